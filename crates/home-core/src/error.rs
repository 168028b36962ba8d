//! Error types for home state and commands

use device_link::DeviceError;
use thiserror::Error;

/// Errors returned by the command gateway and behavior store
#[derive(Error, Debug)]
pub enum HomeError {
    /// Unknown device, state or gesture name
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The board is known to be disconnected
    #[error("Device is not connected")]
    Unavailable,

    /// The board rejected or never answered the request
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Reading or writing the behavior file failed
    #[error("Persistence failure: {0}")]
    Persistence(#[from] std::io::Error),
}

impl HomeError {
    /// Map device-level argument errors onto the gateway's own variant
    pub(crate) fn from_argument(err: DeviceError) -> Self {
        match err {
            DeviceError::InvalidArgument(msg) => HomeError::InvalidArgument(msg),
            other => HomeError::Device(other),
        }
    }
}

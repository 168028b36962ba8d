//! HTTP link to the RoomMate sensor/actuator board
//!
//! This crate implements the small request/response protocol spoken by the
//! ESP32 board: a pipe-delimited status line and path-encoded switch
//! commands.

pub mod client;
pub mod status;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{DeviceClient, HttpDeviceClient, DEFAULT_TIMEOUT};
pub use status::ParsedStatus;
pub use types::*;

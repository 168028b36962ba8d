//! Core types for the device link

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Device link errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Network failure or request timeout
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// Device answered with a non-success status code
    #[error("Device returned status {0}")]
    BadStatus(u16),

    /// Caller supplied a device or state outside the known vocabulary
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Switchable outputs on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Light,
    Fan,
}

impl Device {
    /// Path segment used by the board's command endpoint
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Light => "light",
            Device::Fan => "fan",
        }
    }

    /// Capitalized name for human-readable log lines
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Device::Light => "Light",
            Device::Fan => "Fan",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Device::Light),
            "fan" => Ok(Device::Fan),
            _ => Err(DeviceError::InvalidArgument(format!("unknown device '{s}'"))),
        }
    }
}

/// On/off position of a switch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwitchState {
    On,
    #[default]
    Off,
}

impl SwitchState {
    /// Path segment used by the board's command endpoint
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SwitchState::On => "on",
            SwitchState::Off => "off",
        }
    }

    #[must_use]
    pub fn is_on(self) -> bool {
        self == SwitchState::On
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchState::On => f.write_str("ON"),
            SwitchState::Off => f.write_str("OFF"),
        }
    }
}

impl FromStr for SwitchState {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(SwitchState::On),
            "off" => Ok(SwitchState::Off),
            _ => Err(DeviceError::InvalidArgument(format!("unknown state '{s}'"))),
        }
    }
}

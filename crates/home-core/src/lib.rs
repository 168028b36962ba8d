//! Shared home state for RoomMate
//!
//! This crate owns the reconciled model of the board (switches, sensors,
//! connectivity), the user-facing event log, the learned behavior store and
//! the command gateway through which every state change is requested.

pub mod behavior;
pub mod config;
pub mod error;
pub mod event_log;
pub mod gateway;
pub mod home;
pub mod persistence;
pub mod state;

pub use behavior::{minute_of_day, BehaviorData, BehaviorStore, LEARNING_WINDOW};
pub use config::HomeConfig;
pub use error::HomeError;
pub use event_log::{EventLog, LogEntry, MAX_LOG_SIZE};
pub use gateway::{CommandGateway, CommandOutcome, CommandSource};
pub use home::Home;
pub use state::{StateModel, SystemState};

pub use device_link::{Device, DeviceClient, DeviceError, ParsedStatus, SwitchState};

//! Command gateway: the single path for changing switch positions

use crate::behavior::{minute_of_day, BehaviorStore};
use crate::error::HomeError;
use crate::event_log::EventLog;
use crate::state::StateModel;
use chrono::{DateTime, Local};
use device_link::{Device, DeviceClient, SwitchState};
use serde::Serialize;
use std::sync::Arc;

/// Who asked for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    /// Dashboard or API client
    Manual,
    /// Symbolic command from the gesture recognizer
    Gesture,
    /// One of the automation policies
    Automation,
}

/// Result of a successful command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub device: Device,
    pub state: SwitchState,
    pub source: CommandSource,
}

/// Map a gesture name to the command it stands for
#[must_use]
pub fn gesture_command(name: &str) -> Option<(Device, SwitchState)> {
    match name {
        "fan_on" => Some((Device::Fan, SwitchState::On)),
        "fan_off" => Some((Device::Fan, SwitchState::Off)),
        "light_on" => Some((Device::Light, SwitchState::On)),
        "light_off" => Some((Device::Light, SwitchState::Off)),
        _ => None,
    }
}

/// Validates and executes switch commands against the board
///
/// Locks are only taken around state, log and behavior updates; the board
/// request itself runs unlocked.
pub struct CommandGateway {
    client: Arc<dyn DeviceClient>,
    state: Arc<StateModel>,
    log: Arc<EventLog>,
    behavior: Arc<BehaviorStore>,
    learn_from_gestures: bool,
}

impl CommandGateway {
    pub fn new(
        client: Arc<dyn DeviceClient>,
        state: Arc<StateModel>,
        log: Arc<EventLog>,
        behavior: Arc<BehaviorStore>,
    ) -> Self {
        Self {
            client,
            state,
            log,
            behavior,
            learn_from_gestures: true,
        }
    }

    /// Choose whether gesture light-on commands feed the learned schedule
    #[must_use]
    pub fn with_gesture_learning(mut self, enabled: bool) -> Self {
        self.learn_from_gestures = enabled;
        self
    }

    /// Execute a command given as raw device/state names
    pub async fn execute(
        &self,
        device: &str,
        state: &str,
        source: CommandSource,
    ) -> Result<CommandOutcome, HomeError> {
        self.execute_at(device, state, source, Local::now()).await
    }

    /// `execute` with an explicit wall-clock time
    pub async fn execute_at(
        &self,
        device: &str,
        state: &str,
        source: CommandSource,
        now: DateTime<Local>,
    ) -> Result<CommandOutcome, HomeError> {
        let device: Device = device.parse().map_err(HomeError::from_argument)?;
        let state: SwitchState = state.parse().map_err(HomeError::from_argument)?;
        self.send(device, state, source, now).await
    }

    /// Execute a validated command
    pub async fn send(
        &self,
        device: Device,
        state: SwitchState,
        source: CommandSource,
        now: DateTime<Local>,
    ) -> Result<CommandOutcome, HomeError> {
        if !self.state.is_connected().await {
            tracing::debug!("Rejecting {} {} from {:?}: not connected", device, state, source);
            return Err(HomeError::Unavailable);
        }

        if let Err(e) = self.client.send_command(device, state).await {
            self.log
                .add_at(format!("Failed to control {device}: {e}"), now)
                .await;
            return Err(e.into());
        }

        self.state.set_switch(device, state).await;

        match source {
            CommandSource::Manual => {
                self.log
                    .add_at(format!("{} turned {}", device.label(), state), now)
                    .await;
            }
            CommandSource::Gesture => {
                self.log
                    .add_at(format!("Gesture: {} turned {}", device.label(), state), now)
                    .await;
            }
            // Policies write their own log line naming the reason
            CommandSource::Automation => {}
        }

        if device == Device::Light && state == SwitchState::On && self.learns_from(source) {
            if let Err(e) = self.behavior.record_light_on(minute_of_day(&now)).await {
                tracing::warn!("Failed to persist learned light-on time: {}", e);
            }
        }

        Ok(CommandOutcome {
            device,
            state,
            source,
        })
    }

    /// Execute a gesture-derived command
    ///
    /// The gesture name is recorded even when it is unknown or the command
    /// fails.
    pub async fn execute_gesture(&self, name: &str) -> Result<CommandOutcome, HomeError> {
        self.execute_gesture_at(name, Local::now()).await
    }

    /// `execute_gesture` with an explicit wall-clock time
    pub async fn execute_gesture_at(
        &self,
        name: &str,
        now: DateTime<Local>,
    ) -> Result<CommandOutcome, HomeError> {
        self.state.set_last_gesture(name).await;

        let (device, state) = gesture_command(name)
            .ok_or_else(|| HomeError::InvalidArgument(format!("unknown gesture '{name}'")))?;

        self.send(device, state, CommandSource::Gesture, now).await
    }

    /// Record a gesture for display without acting on it
    pub async fn record_gesture(&self, name: &str) {
        self.state.set_last_gesture(name).await;
        self.log.add(format!("Gesture detected: {name}")).await;
    }

    fn learns_from(&self, source: CommandSource) -> bool {
        match source {
            CommandSource::Manual => true,
            CommandSource::Gesture => self.learn_from_gestures,
            CommandSource::Automation => false,
        }
    }

    pub fn state(&self) -> &Arc<StateModel> {
        &self.state
    }

    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    pub fn behavior(&self) -> &Arc<BehaviorStore> {
        &self.behavior
    }

    pub fn client(&self) -> &Arc<dyn DeviceClient> {
        &self.client
    }
}

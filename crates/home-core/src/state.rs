//! Reconciled model of the board

use chrono::{DateTime, Local};
use device_link::{Device, ParsedStatus, SwitchState};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Snapshot of everything known about the board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    /// Last-known light position
    pub light: SwitchState,
    /// Last-known fan position
    pub fan: SwitchState,
    /// Last gas sensor reading
    pub gas_value: u32,
    /// Whether the latest reading reported motion
    pub motion: bool,
    /// Most recent gesture reported by a client
    pub last_gesture: Option<String>,
    /// Time of the last successful status read
    pub last_updated: Option<DateTime<Local>>,
    /// Outcome of the most recent poll
    pub connected: bool,
}

impl SystemState {
    /// Position of the given switch
    #[must_use]
    pub fn switch(&self, device: Device) -> SwitchState {
        match device {
            Device::Light => self.light,
            Device::Fan => self.fan,
        }
    }

    fn set_switch(&mut self, device: Device, state: SwitchState) {
        match device {
            Device::Light => self.light = state,
            Device::Fan => self.fan = state,
        }
    }
}

/// Lock-guarded `SystemState` shared by the poll loop and the command path
///
/// Each method is one logical update under the lock. No method awaits
/// anything other than the lock itself.
#[derive(Debug, Default)]
pub struct StateModel {
    inner: RwLock<SystemState>,
}

impl StateModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> SystemState {
        self.inner.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.connected
    }

    /// Merge a successful status read and mark the board connected
    ///
    /// Fields missing from `status` keep their previous value. Returns the
    /// connectivity flag as it was before this update.
    pub async fn apply_status(&self, status: &ParsedStatus, now: DateTime<Local>) -> bool {
        let mut state = self.inner.write().await;
        if let Some(gas) = status.gas_value {
            state.gas_value = gas;
        }
        if let Some(motion) = status.motion {
            state.motion = motion;
        }
        if let Some(light) = status.light {
            state.light = light;
        }
        if let Some(fan) = status.fan {
            state.fan = fan;
        }
        state.last_updated = Some(now);
        std::mem::replace(&mut state.connected, true)
    }

    /// Mark the board disconnected, keeping every other field
    ///
    /// Returns the connectivity flag as it was before this update.
    pub async fn mark_disconnected(&self) -> bool {
        let mut state = self.inner.write().await;
        std::mem::replace(&mut state.connected, false)
    }

    /// Record the position of a switch after a confirmed command
    pub async fn set_switch(&self, device: Device, switch: SwitchState) {
        self.inner.write().await.set_switch(device, switch);
    }

    pub async fn set_last_gesture(&self, gesture: impl Into<String>) {
        self.inner.write().await.last_gesture = Some(gesture.into());
    }
}

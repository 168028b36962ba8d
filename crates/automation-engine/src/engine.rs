//! Core automation engine

use crate::config::AutomationConfig;
use crate::policy::{self, PolicyContext};
use chrono::{DateTime, Local};
use home_core::{CommandSource, Device, Home, SwitchState};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

/// Events emitted by the automation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutomationEvent {
    /// The board became reachable or unreachable
    ConnectionChanged { connected: bool },
    /// The learned schedule switched the light on
    AutoLightOn { learned_minute: u16 },
    /// The light was switched off after a quiet period
    AutoLightOff,
    /// Gas reading crossed the alert threshold
    GasAlert { value: u32 },
    /// A policy fired but its command failed
    ActionFailed { policy: String, error: String },
}

/// Evaluates the automation policies against the shared home
pub struct AutomationEngine {
    config: AutomationConfig,
    home: Home,
    event_tx: broadcast::Sender<AutomationEvent>,
    last_gas_alert: Mutex<Option<DateTime<Local>>>,
}

impl AutomationEngine {
    /// Create a new automation engine
    pub fn new(home: Home, config: AutomationConfig) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            config,
            home,
            event_tx,
            last_gas_alert: Mutex::new(None),
        }
    }

    /// Subscribe to automation events
    pub fn subscribe(&self) -> broadcast::Receiver<AutomationEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    pub(crate) fn emit(&self, event: AutomationEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Run every policy once against the current state
    ///
    /// Policies see one snapshot taken at the start of the evaluation, in
    /// order: learned light-on, no-motion light-off, gas alert.
    pub async fn evaluate(&self, last_motion: Option<DateTime<Local>>, now: DateTime<Local>) {
        let state = self.home.state.snapshot().await;
        let behavior = self.home.behavior.snapshot().await;
        let ctx = PolicyContext {
            state: &state,
            behavior: &behavior,
            last_motion,
            now,
        };

        if let Some(learned_minute) = policy::learned_light_on(&self.config, &ctx) {
            self.fire_learned_light_on(learned_minute, now).await;
        }

        if policy::no_motion_off(&self.config, &ctx) {
            self.fire_no_motion_off(now).await;
        }

        let mut last_gas_alert = self.last_gas_alert.lock().await;
        if policy::gas_alert(&self.config, &ctx, *last_gas_alert) {
            *last_gas_alert = Some(now);
            drop(last_gas_alert);
            self.raise_gas_alert(state.gas_value, now).await;
        }
    }

    async fn fire_learned_light_on(&self, learned_minute: u16, now: DateTime<Local>) {
        tracing::info!(
            "Learned light-on firing (learned minute {}, now {})",
            learned_minute,
            now.format("%H:%M")
        );

        match self
            .home
            .gateway
            .send(Device::Light, SwitchState::On, CommandSource::Automation, now)
            .await
        {
            Ok(_) => {
                if let Err(e) = self.home.behavior.mark_auto_light(now.date_naive()).await {
                    tracing::warn!("Failed to persist auto-light date: {}", e);
                }
                self.home.log.add_at("Auto-light on (learned)", now).await;
                self.emit(AutomationEvent::AutoLightOn { learned_minute });
            }
            Err(e) => {
                // The gateway already logged the device failure; a later
                // cycle inside the tolerance window may retry today
                tracing::warn!("Learned light-on failed: {}", e);
                self.emit(AutomationEvent::ActionFailed {
                    policy: "learned_light_on".to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    async fn fire_no_motion_off(&self, now: DateTime<Local>) {
        tracing::info!("No motion for {:?}, switching light off", self.config.no_motion_off_after);

        match self
            .home
            .gateway
            .send(Device::Light, SwitchState::Off, CommandSource::Automation, now)
            .await
        {
            Ok(_) => {
                self.home.log.add_at("Auto-light off (no motion)", now).await;
                self.emit(AutomationEvent::AutoLightOff);
            }
            Err(e) => {
                tracing::warn!("No-motion light-off failed: {}", e);
                self.emit(AutomationEvent::ActionFailed {
                    policy: "no_motion_off".to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    async fn raise_gas_alert(&self, value: u32, now: DateTime<Local>) {
        tracing::warn!("Gas reading {} above threshold {}", value, self.config.gas_alert_threshold);
        self.home
            .log
            .add_at(format!("Gas leak alert: value {value}"), now)
            .await;
        self.emit(AutomationEvent::GasAlert { value });
    }
}

//! Automation settings

use home_core::config::{env_flag, env_parse};
use std::time::Duration;

/// Tunables for the poll loop and the automation policies
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// Time between reconciliation cycles
    pub poll_interval: Duration,
    /// Master switch for the learned light-on policy
    pub auto_light_enabled: bool,
    /// How close to the learned minute the current time must be
    pub learned_tolerance_minutes: u16,
    /// Idle time before the light is switched off; zero disables
    pub no_motion_off_after: Duration,
    /// Gas reading above which an alert is raised; zero disables
    pub gas_alert_threshold: u32,
    /// Minimum time between two gas alerts
    pub gas_alert_cooldown: Duration,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            auto_light_enabled: true,
            learned_tolerance_minutes: 5,
            no_motion_off_after: Duration::from_secs(5 * 60),
            gas_alert_threshold: 300,
            gas_alert_cooldown: Duration::from_secs(30),
        }
    }
}

impl AutomationConfig {
    /// Read settings from the environment, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            poll_interval: Duration::from_millis(env_parse(
                "POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )),
            auto_light_enabled: env_flag("AUTO_LIGHT_ENABLED", defaults.auto_light_enabled),
            learned_tolerance_minutes: env_parse(
                "AUTO_LIGHT_TOLERANCE_MIN",
                defaults.learned_tolerance_minutes,
            ),
            no_motion_off_after: Duration::from_secs(
                env_parse(
                    "NO_MOTION_OFF_MIN",
                    defaults.no_motion_off_after.as_secs() / 60,
                )
                .saturating_mul(60),
            ),
            gas_alert_threshold: env_parse("GAS_ALERT_THRESHOLD", defaults.gas_alert_threshold),
            gas_alert_cooldown: Duration::from_secs(env_parse(
                "GAS_ALERT_COOLDOWN_SECS",
                defaults.gas_alert_cooldown.as_secs(),
            )),
        };
        config.normalized()
    }

    /// Replace settings the poll loop cannot run with by their defaults
    ///
    /// A zero poll interval is rejected since a timer cannot tick at zero.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.poll_interval.is_zero() {
            let fallback = Self::default().poll_interval;
            tracing::warn!(
                "Poll interval must be positive, using {:?} instead",
                fallback
            );
            self.poll_interval = fallback;
        }
        self
    }

    /// Whether the no-motion light-off policy is active
    #[must_use]
    pub fn no_motion_off_enabled(&self) -> bool {
        !self.no_motion_off_after.is_zero()
    }
}

//! Reconciliation loop: keeps the home model in sync with the board

use crate::engine::{AutomationEngine, AutomationEvent};
use chrono::{DateTime, Local};
use device_link::{DeviceError, ParsedStatus};
use futures::FutureExt;
use home_core::Home;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodic poller driving state updates and automation
pub struct Reconciler {
    home: Home,
    engine: Arc<AutomationEngine>,
    poll_interval: Duration,
    /// Last cycle in which the board reported motion
    last_motion: Option<DateTime<Local>>,
}

impl Reconciler {
    pub fn new(home: Home, engine: Arc<AutomationEngine>) -> Self {
        let poll_interval = engine.config().clone().normalized().poll_interval;
        Self {
            home,
            engine,
            poll_interval,
            last_motion: None,
        }
    }

    pub fn last_motion(&self) -> Option<DateTime<Local>> {
        self.last_motion
    }

    /// Run one reconciliation cycle
    ///
    /// A panic anywhere in the cycle is caught and treated as a failed poll
    /// so the loop keeps running.
    pub async fn run_cycle(&mut self, now: DateTime<Local>) {
        let result = AssertUnwindSafe(self.reconcile(now)).catch_unwind().await;

        if let Err(panic) = result {
            let reason = panic_message(panic.as_ref());
            tracing::error!("Unexpected error in reconciliation cycle: {}", reason);
            self.record_failure(format!("Unexpected error during poll: {reason}"), now)
                .await;
        }
    }

    async fn reconcile(&mut self, now: DateTime<Local>) {
        match self.home.client().read_status().await {
            Ok(status) => self.record_success(&status, now).await,
            Err(e) => self.record_failure(failure_message(&e), now).await,
        }

        self.engine.evaluate(self.last_motion, now).await;
    }

    async fn record_success(&mut self, status: &ParsedStatus, now: DateTime<Local>) {
        if status.is_empty() {
            tracing::debug!("Status line carried no known fields");
        }

        let was_connected = self.home.state.apply_status(status, now).await;
        if !was_connected {
            self.home.log.add_at("Device connected", now).await;
            self.engine
                .emit(AutomationEvent::ConnectionChanged { connected: true });
        }

        if status.motion == Some(true) {
            self.last_motion = Some(now);
        }
    }

    /// Mark the board disconnected, logging only on the transition
    async fn record_failure(&self, message: String, now: DateTime<Local>) {
        tracing::debug!("Poll failed: {}", message);
        if self.home.state.mark_disconnected().await {
            self.home.log.add_at(message, now).await;
            self.engine
                .emit(AutomationEvent::ConnectionChanged { connected: false });
        }
    }

    /// Start the loop on the runtime
    pub fn spawn(mut self) -> ReconcilerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            tracing::info!(
                "Reconciliation loop started (every {:?})",
                self.poll_interval
            );
            let mut interval = tokio::time::interval(self.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => self.run_cycle(Local::now()).await,
                    _ = shutdown_rx.changed() => break,
                }
            }

            tracing::info!("Reconciliation loop stopped");
        });

        ReconcilerHandle { shutdown_tx, task }
    }
}

/// Handle to a running reconciliation loop
pub struct ReconcilerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Stop the loop after the current cycle and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Reconciliation loop ended abnormally: {}", e);
        }
    }
}

fn failure_message(err: &DeviceError) -> String {
    match err {
        DeviceError::Unreachable(cause) => format!("Device connection lost: {cause}"),
        DeviceError::BadStatus(code) => format!("Device returned non-success status: {code}"),
        other => format!("Device error: {other}"),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AutomationConfig;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use device_link::mock::MockDeviceClient;
    use home_core::{CommandSource, Device, HomeConfig, SwitchState};

    struct Fixture {
        _dir: tempfile::TempDir,
        client: Arc<MockDeviceClient>,
        home: Home,
        reconciler: Reconciler,
    }

    async fn fixture() -> Fixture {
        fixture_with(AutomationConfig::default()).await
    }

    async fn fixture_with(config: AutomationConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let home_config = HomeConfig {
            data_dir: dir.path().to_path_buf(),
            ..HomeConfig::default()
        };
        let client = Arc::new(MockDeviceClient::new());
        let home = Home::open(&home_config, client.clone()).await;
        let engine = Arc::new(AutomationEngine::new(home.clone(), config));
        let reconciler = Reconciler::new(home.clone(), engine);
        Fixture {
            _dir: dir,
            client,
            home,
            reconciler,
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    async fn messages(home: &Home) -> Vec<String> {
        home.log
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    #[tokio::test]
    async fn test_first_success_connects() {
        let mut f = fixture().await;
        f.client.push_status_line("Gas:50|Motion:Clear|Light:OFF|Fan:ON");

        let now = at(9, 0);
        f.reconciler.run_cycle(now).await;

        let state = f.home.state.snapshot().await;
        assert!(state.connected);
        assert_eq!(state.gas_value, 50);
        assert_eq!(state.fan, SwitchState::On);
        assert_eq!(state.last_updated, Some(now));
        assert_eq!(messages(&f.home).await, vec!["Device connected"]);

        f.reconciler.run_cycle(at(9, 1)).await;
        assert_eq!(messages(&f.home).await.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_failures_log_one_transition() {
        let mut f = fixture().await;
        f.client.push_status_line("Gas:50|Motion:Clear|Light:ON|Fan:OFF");
        f.client
            .push_status(Err(DeviceError::Unreachable("connection refused".into())));
        f.client.push_status(Err(DeviceError::BadStatus(500)));
        f.client.push_status(Err(DeviceError::BadStatus(500)));

        for minute in 0..4 {
            f.reconciler.run_cycle(at(10, minute)).await;
        }

        let state = f.home.state.snapshot().await;
        assert!(!state.connected);
        // Stale values survive the outage
        assert_eq!(state.gas_value, 50);
        assert_eq!(state.light, SwitchState::On);

        let entries = f.home.log.snapshot().await;
        assert_eq!(entries[0].time, at(10, 1));

        let log = messages(&f.home).await;
        assert_eq!(
            log,
            vec![
                "Device connection lost: connection refused".to_string(),
                "Device connected".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_status_message_names_code() {
        let mut f = fixture().await;
        f.client.push_status_line("Gas:1");
        f.client.push_status(Err(DeviceError::BadStatus(404)));

        f.reconciler.run_cycle(at(10, 0)).await;
        f.reconciler.run_cycle(at(10, 1)).await;

        assert_eq!(
            messages(&f.home).await[0],
            "Device returned non-success status: 404"
        );
    }

    #[tokio::test]
    async fn test_never_connected_failures_are_silent() {
        let mut f = fixture().await;
        f.client.push_status(Err(DeviceError::Unreachable("timeout".into())));

        f.reconciler.run_cycle(at(10, 0)).await;
        f.reconciler.run_cycle(at(10, 1)).await;
        assert!(f.home.log.is_empty().await);
    }

    #[tokio::test]
    async fn test_motion_time_recorded_only_when_seen() {
        let mut f = fixture().await;
        f.client.push_status_line("Motion:Detected|Light:ON");
        f.client.push_status_line("Motion:Clear|Light:ON");
        f.client.push_status_line("Light:ON");

        f.reconciler.run_cycle(at(20, 0)).await;
        f.reconciler.run_cycle(at(20, 1)).await;
        f.reconciler.run_cycle(at(20, 2)).await;

        assert_eq!(f.reconciler.last_motion(), Some(at(20, 0)));
    }

    #[tokio::test]
    async fn test_panic_is_treated_as_poll_failure() {
        let mut f = fixture().await;
        f.client.push_status_line("Gas:10|Light:OFF");
        f.reconciler.run_cycle(at(8, 0)).await;

        f.client.panic_on_next_read();
        f.reconciler.run_cycle(at(8, 1)).await;

        assert!(!f.home.state.is_connected().await);
        let entries = f.home.log.snapshot().await;
        assert_eq!(
            entries[0].message,
            "Unexpected error during poll: scripted read failure"
        );
        assert_eq!(entries[0].time, at(8, 1));

        // The next cycle recovers with the repeated status
        f.reconciler.run_cycle(at(8, 2)).await;
        assert!(f.home.state.is_connected().await);
    }

    #[tokio::test]
    async fn test_manual_then_learned_light_on_next_day() {
        let mut f = fixture().await;
        f.client.push_status_line("Gas:50|Motion:Clear|Light:OFF|Fan:OFF");
        f.reconciler.run_cycle(at(6, 59)).await;

        f.home
            .gateway
            .execute_at("light", "on", CommandSource::Manual, at(7, 0))
            .await
            .unwrap();
        assert_eq!(f.home.behavior.snapshot().await.light_on_minutes, vec![420]);
        assert_eq!(messages(&f.home).await.len(), 2);

        // Next morning the board reports the light off again
        let tomorrow = at(7, 2) + ChronoDuration::days(1);
        for offset in 0..5 {
            f.reconciler
                .run_cycle(tomorrow + ChronoDuration::seconds(offset))
                .await;
        }

        let auto_on = f
            .client
            .commands()
            .into_iter()
            .filter(|c| *c == (Device::Light, SwitchState::On))
            .count();
        // One manual command plus exactly one learned trigger
        assert_eq!(auto_on, 2);
        assert!(f.home.behavior.auto_lit_on(tomorrow.date_naive()).await);
    }

    #[tokio::test]
    async fn test_motion_then_quiet_switches_light_off() {
        let mut f = fixture().await;
        f.client.push_status_line("Motion:Detected|Light:ON");
        f.client.push_status_line("Motion:Clear|Light:ON");

        let start = at(21, 0);
        f.reconciler.run_cycle(start).await;
        f.reconciler
            .run_cycle(start + ChronoDuration::minutes(3))
            .await;
        assert!(f.client.commands().is_empty());

        f.reconciler
            .run_cycle(start + ChronoDuration::minutes(5))
            .await;
        assert_eq!(f.client.commands(), vec![(Device::Light, SwitchState::Off)]);
        assert_eq!(messages(&f.home).await[0], "Auto-light off (no motion)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_polls_until_shutdown() {
        let f = fixture_with(AutomationConfig {
            poll_interval: Duration::from_secs(1),
            ..AutomationConfig::default()
        })
        .await;
        f.client.push_status_line("Gas:5|Light:OFF");
        f.client.panic_on_next_read();

        let handle = f.reconciler.spawn();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(f.client.read_count() >= 3);
        assert!(f.home.state.is_connected().await);

        handle.shutdown().await;
        let reads = f.client.read_count();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(f.client.read_count(), reads);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_poll_interval_keeps_loop_alive() {
        let f = fixture_with(AutomationConfig {
            poll_interval: Duration::ZERO,
            ..AutomationConfig::default()
        })
        .await;
        f.client.push_status_line("Gas:5|Light:OFF");

        let handle = f.reconciler.spawn();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(f.client.read_count() >= 2);
        assert!(f.home.state.is_connected().await);

        handle.shutdown().await;
    }
}

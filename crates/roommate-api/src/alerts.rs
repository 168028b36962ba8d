//! Hook point for notification delivery
//!
//! Delivery (mail, speech) lives outside the controller. This listener is
//! where it plugs in; for now alerts go to the operator log.

use automation_engine::{AutomationEngine, AutomationEvent};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Forward automation events to the operator log
pub fn start_alert_listener(engine: &Arc<AutomationEngine>) {
    let mut rx = engine.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(AutomationEvent::GasAlert { value }) => {
                    tracing::warn!(target: "alerts", "Gas leak detected! Sensor value: {}", value);
                }
                Ok(AutomationEvent::ConnectionChanged { connected: false }) => {
                    tracing::warn!(target: "alerts", "Board went offline");
                }
                Ok(AutomationEvent::ActionFailed { policy, error }) => {
                    tracing::warn!(target: "alerts", "Automation {} failed: {}", policy, error);
                }
                Ok(event) => tracing::debug!(target: "alerts", "{:?}", event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Alert listener lagged by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Automation event channel closed");
                    break;
                }
            }
        }
    });
}

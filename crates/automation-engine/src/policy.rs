//! Automation policies
//!
//! Each policy is a pure decision over a snapshot of the home: it never
//! touches shared state itself. The engine acts on the decision.
//!
//! The learned light-on policy requires the light to be OFF and the
//! no-motion policy requires it to be ON, so at most one of them can fire
//! for a given snapshot. New policies must keep their preconditions
//! disjoint in the same way.

use crate::config::AutomationConfig;
use chrono::{DateTime, Local};
use home_core::behavior::MINUTES_PER_DAY;
use home_core::{minute_of_day, BehaviorData, SwitchState, SystemState};

/// Everything a policy may look at
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub state: &'a SystemState,
    pub behavior: &'a BehaviorData,
    /// Last cycle in which the board reported motion
    pub last_motion: Option<DateTime<Local>>,
    pub now: DateTime<Local>,
}

/// Learned light-on: switch the light on around the usual time of day
///
/// Returns the learned minute when the policy should fire.
#[must_use]
pub fn learned_light_on(config: &AutomationConfig, ctx: &PolicyContext<'_>) -> Option<u16> {
    if !config.auto_light_enabled || !ctx.state.connected || ctx.state.light != SwitchState::Off {
        return None;
    }
    if ctx.behavior.last_auto_light_date == Some(ctx.now.date_naive()) {
        return None;
    }

    let learned = ctx.behavior.learned_minute()?;
    let distance = minute_distance(minute_of_day(&ctx.now), learned);
    (distance <= config.learned_tolerance_minutes).then_some(learned)
}

/// No-motion light-off: switch the light off after a quiet period
#[must_use]
pub fn no_motion_off(config: &AutomationConfig, ctx: &PolicyContext<'_>) -> bool {
    if !config.no_motion_off_enabled() {
        return false;
    }
    let Some(last_motion) = ctx.last_motion else {
        return false;
    };
    if !ctx.state.connected || ctx.state.light != SwitchState::On || ctx.state.motion {
        return false;
    }

    elapsed_at_least(last_motion, ctx.now, config.no_motion_off_after)
}

/// Gas alert: reading above threshold and outside the cooldown window
#[must_use]
pub fn gas_alert(
    config: &AutomationConfig,
    ctx: &PolicyContext<'_>,
    last_alert: Option<DateTime<Local>>,
) -> bool {
    if config.gas_alert_threshold == 0 || !ctx.state.connected {
        return false;
    }
    if ctx.state.gas_value <= config.gas_alert_threshold {
        return false;
    }

    match last_alert {
        Some(previous) => elapsed_at_least(previous, ctx.now, config.gas_alert_cooldown),
        None => true,
    }
}

/// Distance between two minutes-of-day, wrapping at midnight
fn minute_distance(a: u16, b: u16) -> u16 {
    let diff = a.abs_diff(b) % MINUTES_PER_DAY;
    diff.min(MINUTES_PER_DAY - diff)
}

fn elapsed_at_least(since: DateTime<Local>, now: DateTime<Local>, threshold: std::time::Duration) -> bool {
    // A clock that stepped backwards yields a negative delta, which never counts
    (now - since)
        .to_std()
        .map(|elapsed| elapsed >= threshold)
        .unwrap_or(false)
}

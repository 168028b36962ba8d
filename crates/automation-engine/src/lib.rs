//! Automation engine for RoomMate
//!
//! Runs the reconciliation loop that keeps the home model in sync with the
//! board, and the policies that act on it: learned time-of-day light-on,
//! no-motion light-off and gas alerts.

pub mod config;
pub mod engine;
pub mod policy;
pub mod reconciler;

pub use config::AutomationConfig;
pub use engine::{AutomationEngine, AutomationEvent};
pub use reconciler::{Reconciler, ReconcilerHandle};

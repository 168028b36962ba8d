//! Status line parsing
//!
//! The board reports its state as a single line of `key:value` pairs joined
//! by `|`, e.g. `Gas:123|Motion:Detected|Light:ON|Fan:OFF`. Field order is
//! not fixed and the firmware may add fields over time.

use crate::types::SwitchState;
use serde::Serialize;

/// Marker the firmware uses in the `Motion` field when the PIR has fired
pub const MOTION_DETECTED: &str = "Detected";

/// Fields recovered from one status line
///
/// Every field is optional: a field that is missing or malformed stays
/// `None` so the caller can keep its last-known value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedStatus {
    pub gas_value: Option<u32>,
    pub motion: Option<bool>,
    pub light: Option<SwitchState>,
    pub fan: Option<SwitchState>,
}

impl ParsedStatus {
    /// Parse a status body, ignoring unknown or malformed fields
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let mut status = Self::default();

        for part in body.trim().split('|') {
            let Some((key, value)) = part.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "Gas" => match value.parse::<u32>() {
                    Ok(v) => status.gas_value = Some(v),
                    Err(_) => tracing::debug!("Ignoring malformed gas value {:?}", value),
                },
                "Motion" => status.motion = Some(value.contains(MOTION_DETECTED)),
                "Light" => status.light = value.parse().ok(),
                "Fan" => status.fan = value.parse().ok(),
                other => tracing::trace!("Ignoring unknown status field {:?}", other),
            }
        }

        status
    }

    /// True when no known field could be recovered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gas_value.is_none() && self.motion.is_none() && self.light.is_none() && self.fan.is_none()
    }
}

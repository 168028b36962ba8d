//! Environment-driven configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default board address on the home LAN.
pub const DEFAULT_DEVICE_URL: &str = "http://192.168.29.226";

/// Settings for the shared home state and device link
#[derive(Debug, Clone)]
pub struct HomeConfig {
    /// Base URL of the board
    pub device_url: String,
    /// Directory holding `behavior.json`
    pub data_dir: PathBuf,
    /// Per-request timeout for board calls
    pub request_timeout: Duration,
    /// Whether gesture light-on commands feed the learned schedule
    pub learn_from_gestures: bool,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            device_url: DEFAULT_DEVICE_URL.to_string(),
            data_dir: PathBuf::from("./data"),
            request_timeout: device_link::DEFAULT_TIMEOUT,
            learn_from_gestures: true,
        }
    }
}

impl HomeConfig {
    /// Read settings from `DEVICE_URL`, `DATA_DIR`, `REQUEST_TIMEOUT_MS`
    /// and `LEARN_FROM_GESTURES`, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            device_url: std::env::var("DEVICE_URL").unwrap_or(defaults.device_url),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            request_timeout: Duration::from_millis(env_parse(
                "REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )),
            learn_from_gestures: env_flag("LEARN_FROM_GESTURES", defaults.learn_from_gestures),
        }
    }

    /// Location of the persisted behavior record
    #[must_use]
    pub fn behavior_path(&self) -> PathBuf {
        self.data_dir.join("behavior.json")
    }
}

/// Parse an environment variable, keeping `default` when unset or invalid
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid value {:?} for {}", raw, key);
                default
            }
        },
        Err(_) => default,
    }
}

/// Read a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`)
pub fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw).unwrap_or_else(|| {
            tracing::warn!("Ignoring invalid flag {:?} for {}", raw, key);
            default
        }),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

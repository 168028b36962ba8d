//! HTTP client for the board

use crate::status::ParsedStatus;
use crate::types::{Device, DeviceError, SwitchState};
use async_trait::async_trait;
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Read/command access to the board
///
/// Implementations make exactly one attempt per call. Retrying is left to
/// the caller's polling cadence.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Fetch and parse the current status line
    async fn read_status(&self) -> Result<ParsedStatus, DeviceError>;

    /// Drive a switch to the requested position
    async fn send_command(&self, device: Device, state: SwitchState) -> Result<(), DeviceError>;
}

/// `DeviceClient` backed by the board's HTTP endpoints
pub struct HttpDeviceClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpDeviceClient {
    /// Create a client for the board at `base_url` (e.g. `http://192.168.1.50`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DeviceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, http })
    }

    /// Base URL of the board
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn status_url(&self) -> String {
        format!("{}/status", self.base_url)
    }

    fn command_url(&self, device: Device, state: SwitchState) -> String {
        format!("{}/{}/{}", self.base_url, device.as_str(), state.as_str())
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, DeviceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| DeviceError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::BadStatus(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    async fn read_status(&self) -> Result<ParsedStatus, DeviceError> {
        let response = self.get(&self.status_url()).await?;
        let body = response
            .text()
            .await
            .map_err(|e| DeviceError::Unreachable(e.to_string()))?;

        tracing::trace!("Status line: {}", body.trim());
        Ok(ParsedStatus::parse(&body))
    }

    async fn send_command(&self, device: Device, state: SwitchState) -> Result<(), DeviceError> {
        let url = self.command_url(device, state);
        tracing::debug!("Sending {} {} to {}", device, state, url);
        self.get(&url).await?;
        Ok(())
    }
}

//! Scripted in-memory `DeviceClient` for tests

use crate::client::DeviceClient;
use crate::status::ParsedStatus;
use crate::types::{Device, DeviceError, SwitchState};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// A `DeviceClient` that replays queued responses
///
/// Status reads pop from the status script; once it is drained the last
/// scripted reply is repeated. Commands pop from the command script and
/// succeed by default. Every command is recorded.
#[derive(Default)]
pub struct MockDeviceClient {
    statuses: Mutex<VecDeque<Result<ParsedStatus, DeviceError>>>,
    last_status: Mutex<Option<Result<ParsedStatus, DeviceError>>>,
    command_results: Mutex<VecDeque<Result<(), DeviceError>>>,
    commands: Mutex<Vec<(Device, SwitchState)>>,
    reads: AtomicUsize,
    panic_next_read: AtomicBool,
}

impl MockDeviceClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a status line as the next successful read
    pub fn push_status_line(&self, line: &str) {
        self.push_status(Ok(ParsedStatus::parse(line)));
    }

    /// Queue a raw read outcome
    pub fn push_status(&self, reply: Result<ParsedStatus, DeviceError>) {
        lock(&self.statuses).push_back(reply);
    }

    /// Queue the outcome of the next command
    pub fn push_command_result(&self, reply: Result<(), DeviceError>) {
        lock(&self.command_results).push_back(reply);
    }

    /// Make the next `read_status` call panic
    pub fn panic_on_next_read(&self) {
        self.panic_next_read.store(true, Ordering::SeqCst);
    }

    /// Commands received so far, oldest first
    #[must_use]
    pub fn commands(&self) -> Vec<(Device, SwitchState)> {
        lock(&self.commands).clone()
    }

    /// Number of status reads performed
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceClient for MockDeviceClient {
    async fn read_status(&self) -> Result<ParsedStatus, DeviceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.panic_next_read.swap(false, Ordering::SeqCst) {
            panic!("scripted read failure");
        }

        let next = lock(&self.statuses).pop_front();
        let mut last = lock(&self.last_status);
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(DeviceError::Unreachable("no scripted status".into()))),
        }
    }

    async fn send_command(&self, device: Device, state: SwitchState) -> Result<(), DeviceError> {
        lock(&self.commands).push((device, state));
        lock(&self.command_results).pop_front().unwrap_or(Ok(()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

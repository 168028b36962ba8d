//! Learned behavior: recent light-on times and the auto-light guard

use crate::error::HomeError;
use crate::persistence;
use chrono::{DateTime, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Number of recent light-on events kept for averaging
pub const LEARNING_WINDOW: usize = 7;

/// Minutes in a day; valid minute-of-day values are below this
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Minutes since local midnight
pub fn minute_of_day<Tz: TimeZone>(time: &DateTime<Tz>) -> u16 {
    (time.hour() * 60 + time.minute()) as u16
}

/// Persisted behavior record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorData {
    /// Minute-of-day of recent manual light-on events, oldest first
    #[serde(default)]
    pub light_on_minutes: Vec<u16>,
    /// Day the learned schedule last switched the light on
    #[serde(default)]
    pub last_auto_light_date: Option<NaiveDate>,
}

impl BehaviorData {
    /// Floor of the mean of the recorded minutes, if any
    #[must_use]
    pub fn learned_minute(&self) -> Option<u16> {
        if self.light_on_minutes.is_empty() {
            return None;
        }
        let sum: u32 = self.light_on_minutes.iter().map(|&m| u32::from(m)).sum();
        Some((sum / self.light_on_minutes.len() as u32) as u16)
    }

    /// Append a minute, evicting the oldest beyond the window
    fn push_light_on(&mut self, minute: u16) {
        self.light_on_minutes.push(minute % MINUTES_PER_DAY);
        self.trim_window();
    }

    fn trim_window(&mut self) {
        let excess = self.light_on_minutes.len().saturating_sub(LEARNING_WINDOW);
        self.light_on_minutes.drain(..excess);
    }

    /// Drop out-of-range values and enforce the window on loaded data
    fn sanitize(mut self) -> Self {
        self.light_on_minutes.retain(|&m| m < MINUTES_PER_DAY);
        self.trim_window();
        self
    }
}

/// Write-through store for `BehaviorData`
///
/// Every mutation holds the lock across append, trim and the disk write, so
/// concurrent mutations are applied and persisted one at a time. A failed
/// write is reported to the caller but the in-memory change stands.
pub struct BehaviorStore {
    path: PathBuf,
    data: Mutex<BehaviorData>,
}

impl BehaviorStore {
    /// Load the store from `path`, starting empty if the file is absent
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = persistence::load_behavior(&path).await.sanitize();
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> BehaviorData {
        self.data.lock().await.clone()
    }

    pub async fn learned_minute(&self) -> Option<u16> {
        self.data.lock().await.learned_minute()
    }

    /// Whether the learned schedule already fired on `date`
    pub async fn auto_lit_on(&self, date: NaiveDate) -> bool {
        self.data.lock().await.last_auto_light_date == Some(date)
    }

    /// Record a light-on at `minute` and persist
    pub async fn record_light_on(&self, minute: u16) -> Result<(), HomeError> {
        let mut data = self.data.lock().await;
        data.push_light_on(minute);
        persistence::save_behavior(&self.path, &data).await?;
        Ok(())
    }

    /// Mark `date` as the day the learned schedule fired and persist
    pub async fn mark_auto_light(&self, date: NaiveDate) -> Result<(), HomeError> {
        let mut data = self.data.lock().await;
        data.last_auto_light_date = Some(date);
        persistence::save_behavior(&self.path, &data).await?;
        Ok(())
    }
}

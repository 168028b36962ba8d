//! On-disk form of the learned behavior record
//!
//! Files written before the auto-light guard existed carry only
//! `light_on_minutes`; they load with no guard date.

use crate::behavior::BehaviorData;
use chrono::NaiveDate;
use std::path::Path;
use tokio::fs;

/// Read the behavior record at `path`
///
/// Missing, unreadable or corrupt files yield an empty record, which means
/// nothing is learned and the auto-light guard is clear.
pub async fn load_behavior(path: &Path) -> BehaviorData {
    match fs::read_to_string(path).await {
        Ok(contents) => match serde_json::from_str::<BehaviorData>(&contents) {
            Ok(data) => {
                tracing::info!(
                    "Restored {} light-on times from {:?}, last auto light-on {}",
                    data.light_on_minutes.len(),
                    path,
                    describe_guard(data.last_auto_light_date)
                );
                data
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable behavior record {:?}: {}", path, e);
                BehaviorData::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No behavior record at {:?}, nothing learned yet", path);
            BehaviorData::default()
        }
        Err(e) => {
            tracing::warn!("Cannot open behavior record {:?}: {}", path, e);
            BehaviorData::default()
        }
    }
}

/// Write the behavior record to `path`
///
/// Readers never see a half-written record: the JSON lands in
/// `behavior.json.tmp` first and is renamed into place.
#[allow(clippy::missing_errors_doc)]
pub async fn save_behavior(path: &Path, data: &BehaviorData) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &json).await?;
    fs::rename(&tmp_path, path).await?;

    tracing::debug!(
        "Stored {} light-on times, last auto light-on {}",
        data.light_on_minutes.len(),
        describe_guard(data.last_auto_light_date)
    );
    Ok(())
}

fn describe_guard(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "never".to_string(), |d| d.to_string())
}

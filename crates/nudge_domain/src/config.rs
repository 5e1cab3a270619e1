use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::trigger::IntervalFloors;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Namespace for keys written to the key-value store.
    pub suite_name: String,
    /// Where attachment factories write their files.
    pub attachment_dir: PathBuf,
    pub interval_floors: IntervalFloors,
    /// Re-read the pending set after each schedule or removal.
    pub refresh_pending_on_change: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            suite_name: "dev.nudge.notifications".to_string(),
            attachment_dir: std::env::temp_dir().join("nudge-attachments"),
            interval_floors: IntervalFloors::default(),
            refresh_pending_on_change: true,
        }
    }
}

impl ManagerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(suite) = std::env::var("NUDGE_SUITE_NAME") {
            let suite = suite.trim();
            if !suite.is_empty() {
                config.suite_name = suite.to_string();
            }
        }
        if let Ok(dir) = std::env::var("NUDGE_ATTACHMENT_DIR") {
            if !dir.trim().is_empty() {
                config.attachment_dir = PathBuf::from(dir);
            }
        }
        if let Some(value) = read_positive_secs("NUDGE_REPEATING_FLOOR_SECS") {
            config.interval_floors.repeating_secs = value;
        }
        if let Some(value) = read_positive_secs("NUDGE_ONE_SHOT_FLOOR_SECS") {
            config.interval_floors.one_shot_secs = value;
        }
        if let Ok(flag) = std::env::var("NUDGE_REFRESH_PENDING") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.refresh_pending_on_change = true,
                "0" | "false" | "no" => config.refresh_pending_on_change = false,
                other => tracing::warn!(value = other, "ignoring NUDGE_REFRESH_PENDING"),
            }
        }
        config
    }

    /// Key under this config's suite.
    pub fn scoped_key(&self, key: &str) -> String {
        format!("{}.{}", self.suite_name, key)
    }
}

fn read_positive_secs(var: &str) -> Option<f64> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Some(value),
        _ => {
            tracing::warn!(var, value = %raw, "ignoring invalid interval floor");
            None
        }
    }
}

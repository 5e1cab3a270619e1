use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use nudge_domain::category::{ActionOption, NotificationAction, NotificationCategory};
use nudge_domain::memory::{InMemoryNotificationStore, InMemoryPermissions};
use nudge_domain::persistence::JsonFileStore;
use nudge_domain::platform::{AuthorizationOptions, AuthorizationStatus};
use nudge_domain::weekday::EnglishSymbols;
use nudge_domain::{
    ManagerConfig, NotificationManager, NotificationRequest, NotificationType, Weekday,
};
use tracing::{info, warn};

const HABIT_CATEGORY: &str = "habit";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) state_file: PathBuf,
    pub(crate) manager: ManagerConfig,
    pub(crate) habit_days: Vec<Weekday>,
    pub(crate) habit_hour: u32,
    pub(crate) habit_minute: u32,
    pub(crate) inactivity_after: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_file: std::env::temp_dir().join("nudge-state.json"),
            manager: ManagerConfig::default(),
            habit_days: vec![Weekday::MONDAY, Weekday::WEDNESDAY, Weekday::FRIDAY],
            habit_hour: 7,
            habit_minute: 30,
            inactivity_after: Duration::from_secs(3 * 24 * 60 * 60),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self {
            manager: ManagerConfig::from_env(),
            ..Self::default()
        };
        if let Ok(path) = std::env::var("NUDGE_STATE_FILE") {
            if !path.trim().is_empty() {
                config.state_file = PathBuf::from(path);
            }
        }
        if let Ok(list) = std::env::var("NUDGE_DEMO_DAYS") {
            let days = parse_days(&list);
            if days.is_empty() {
                warn!(value = %list, "ignoring NUDGE_DEMO_DAYS");
            } else {
                config.habit_days = days;
            }
        }
        if let Ok(time) = std::env::var("NUDGE_DEMO_TIME") {
            match parse_time(&time) {
                Some((hour, minute)) => {
                    config.habit_hour = hour;
                    config.habit_minute = minute;
                }
                None => warn!(value = %time, "ignoring NUDGE_DEMO_TIME"),
            }
        }
        if let Ok(hours) = std::env::var("NUDGE_INACTIVITY_HOURS") {
            match parse_hours(&hours) {
                Some(after) => config.inactivity_after = after,
                None => warn!(value = %hours, "ignoring NUDGE_INACTIVITY_HOURS"),
            }
        }
        config
    }
}

/// Positive whole hours; values whose seconds overflow `u64` are rejected.
fn parse_hours(raw: &str) -> Option<Duration> {
    let hours = raw.trim().parse::<u64>().ok().filter(|hours| *hours > 0)?;
    hours.checked_mul(60 * 60).map(Duration::from_secs)
}

/// Comma separated weekday numbers, 1 = Sunday. Invalid entries are skipped.
fn parse_days(list: &str) -> Vec<Weekday> {
    list.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .filter_map(|value| Weekday::new(value).ok())
        .collect()
}

fn parse_time(raw: &str) -> Option<(u32, u32)> {
    let (hour, minute) = raw.trim().split_once(':')?;
    let hour = hour.parse::<u32>().ok().filter(|hour| *hour < 24)?;
    let minute = minute.parse::<u32>().ok().filter(|minute| *minute < 60)?;
    Some((hour, minute))
}

fn habit_category() -> NotificationCategory {
    NotificationCategory::new(HABIT_CATEGORY)
        .with_action(NotificationAction::new("done", "Done"))
        .with_action(
            NotificationAction::new("snooze", "Later").with_option(ActionOption::Foreground),
        )
}

pub async fn run(config: AppConfig) -> Result<()> {
    let store = Arc::new(InMemoryNotificationStore::new());
    let permissions = Arc::new(InMemoryPermissions::new(AuthorizationStatus::NotDetermined));
    let settings = Arc::new(
        JsonFileStore::open(&config.state_file)
            .with_context(|| format!("failed to open {}", config.state_file.display()))?,
    );
    let manager = NotificationManager::builder(store.clone(), permissions, settings)
        .with_config(config.manager.clone())
        .build();

    let previous_open = manager
        .last_opened_at()
        .await
        .context("failed to read last open")?;
    manager
        .record_app_opened()
        .await
        .context("failed to record app open")?;
    info!(?previous_open, "app opened");

    let granted = manager
        .request_permission(AuthorizationOptions::default())
        .await
        .context("failed to request notification permission")?;
    if !granted {
        warn!("notifications not permitted; nothing scheduled");
        return Ok(());
    }

    manager.register_categories(vec![habit_category()]).await;

    let template = NotificationRequest::builder(
        "stretch",
        NotificationType::daily(config.habit_hour, config.habit_minute),
    )
    .title("Stretch")
    .body("Five minutes before the day starts")
    .category(HABIT_CATEGORY)
    .thread_id("habits")
    .build();
    let report = manager
        .schedule_repeating_weekdays(&template, config.habit_days.iter().copied())
        .await;
    for outcome in report.failures() {
        if let Err(err) = &outcome.result {
            warn!(id = %outcome.id, %err, "habit day skipped");
        }
    }

    manager
        .schedule_inactivity_reminder(
            config.inactivity_after,
            "We miss you",
            "Your habits are waiting",
        )
        .await
        .context("failed to schedule inactivity reminder")?;

    let now = Local::now();
    for request in manager.pending_notifications().await {
        let label = nudge_domain::identifier::parse_weekday_id(&request.id)
            .map(|(_, day)| day.name(&EnglishSymbols))
            .unwrap_or_else(|| "-".to_string());
        let next = manager.next_trigger_date_from(&request.id, now).await;
        info!(
            id = %request.id,
            day = %label,
            next = ?next.map(|at| at.format("%a %Y-%m-%d %H:%M").to_string()),
            "pending"
        );
    }
    info!(
        pending = manager.has_pending(),
        adds = store.add_calls(),
        "demo finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_day_lists_leniently() {
        assert_eq!(
            parse_days("2, 4,x,9,6"),
            vec![Weekday::MONDAY, Weekday::WEDNESDAY, Weekday::FRIDAY]
        );
        assert!(parse_days("").is_empty());
    }

    #[test]
    fn parses_clock_times() {
        assert_eq!(parse_time("07:30"), Some((7, 30)));
        assert_eq!(parse_time(" 23:59 "), Some((23, 59)));
        assert_eq!(parse_time("24:00"), None);
        assert_eq!(parse_time("7"), None);
    }

    #[test]
    fn parses_inactivity_hours() {
        assert_eq!(parse_hours(" 48 "), Some(Duration::from_secs(48 * 60 * 60)));
        assert_eq!(parse_hours("0"), None);
        assert_eq!(parse_hours("soon"), None);
        assert_eq!(parse_hours(&u64::MAX.to_string()), None);
        assert_eq!(parse_hours(&(u64::MAX / 3600 + 1).to_string()), None);
    }

    #[tokio::test]
    async fn run_persists_last_open() {
        let dir = tempdir().expect("tempdir");
        let config = AppConfig {
            state_file: dir.path().join("state.json"),
            manager: ManagerConfig {
                attachment_dir: dir.path().join("attachments"),
                ..ManagerConfig::default()
            },
            ..AppConfig::default()
        };
        run(config.clone()).await.expect("demo runs");

        let saved = std::fs::read_to_string(&config.state_file).expect("state written");
        assert!(saved.contains("last_opened_at"), "{saved}");
    }
}

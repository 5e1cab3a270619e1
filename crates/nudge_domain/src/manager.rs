use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::attachment::Attachment;
use crate::category::NotificationCategory;
use crate::config::ManagerConfig;
use crate::content::{NotificationContent, NotificationRequest, PendingRequest};
use crate::error::{NotificationError, Result};
use crate::identifier::{derive_weekday_id, INACTIVITY_REMINDER_ID};
use crate::platform::{
    AuthorizationOptions, AuthorizationStatus, KeyValueStore, NotificationStore,
    PermissionProvider,
};
use crate::sound::{SoundResolver, StandardSoundResolver};
use crate::trigger::{NotificationType, StandardTriggerBuilder, TriggerBuilder};
use crate::weekday::Weekday;

const LAST_OPENED_KEY: &str = "last_opened_at";
const INACTIVITY_INTERVAL_KEY: &str = "inactivity_interval_secs";
const INACTIVITY_SCHEDULED_KEY: &str = "inactivity_scheduled_at";
const EVENT_CAPACITY: usize = 64;

/// State changes published to whoever embeds the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    PermissionChanged(AuthorizationStatus),
    PendingChanged { has_pending: bool },
    Scheduled { id: String },
    Removed { ids: Vec<String> },
    /// Every pending request was cleared.
    RemovedAll,
}

/// Outcome of one day in a weekday family.
#[derive(Debug)]
pub struct WeekdayOutcome {
    pub day: Weekday,
    pub id: String,
    pub result: Result<()>,
}

#[derive(Debug)]
pub struct WeekdayScheduleReport {
    pub base_id: String,
    /// Ordered by weekday value.
    pub outcomes: Vec<WeekdayOutcome>,
}

impl WeekdayScheduleReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn scheduled_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .map(|outcome| outcome.id.as_str())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &WeekdayOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }
}

/// Schedules, queries and removes local notifications against the OS store.
///
/// The store is the source of truth; the manager only caches the permission
/// status and a "has pending" flag, both refreshed opportunistically.
pub struct NotificationManager {
    pub(crate) store: Arc<dyn NotificationStore>,
    permissions: Arc<dyn PermissionProvider>,
    settings: Arc<dyn KeyValueStore>,
    triggers: Box<dyn TriggerBuilder>,
    sounds: Box<dyn SoundResolver>,
    pub(crate) config: ManagerConfig,
    permission_status: RwLock<AuthorizationStatus>,
    pub(crate) has_pending: RwLock<bool>,
    events: broadcast::Sender<NotificationEvent>,
}

pub struct NotificationManagerBuilder {
    store: Arc<dyn NotificationStore>,
    permissions: Arc<dyn PermissionProvider>,
    settings: Arc<dyn KeyValueStore>,
    triggers: Option<Box<dyn TriggerBuilder>>,
    sounds: Option<Box<dyn SoundResolver>>,
    config: ManagerConfig,
}

impl NotificationManagerBuilder {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        permissions: Arc<dyn PermissionProvider>,
        settings: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            store,
            permissions,
            settings,
            triggers: None,
            sounds: None,
            config: ManagerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_trigger_builder(mut self, triggers: Box<dyn TriggerBuilder>) -> Self {
        self.triggers = Some(triggers);
        self
    }

    pub fn with_sound_resolver(mut self, sounds: Box<dyn SoundResolver>) -> Self {
        self.sounds = Some(sounds);
        self
    }

    pub fn build(self) -> NotificationManager {
        let floors = self.config.interval_floors;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        NotificationManager {
            store: self.store,
            permissions: self.permissions,
            settings: self.settings,
            triggers: self
                .triggers
                .unwrap_or_else(|| Box::new(StandardTriggerBuilder::new(floors))),
            sounds: self
                .sounds
                .unwrap_or_else(|| Box::new(StandardSoundResolver)),
            config: self.config,
            permission_status: RwLock::new(AuthorizationStatus::NotDetermined),
            has_pending: RwLock::new(false),
            events,
        }
    }
}

impl NotificationManager {
    pub fn builder(
        store: Arc<dyn NotificationStore>,
        permissions: Arc<dyn PermissionProvider>,
        settings: Arc<dyn KeyValueStore>,
    ) -> NotificationManagerBuilder {
        NotificationManagerBuilder::new(store, permissions, settings)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: NotificationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // -- permissions --------------------------------------------------------

    /// Last status seen; may be stale.
    pub fn cached_permission_status(&self) -> AuthorizationStatus {
        *self.permission_status.read()
    }

    pub async fn refresh_permission_status(&self) -> AuthorizationStatus {
        let status = self.permissions.current_status().await;
        let previous = std::mem::replace(&mut *self.permission_status.write(), status);
        if previous != status {
            tracing::debug!(?previous, ?status, "permission status changed");
            self.emit(NotificationEvent::PermissionChanged(status));
        }
        status
    }

    #[instrument(skip(self))]
    pub async fn request_permission(&self, options: AuthorizationOptions) -> Result<bool> {
        let granted = self.permissions.request_authorization(options).await?;
        self.refresh_permission_status().await;
        tracing::info!(granted, "notification permission requested");
        Ok(granted)
    }

    async fn ensure_permission(&self) -> Result<()> {
        if self.cached_permission_status().allows_alerts() {
            return Ok(());
        }
        if self.refresh_permission_status().await.allows_alerts() {
            return Ok(());
        }
        tracing::warn!(status = ?self.cached_permission_status(), "notifications not permitted");
        Err(NotificationError::PermissionDenied)
    }

    // -- categories and badge ----------------------------------------------

    pub async fn register_categories(&self, categories: Vec<NotificationCategory>) {
        tracing::debug!(count = categories.len(), "registering notification categories");
        self.store.set_categories(categories).await;
    }

    pub async fn set_badge_count(&self, count: u32) -> Result<()> {
        self.store.set_badge_count(count).await?;
        Ok(())
    }

    pub async fn clear_badge(&self) -> Result<()> {
        self.set_badge_count(0).await
    }

    // -- scheduling ---------------------------------------------------------

    pub async fn schedule(&self, request: NotificationRequest) -> Result<()> {
        self.schedule_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Like [`Self::schedule`]; cancelling `cancel` while attachments are
    /// being produced abandons the request and removes their files.
    #[instrument(skip_all, fields(id = %request.id))]
    pub async fn schedule_with_cancel(
        &self,
        request: NotificationRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.ensure_permission().await?;
        self.submit(request, None, cancel).await
    }

    /// Schedules one repeating calendar notification per day under
    /// `"{template.id}_{day}"`. Days are independent: a failing day does not
    /// undo the others, and every outcome is reported.
    #[instrument(skip_all, fields(base_id = %template.id))]
    pub async fn schedule_repeating_weekdays(
        &self,
        template: &NotificationRequest,
        days: impl IntoIterator<Item = Weekday>,
    ) -> WeekdayScheduleReport {
        let days: BTreeSet<Weekday> = days.into_iter().collect();
        let base_id = template.id.clone();
        let permitted = self.ensure_permission().await.is_ok();
        let cancel = CancellationToken::new();

        let mut outcomes = Vec::with_capacity(days.len());
        for day in days {
            let id = derive_weekday_id(&base_id, day);
            let result = if !permitted {
                Err(NotificationError::PermissionDenied)
            } else {
                match template.trigger.for_weekday(day) {
                    Some(trigger) => {
                        let request = template.with_identity(id.clone(), trigger);
                        self.submit(request, Some(day), &cancel).await
                    }
                    None => Err(NotificationError::trigger(
                        &id,
                        "weekday repetition needs a calendar time of day",
                    )),
                }
            };
            if let Err(err) = &result {
                tracing::warn!(%id, %err, "weekday notification not scheduled");
            }
            outcomes.push(WeekdayOutcome { day, id, result });
        }

        let report = WeekdayScheduleReport { base_id, outcomes };
        tracing::info!(
            scheduled = report.scheduled_ids().len(),
            failed = report.failures().count(),
            "weekday family scheduled"
        );
        report
    }

    /// Keeps exactly one repeating reminder that fires after `after` of
    /// inactivity. Any earlier reminder is replaced.
    #[instrument(skip(self, title, body))]
    pub async fn schedule_inactivity_reminder(
        &self,
        after: Duration,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<()> {
        self.put_setting(INACTIVITY_INTERVAL_KEY, Value::from(after.as_secs_f64()))
            .await?;
        self.put_setting(INACTIVITY_SCHEDULED_KEY, Value::from(Utc::now().to_rfc3339()))
            .await?;

        self.remove_pending_notification(INACTIVITY_REMINDER_ID).await;

        let request =
            NotificationRequest::builder(INACTIVITY_REMINDER_ID, NotificationType::every(after))
                .title(title)
                .body(body)
                .build();
        self.schedule(request).await
    }

    pub async fn cancel_inactivity_reminder(&self) {
        self.remove_pending_notification(INACTIVITY_REMINDER_ID).await;
    }

    /// Interval stored by the last [`Self::schedule_inactivity_reminder`] call.
    pub async fn inactivity_interval(&self) -> Result<Option<Duration>> {
        let value = self.get_setting(INACTIVITY_INTERVAL_KEY).await?;
        Ok(value
            .and_then(|value| value.as_f64())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok()))
    }

    pub async fn record_app_opened(&self) -> Result<()> {
        self.put_setting(LAST_OPENED_KEY, Value::from(Utc::now().to_rfc3339()))
            .await
    }

    pub async fn last_opened_at(&self) -> Result<Option<DateTime<Utc>>> {
        let value = self.get_setting(LAST_OPENED_KEY).await?;
        Ok(value
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc)))
    }

    async fn put_setting(&self, key: &str, value: Value) -> Result<()> {
        let key = self.config.scoped_key(key);
        self.settings
            .set(&key, value)
            .await
            .map_err(|err| NotificationError::persistence(format!("writing `{key}`: {err}")))
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        let key = self.config.scoped_key(key);
        self.settings
            .get(&key)
            .await
            .map_err(|err| NotificationError::persistence(format!("reading `{key}`: {err}")))
    }

    /// Builds and submits one request; the permission check has already run.
    async fn submit(
        &self,
        request: NotificationRequest,
        weekday_override: Option<Weekday>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // Validate the trigger first so a rejected request never writes files.
        let trigger = self
            .triggers
            .build(&request.id, &request.trigger, weekday_override)
            .inspect_err(|err| tracing::error!(id = %request.id, %err, "invalid trigger"))?;

        let attachments = self.resolve_attachments(&request, cancel).await?;
        let content = self.build_content(&request, attachments.items.clone());

        let pending = PendingRequest {
            id: request.id.clone(),
            content,
            trigger,
        };
        if let Err(err) = self.store.add(pending).await {
            tracing::error!(id = %request.id, %err, "notification store rejected request");
            return Err(NotificationError::submission(request.id, err));
        }
        attachments.release();

        tracing::info!(id = %request.id, "notification scheduled");
        self.emit(NotificationEvent::Scheduled { id: request.id });
        if self.config.refresh_pending_on_change {
            self.refresh_pending_flag().await;
        }
        Ok(())
    }

    fn build_content(
        &self,
        request: &NotificationRequest,
        attachments: Vec<Attachment>,
    ) -> NotificationContent {
        NotificationContent {
            title: request.title.clone(),
            subtitle: request.subtitle.clone(),
            body: request.body.clone(),
            badge: request.badge,
            sound: self.sounds.resolve(&request.sound),
            category_id: request.category.clone(),
            attachments,
            interruption_level: request.interruption_level,
            user_info: request.metadata.clone(),
            thread_id: request.thread_id.clone(),
            relevance_score: request.relevance_score,
        }
    }

    /// Runs every attachment factory concurrently and keeps the ones that
    /// produced something. Order follows completion, not input.
    async fn resolve_attachments(
        &self,
        request: &NotificationRequest,
        cancel: &CancellationToken,
    ) -> Result<ScratchAttachments> {
        let mut resolved = ScratchAttachments::default();
        if request.attachments.is_empty() {
            return Ok(resolved);
        }

        let mut in_flight: FuturesUnordered<_> = request
            .attachments
            .iter()
            .map(|factory| factory.make_attachment())
            .collect();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(
                        id = %request.id,
                        "schedule cancelled while producing attachments"
                    );
                    return Err(NotificationError::Cancelled { id: request.id.clone() });
                }
                next = in_flight.next() => match next {
                    Some(Some(attachment)) => resolved.items.push(attachment),
                    Some(None) => tracing::warn!(id = %request.id, "attachment skipped"),
                    None => break,
                },
            }
        }

        tracing::debug!(
            id = %request.id,
            requested = request.attachments.len(),
            produced = resolved.items.len(),
            "attachments resolved"
        );
        Ok(resolved)
    }
}

/// Attachment files produced for a request that has not reached the store
/// yet. Dropping the batch deletes the files unless it was released.
#[derive(Default)]
struct ScratchAttachments {
    items: Vec<Attachment>,
    released: bool,
}

impl ScratchAttachments {
    fn release(mut self) {
        self.released = true;
    }
}

impl Drop for ScratchAttachments {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for attachment in &self.items {
            attachment.discard();
        }
    }
}

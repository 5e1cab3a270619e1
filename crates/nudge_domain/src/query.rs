//! Read and delete operations over the OS-held pending and delivered sets.
//!
//! Prefix removals read the full set and then remove the matches. That is
//! not atomic: another writer scheduling into the same store between the
//! two calls can be missed. The manager assumes it is the only writer.

use chrono::{DateTime, Local, TimeZone};

use crate::content::{DeliveredNotification, NotificationState, PendingRequest};
use crate::identifier::derive_weekday_ids;
use crate::manager::{NotificationEvent, NotificationManager};
use crate::weekday::Weekday;

impl NotificationManager {
    pub async fn pending_notifications(&self) -> Vec<PendingRequest> {
        self.store.pending_requests().await
    }

    pub async fn pending_notifications_matching(&self, prefix: &str) -> Vec<PendingRequest> {
        self.store
            .pending_requests()
            .await
            .into_iter()
            .filter(|request| request.id.starts_with(prefix))
            .collect()
    }

    /// Removing an id that is not pending is a no-op.
    pub async fn remove_pending_notification(&self, id: &str) {
        self.remove_pending_ids(vec![id.to_string()]).await;
    }

    /// Returns the ids that were matched and removed.
    pub async fn remove_pending_notifications_matching(&self, prefix: &str) -> Vec<String> {
        let ids: Vec<String> = self
            .pending_notifications_matching(prefix)
            .await
            .into_iter()
            .map(|request| request.id)
            .collect();
        if !ids.is_empty() {
            self.remove_pending_ids(ids.clone()).await;
        }
        ids
    }

    /// Removes the members of a weekday family without reading the store
    /// first; days that were never scheduled are ignored.
    pub async fn remove_pending_weekday_notifications(
        &self,
        base_id: &str,
        days: impl IntoIterator<Item = Weekday>,
    ) {
        let ids = derive_weekday_ids(base_id, days);
        if !ids.is_empty() {
            self.remove_pending_ids(ids).await;
        }
    }

    pub async fn remove_all_pending_notifications(&self) {
        tracing::info!("removing all pending notifications");
        self.store.remove_all_pending().await;
        self.after_pending_removal(NotificationEvent::RemovedAll).await;
    }

    pub async fn delivered_notifications(&self) -> Vec<DeliveredNotification> {
        self.store.delivered_notifications().await
    }

    pub async fn remove_delivered_notification(&self, id: &str) {
        self.store.remove_delivered(&[id.to_string()]).await;
    }

    pub async fn remove_delivered_notifications_matching(&self, prefix: &str) -> Vec<String> {
        let ids: Vec<String> = self
            .store
            .delivered_notifications()
            .await
            .iter()
            .map(DeliveredNotification::id)
            .filter(|id| id.starts_with(prefix))
            .map(str::to_string)
            .collect();
        if !ids.is_empty() {
            self.store.remove_delivered(&ids).await;
        }
        ids
    }

    pub async fn remove_all_delivered_notifications(&self) {
        tracing::info!("removing all delivered notifications");
        self.store.remove_all_delivered().await;
    }

    /// Where `id` currently lives. Meant for diagnostics.
    pub async fn notification_state(&self, id: &str) -> NotificationState {
        let pending = self
            .store
            .pending_requests()
            .await
            .into_iter()
            .find(|request| request.id == id);
        let delivered = self
            .store
            .delivered_notifications()
            .await
            .into_iter()
            .find(|notification| notification.id() == id);
        NotificationState {
            id: id.to_string(),
            pending,
            delivered,
        }
    }

    pub async fn next_trigger_date(&self, id: &str) -> Option<DateTime<Local>> {
        self.next_trigger_date_from(id, Local::now()).await
    }

    /// Next fire instant of the pending request `id` as seen from `now`.
    /// `None` when the id is not pending or its trigger has no fire date.
    pub async fn next_trigger_date_from<Tz: TimeZone>(
        &self,
        id: &str,
        now: DateTime<Tz>,
    ) -> Option<DateTime<Tz>> {
        let request = self
            .store
            .pending_requests()
            .await
            .into_iter()
            .find(|request| request.id == id)?;
        request.trigger.next_trigger_date(now)
    }

    /// Cached view; call [`Self::refresh_pending_flag`] for a fresh answer.
    pub fn has_pending(&self) -> bool {
        *self.has_pending.read()
    }

    pub async fn refresh_pending_flag(&self) -> bool {
        let has_pending = !self.store.pending_requests().await.is_empty();
        let previous = std::mem::replace(&mut *self.has_pending.write(), has_pending);
        if previous != has_pending {
            self.emit(NotificationEvent::PendingChanged { has_pending });
        }
        has_pending
    }

    async fn remove_pending_ids(&self, ids: Vec<String>) {
        tracing::debug!(?ids, "removing pending notifications");
        self.store.remove_pending(&ids).await;
        self.after_pending_removal(NotificationEvent::Removed { ids }).await;
    }

    async fn after_pending_removal(&self, event: NotificationEvent) {
        self.emit(event);
        if self.config.refresh_pending_on_change {
            self.refresh_pending_flag().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{NaiveDate, Utc};

    use crate::config::ManagerConfig;
    use crate::content::NotificationRequest;
    use crate::memory::{InMemoryNotificationStore, InMemoryPermissions};
    use crate::persistence::MemoryKeyValueStore;
    use crate::trigger::NotificationType;

    use super::*;

    fn manager() -> (Arc<InMemoryNotificationStore>, NotificationManager) {
        let store = Arc::new(InMemoryNotificationStore::new());
        let manager = NotificationManager::builder(
            store.clone(),
            Arc::new(InMemoryPermissions::authorized()),
            Arc::new(MemoryKeyValueStore::new()),
        )
        .build();
        (store, manager)
    }

    async fn schedule(manager: &NotificationManager, id: &str, trigger: NotificationType) {
        manager
            .schedule(NotificationRequest::builder(id, trigger).title(id).build())
            .await
            .expect("scheduled");
    }

    #[tokio::test]
    async fn prefix_filter_returns_only_matches() {
        let (_, manager) = manager();
        for id in ["a_1", "a_2", "b_1"] {
            schedule(&manager, id, NotificationType::daily(9, 0)).await;
        }
        let mut ids: Vec<String> = manager
            .pending_notifications_matching("a_")
            .await
            .into_iter()
            .map(|request| request.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a_1", "a_2"]);
        assert_eq!(manager.pending_notifications().await.len(), 3);
    }

    #[tokio::test]
    async fn prefix_removal_leaves_other_families() {
        let (_, manager) = manager();
        for id in ["a_1", "a_2", "b_1"] {
            schedule(&manager, id, NotificationType::daily(9, 0)).await;
        }
        let mut removed = manager.remove_pending_notifications_matching("a_").await;
        removed.sort();
        assert_eq!(removed, vec!["a_1", "a_2"]);
        let left: Vec<String> = manager
            .pending_notifications()
            .await
            .into_iter()
            .map(|request| request.id)
            .collect();
        assert_eq!(left, vec!["b_1"]);
    }

    #[tokio::test]
    async fn removing_twice_is_harmless() {
        let (_, manager) = manager();
        schedule(&manager, "one", NotificationType::daily(9, 0)).await;
        schedule(&manager, "two", NotificationType::daily(9, 0)).await;

        manager.remove_pending_notification("one").await;
        let after_first = manager.pending_notifications().await.len();
        manager.remove_pending_notification("one").await;
        assert_eq!(after_first, 1);
        assert_eq!(manager.pending_notifications().await.len(), after_first);
    }

    #[tokio::test]
    async fn weekday_removal_tolerates_unscheduled_days() {
        let (_, manager) = manager();
        let template = NotificationRequest::builder("gym", NotificationType::daily(18, 0)).build();
        manager
            .schedule_repeating_weekdays(&template, [Weekday::MONDAY])
            .await;
        manager
            .remove_pending_weekday_notifications("gym", Weekday::all())
            .await;
        assert!(manager.pending_notifications().await.is_empty());
        assert!(!manager.has_pending());
    }

    #[tokio::test]
    async fn state_tracks_pending_and_delivered() {
        let (store, manager) = manager();
        schedule(&manager, "once", NotificationType::after(Duration::from_secs(5))).await;

        let state = manager.notification_state("once").await;
        assert!(state.is_pending());
        assert!(!state.is_delivered());

        store.deliver("once", Utc::now());
        let state = manager.notification_state("once").await;
        assert!(!state.is_pending());
        assert!(state.is_delivered());

        manager.remove_delivered_notification("once").await;
        assert!(manager.notification_state("once").await.is_unknown());
    }

    #[tokio::test]
    async fn delivered_prefix_removal() {
        let (store, manager) = manager();
        for id in ["news_1", "news_2", "other"] {
            schedule(&manager, id, NotificationType::after(Duration::from_secs(5))).await;
            store.deliver(id, Utc::now());
        }
        let removed = manager.remove_delivered_notifications_matching("news_").await;
        assert_eq!(removed.len(), 2);
        assert_eq!(manager.delivered_notifications().await.len(), 1);

        manager.remove_all_delivered_notifications().await;
        assert!(manager.delivered_notifications().await.is_empty());
    }

    #[tokio::test]
    async fn next_trigger_date_delegates_to_trigger() {
        let (_, manager) = manager();
        schedule(&manager, "breakfast", NotificationType::daily(8, 0)).await;
        let now = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_utc();
        let next = manager.next_trigger_date_from("breakfast", now).await;
        assert_eq!(
            next,
            Some(
                NaiveDate::from_ymd_opt(2025, 3, 11)
                    .unwrap()
                    .and_hms_opt(8, 0, 0)
                    .unwrap()
                    .and_utc()
            )
        );
        assert_eq!(manager.next_trigger_date_from("missing", now).await, None);
    }

    #[tokio::test]
    async fn pending_flag_follows_store() {
        let (_, manager) = manager();
        let mut events = manager.subscribe();
        assert!(!manager.has_pending());

        schedule(&manager, "x", NotificationType::daily(9, 0)).await;
        assert!(manager.has_pending());
        assert_eq!(
            events.recv().await.unwrap(),
            NotificationEvent::PermissionChanged(crate::platform::AuthorizationStatus::Authorized)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            NotificationEvent::Scheduled { id: "x".into() }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            NotificationEvent::PendingChanged { has_pending: true }
        );

        manager.remove_all_pending_notifications().await;
        assert!(!manager.has_pending());
    }

    #[tokio::test]
    async fn clearing_everything_is_its_own_event() {
        let (_, manager) = manager();
        schedule(&manager, "x", NotificationType::daily(9, 0)).await;
        let mut events = manager.subscribe();

        manager.remove_pending_notification("absent").await;
        assert_eq!(
            events.recv().await.unwrap(),
            NotificationEvent::Removed {
                ids: vec!["absent".into()]
            }
        );

        manager.remove_all_pending_notifications().await;
        assert_eq!(events.recv().await.unwrap(), NotificationEvent::RemovedAll);
        assert_eq!(
            events.recv().await.unwrap(),
            NotificationEvent::PendingChanged { has_pending: false }
        );
    }

    #[tokio::test]
    async fn disabled_refresh_skips_removals_too() {
        let store = Arc::new(InMemoryNotificationStore::new());
        let manager = NotificationManager::builder(
            store,
            Arc::new(InMemoryPermissions::authorized()),
            Arc::new(MemoryKeyValueStore::new()),
        )
        .with_config(ManagerConfig {
            refresh_pending_on_change: false,
            ..ManagerConfig::default()
        })
        .build();

        schedule(&manager, "x", NotificationType::daily(9, 0)).await;
        assert!(!manager.has_pending());
        assert!(manager.refresh_pending_flag().await);

        manager.remove_all_pending_notifications().await;
        assert!(manager.has_pending());
        assert!(!manager.refresh_pending_flag().await);
    }
}

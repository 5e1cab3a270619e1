//! In-process platform backends for tests, demos and headless hosts.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::category::NotificationCategory;
use crate::content::{DeliveredNotification, PendingRequest};
use crate::error::StoreError;
use crate::platform::{
    AuthorizationOptions, AuthorizationStatus, NotificationStore, PermissionProvider,
};

#[derive(Debug, Default)]
struct StoreState {
    pending: Vec<PendingRequest>,
    delivered: Vec<DeliveredNotification>,
    categories: Vec<NotificationCategory>,
    badge: u32,
    rejected_ids: HashSet<String>,
}

/// Notification store kept in memory. Adding an id that is already pending
/// replaces the earlier request, as OS stores do.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    state: Mutex<StoreState>,
    add_calls: AtomicUsize,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `add` for `id` fail.
    pub fn reject(&self, id: impl Into<String>) {
        self.state.lock().rejected_ids.insert(id.into());
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn badge_count(&self) -> u32 {
        self.state.lock().badge
    }

    pub fn categories(&self) -> Vec<NotificationCategory> {
        self.state.lock().categories.clone()
    }

    /// Fires `id` as the OS would: the request moves to the delivered set,
    /// and stays pending only when its trigger repeats.
    pub fn deliver(&self, id: &str, at: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        let Some(idx) = state.pending.iter().position(|request| request.id == id) else {
            return false;
        };
        let request = if state.pending[idx].trigger.repeats() {
            state.pending[idx].clone()
        } else {
            state.pending.remove(idx)
        };
        state.delivered.retain(|delivered| delivered.id() != id);
        state.delivered.push(DeliveredNotification {
            request,
            delivered_at: at,
        });
        true
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn add(&self, request: PendingRequest) -> Result<(), StoreError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if state.rejected_ids.contains(&request.id) {
            return Err(StoreError::Rejected(format!("`{}` is blocked", request.id)));
        }
        state.pending.retain(|existing| existing.id != request.id);
        state.pending.push(request);
        Ok(())
    }

    async fn pending_requests(&self) -> Vec<PendingRequest> {
        self.state.lock().pending.clone()
    }

    async fn delivered_notifications(&self) -> Vec<DeliveredNotification> {
        self.state.lock().delivered.clone()
    }

    async fn remove_pending(&self, ids: &[String]) {
        self.state
            .lock()
            .pending
            .retain(|request| !ids.contains(&request.id));
    }

    async fn remove_all_pending(&self) {
        self.state.lock().pending.clear();
    }

    async fn remove_delivered(&self, ids: &[String]) {
        self.state
            .lock()
            .delivered
            .retain(|delivered| !ids.iter().any(|id| id == delivered.id()));
    }

    async fn remove_all_delivered(&self) {
        self.state.lock().delivered.clear();
    }

    async fn set_badge_count(&self, count: u32) -> Result<(), StoreError> {
        self.state.lock().badge = count;
        Ok(())
    }

    async fn set_categories(&self, categories: Vec<NotificationCategory>) {
        self.state.lock().categories = categories;
    }
}

/// Permission service with a settable status.
#[derive(Debug)]
pub struct InMemoryPermissions {
    status: RwLock<AuthorizationStatus>,
    grant_on_request: bool,
    status_reads: AtomicUsize,
}

impl InMemoryPermissions {
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            status: RwLock::new(status),
            grant_on_request: true,
            status_reads: AtomicUsize::new(0),
        }
    }

    pub fn authorized() -> Self {
        Self::new(AuthorizationStatus::Authorized)
    }

    /// A user who declines the prompt.
    pub fn declining() -> Self {
        Self {
            grant_on_request: false,
            ..Self::new(AuthorizationStatus::NotDetermined)
        }
    }

    pub fn set_status(&self, status: AuthorizationStatus) {
        *self.status.write() = status;
    }

    pub fn status_reads(&self) -> usize {
        self.status_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionProvider for InMemoryPermissions {
    async fn current_status(&self) -> AuthorizationStatus {
        self.status_reads.fetch_add(1, Ordering::SeqCst);
        *self.status.read()
    }

    async fn request_authorization(
        &self,
        options: AuthorizationOptions,
    ) -> Result<bool, StoreError> {
        let mut status = self.status.write();
        if *status == AuthorizationStatus::NotDetermined {
            *status = if !self.grant_on_request {
                AuthorizationStatus::Denied
            } else if options.provisional {
                AuthorizationStatus::Provisional
            } else {
                AuthorizationStatus::Authorized
            };
        }
        Ok(status.allows_alerts())
    }
}

//! Seams to the host platform. Each OS backend implements these traits; the
//! `memory` module carries in-process versions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::NotificationCategory;
use crate::content::{DeliveredNotification, PendingRequest};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Authorized,
    Provisional,
    Denied,
    Ephemeral,
}

impl AuthorizationStatus {
    /// Provisional delivery counts as granted.
    pub fn allows_alerts(self) -> bool {
        matches!(self, Self::Authorized | Self::Provisional)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationOptions {
    pub alert: bool,
    pub sound: bool,
    pub badge: bool,
    pub provisional: bool,
    pub critical_alert: bool,
    pub time_sensitive: bool,
}

impl Default for AuthorizationOptions {
    fn default() -> Self {
        Self {
            alert: true,
            sound: true,
            badge: true,
            provisional: false,
            critical_alert: false,
            time_sensitive: false,
        }
    }
}

#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn current_status(&self) -> AuthorizationStatus;

    /// Prompts the user when the status is not yet determined.
    async fn request_authorization(
        &self,
        options: AuthorizationOptions,
    ) -> Result<bool, StoreError>;
}

/// The OS notification store. It is the single source of truth for pending
/// and delivered notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn add(&self, request: PendingRequest) -> Result<(), StoreError>;

    async fn pending_requests(&self) -> Vec<PendingRequest>;

    async fn delivered_notifications(&self) -> Vec<DeliveredNotification>;

    /// Unknown ids are ignored.
    async fn remove_pending(&self, ids: &[String]);

    async fn remove_all_pending(&self);

    async fn remove_delivered(&self, ids: &[String]);

    async fn remove_all_delivered(&self);

    async fn set_badge_count(&self, count: u32) -> Result<(), StoreError>;

    /// Replaces the registered category set.
    async fn set_categories(&self, categories: Vec<NotificationCategory>);
}

/// Small persistent settings store, scoped to the library's own suite.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_counts_as_granted() {
        assert!(AuthorizationStatus::Authorized.allows_alerts());
        assert!(AuthorizationStatus::Provisional.allows_alerts());
        assert!(!AuthorizationStatus::Denied.allows_alerts());
        assert!(!AuthorizationStatus::NotDetermined.allows_alerts());
        assert!(!AuthorizationStatus::Ephemeral.allows_alerts());
    }
}

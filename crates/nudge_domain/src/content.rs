use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attachment::{Attachment, AttachmentFactory};
use crate::sound::{PlatformSound, Sound};
use crate::trigger::{NotificationType, PlatformTrigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptionLevel {
    Passive,
    #[default]
    Active,
    TimeSensitive,
    Critical,
}

/// Everything a caller declares about one notification. Consumed by a single
/// schedule call; the OS store owns the result.
#[derive(Clone)]
pub struct NotificationRequest {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub category: Option<String>,
    pub trigger: NotificationType,
    pub sound: Sound,
    pub badge: Option<u32>,
    pub attachments: Vec<Arc<dyn AttachmentFactory>>,
    pub interruption_level: InterruptionLevel,
    pub metadata: Map<String, Value>,
    pub thread_id: Option<String>,
    pub relevance_score: Option<f64>,
}

impl fmt::Debug for NotificationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationRequest")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("category", &self.category)
            .field("trigger", &self.trigger)
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

impl NotificationRequest {
    pub fn builder(id: impl Into<String>, trigger: NotificationType) -> NotificationRequestBuilder {
        NotificationRequestBuilder::new(id, trigger)
    }

    /// Copy of this request under another id and trigger, as used for each
    /// member of a weekday family.
    pub fn with_identity(&self, id: String, trigger: NotificationType) -> Self {
        Self {
            id,
            trigger,
            ..self.clone()
        }
    }
}

pub struct NotificationRequestBuilder {
    request: NotificationRequest,
}

impl NotificationRequestBuilder {
    pub fn new(id: impl Into<String>, trigger: NotificationType) -> Self {
        Self {
            request: NotificationRequest {
                id: id.into(),
                title: String::new(),
                subtitle: String::new(),
                body: String::new(),
                category: None,
                trigger,
                sound: Sound::Default,
                badge: None,
                attachments: Vec::new(),
                interruption_level: InterruptionLevel::default(),
                metadata: Map::new(),
                thread_id: None,
                relevance_score: None,
            },
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.request.title = title.into();
        self
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.request.subtitle = subtitle.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.request.body = body.into();
        self
    }

    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.request.category = Some(category_id.into());
        self
    }

    pub fn sound(mut self, sound: Sound) -> Self {
        self.request.sound = sound;
        self
    }

    pub fn badge(mut self, badge: u32) -> Self {
        self.request.badge = Some(badge);
        self
    }

    pub fn attachment(mut self, factory: Arc<dyn AttachmentFactory>) -> Self {
        self.request.attachments.push(factory);
        self
    }

    pub fn interruption_level(mut self, level: InterruptionLevel) -> Self {
        self.request.interruption_level = level;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.metadata.insert(key.into(), value.into());
        self
    }

    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.request.thread_id = Some(thread_id.into());
        self
    }

    /// Ranking hint for notification summaries, clamped to 0.0..=1.0.
    pub fn relevance_score(mut self, score: f64) -> Self {
        self.request.relevance_score = Some(score.clamp(0.0, 1.0));
        self
    }

    pub fn build(self) -> NotificationRequest {
        self.request
    }
}

/// Content payload submitted to the OS store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub badge: Option<u32>,
    pub sound: Option<PlatformSound>,
    pub category_id: Option<String>,
    pub attachments: Vec<Attachment>,
    pub interruption_level: InterruptionLevel,
    pub user_info: Map<String, Value>,
    pub thread_id: Option<String>,
    pub relevance_score: Option<f64>,
}

/// A registration as held by the OS store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: String,
    pub content: NotificationContent,
    pub trigger: PlatformTrigger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredNotification {
    pub request: PendingRequest,
    pub delivered_at: DateTime<Utc>,
}

impl DeliveredNotification {
    pub fn id(&self) -> &str {
        &self.request.id
    }
}

/// Where an identifier currently lives in the OS store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationState {
    pub id: String,
    pub pending: Option<PendingRequest>,
    pub delivered: Option<DeliveredNotification>,
}

impl NotificationState {
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered.is_some()
    }

    pub fn is_unknown(&self) -> bool {
        !self.is_pending() && !self.is_delivered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn builder_defaults() {
        let request =
            NotificationRequest::builder("tea", NotificationType::after(Duration::from_secs(5)))
                .title("Tea")
                .build();
        assert_eq!(request.badge, None);
        assert_eq!(request.sound, Sound::Default);
        assert_eq!(request.interruption_level, InterruptionLevel::Active);
        assert!(request.category.is_none());
        assert!(request.attachments.is_empty());
    }

    #[test]
    fn builder_collects_metadata_and_clamps_relevance() {
        let request = NotificationRequest::builder("tea", NotificationType::daily(16, 0))
            .metadata("route", "kitchen")
            .metadata("cups", 2)
            .relevance_score(4.0)
            .build();
        assert_eq!(request.metadata.get("route"), Some(&Value::from("kitchen")));
        assert_eq!(request.metadata.get("cups"), Some(&Value::from(2)));
        assert_eq!(request.relevance_score, Some(1.0));
    }

    #[test]
    fn with_identity_keeps_content() {
        let template = NotificationRequest::builder("walk", NotificationType::daily(7, 0))
            .title("Walk")
            .body("Around the block")
            .build();
        let copy = template.with_identity("walk_2".into(), NotificationType::daily(8, 0));
        assert_eq!(copy.id, "walk_2");
        assert_eq!(copy.title, "Walk");
        assert_eq!(copy.body, "Around the block");
        assert_eq!(copy.trigger, NotificationType::daily(8, 0));
    }
}

pub mod attachment;
pub mod category;
pub mod config;
pub mod content;
pub mod error;
pub mod identifier;
pub mod manager;
pub mod memory;
pub mod persistence;
pub mod platform;
pub mod query;
pub mod sound;
pub mod trigger;
pub mod weekday;

pub use crate::config::ManagerConfig;
pub use crate::content::{NotificationRequest, NotificationRequestBuilder};
pub use crate::error::{NotificationError, Result, StoreError};
pub use crate::manager::{
    NotificationEvent, NotificationManager, NotificationManagerBuilder, WeekdayScheduleReport,
};
pub use crate::trigger::NotificationType;
pub use crate::weekday::Weekday;

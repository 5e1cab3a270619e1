use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotificationError>;

/// Failures reported by a [`crate::platform::NotificationStore`] implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request rejected by notification store: {0}")]
    Rejected(String),

    #[error("notification store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum NotificationError {
    /// Alerts are not allowed; the host should send the user to system settings.
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("unable to build trigger for `{id}`: {reason}")]
    TriggerConstruction { id: String, reason: String },

    #[error("notification store rejected `{id}`: {source}")]
    Submission {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("weekday value {0} is outside 1..=7")]
    InvalidWeekday(i64),

    #[error("scheduling `{id}` was cancelled")]
    Cancelled { id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl NotificationError {
    pub fn trigger(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TriggerConstruction {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn submission(id: impl Into<String>, source: StoreError) -> Self {
        Self::Submission {
            id: id.into(),
            source,
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Whether the caller can recover by asking the user to change settings.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_error_names_the_request() {
        let err = NotificationError::submission("water_2", StoreError::Rejected("quota".into()));
        let message = err.to_string();
        assert!(message.contains("water_2"));
        assert!(message.contains("quota"));
    }

    #[test]
    fn store_errors_convert() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: NotificationError = StoreError::from(io_err).into();
        assert!(matches!(err, NotificationError::Store(StoreError::Io(_))));
    }

    #[test]
    fn permission_denied_is_flagged() {
        assert!(NotificationError::PermissionDenied.is_permission_denied());
        assert!(!NotificationError::InvalidWeekday(9).is_permission_denied());
    }
}

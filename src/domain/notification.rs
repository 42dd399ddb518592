//! In-app notifications.
//!
//! Stored notifications double as the durable audit trail for ledger
//! mutations: every admin-initiated balance or bonus change writes one
//! describing the old and new amount.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;

/// Severity of an in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Neutral information.
    Info,
    /// Positive outcome (approval, credit).
    Success,
    /// Needs attention.
    Warning,
    /// Negative outcome (rejection).
    Error,
}

/// An in-app notification as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    /// Notification identifier.
    pub id: uuid::Uuid,
    /// User the notification belongs to.
    pub user_id: UserId,
    /// Short title.
    pub title: String,
    /// Message body.
    pub message: String,
    /// Severity for display.
    pub severity: Severity,
    /// Whether the user has read it.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Creates an unread notification.
    #[must_use]
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            user_id,
            title: title.into(),
            message: message.into(),
            severity,
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_notification_is_unread() {
        let n = Notification::new(UserId::new(), "Deposit approved", "Funds credited", Severity::Success);
        assert!(!n.read);
        assert_eq!(n.severity, Severity::Success);
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap_or_default();
        assert_eq!(json, "\"warning\"");
    }
}

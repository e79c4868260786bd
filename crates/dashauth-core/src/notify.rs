//! Transient user-facing notifications.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{error, info};

pub const LOGIN_SUCCEEDED: &str = "Login successful";
pub const LOGIN_FAILED: &str = "Login failed";
pub const LOGOUT_SUCCEEDED: &str = "Logged out";
pub const LOGOUT_FAILED: &str = "Logout failed";
pub const SERVER_ERROR: &str = "Server error";
pub const REQUEST_FAILED: &str = "Request failed";
pub const NETWORK_ERROR: &str = "Network error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.notify(Notification {
            level: NotificationLevel::Success,
            message: message.to_string(),
        });
    }

    fn error(&self, message: &str) {
        self.notify(Notification {
            level: NotificationLevel::Error,
            message: message.to_string(),
        });
    }
}

/// Writes notifications to stderr and the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => {
                info!(message = %notification.message, "Notification");
                eprintln!("✓ {}", notification.message);
            }
            NotificationLevel::Error => {
                error!(message = %notification.message, "Notification");
                eprintln!("✗ {}", notification.message);
            }
        }
    }
}

/// Keeps every notification in memory.
#[derive(Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|n| n.message).collect()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_log_records_levels() {
        let log = NotificationLog::new();
        log.success(LOGIN_SUCCEEDED);
        log.error(NETWORK_ERROR);

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, NotificationLevel::Success);
        assert_eq!(entries[1].level, NotificationLevel::Error);
        assert_eq!(log.messages(), vec![LOGIN_SUCCEEDED, NETWORK_ERROR]);
    }
}

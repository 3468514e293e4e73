//! User-facing notifications emitted by board mutations.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// The mutation was confirmed.
    Success,
    /// The mutation was rejected or rolled back.
    Error,
}

/// A single toast shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: Level,
    /// Text shown to the user.
    pub message: String,
}

impl Notification {
    /// Build a success notification.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    /// Build an error notification.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    /// Returns true for error notifications.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Success => write!(f, "✓ {}", self.message),
            Level::Error => write!(f, "✗ {}", self.message),
        }
    }
}

/// Sink for notifications.
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification);
    }
}

/// Notifier that records every notification in memory.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Remove and return every recorded notification.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
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
    fn log_collects_and_drains() {
        let log = NotificationLog::new();
        let shared = Arc::new(log.clone());
        shared.notify(Notification::success("Task created successfully!"));
        log.notify(Notification::error("Failed to update task status"));

        assert_eq!(log.entries().len(), 2);
        let drained = log.take();
        assert!(drained[1].is_error());
        assert!(log.entries().is_empty());
    }

    #[test]
    fn display_marks_the_level() {
        assert_eq!(Notification::success("Task moved to Done").to_string(), "✓ Task moved to Done");
        assert_eq!(Notification::error("Failed to create task").to_string(), "✗ Failed to create task");
    }
}

//! User-facing notification sink.
//!
//! The engine reports summaries through [`Notifier`] without depending on
//! delivery. The application decides how notifications reach a person.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Neutral information.
    Info,
    /// Everything worked.
    Success,
    /// Partly worked.
    Warning,
    /// Nothing worked.
    Error,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Presentation severity.
    pub severity: Severity,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// When the notification was raised.
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    /// Creates a notification stamped with the current time.
    pub fn new(severity: Severity, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            message: message.into(),
            raised_at: Utc::now(),
        }
    }
}

/// Receives notifications. Delivery is best effort and never reports failure.
pub trait Notifier: Send + Sync {
    /// Delivers one notification.
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let Notification {
            severity,
            title,
            message,
            ..
        } = notification;
        match severity {
            Severity::Info | Severity::Success => info!(?severity, title = %title, "{}", message),
            Severity::Warning => warn!(title = %title, "{}", message),
            Severity::Error => error!(title = %title, "{}", message),
        }
    }
}

/// Keeps every notification in memory, newest last.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    received: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        match self.received.lock() {
            Ok(received) => received.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the most recent notification.
    pub fn last(&self) -> Option<Notification> {
        self.notifications().pop()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        match self.received.lock() {
            Ok(mut received) => received.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify(Notification::new(Severity::Info, "first", "a"));
        notifier.notify(Notification::new(Severity::Error, "second", "b"));

        let all = notifier.notifications();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "first");
        assert_eq!(notifier.last().unwrap().severity, Severity::Error);
    }

    #[test]
    fn test_tracing_notifier_accepts_all_severities() {
        let notifier = TracingNotifier;
        for severity in [Severity::Info, Severity::Success, Severity::Warning, Severity::Error] {
            notifier.notify(Notification::new(severity, "title", "message"));
        }
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(
            serde_json::to_string(&Severity::Warning).unwrap(),
            "\"warning\""
        );
    }
}

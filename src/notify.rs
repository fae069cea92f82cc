//! Change notifications
//!
//! Mutations publish a [`Notification`] after the store has accepted them.
//! Delivery is best effort: a notifier never fails the mutation that fed it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

/// What happened to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::Created => "CREATED",
            NotificationKind::Updated => "UPDATED",
            NotificationKind::Deleted => "DELETED",
        };
        f.write_str(s)
    }
}

/// A change event for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    /// Full name of the changed resource
    pub resource: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, resource: impl fmt::Display) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            resource: resource.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn created(resource: impl fmt::Display) -> Self {
        Self::new(NotificationKind::Created, resource)
    }

    pub fn updated(resource: impl fmt::Display) -> Self {
        Self::new(NotificationKind::Updated, resource)
    }

    pub fn deleted(resource: impl fmt::Display) -> Self {
        Self::new(NotificationKind::Deleted, resource)
    }
}

/// Sink for change notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Fan-out notifier over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    /// Create new notifier with channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to notifications published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        debug!("{} {}", notification.kind, notification.resource);
        if self.tx.send(notification).is_err() {
            // No subscribers
            debug!("Notification dropped: nobody is listening");
        }
    }
}

/// Notifier that keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    /// `(kind, resource)` pairs, oldest first
    pub fn events(&self) -> Vec<(NotificationKind, String)> {
        self.notifications()
            .into_iter()
            .map(|n| (n.kind, n.resource))
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_upper_case() {
        let n = Notification::created("projects/demo");
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains(r#""kind":"CREATED""#));
        assert!(json.contains(r#""resource":"projects/demo""#));
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);

        notifier.notify(Notification::deleted("projects/demo/artifacts/x"));
        let got = rx.recv().await.unwrap();
        assert_eq!(got.kind, NotificationKind::Deleted);
        assert_eq!(got.resource, "projects/demo/artifacts/x");
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let notifier = BroadcastNotifier::default();
        notifier.notify(Notification::updated("projects/demo"));
    }

    #[test]
    fn test_lagging_subscriber_sees_newest_events() {
        let notifier = BroadcastNotifier::new(2);
        let mut rx = notifier.subscribe();
        for i in 0..4 {
            notifier.notify(Notification::created(format!("projects/p{}", i)));
        }
        tokio_test::block_on(async {
            assert!(matches!(
                rx.recv().await,
                Err(broadcast::error::RecvError::Lagged(2))
            ));
            let got = tokio_test::assert_ok!(rx.recv().await);
            assert_eq!(got.resource, "projects/p2");
        });
    }

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notification::created("a"));
        notifier.notify(Notification::updated("a"));
        assert_eq!(
            notifier.events(),
            vec![
                (NotificationKind::Created, "a".to_string()),
                (NotificationKind::Updated, "a".to_string())
            ]
        );
    }
}

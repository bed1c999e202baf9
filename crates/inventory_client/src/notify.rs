//! Transient user-facing messages.

use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{classifier::ClassifiedError, session::SessionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    /// How long the host should keep the message on screen.
    pub duration: Duration,
}

/// One-way channel for messages shown to the operator.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Display durations for each notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationDurations {
    pub success: Duration,
    pub error: Duration,
}

impl Default for NotificationDurations {
    fn default() -> Self {
        Self {
            success: Duration::from_secs(3),
            error: Duration::from_secs(6),
        }
    }
}

impl NotificationDurations {
    pub fn success(&self, message: impl Into<String>) -> Notification {
        Notification {
            kind: NotificationKind::Success,
            message: message.into(),
            duration: self.success,
        }
    }

    pub fn error(&self, message: impl Into<String>) -> Notification {
        Notification {
            kind: NotificationKind::Error,
            message: message.into(),
            duration: self.error,
        }
    }
}

/// Fans notifications out to every subscriber.
pub struct BroadcastNotifier {
    events: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        if self.events.send(notification).is_err() {
            debug!("notify: no subscribers, message dropped");
        }
    }
}

/// Routes controller outcomes to the notifier and the session.
#[derive(Clone)]
pub struct Reporter {
    notifier: Arc<dyn NotificationSink>,
    session: Arc<dyn SessionContext>,
    durations: NotificationDurations,
}

impl Reporter {
    pub fn new(
        notifier: Arc<dyn NotificationSink>,
        session: Arc<dyn SessionContext>,
        durations: NotificationDurations,
    ) -> Self {
        Self {
            notifier,
            session,
            durations,
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notifier.notify(self.durations.success(message));
    }

    /// Surfaces a classified failure. Validation failures stay on their
    /// fields; a 401 tears the session down before the message goes out.
    pub fn failure(&self, error: &ClassifiedError) {
        if !error.category().notifies() {
            return;
        }
        if error.requires_reauth() {
            self.session.on_unauthorized();
        }
        warn!(
            operation = %error.operation(),
            category = ?error.category(),
            "{}",
            error.message()
        );
        self.notifier.notify(self.durations.error(error.message()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_delivers_to_subscribers() {
        let notifier = BroadcastNotifier::default();
        let mut rx = notifier.subscribe();
        let durations = NotificationDurations::default();

        notifier.notify(durations.success("Product created successfully"));

        let received = rx.recv().await.expect("notification");
        assert_eq!(received.kind, NotificationKind::Success);
        assert_eq!(received.duration, Duration::from_secs(3));
    }

    #[test]
    fn sending_without_subscribers_is_harmless() {
        let notifier = BroadcastNotifier::new(0);
        notifier.notify(NotificationDurations::default().error("lost"));
    }
}

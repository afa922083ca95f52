// In crates/engine/src/notifier.rs

use async_trait::async_trait;
use chrono::Utc;
use core_types::SubscriberId;
use events::{WsMessage, WsNotification};
use tokio::sync::broadcast;

/// The universal interface for delivering a text message to a subscriber.
///
/// Delivery is fire-and-forget from the pipeline's point of view: the
/// dispatcher logs a returned error and moves on to the next message.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// The name of the notifier (e.g., "BroadcastNotifier").
    fn name(&self) -> &'static str;

    async fn notify(&self, subscriber: SubscriberId, text: &str) -> anyhow::Result<()>;
}

/// Publishes notifications on the events channel, where `/ws` clients pick them up.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<WsMessage>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<WsMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    fn name(&self) -> &'static str {
        "BroadcastNotifier"
    }

    async fn notify(&self, subscriber: SubscriberId, text: &str) -> anyhow::Result<()> {
        let message = WsMessage::Notification(WsNotification {
            timestamp: Utc::now(),
            subscriber,
            text: text.to_string(),
        });
        self.tx
            .send(message)
            .map_err(|_| anyhow::anyhow!("no client is listening for subscriber {}", subscriber))?;
        Ok(())
    }
}

/// Writes every notification to the log instead of pushing it to clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "LogNotifier"
    }

    async fn notify(&self, subscriber: SubscriberId, text: &str) -> anyhow::Result<()> {
        tracing::info!(%subscriber, text = %text, "Notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_notifier_publishes_a_notification() {
        let (tx, mut rx) = broadcast::channel(8);
        let notifier = BroadcastNotifier::new(tx);

        notifier.notify(SubscriberId(42), "hello").await.unwrap();

        match rx.recv().await.unwrap() {
            WsMessage::Notification(n) => {
                assert_eq!(n.subscriber, SubscriberId(42));
                assert_eq!(n.text, "hello");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn broadcast_notifier_reports_missing_listeners() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        let notifier = BroadcastNotifier::new(tx);

        assert!(notifier.notify(SubscriberId(1), "lost").await.is_err());
    }

    #[tokio::test]
    async fn log_notifier_accepts_every_message() {
        let notifier = LogNotifier;
        assert_eq!(notifier.name(), "LogNotifier");
        notifier.notify(SubscriberId(7), "Auto signal\nPair: EUR/USD\nBUY").await.unwrap();
    }
}

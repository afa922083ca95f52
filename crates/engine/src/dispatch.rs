// In crates/engine/src/dispatch.rs

use crate::notifier::Notifier;
use crate::shutdown::cancelled;
use core_types::SubscriberId;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

/// Creates the bounded notification queue of one subscriber.
pub fn channel(
    subscriber: SubscriberId,
    capacity: usize,
    notifier: Arc<dyn Notifier>,
    shutdown: watch::Receiver<bool>,
) -> (Outbox, Dispatcher) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        Outbox { subscriber, tx },
        Dispatcher {
            subscriber,
            notifier,
            rx,
            shutdown,
        },
    )
}

/// The sending half held by the ingestion worker. Never blocks.
#[derive(Debug, Clone)]
pub struct Outbox {
    subscriber: SubscriberId,
    tx: mpsc::Sender<String>,
}

impl Outbox {
    /// Queues `text` for delivery. Returns false if it was dropped.
    pub fn try_send(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscriber = %self.subscriber, "Notification queue is full. Dropping message.");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(subscriber = %self.subscriber, "Notification queue is closed. Dropping message.");
                false
            }
        }
    }
}

/// Drains one subscriber's queue into the notifier, in order.
pub struct Dispatcher {
    subscriber: SubscriberId,
    notifier: Arc<dyn Notifier>,
    rx: mpsc::Receiver<String>,
    shutdown: watch::Receiver<bool>,
}

impl Dispatcher {
    /// Runs until cancelled or until every `Outbox` is gone and the queue is empty.
    ///
    /// A delivery already in progress when cancellation arrives is allowed to
    /// finish; anything still queued is discarded.
    pub async fn run(mut self) {
        let mut delivered = 0usize;
        loop {
            let text = tokio::select! {
                biased;
                _ = cancelled(&mut self.shutdown) => {
                    let discarded = self.rx.len();
                    tracing::debug!(subscriber = %self.subscriber, discarded, "Dispatcher cancelled.");
                    break;
                }
                next = self.rx.recv() => match next {
                    Some(text) => text,
                    None => break,
                },
            };

            match self.notifier.notify(self.subscriber, &text).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        subscriber = %self.subscriber,
                        notifier = self.notifier.name(),
                        error = %e,
                        "Notification delivery failed."
                    );
                }
            }
        }
        tracing::debug!(subscriber = %self.subscriber, delivered, "Dispatcher stopped.");
    }
}

// In crates/engine/src/worker.rs

use crate::context::SignalContext;
use crate::dispatch::Outbox;
use crate::format;
use crate::shutdown::cancelled;
use chrono::Utc;
use core_types::{SubscriberId, WorkerState};
use events::WsMessage;
use futures::StreamExt;
use quote_feed::{FeedEvent, Quote, QuoteSource};
use scoring::Scorer;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Counters kept for the end-of-session log line.
#[derive(Debug, Default, Clone, Copy)]
struct WorkerStats {
    quotes: u64,
    skipped: u64,
    candidates: u64,
    notifications: u64,
}

/// Streams quotes for the whole instrument universe on behalf of one subscriber.
///
/// Every quote is recorded into the shared window store and scored; candidates
/// that clear the threshold and the cooldown are queued for delivery.
pub struct IngestionWorker {
    subscriber: SubscriberId,
    context: Arc<SignalContext>,
    source: Arc<dyn QuoteSource>,
    outbox: Outbox,
    ws_tx: broadcast::Sender<WsMessage>,
    state: WorkerState,
    stats: WorkerStats,
}

impl IngestionWorker {
    pub fn new(
        subscriber: SubscriberId,
        context: Arc<SignalContext>,
        source: Arc<dyn QuoteSource>,
        outbox: Outbox,
        ws_tx: broadcast::Sender<WsMessage>,
    ) -> Self {
        Self {
            subscriber,
            context,
            source,
            outbox,
            ws_tx,
            state: WorkerState::Idle,
            stats: WorkerStats::default(),
        }
    }

    /// The main, long-running loop for this worker. Returns the terminal state.
    ///
    /// `Closed` means the session was cancelled; `Failed` means the feed
    /// could not be reached or went away. There is no reconnect.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WorkerState {
        self.transition(WorkerState::Connecting, None);

        let symbols = self.context.instruments.clone();
        let source = Arc::clone(&self.source);

        let mut stream = tokio::select! {
            biased;
            _ = cancelled(&mut shutdown) => return self.finish(WorkerState::Closed, None),
            connected = source.connect(&symbols) => match connected {
                Ok(stream) => stream,
                Err(e) => return self.finish(WorkerState::Failed, Some(e.to_string())),
            },
        };

        self.transition(WorkerState::Streaming, None);

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => {
                    // Dropping the stream releases the connection.
                    drop(stream);
                    return self.finish(WorkerState::Closed, None);
                }
                next = stream.next() => match next {
                    Some(Ok(event)) => self.on_event(event),
                    Some(Err(e)) => return self.finish(WorkerState::Failed, Some(e.to_string())),
                    None => {
                        return self.finish(WorkerState::Failed, Some("quote stream ended".to_string()));
                    }
                },
            }
        }
    }

    fn on_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Quote(quote) => self.on_quote(quote),
            FeedEvent::SubscribeStatus { status, accepted, rejected } => {
                tracing::info!(
                    subscriber = %self.subscriber,
                    %status,
                    accepted = ?accepted,
                    "Subscription acknowledged."
                );
                if !rejected.is_empty() {
                    tracing::warn!(subscriber = %self.subscriber, rejected = ?rejected, "Feed rejected some instruments.");
                }
            }
            FeedEvent::Heartbeat => tracing::trace!(subscriber = %self.subscriber, "Heartbeat received."),
            FeedEvent::Unrecognized => {
                self.stats.skipped += 1;
                tracing::trace!(subscriber = %self.subscriber, "Skipping unrecognized frame.");
            }
        }
    }

    fn on_quote(&mut self, quote: Quote) {
        if !self.context.is_known(&quote.symbol) {
            self.stats.skipped += 1;
            tracing::debug!(symbol = %quote.symbol, "Skipping quote outside the instrument universe.");
            return;
        }

        let Quote { symbol, price } = quote;
        let now = Utc::now();
        let prices = self.context.windows.record_and_snapshot(&symbol, now, price);
        self.stats.quotes += 1;

        let result = self.context.scorer.score(&prices);
        if !self.context.is_candidate(result.score) {
            return;
        }
        self.stats.candidates += 1;

        let outbox = &self.outbox;
        let fired = self.context.cooldown.fire_if_ready(&symbol, now, || {
            outbox.try_send(format::auto_signal(&symbol, &result))
        });

        if fired {
            self.stats.notifications += 1;
            tracing::info!(
                subscriber = %self.subscriber,
                symbol = %symbol,
                score = result.score,
                direction = %result.direction(),
                "Signal dispatched."
            );
        } else {
            tracing::debug!(subscriber = %self.subscriber, symbol = %symbol, score = result.score, "Candidate held back.");
        }
    }

    fn transition(&mut self, state: WorkerState, error: Option<String>) {
        let from = std::mem::replace(&mut self.state, state);
        match (&state, &error) {
            (WorkerState::Failed, Some(e)) => {
                tracing::error!(subscriber = %self.subscriber, source = self.source.name(), ?from, error = %e, "Ingestion worker failed.");
            }
            _ => tracing::info!(subscriber = %self.subscriber, ?from, to = ?state, "Ingestion worker state changed."),
        }
        // Nobody listening is fine.
        let _ = self.ws_tx.send(WsMessage::worker_status(self.subscriber, state, error));
    }

    fn finish(&mut self, state: WorkerState, error: Option<String>) -> WorkerState {
        debug_assert!(state.is_terminal());
        self.transition(state, error);
        tracing::info!(
            subscriber = %self.subscriber,
            quotes = self.stats.quotes,
            skipped = self.stats.skipped,
            candidates = self.stats.candidates,
            notifications = self.stats.notifications,
            "Ingestion worker stopped."
        );
        state
    }
}


// In crates/engine/src/registry.rs

use crate::context::SignalContext;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::format;
use crate::notifier::Notifier;
use crate::worker::IngestionWorker;
use core_types::{SubscriberId, Symbol, WorkerState};
use events::WsMessage;
use parking_lot::Mutex;
use quote_feed::QuoteSource;
use scoring::{ScoreResult, Scorer};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnableOutcome {
    Started,
    AlreadyActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableOutcome {
    Stopped,
    WasNotActive,
}

/// The answer to an on-demand query. `result` is `None` when the window is empty.
#[derive(Debug, Clone, Serialize)]
pub struct OnDemandReply {
    pub symbol: Symbol,
    pub text: String,
    pub result: Option<ScoreResult>,
}

/// The cancellable handle of one active session.
struct WorkerHandle {
    generation: u64,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

struct RegistryInner {
    context: Arc<SignalContext>,
    source: Arc<dyn QuoteSource>,
    notifier: Arc<dyn Notifier>,
    ws_tx: broadcast::Sender<WsMessage>,
    sessions: Mutex<HashMap<SubscriberId, WorkerHandle>>,
    next_generation: AtomicU64,
}

impl RegistryInner {
    /// Forgets the session if it still belongs to `generation`.
    ///
    /// The removed handle is returned so the caller decides when its
    /// cancellation channel is dropped.
    fn worker_exited(&self, subscriber: SubscriberId, generation: u64) -> Option<WorkerHandle> {
        let mut sessions = self.sessions.lock();
        match sessions.get(&subscriber) {
            Some(handle) if handle.generation == generation => sessions.remove(&subscriber),
            _ => None,
        }
    }
}

/// Owns every subscriber's auto-analysis session.
///
/// Cloning is cheap and every clone manages the same sessions, so request
/// handlers can each hold one. `enable` must be called from within a Tokio
/// runtime.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(
        context: SignalContext,
        source: Arc<dyn QuoteSource>,
        notifier: Arc<dyn Notifier>,
        ws_tx: broadcast::Sender<WsMessage>,
    ) -> Self {
        tracing::info!(source = source.name(), notifier = notifier.name(), "Session registry ready.");
        Self {
            inner: Arc::new(RegistryInner {
                context: Arc::new(context),
                source,
                notifier,
                ws_tx,
                sessions: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Starts auto-analysis for `subscriber`. A second call while active is a no-op.
    pub fn enable(&self, subscriber: SubscriberId) -> EnableOutcome {
        let mut sessions = self.inner.sessions.lock();
        if sessions.contains_key(&subscriber) {
            tracing::info!(%subscriber, "Auto-analysis already active.");
            return EnableOutcome::AlreadyActive;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(supervise(
            Arc::clone(&self.inner),
            subscriber,
            generation,
            shutdown_rx,
        ));

        sessions.insert(
            subscriber,
            WorkerHandle {
                generation,
                shutdown: shutdown_tx,
                task,
            },
        );
        tracing::info!(%subscriber, generation, "Auto-analysis enabled.");
        EnableOutcome::Started
    }

    /// Cancels the session of `subscriber`, whatever state its worker is in.
    pub fn disable(&self, subscriber: SubscriberId) -> DisableOutcome {
        let handle = self.inner.sessions.lock().remove(&subscriber);
        match handle {
            Some(handle) => {
                let _ = handle.shutdown.send(true);
                tracing::info!(%subscriber, generation = handle.generation, "Auto-analysis disabled.");
                DisableOutcome::Stopped
            }
            None => {
                tracing::info!(%subscriber, "Auto-analysis was not active.");
                DisableOutcome::WasNotActive
            }
        }
    }

    pub fn is_active(&self, subscriber: SubscriberId) -> bool {
        self.inner.sessions.lock().contains_key(&subscriber)
    }

    pub fn active_subscribers(&self) -> Vec<SubscriberId> {
        let mut active: Vec<SubscriberId> = self.inner.sessions.lock().keys().copied().collect();
        active.sort();
        active
    }

    pub fn instruments(&self) -> &[Symbol] {
        &self.inner.context.instruments
    }

    pub fn context(&self) -> &SignalContext {
        &self.inner.context
    }

    /// Scores the current window of `symbol` without touching the cooldown.
    pub fn query_on_demand(&self, symbol: &Symbol) -> Result<OnDemandReply> {
        let context = &self.inner.context;
        if !context.is_known(symbol) {
            return Err(Error::UnknownInstrument(symbol.clone()));
        }

        let prices = context.windows.snapshot(symbol);
        if prices.is_empty() {
            return Ok(OnDemandReply {
                symbol: symbol.clone(),
                text: format::no_data(symbol),
                result: None,
            });
        }

        let result = context.scorer.score(&prices);
        tracing::debug!(symbol = %symbol, samples = prices.len(), score = result.score, "On-demand query scored.");
        Ok(OnDemandReply {
            symbol: symbol.clone(),
            text: format::on_demand(symbol, &result),
            result: Some(result),
        })
    }

    /// Cancels every session and waits for their tasks to finish.
    pub async fn shutdown(&self) {
        let handles: Vec<(SubscriberId, WorkerHandle)> = self.inner.sessions.lock().drain().collect();
        if handles.is_empty() {
            return;
        }
        tracing::info!(count = handles.len(), "Stopping all auto-analysis sessions...");

        for (_, handle) in &handles {
            let _ = handle.shutdown.send(true);
        }
        for (subscriber, handle) in handles {
            if let Err(e) = handle.task.await {
                tracing::error!(%subscriber, error = %e, "Session task panicked.");
            }
        }
        tracing::info!("All auto-analysis sessions stopped.");
    }
}

/// Runs one session: the dispatcher task, then the worker until it ends.
async fn supervise(
    inner: Arc<RegistryInner>,
    subscriber: SubscriberId,
    generation: u64,
    shutdown: watch::Receiver<bool>,
) {
    let (outbox, dispatcher) = dispatch::channel(
        subscriber,
        inner.context.notification_queue,
        Arc::clone(&inner.notifier),
        shutdown.clone(),
    );
    let dispatcher = tokio::spawn(dispatcher.run());

    let worker = IngestionWorker::new(
        subscriber,
        Arc::clone(&inner.context),
        Arc::clone(&inner.source),
        outbox,
        inner.ws_tx.clone(),
    );
    let state = worker.run(shutdown).await;

    // Held until the dispatcher is done, so a failed session still drains its queue.
    let _session = inner.worker_exited(subscriber, generation);
    if state == WorkerState::Failed {
        tracing::warn!(%subscriber, "Auto-analysis stopped after a feed failure. Re-enable to resume.");
    }

    if let Err(e) = dispatcher.await {
        tracing::error!(%subscriber, error = %e, "Notification dispatcher panicked.");
    }
}

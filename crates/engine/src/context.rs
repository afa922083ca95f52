// In crates/engine/src/context.rs

use crate::cooldown::CooldownGate;
use crate::error::Result;
use crate::window::PriceWindowStore;
use app_config::Settings;
use core_types::Symbol;
use scoring::{EmaRsiScorer, Scorer};

/// State and parameters shared by every worker and the on-demand query path.
pub struct SignalContext {
    pub windows: PriceWindowStore,
    pub cooldown: CooldownGate,
    pub scorer: Box<dyn Scorer + Send + Sync>,
    /// The instrument universe, in subscription order.
    pub instruments: Vec<Symbol>,
    pub signal_threshold: f64,
    pub notification_queue: usize,
}

impl SignalContext {
    /// Builds the context from validated settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let signals = &settings.signals;
        let scorer = EmaRsiScorer::new(settings.scoring.clone())?;

        tracing::info!(
            instruments = signals.instruments.len(),
            window = signals.window_capacity,
            threshold = signals.signal_threshold,
            cooldown_secs = signals.cooldown_secs,
            scorer = scorer.name(),
            "Signal context initialized."
        );

        Ok(Self {
            windows: PriceWindowStore::new(signals.window_capacity),
            cooldown: CooldownGate::from_secs(signals.cooldown_secs),
            scorer: Box::new(scorer),
            instruments: signals.instrument_symbols()?,
            signal_threshold: signals.signal_threshold,
            notification_queue: signals.notification_queue,
        })
    }

    pub fn is_known(&self, symbol: &Symbol) -> bool {
        self.instruments.contains(symbol)
    }

    /// True when `score` is strong enough to be considered for a notification.
    pub fn is_candidate(&self, score: f64) -> bool {
        score.abs() >= self.signal_threshold
    }
}

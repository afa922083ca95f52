// In crates/app-config/src/types.rs

use crate::error::{Error, Result};
use core_types::Symbol;
use scoring::ScoringSettings;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    pub server: ServerSettings,
    /// Settings for the streaming quote feed.
    pub feed: FeedSettings,
    #[serde(default)]
    pub signals: SignalSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
}

impl Settings {
    /// Rejects combinations that would make the pipeline silently useless.
    pub fn validate(&self) -> Result<()> {
        self.signals.validate()?;
        self.scoring.validate()?;
        if self.signals.window_capacity < self.scoring.min_samples {
            return Err(Error::Invalid(format!(
                "window_capacity ({}) is smaller than scoring.min_samples ({}); no signal could ever fire",
                self.signals.window_capacity, self.scoring.min_samples
            )));
        }
        if self.feed.ws_url.trim().is_empty() {
            return Err(Error::Invalid("feed.ws_url must be set".into()));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FeedSettings {
    /// The WebSocket URL of the quotes endpoint.
    pub ws_url: String,
    /// The provider API key, appended as `?apikey=`. Usually set via `APP_FEED__API_KEY`.
    #[serde(default)]
    pub api_key: String,
    /// Seconds between keep-alive frames. 0 disables them.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

/// Longest accepted cooldown between two notifications for one instrument.
pub const MAX_COOLDOWN_SECS: u64 = 86_400;

/// Where auto-signal notifications are delivered.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    /// Pushed to `/ws` clients.
    #[default]
    Broadcast,
    /// Written to the application log only.
    Log,
}

/// Parameters of the ingestion and dispatch pipeline.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SignalSettings {
    /// The instrument universe, subscribed to as one batch per connection.
    pub instruments: Vec<String>,
    /// Samples retained per instrument.
    pub window_capacity: usize,
    /// Minimum absolute score for a candidate to be considered.
    pub signal_threshold: f64,
    /// Minimum seconds between two notifications for the same instrument.
    pub cooldown_secs: u64,
    /// Pending notifications buffered per subscriber.
    pub notification_queue: usize,
    pub notifier: NotifierKind,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            window_capacity: 120,
            signal_threshold: 0.3,
            cooldown_secs: 30,
            notification_queue: 64,
            notifier: NotifierKind::Broadcast,
        }
    }
}

impl SignalSettings {
    pub fn instrument_symbols(&self) -> Result<Vec<Symbol>> {
        let mut symbols = Vec::with_capacity(self.instruments.len());
        for raw in &self.instruments {
            let symbol = Symbol::parse(raw)?;
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        Ok(symbols)
    }

    pub fn validate(&self) -> Result<()> {
        if self.instrument_symbols()?.is_empty() {
            return Err(Error::Invalid("signals.instruments must not be empty".into()));
        }
        if self.window_capacity == 0 {
            return Err(Error::Invalid("signals.window_capacity must be greater than 0".into()));
        }
        if !(self.signal_threshold > 0.0) {
            return Err(Error::Invalid("signals.signal_threshold must be positive".into()));
        }
        if self.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(Error::Invalid(format!(
                "signals.cooldown_secs ({}) exceeds the maximum of {} seconds",
                self.cooldown_secs, MAX_COOLDOWN_SECS
            )));
        }
        if self.notification_queue == 0 {
            return Err(Error::Invalid("signals.notification_queue must be greater than 0".into()));
        }
        Ok(())
    }
}

/// Helper functions for serde defaults
fn default_log_level() -> String { "info".into() }
fn default_heartbeat_secs() -> u64 { 10 }

fn default_instruments() -> Vec<String> {
    [
        "EUR/USD", "GBP/USD", "USD/JPY", "AUD/JPY", "EUR/GBP", "EUR/JPY",
        "GBP/JPY", "USD/CHF", "AUD/USD", "NZD/USD", "EUR/RUB", "USD/RUB",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// In crates/core-types/src/types.rs

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An instrument symbol as the quote feed names it (e.g., "EUR/USD").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// Builds a symbol from user or config input, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.contains(',') {
            return Err(Error::InvalidSymbol(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifies the party that receives notifications (a chat id in the bot front-end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriberId(pub i64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubscriberId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(SubscriberId)
            .map_err(|_| Error::InvalidSubscriber(s.to_string()))
    }
}

/// A single observed price. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// The direction implied by the sign of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl Direction {
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Direction::Up
        } else if score < 0.0 {
            Direction::Down
        } else {
            Direction::Neutral
        }
    }

    /// The action label used in autonomous signals.
    pub fn action_label(&self) -> &'static str {
        match self {
            Direction::Up => "BUY",
            Direction::Down => "SELL",
            Direction::Neutral => "HOLD",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Neutral => "Neutral",
        };
        f.write_str(label)
    }
}

/// Lifecycle of a stream ingestion worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Connecting,
    Streaming,
    Closed,
    Failed,
}

impl WorkerState {
    /// Whether the worker has stopped for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Closed | WorkerState::Failed)
    }
}

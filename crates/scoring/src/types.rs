// In crates/scoring/src/types.rs

use crate::error::{Error, Result};
use core_types::Direction;
use serde::{Deserialize, Serialize};

/// Note attached to a result computed from too short a window.
pub const INSUFFICIENT_DATA_NOTE: &str = "insufficient data";

/// Parameters of the EMA crossover + RSI heuristic.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScoringSettings {
    /// Windows shorter than this produce the neutral "insufficient data" result.
    pub min_samples: usize,
    pub fast_ema_period: usize,
    pub slow_ema_period: usize,
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    /// Added when the fast EMA is above the slow one, subtracted otherwise.
    pub trend_weight: f64,
    /// Applied against the trend when RSI leaves the 30..=70 band.
    pub momentum_weight: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            min_samples: 10,
            fast_ema_period: 5,
            slow_ema_period: 12,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            trend_weight: 0.5,
            momentum_weight: 0.3,
        }
    }
}

impl ScoringSettings {
    pub fn validate(&self) -> Result<()> {
        if self.min_samples < 2 {
            return Err(Error::InvalidSettings(
                "min_samples must be at least 2".into(),
            ));
        }
        if self.fast_ema_period == 0 || self.slow_ema_period == 0 || self.rsi_period == 0 {
            return Err(Error::InvalidSettings(
                "indicator periods must be greater than 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(Error::InvalidSettings(format!(
                "RSI bands must satisfy 0 <= oversold ({}) < overbought ({}) <= 100",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        if self.trend_weight < 0.0 || self.momentum_weight < 0.0 {
            return Err(Error::InvalidSettings("weights must not be negative".into()));
        }
        Ok(())
    }
}

/// The outcome of one evaluation. Produced fresh per call, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub score: f64,
    pub notes: Vec<String>,
}

impl ScoreResult {
    pub fn insufficient_data() -> Self {
        Self {
            score: 0.0,
            notes: vec![INSUFFICIENT_DATA_NOTE.to_string()],
        }
    }

    /// True for the neutral result returned when the window was too short.
    pub fn has_insufficient_data(&self) -> bool {
        self.notes.len() == 1 && self.notes[0] == INSUFFICIENT_DATA_NOTE
    }

    pub fn direction(&self) -> Direction {
        Direction::from_score(self.score)
    }
}

// In crates/scoring/src/lib.rs

pub mod ema_rsi;
pub mod error;
pub mod types;

pub use ema_rsi::EmaRsiScorer;
pub use error::{Error, Result};
pub use types::{INSUFFICIENT_DATA_NOTE, ScoreResult, ScoringSettings};

/// The universal interface for a directional scorer.
///
/// A scorer maps the current price window of one instrument, oldest first,
/// to a signed score and the notes explaining it. Implementations must be
/// pure: the same window always yields the same result.
pub trait Scorer {
    /// The name of the scorer.
    fn name(&self) -> &'static str;

    fn score(&self, prices: &[f64]) -> ScoreResult;
}

/// Scores `prices` with the default EMA 5/12 + RSI 14 heuristic.
pub fn score(prices: &[f64]) -> ScoreResult {
    match EmaRsiScorer::new(ScoringSettings::default()) {
        Ok(scorer) => scorer.score(prices),
        Err(_) => ScoreResult::insufficient_data(),
    }
}

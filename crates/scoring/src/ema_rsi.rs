// In crates/scoring/src/ema_rsi.rs

use crate::error::{Error, Result};
use crate::types::{ScoreResult, ScoringSettings};
use crate::Scorer;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage as Ema, SimpleMovingAverage as Sma};

/// EMA crossover scorer with an RSI overbought/oversold adjustment.
///
/// The indicators are built once from the settings and cloned for every
/// evaluation, so a call never depends on the windows scored before it.
#[derive(Debug, Clone)]
pub struct EmaRsiScorer {
    settings: ScoringSettings,
    fast_ema: Ema,
    slow_ema: Ema,
    // Trailing averages of price changes, split by sign.
    gain_avg: Sma,
    loss_avg: Sma,
}

impl EmaRsiScorer {
    pub fn new(settings: ScoringSettings) -> Result<Self> {
        settings.validate()?;
        let indicator_err = |e| Error::Indicator(format!("{:?}", e));

        Ok(Self {
            fast_ema: Ema::new(settings.fast_ema_period).map_err(indicator_err)?,
            slow_ema: Ema::new(settings.slow_ema_period).map_err(indicator_err)?,
            gain_avg: Sma::new(settings.rsi_period).map_err(indicator_err)?,
            loss_avg: Sma::new(settings.rsi_period).map_err(indicator_err)?,
            settings,
        })
    }

    fn last_ema(prototype: &Ema, prices: &[f64]) -> f64 {
        let mut ema = prototype.clone();
        prices.iter().fold(0.0, |_, price| ema.next(*price))
    }

    /// RSI over the trailing `rsi_period` price changes. No losses means 100.
    fn rsi(&self, prices: &[f64]) -> f64 {
        let mut gains = self.gain_avg.clone();
        let mut losses = self.loss_avg.clone();
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;

        for pair in prices.windows(2) {
            let change = pair[1] - pair[0];
            avg_gain = gains.next(change.max(0.0));
            avg_loss = losses.next((-change).max(0.0));
        }

        if avg_loss <= 0.0 {
            return 100.0;
        }
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

impl Scorer for EmaRsiScorer {
    fn name(&self) -> &'static str {
        "EmaCrossoverRsi"
    }

    fn score(&self, prices: &[f64]) -> ScoreResult {
        if prices.len() < self.settings.min_samples {
            return ScoreResult::insufficient_data();
        }

        let s = &self.settings;
        let fast = Self::last_ema(&self.fast_ema, prices);
        let slow = Self::last_ema(&self.slow_ema, prices);
        let mut score = 0.0;
        let mut notes = Vec::with_capacity(3);

        // A tie counts as bearish.
        if fast > slow {
            score += s.trend_weight;
            notes.push(format!("EMA{} > EMA{}", s.fast_ema_period, s.slow_ema_period));
        } else {
            score -= s.trend_weight;
            notes.push(format!("EMA{} < EMA{}", s.fast_ema_period, s.slow_ema_period));
        }

        let rsi = self.rsi(prices);
        notes.push(format!("RSI={:.1}", rsi));
        if rsi > s.rsi_overbought {
            score -= s.momentum_weight;
            notes.push("overbought".to_string());
        } else if rsi < s.rsi_oversold {
            score += s.momentum_weight;
            notes.push("oversold".to_string());
        }

        ScoreResult { score, notes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> EmaRsiScorer {
        EmaRsiScorer::new(ScoringSettings::default()).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    /// Alternates +5 and -3 pips on the way up.
    fn zigzag_up() -> Vec<f64> {
        vec![
            1.1040, 1.1045, 1.1042, 1.1047, 1.1044, 1.1049, 1.1046, 1.1051, 1.1048, 1.1053,
        ]
    }

    #[test]
    fn short_windows_are_neutral_with_a_single_note() {
        let scorer = scorer();
        for len in 0..10 {
            let prices: Vec<f64> = (0..len).map(|i| 1.0 + (i as f64 * 0.37).sin()).collect();
            let result = scorer.score(&prices);
            assert_eq!(result.score, 0.0);
            assert_eq!(result.notes.len(), 1);
            assert!(result.has_insufficient_data());
        }
    }

    #[test]
    fn rising_ramp_is_bullish_but_overbought() {
        let prices: Vec<f64> = (0..14).map(|i| 1.1000 + 0.0001 * i as f64).collect();
        let result = scorer().score(&prices);

        assert_close(result.score, 0.2);
        assert_eq!(result.notes, vec!["EMA5 > EMA12", "RSI=100.0", "overbought"]);
        assert!(!result.has_insufficient_data());
    }

    #[test]
    fn falling_ramp_is_bearish_but_oversold() {
        let prices: Vec<f64> = (0..14).map(|i| 1.1013 - 0.0001 * i as f64).collect();
        let result = scorer().score(&prices);

        assert_close(result.score, -0.2);
        assert_eq!(result.notes, vec!["EMA5 < EMA12", "RSI=0.0", "oversold"]);
    }

    #[test]
    fn choppy_uptrend_scores_full_trend_weight() {
        let result = scorer().score(&zigzag_up());

        assert_close(result.score, 0.5);
        assert_eq!(result.notes, vec!["EMA5 > EMA12", "RSI=67.6"]);
    }

    #[test]
    fn choppy_downtrend_scores_negative_trend_weight() {
        let prices: Vec<f64> = zigzag_up().iter().map(|p| 2.2 - p).collect();
        let result = scorer().score(&prices);

        assert_close(result.score, -0.5);
        assert_eq!(result.notes, vec!["EMA5 < EMA12", "RSI=32.4"]);
    }

    #[test]
    fn flat_window_counts_as_tie_with_no_losses() {
        let result = scorer().score(&[1.25; 12]);

        assert_close(result.score, -0.8);
        assert_eq!(result.notes, vec!["EMA5 < EMA12", "RSI=100.0", "overbought"]);
    }

    #[test]
    fn rsi_only_looks_at_the_trailing_period() {
        let mut prices: Vec<f64> = (0..16).map(|i| 1.2 - 0.001 * i as f64).collect();
        let bottom = *prices.last().unwrap();
        prices.extend((1..=14).map(|i| bottom + 0.001 * i as f64));

        let result = scorer().score(&prices);
        assert_eq!(result.notes[1], "RSI=100.0");
        assert_close(result.score, 0.2);
    }

    #[test]
    fn scoring_is_deterministic() {
        let scorer = scorer();
        let prices = zigzag_up();
        assert_eq!(scorer.score(&prices), scorer.score(&prices));
        assert_eq!(crate::score(&prices), scorer.score(&prices));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let bad_bands = ScoringSettings {
            rsi_oversold: 80.0,
            ..ScoringSettings::default()
        };
        assert!(EmaRsiScorer::new(bad_bands).is_err());

        let zero_period = ScoringSettings {
            slow_ema_period: 0,
            ..ScoringSettings::default()
        };
        assert!(EmaRsiScorer::new(zero_period).is_err());
    }
}

// In crates/engine/src/format.rs

use core_types::Symbol;
use scoring::ScoreResult;

pub fn auto_signal(symbol: &Symbol, result: &ScoreResult) -> String {
    format!(
        "Auto signal\nPair: {}\n{}\n\n{}",
        symbol,
        result.direction().action_label(),
        result.notes.join("\n")
    )
}

pub fn on_demand(symbol: &Symbol, result: &ScoreResult) -> String {
    format!(
        "Signal (on demand)\nPair: {}\nDirection: {}\n\n{}",
        symbol,
        result.direction(),
        result.notes.join("\n")
    )
}

pub fn no_data(symbol: &Symbol) -> String {
    format!("No data for {} yet. Enable auto-analysis first.", symbol)
}

// In crates/engine/src/error.rs

use core_types::Symbol;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Instrument {0} is not part of the configured universe")]
    UnknownInstrument(Symbol),
    #[error("Invalid configuration: {0}")]
    Config(#[from] app_config::Error),
    #[error("Scorer could not be built: {0}")]
    Scoring(#[from] scoring::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

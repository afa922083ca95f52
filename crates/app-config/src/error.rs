// In crates/app-config/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load configuration")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid scoring configuration: {0}")]
    Scoring(#[from] scoring::Error),

    #[error("Invalid instrument in configuration: {0}")]
    Instrument(#[from] core_types::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

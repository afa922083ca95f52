// In crates/scoring/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid scoring settings: {0}")]
    InvalidSettings(String),
    #[error("Indicator could not be built: {0}")]
    Indicator(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Invalid instrument symbol: {0:?}")]
    InvalidSymbol(String),
    #[error("Invalid subscriber id: {0:?}")]
    InvalidSubscriber(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// In crates/quote-feed/src/error.rs

use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to connect to the quote feed: {0}")]
    Connect(#[source] tungstenite::Error),
    #[error("Quote feed transport error: {0}")]
    Transport(#[from] tungstenite::Error),
    #[error("Failed to encode feed request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Quote feed closed: {0}")]
    Closed(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// In crates/quote-feed/src/lib.rs

pub mod error;
pub mod live_connector;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use live_connector::{LiveConnector, QuoteSource, QuoteStream};
pub use types::*;

// In crates/quote-feed/src/types.rs

use core_types::Symbol;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound request subscribing to a batch of instruments.
///
/// Serializes as `{"action":"subscribe","params":{"symbols":"EUR/USD,GBP/USD"}}`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SubscribeRequest {
    pub action: &'static str,
    pub params: SubscribeParams,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SubscribeParams {
    /// Comma-joined list of symbols.
    pub symbols: String,
}

impl SubscribeRequest {
    pub fn new(symbols: &[Symbol]) -> Self {
        let joined = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            action: "subscribe",
            params: SubscribeParams { symbols: joined },
        }
    }
}

/// Keep-alive request the provider expects on an otherwise quiet connection.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct HeartbeatRequest {
    pub action: &'static str,
}

impl Default for HeartbeatRequest {
    fn default() -> Self {
        Self { action: "heartbeat" }
    }
}

/// A decoded price update for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
}

/// Everything the feed can send us, after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Quote(Quote),
    /// Acknowledgement of a subscribe request.
    SubscribeStatus {
        status: String,
        accepted: Vec<Symbol>,
        rejected: Vec<Symbol>,
    },
    Heartbeat,
    /// Any other shape, including invalid JSON. Skipped by consumers.
    Unrecognized,
}

/// Loose view of an inbound frame. Every field is optional because the feed
/// multiplexes quotes, acknowledgements and heartbeats on one connection.
#[derive(Debug, Deserialize)]
struct RawFrame {
    event: Option<String>,
    symbol: Option<String>,
    price: Option<Value>,
    status: Option<String>,
    #[serde(default)]
    success: Vec<Value>,
    #[serde(default)]
    fails: Vec<Value>,
}

/// Decodes one text frame from the quote feed.
///
/// A frame carrying both `symbol` and a parseable `price` is a quote,
/// whatever its `event` field says.
pub fn decode_event(text: &str) -> FeedEvent {
    let frame = match serde_json::from_str::<RawFrame>(text) {
        Ok(frame) => frame,
        Err(_) => return FeedEvent::Unrecognized,
    };

    if let (Some(symbol), Some(price)) = (frame.symbol.as_deref(), frame.price.as_ref()) {
        return match (Symbol::parse(symbol), parse_price(price)) {
            (Ok(symbol), Some(price)) => FeedEvent::Quote(Quote { symbol, price }),
            _ => FeedEvent::Unrecognized,
        };
    }

    match frame.event.as_deref() {
        Some("subscribe-status") => FeedEvent::SubscribeStatus {
            status: frame.status.unwrap_or_default(),
            accepted: symbols_of(&frame.success),
            rejected: symbols_of(&frame.fails),
        },
        Some("heartbeat") => FeedEvent::Heartbeat,
        _ => FeedEvent::Unrecognized,
    }
}

/// Prices arrive either as JSON numbers or as numeric strings. Only finite
/// values are accepted.
fn parse_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    price.is_finite().then_some(price)
}

/// Entries of the ack lists are either bare strings or objects with a `symbol` field.
fn symbols_of(entries: &[Value]) -> Vec<Symbol> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get("symbol").and_then(Value::as_str),
            _ => None,
        })
        .filter_map(|s| Symbol::parse(s).ok())
        .collect()
}

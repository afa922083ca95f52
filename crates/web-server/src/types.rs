// In crates/web-server/src/types.rs

use core_types::{Direction, SubscriberId, Symbol};
use engine::{DisableOutcome, EnableOutcome, OnDemandReply};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/subscribers/{id}/auto`.
#[derive(Debug, Deserialize)]
pub struct AutoRequest {
    pub enabled: bool,
}

/// Either outcome serializes as its bare snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AutoOutcome {
    Enable(EnableOutcome),
    Disable(DisableOutcome),
}

#[derive(Debug, Serialize)]
pub struct AutoResponse {
    pub outcome: AutoOutcome,
}

#[derive(Debug, Serialize)]
pub struct SubscriberStatus {
    pub subscriber: SubscriberId,
    pub active: bool,
}

/// Query of `GET /api/signal?pair=EUR/USD`.
#[derive(Debug, Deserialize)]
pub struct SignalQuery {
    pub pair: String,
}

/// `score` and `direction` are null when no price has been seen yet.
#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub symbol: Symbol,
    pub text: String,
    pub score: Option<f64>,
    pub direction: Option<Direction>,
    pub notes: Vec<String>,
}

impl From<OnDemandReply> for SignalResponse {
    fn from(reply: OnDemandReply) -> Self {
        let (score, direction, notes) = match reply.result {
            Some(result) => (Some(result.score), Some(result.direction()), result.notes),
            None => (None, None, Vec::new()),
        };
        Self {
            symbol: reply.symbol,
            text: reply.text,
            score,
            direction,
            notes,
        }
    }
}

/// Query of `GET /ws`. Without `subscriber` every message is forwarded.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub subscriber: Option<i64>,
}

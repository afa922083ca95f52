// --- Broadcast Message Structures ---

use chrono::{DateTime, Utc};
use core_types::{SubscriberId, WorkerState};
use serde::Serialize;

/// Represents a log message event to be sent to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct WsLogMessage {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

/// A message delivered to one subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct WsNotification {
    pub timestamp: DateTime<Utc>,
    pub subscriber: SubscriberId,
    pub text: String,
}

/// A lifecycle transition of a subscriber's ingestion worker.
#[derive(Debug, Clone, Serialize)]
pub struct WsWorkerStatus {
    pub timestamp: DateTime<Utc>,
    pub subscriber: SubscriberId,
    pub state: WorkerState,
    /// Set when the worker failed.
    pub error: Option<String>,
}

/// The top-level WebSocket message enum.
/// `tag` and `content` are used by serde for clean JSON representation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum WsMessage {
    Log(WsLogMessage),
    Notification(WsNotification),
    WorkerStatus(WsWorkerStatus),
}

impl WsMessage {
    /// The subscriber this message is addressed to, if any. Logs are for everyone.
    pub fn subscriber(&self) -> Option<SubscriberId> {
        match self {
            WsMessage::Log(_) => None,
            WsMessage::Notification(n) => Some(n.subscriber),
            WsMessage::WorkerStatus(s) => Some(s.subscriber),
        }
    }

    pub fn worker_status(subscriber: SubscriberId, state: WorkerState, error: Option<String>) -> Self {
        WsMessage::WorkerStatus(WsWorkerStatus {
            timestamp: Utc::now(),
            subscriber,
            state,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let msg = WsMessage::worker_status(SubscriberId(7), WorkerState::Failed, Some("closed".into()));
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "WorkerStatus");
        assert_eq!(json["payload"]["subscriber"], 7);
        assert_eq!(json["payload"]["state"], "failed");
        assert_eq!(json["payload"]["error"], "closed");
    }

    #[test]
    fn logs_are_not_addressed() {
        let log = WsMessage::Log(WsLogMessage {
            timestamp: Utc::now(),
            level: "INFO".into(),
            message: "hello".into(),
        });
        assert_eq!(log.subscriber(), None);
    }
}

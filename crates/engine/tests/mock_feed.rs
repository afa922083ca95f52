#![allow(dead_code)]

use app_config::{AppSettings, FeedSettings, ServerSettings, Settings, SignalSettings};
use async_trait::async_trait;
use core_types::{SubscriberId, Symbol};
use engine::Notifier;
use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use quote_feed::{FeedEvent, QuoteSource, QuoteStream, decode_event};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const ZIGZAG: [&str; 12] = [
    "1.1040", "1.1045", "1.1042", "1.1047", "1.1044", "1.1049", "1.1046", "1.1051", "1.1048",
    "1.1053", "1.1050", "1.1055",
];

pub fn quote_frame(symbol: &str, price: &str) -> String {
    format!(r#"{{"symbol":"{}","price":"{}"}}"#, symbol, price)
}

pub fn settings(instruments: &[&str]) -> Settings {
    Settings {
        app: AppSettings {
            environment: "test".into(),
            log_level: "debug".into(),
        },
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        feed: FeedSettings {
            ws_url: "wss://feed.invalid/quotes".into(),
            api_key: String::new(),
            heartbeat_secs: 0,
        },
        signals: SignalSettings {
            instruments: instruments.iter().map(|s| s.to_string()).collect(),
            ..SignalSettings::default()
        },
        scoring: Default::default(),
    }
}

/// How a scripted connection behaves once its frames are used up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AfterScript {
    /// Stay open and silent until dropped.
    Idle,
    /// End the stream, as a dropped connection does.
    Drop,
    /// Never finish connecting.
    HangOnConnect,
}

/// A `QuoteSource` replaying raw text frames through the real decoder.
pub struct ScriptedSource {
    frames: Vec<String>,
    after: AfterScript,
    connects: AtomicUsize,
    subscribed: Mutex<Vec<Symbol>>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<String>, after: AfterScript) -> Self {
        Self {
            frames,
            after,
            connects: AtomicUsize::new(0),
            subscribed: Mutex::new(Vec::new()),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn subscribed(&self) -> Vec<Symbol> {
        self.subscribed.lock().clone()
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "ScriptedSource"
    }

    async fn connect(&self, symbols: &[Symbol]) -> quote_feed::Result<QuoteStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.subscribed.lock() = symbols.to_vec();

        if self.after == AfterScript::HangOnConnect {
            futures::future::pending::<()>().await;
        }

        let events: Vec<quote_feed::Result<FeedEvent>> =
            self.frames.iter().map(|f| Ok(decode_event(f))).collect();
        let scripted = stream::iter(events);
        let events: QuoteStream = match self.after {
            AfterScript::Drop => Box::pin(scripted),
            _ => Box::pin(scripted.chain(stream::pending())),
        };
        Ok(events)
    }
}

/// A `Notifier` that keeps every delivered message.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(SubscriberId, String)>>,
}

impl RecordingNotifier {
    pub fn delivered(&self) -> Vec<(SubscriberId, String)> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "RecordingNotifier"
    }

    async fn notify(&self, subscriber: SubscriberId, text: &str) -> anyhow::Result<()> {
        self.delivered.lock().push((subscriber, text.to_string()));
        Ok(())
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

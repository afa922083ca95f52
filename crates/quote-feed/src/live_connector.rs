// In crates/quote-feed/src/live_connector.rs

use crate::types::{FeedEvent, HeartbeatRequest, SubscribeRequest, decode_event};
use crate::{Error, Result};
use app_config::FeedSettings;
use async_stream::stream;
use async_trait::async_trait;
use core_types::Symbol;
use futures::Stream;
use futures_util::{SinkExt, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// A live stream of decoded feed events. Dropping it releases the connection.
pub type QuoteStream = Pin<Box<dyn Stream<Item = Result<FeedEvent>> + Send>>;

/// Anything that can open a subscription to the quote feed.
///
/// The stream ends with an `Err` (or simply ends) when the transport fails;
/// implementations must not reconnect on their own.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn connect(&self, symbols: &[Symbol]) -> Result<QuoteStream>;
}

/// A connector for the provider's streaming quotes endpoint.
#[derive(Debug, Clone)]
pub struct LiveConnector {
    ws_url: String,
    api_key: String,
    heartbeat: Option<Duration>,
}

impl LiveConnector {
    pub fn new(settings: &FeedSettings) -> Self {
        Self {
            ws_url: settings.ws_url.clone(),
            api_key: settings.api_key.clone(),
            heartbeat: (settings.heartbeat_secs > 0)
                .then(|| Duration::from_secs(settings.heartbeat_secs)),
        }
    }

    fn endpoint(&self) -> String {
        if self.api_key.is_empty() {
            return self.ws_url.clone();
        }
        let separator = if self.ws_url.contains('?') { '&' } else { '?' };
        format!("{}{}apikey={}", self.ws_url, separator, self.api_key)
    }
}

#[async_trait]
impl QuoteSource for LiveConnector {
    fn name(&self) -> &'static str {
        "TwelveDataQuotes"
    }

    /// Connects, sends one subscribe request for `symbols`, and returns the
    /// stream of decoded events.
    async fn connect(&self, symbols: &[Symbol]) -> Result<QuoteStream> {
        // The endpoint carries the API key, so only the bare URL is logged.
        tracing::info!(url = %self.ws_url, instruments = symbols.len(), "Connecting to quote feed...");
        let (ws_stream, _) = connect_async(self.endpoint()).await.map_err(Error::Connect)?;
        tracing::info!("Quote feed connection successful.");

        let (mut write, read) = ws_stream.split();

        let subscribe = serde_json::to_string(&SubscribeRequest::new(symbols))?;
        write.send(Message::Text(subscribe.into())).await?;
        tracing::debug!(instruments = symbols.len(), "Subscribe request sent.");

        let heartbeat_frame = serde_json::to_string(&HeartbeatRequest::default())?;
        let heartbeat = self.heartbeat;

        let events = stream! {
            let mut read = read.fuse();
            let mut ticker = heartbeat.map(|period| interval_at(Instant::now() + period, period));

            loop {
                // `None` means a heartbeat is due rather than a frame arriving.
                let next = match ticker.as_mut() {
                    Some(ticker) => tokio::select! {
                        frame = read.next() => Some(frame),
                        _ = ticker.tick() => None,
                    },
                    None => Some(read.next().await),
                };

                match next {
                    None => {
                        if let Err(e) = write.send(Message::Text(heartbeat_frame.clone().into())).await {
                            yield Err(Error::Transport(e));
                            break;
                        }
                        tracing::trace!("Heartbeat sent.");
                    }
                    Some(Some(Ok(Message::Text(text)))) => {
                        yield Ok(decode_event(text.as_str()));
                    }
                    Some(Some(Ok(Message::Binary(bytes)))) => {
                        match std::str::from_utf8(&bytes) {
                            Ok(text) => yield Ok(decode_event(text)),
                            Err(_) => yield Ok(FeedEvent::Unrecognized),
                        }
                    }
                    Some(Some(Ok(Message::Close(frame)))) => {
                        let reason = frame
                            .map(|f| format!("{} {}", f.code, f.reason))
                            .unwrap_or_else(|| "no close frame".to_string());
                        yield Err(Error::Closed(reason));
                        break;
                    }
                    // Pings are answered by tungstenite itself.
                    Some(Some(Ok(_))) => continue,
                    Some(Some(Err(e))) => {
                        yield Err(Error::Transport(e));
                        break;
                    }
                    Some(None) => {
                        yield Err(Error::Closed("stream ended".to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quote;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::{WebSocketStream, accept_async};

    async fn local_server() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (tcp, _) = listener.accept().await.unwrap();
        accept_async(tcp).await.unwrap()
    }

    async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_string(),
                Some(Ok(_)) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    async fn next_event(events: &mut QuoteStream) -> Option<Result<FeedEvent>> {
        tokio::time::timeout(Duration::from_secs(5), events.next())
            .await
            .expect("no feed event in time")
    }

    fn local_connector(url: String, heartbeat_secs: u64) -> LiveConnector {
        LiveConnector::new(&FeedSettings {
            ws_url: url,
            api_key: String::new(),
            heartbeat_secs,
        })
    }

    fn settings(api_key: &str, heartbeat_secs: u64) -> FeedSettings {
        FeedSettings {
            ws_url: "wss://ws.twelvedata.com/v1/quotes".into(),
            api_key: api_key.into(),
            heartbeat_secs,
        }
    }

    #[test]
    fn endpoint_appends_api_key() {
        let connector = LiveConnector::new(&settings("secret", 10));
        assert_eq!(connector.endpoint(), "wss://ws.twelvedata.com/v1/quotes?apikey=secret");
        assert_eq!(connector.heartbeat, Some(Duration::from_secs(10)));
    }

    #[test]
    fn endpoint_without_key_is_the_bare_url() {
        let connector = LiveConnector::new(&settings("", 0));
        assert_eq!(connector.endpoint(), "wss://ws.twelvedata.com/v1/quotes");
        assert_eq!(connector.heartbeat, None);
    }

    #[tokio::test]
    async fn subscribes_heartbeats_and_ends_on_close() {
        let (listener, url) = local_server().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let subscribe = next_text(&mut ws).await;
            let heartbeat = next_text(&mut ws).await;

            ws.send(Message::Text(r#"{"event":"price","symbol":"EUR/USD","price":1.105}"#.into()))
                .await
                .unwrap();
            ws.send(Message::from(br#"{"event":"heartbeat","status":"ok"}"#.to_vec()))
                .await
                .unwrap();
            ws.close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            }))
            .await
            .unwrap();
            while let Some(Ok(_)) = ws.next().await {}

            (subscribe, heartbeat)
        });

        let symbols = [Symbol::from("EUR/USD"), Symbol::from("USD/JPY")];
        let mut events = local_connector(url, 1).connect(&symbols).await.unwrap();

        assert_eq!(
            next_event(&mut events).await.unwrap().unwrap(),
            FeedEvent::Quote(Quote { symbol: Symbol::from("EUR/USD"), price: 1.105 })
        );
        // Binary frames go through the same decoder.
        assert_eq!(next_event(&mut events).await.unwrap().unwrap(), FeedEvent::Heartbeat);
        match next_event(&mut events).await {
            Some(Err(Error::Closed(reason))) => assert_eq!(reason, "1000 bye"),
            other => panic!("expected the close to surface as an error, got {other:?}"),
        }
        assert!(next_event(&mut events).await.is_none());

        let (subscribe, heartbeat) = server.await.unwrap();
        assert_eq!(subscribe, r#"{"action":"subscribe","params":{"symbols":"EUR/USD,USD/JPY"}}"#);
        assert_eq!(heartbeat, r#"{"action":"heartbeat"}"#);
    }

    #[tokio::test]
    async fn dropped_connection_ends_the_stream_with_an_error() {
        let (listener, url) = local_server().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            next_text(&mut ws).await;
            // Dropped without a closing handshake.
        });

        let mut events = local_connector(url, 0)
            .connect(&[Symbol::from("EUR/USD")])
            .await
            .unwrap();
        server.await.unwrap();

        assert!(matches!(next_event(&mut events).await, Some(Err(_))));
        assert!(next_event(&mut events).await.is_none());
    }

    #[tokio::test]
    async fn unreachable_feed_is_a_connect_error() {
        let (listener, url) = local_server().await;
        drop(listener);

        let result = local_connector(url, 0).connect(&[Symbol::from("EUR/USD")]).await;
        assert!(matches!(result, Err(Error::Connect(_))));
    }
}

// In crates/web-server/src/lib.rs

use app_config::ServerSettings;
use axum::{
    Router,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Json},
    routing::{get, post},
};
use core_types::{SubscriberId, Symbol};
use engine::SessionRegistry;
use events::WsMessage;
use futures::{sink::SinkExt, stream::StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use types::{
    AutoOutcome, AutoRequest, AutoResponse, SignalQuery, SignalResponse, SubscriberStatus, WsParams,
};

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// WebSocket message replay cache, shared with the log broadcaster.
pub type WsCache = Arc<Mutex<VecDeque<WsMessage>>>;

/// The maximum number of messages to keep in the replay cache.
pub const WS_CACHE_SIZE: usize = 200;

pub fn new_ws_cache() -> WsCache {
    Arc::new(Mutex::new(VecDeque::with_capacity(WS_CACHE_SIZE)))
}

/// Appends `msg` to the replay cache, evicting the oldest entry when full.
pub fn push_to_cache(cache: &WsCache, msg: WsMessage) {
    let mut cache = cache.lock();
    if cache.len() >= WS_CACHE_SIZE {
        cache.pop_front();
    }
    cache.push_back(msg);
}

/// The shared application state that is available to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub ws_tx: broadcast::Sender<WsMessage>, // For broadcasting live messages
    pub ws_cache: WsCache,                   // For replaying recent messages
}

/// Creates the main application router with all routes and middleware.
pub fn create_router(app_state: AppState) -> Router {
    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let api_router = Router::new()
        .route("/instruments", get(get_instruments_handler))
        .route("/signal", get(get_signal_handler))
        .route("/subscribers/{id}", get(get_subscriber_handler))
        .route("/subscribers/{id}/auto", post(set_auto_handler));

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check_handler))
        .nest("/api", api_router)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn health_check_handler() -> &'static str {
    "OK"
}

/// Handler for `GET /api/instruments`
async fn get_instruments_handler(State(state): State<AppState>) -> Json<Vec<Symbol>> {
    Json(state.registry.instruments().to_vec())
}

/// Handler for `GET /api/signal?pair=EUR/USD`
async fn get_signal_handler(
    State(state): State<AppState>,
    Query(query): Query<SignalQuery>,
) -> Result<Json<SignalResponse>> {
    let symbol = Symbol::parse(&query.pair)?;
    let reply = state.registry.query_on_demand(&symbol)?;
    Ok(Json(reply.into()))
}

/// Handler for `GET /api/subscribers/{id}`
async fn get_subscriber_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<SubscriberStatus> {
    let subscriber = SubscriberId(id);
    Json(SubscriberStatus {
        subscriber,
        active: state.registry.is_active(subscriber),
    })
}

/// Handler for `POST /api/subscribers/{id}/auto`
async fn set_auto_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AutoRequest>,
) -> Json<AutoResponse> {
    let subscriber = SubscriberId(id);
    let outcome = if request.enabled {
        AutoOutcome::Enable(state.registry.enable(subscriber))
    } else {
        AutoOutcome::Disable(state.registry.disable(subscriber))
    };
    Json(AutoResponse { outcome })
}

/// The handler for `GET /ws`.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> impl IntoResponse {
    let filter = params.subscriber.map(SubscriberId);
    ws.on_upgrade(move |socket| handle_socket(socket, state, filter))
}

/// Messages addressed to another subscriber are hidden from a filtered client.
fn is_visible(msg: &WsMessage, filter: Option<SubscriberId>) -> bool {
    match (filter, msg.subscriber()) {
        (Some(wanted), Some(addressee)) => wanted == addressee,
        _ => true,
    }
}

async fn send_json(socket: &mut WebSocket, msg: &WsMessage) -> bool {
    let json_msg = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize WebSocket message.");
            return true;
        }
    };
    socket.send(Message::Text(json_msg.into())).await.is_ok()
}

async fn handle_socket(mut socket: WebSocket, state: AppState, filter: Option<SubscriberId>) {
    tracing::info!(subscriber = ?filter, "New WebSocket client connected.");

    // Subscribe before the replay so nothing falls between the two.
    let mut rx = state.ws_tx.subscribe();

    let replay_msgs: Vec<WsMessage> = state.ws_cache.lock().iter().cloned().collect();
    for msg in replay_msgs.iter().filter(|m| is_visible(m, filter)) {
        if !send_json(&mut socket, msg).await {
            tracing::info!("WebSocket client disconnected during replay.");
            return;
        }
    }

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(msg) => {
                    if is_visible(&msg, filter) && !send_json(&mut socket, &msg).await {
                        tracing::info!("WebSocket client disconnected.");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "WebSocket client lagged behind.");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("WebSocket client sent close frame.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "WebSocket receive error.");
                    break;
                }
            },
        }
    }
    tracing::info!("WebSocket client connection closed.");
}

/// The main entry point for running the web server.
///
/// Runs until the listener fails or the surrounding task is dropped.
pub async fn run(settings: &ServerSettings, app_state: AppState) -> Result<()> {
    let app = create_router(app_state);

    let address = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&address).await.map_err(Error::ServerBindError)?;
    tracing::info!("Web server listening on {}", address);

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(Error::ServeError)?;

    Ok(())
}

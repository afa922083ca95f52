// In app/src/main.rs

use anyhow::Result;
use app_config::{NotifierKind, Settings};
use clap::{Parser, Subcommand};
use core_types::SubscriberId;
use engine::{BroadcastNotifier, LogNotifier, Notifier, SessionRegistry, SignalContext};
use events::WsMessage;
use quote_feed::LiveConnector;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;
use web_server::{AppState, WsCache};

use self::tracing_layer::WsBroadcastLayer;
mod tracing_layer;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "Streams FX quotes and pushes EMA/RSI signals to subscribers.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the quote pipeline and the control server until Ctrl-C.
    Run {
        /// Subscribers to enable auto-analysis for at startup.
        #[arg(long = "auto", value_name = "SUBSCRIBER")]
        auto: Vec<SubscriberId>,
    },

    /// Prints the configured instrument universe.
    Instruments,
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = app_config::load_settings()?;

    // --- WebSocket and Tracing Setup ---
    let (ws_tx, _) = broadcast::channel::<WsMessage>(1024);
    let ws_cache = web_server::new_ws_cache();
    init_tracing(&settings.app.log_level, ws_tx.clone(), ws_cache.clone())?;

    tracing::info!(environment = %settings.app.environment, "Starting fx-signal");

    match cli.command {
        Commands::Run { auto } => {
            run_app(settings, auto, ws_tx, ws_cache).await?;
        }
        Commands::Instruments => {
            print_instruments(&settings)?;
        }
    }

    tracing::info!("fx-signal has finished successfully.");

    Ok(())
}

fn init_tracing(log_level: &str, ws_tx: broadcast::Sender<WsMessage>, ws_cache: WsCache) -> Result<()> {
    let level: tracing::Level = log_level
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid app.log_level {:?}", log_level))?;

    let filter = Targets::new()
        .with_target("tungstenite", tracing::Level::WARN)
        .with_target("tokio_tungstenite", tracing::Level::WARN)
        .with_target("hyper", tracing::Level::WARN)
        .with_default(level);

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter.clone());
    let ws_layer = WsBroadcastLayer::new(ws_tx, ws_cache).with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).with(ws_layer).init();
    Ok(())
}

// --- "Run" Subcommand Logic ---

/// Starts the session registry and the web server, then waits for Ctrl-C
/// or for the server to stop.
async fn run_app(
    settings: Settings,
    auto: Vec<SubscriberId>,
    ws_tx: broadcast::Sender<WsMessage>,
    ws_cache: WsCache,
) -> Result<()> {
    // --- 1. Component Instantiation ---
    let context = SignalContext::from_settings(&settings)?;

    if settings.feed.api_key.is_empty() {
        tracing::warn!("feed.api_key is empty. Set APP_FEED__API_KEY or the provider will refuse the connection.");
    }
    let source = Arc::new(LiveConnector::new(&settings.feed));
    let notifier: Arc<dyn Notifier> = match settings.signals.notifier {
        NotifierKind::Broadcast => Arc::new(BroadcastNotifier::new(ws_tx.clone())),
        NotifierKind::Log => Arc::new(LogNotifier),
    };
    let registry = SessionRegistry::new(context, source, notifier, ws_tx.clone());

    for subscriber in auto {
        let outcome = registry.enable(subscriber);
        tracing::info!(%subscriber, ?outcome, "Auto-analysis requested on the command line.");
    }

    // --- 2. Launch the Web Server ---
    let app_state = AppState {
        registry: registry.clone(),
        ws_tx,
        ws_cache,
    };
    let server_settings = settings.server.clone();
    let mut server_handle = tokio::spawn(async move { web_server::run(&server_settings, app_state).await });

    // --- 3. Wait for Ctrl-C or a dead server ---
    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
            }
            tracing::info!("Shutdown requested.");
            Ok(())
        }
        server_result = &mut server_handle => {
            tracing::error!(?server_result, "Web server task has terminated unexpectedly.");
            Err(anyhow::anyhow!("A critical task terminated. Shutting down."))
        }
    };

    registry.shutdown().await;
    server_handle.abort();
    outcome
}

// --- "Instruments" Subcommand Logic ---

fn print_instruments(settings: &Settings) -> Result<()> {
    for symbol in settings.signals.instrument_symbols()? {
        println!("{}", symbol);
    }
    Ok(())
}

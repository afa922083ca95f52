// In crates/engine/src/lib.rs

pub mod context;
pub mod cooldown;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod notifier;
pub mod registry;
pub mod shutdown;
pub mod window;
pub mod worker;

pub use context::SignalContext;
pub use cooldown::CooldownGate;
pub use error::{Error, Result};
pub use notifier::{BroadcastNotifier, LogNotifier, Notifier};
pub use registry::{DisableOutcome, EnableOutcome, OnDemandReply, SessionRegistry};
pub use window::PriceWindowStore;
pub use worker::IngestionWorker;

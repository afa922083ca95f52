// In crates/app-config/src/lib.rs

use config::{Config, Environment, File};

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{
    AppSettings, FeedSettings, MAX_COOLDOWN_SECS, NotifierKind, ServerSettings, Settings, SignalSettings,
};

/// Loads the application settings from various sources.
///
/// This function orchestrates the layered configuration loading:
/// 1. Reads from a default `base.toml` file.
/// 2. Merges settings from an environment-specific file (e.g., `development.toml`).
/// 3. Merges settings from environment variables.
///
/// The merged result is validated before it is returned.
pub fn load_settings() -> Result<Settings> {
    // Get the current environment. Default to "development" if not set.
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());
    load_settings_from("config", &environment)
}

/// Same as [`load_settings`], reading `base.toml` and `{environment}.toml` from `config_dir`.
pub fn load_settings_from(config_dir: &str, environment: &str) -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::with_name(&format!("{}/base", config_dir)))
        .add_source(File::with_name(&format!("{}/{}", config_dir, environment)).required(false))
        .add_source(self::environment())
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}

/// Environment overrides, e.g. `APP_FEED__API_KEY=...` or
/// `APP_SIGNALS__INSTRUMENTS=EUR/USD,GBP/USD`.
fn environment() -> Environment {
    Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("signals.instruments")
        .try_parsing(true)
}

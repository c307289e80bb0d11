//! Application configuration loaded from environment variables and config files.
//!
//! Precedence: env vars > .env file > config.toml > defaults.

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Default REST base for the platform API.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call slashgate_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at startup, before anything else reads config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let app_config = load(
        config::Environment::with_prefix("SLASHGATE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )?;
    Ok(CONFIG.get_or_init(|| app_config))
}

/// Build an [`AppConfig`] from defaults, an optional `config.toml` and the given
/// environment source.
pub fn load(env: config::Environment) -> Result<AppConfig, config::ConfigError> {
    let cfg = config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.interactions_path", "/interactions")?
        .set_default("server.request_timeout_secs", 3)?
        .set_default("server.max_body_bytes", 1_048_576)? // 1 MiB
        .set_default("application.id", "")?
        .set_default("application.public_key", "")?
        .set_default("application.token", "")?
        .set_default("application.api_base", DEFAULT_API_BASE)?
        .set_default("commands.sync_on_startup", false)?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // SLASHGATE_SERVER__PORT, SLASHGATE_APPLICATION__PUBLIC_KEY, ...
        .add_source(env)
        .build()?;

    cfg.try_deserialize()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub application: ApplicationConfig,
    pub commands: CommandsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path the platform posts interactions to.
    pub interactions_path: String,
    /// Upper bound on a single webhook round trip. The platform gives up after 3s.
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationConfig {
    /// Application snowflake, as a string.
    pub id: String,
    /// Hex-encoded Ed25519 public key from the developer portal.
    pub public_key: String,
    /// Bot token used for command registration.
    pub token: String,
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandsConfig {
    /// Bulk-overwrite the registered commands before serving.
    pub sync_on_startup: bool,
}

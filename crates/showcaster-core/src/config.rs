use anyhow::Result;
use config::Config;
use serde::Deserialize;

/// Root configuration for the core: connection details for both stores plus the
/// ambient logging level. Transport/server binding belongs to the HTTP layer, which
/// is out of scope here and loads its own settings on top of this one.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub relstore: RelStoreConfig,
    pub calstore: CalStoreConfig,
    #[serde(default)]
    pub bus: BusConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelStoreConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Connection details for the CalDAV-backed CalStore: a single calendar base URL
/// plus HTTP Basic credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct CalStoreConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional `config.toml`.
    /// Environment variables take precedence.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("relstore.max_connections", 4)?
            .set_default("bus.capacity", 256)?
            .set_default("logging.level", "debug")?
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads a `.env` file (if present) then delegates to [`Settings::load`].
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}

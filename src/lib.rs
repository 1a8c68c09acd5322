use config::{Config, ConfigError};
use serde::Deserialize;

pub mod domain;
pub mod gateway;
pub mod infrastructure;

#[derive(Clone, Debug, Deserialize)]
pub struct CustdbConfig {
    pub server: Server,
    pub storage: Storage,
    pub meilisearch: MeiliSearch,
    pub logger: Logger,
}

impl CustdbConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(config::File::with_name("custdb.toml").required(false))
            .add_source(config::Environment::with_prefix("CUSTDB").separator("__"))
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?
            .try_deserialize::<CustdbConfig>()
    }

    /// Defaults only, without reading the file system or the environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize::<CustdbConfig>()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("server.static_dir", "public")?
            .set_default("storage.backend", "meilisearch")?
            .set_default("meilisearch.url", "http://127.0.0.1:7700")?
            .set_default("meilisearch.index", "customers")?
            .set_default("logger.level", "INFO")
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
    /// Gates the mutating routes when set.
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
    pub backend: Backend,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Meilisearch,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeiliSearch {
    pub url: String,
    pub api_key: Option<String>,
    pub index: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Logger {
    pub level: Level,
}

#[derive(Clone, Debug, Deserialize)]
pub enum Level {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<&Level> for tracing::Level {
    fn from(value: &Level) -> Self {
        match value {
            Level::TRACE => tracing::Level::TRACE,
            Level::DEBUG => tracing::Level::DEBUG,
            Level::INFO => tracing::Level::INFO,
            Level::WARN => tracing::Level::WARN,
            Level::ERROR => tracing::Level::ERROR,
        }
    }
}

//! Settings for the `budgetwise` binary.
//!
//! Read from `settings.toml` (or the file given with `--config`), then from
//! `BUDGETWISE__*` environment variables, then from command-line overrides.
//! Nested keys use `__`, e.g. `BUDGETWISE__OPENAI__API_KEY`.

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OpenAi {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAi {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: ingest::llm::DEFAULT_BASE_URL.to_string(),
            model: ingest::llm::DEFAULT_MODEL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bucket() -> String {
    ingest::storage::DEFAULT_BUCKET.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    #[serde(default)]
    pub openai: OpenAi,
    pub storage: Storage,
}

#[derive(Debug, Parser)]
#[command(name = "budgetwise", version)]
struct Args {
    /// Settings file path, without or with the `.toml` extension.
    #[arg(long)]
    config: Option<String>,
    /// Override the log level (e.g. debug).
    #[arg(long)]
    level: Option<String>,
    /// Override the listening port.
    #[arg(long)]
    port: Option<u16>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let args = Args::parse();

        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("BUDGETWISE").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(level) = args.level {
            settings.app.level = level;
        }
        if let Some(port) = args.port {
            settings.server.port = port;
        }

        Ok(settings)
    }
}

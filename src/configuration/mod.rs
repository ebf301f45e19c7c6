use crate::database::{DatabaseService, MemoryStore, UserStore};
use serde::Deserialize;
use std::env;
use std::fs;
use std::sync::Arc;
use teloxide::Bot;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File read error")]
    FileError,

    #[error("Deserialization error:{0}")]
    DeserializationError(String),

    #[error("Missing environment variable:{0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for {0}:{1}")]
    InvalidValue(&'static str, String),

    #[error("Database setup error:{0}")]
    DatabaseError(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub paypal: PaypalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    // Base URL PayPal redirects back to and pay links point at
    pub public_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub admin_ids: Vec<i64>,
    pub channel_url: String,
    pub contact_url: String,
    pub bot_username: String,
    #[serde(default = "default_broadcast_concurrency")]
    pub broadcast_concurrency: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaypalEnvironment {
    Sandbox,
    #[default]
    Live,
}

impl PaypalEnvironment {
    pub fn api_base(&self) -> &'static str {
        match self {
            PaypalEnvironment::Live => "https://api.paypal.com",
            PaypalEnvironment::Sandbox => "https://api.sandbox.paypal.com",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaypalConfig {
    #[serde(default)]
    pub environment: PaypalEnvironment,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_brand_name")]
    pub brand_name: String,
}

impl Default for PaypalConfig {
    fn default() -> Self {
        Self {
            environment: PaypalEnvironment::default(),
            currency: default_currency(),
            brand_name: default_brand_name(),
        }
    }
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_broadcast_concurrency() -> usize {
    8
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_brand_name() -> String {
    "ChiaraBadGirl".to_string()
}

/// Secrets never live in config.json, they are read from the environment
#[derive(Clone)]
pub struct Secrets {
    pub bot_token: String,
    pub webhook_secret: String,
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    pub paypal_webhook_id: String,
    pub paypal_debug_webhook: bool,
    pub supabase: Option<SupabaseSecrets>,
}

#[derive(Clone)]
pub struct SupabaseSecrets {
    pub url: String,
    pub key: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("paypal_client_id", &self.paypal_client_id)
            .field("paypal_webhook_id", &self.paypal_webhook_id)
            .field("paypal_debug_webhook", &self.paypal_debug_webhook)
            .field("supabase", &self.supabase.as_ref().map(|s| &s.url))
            .finish_non_exhaustive()
    }
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        let supabase = match (env::var("SUPABASE_URL"), env::var("SUPABASE_KEY")) {
            (Ok(url), Ok(key)) if !url.is_empty() && !key.is_empty() => {
                Some(SupabaseSecrets { url, key })
            }
            (Ok(url), _) if !url.is_empty() => return Err(ConfigError::MissingEnv("SUPABASE_KEY")),
            _ => None,
        };

        Ok(Self {
            bot_token: required_env("BOT_TOKEN")?,
            webhook_secret: required_env("WEBHOOK_SECRET")?,
            paypal_client_id: env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
            paypal_client_secret: env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default(),
            paypal_webhook_id: env::var("PAYPAL_WEBHOOK_ID").unwrap_or_default(),
            paypal_debug_webhook: env::var("PAYPAL_DEBUG_WEBHOOK")
                .map(|v| flag_enabled(&v))
                .unwrap_or(false),
            supabase,
        })
    }
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}

fn flag_enabled(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}

/// Which user store the process runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase { url: String },
    Memory,
}

impl StoreBackend {
    /// Context is built before the subscriber exists, so main calls this
    /// once logging is up.
    pub fn log_selection(&self) {
        match self {
            StoreBackend::Supabase { url } => info!(%url, "Using Supabase user store"),
            StoreBackend::Memory => warn!(
                "SUPABASE_URL not set - using in-memory user store, data is lost on restart"
            ),
        }
    }
}

fn open_store(secrets: &Secrets) -> Result<(Arc<dyn UserStore>, StoreBackend), ConfigError> {
    match &secrets.supabase {
        Some(supabase) => {
            let store: Arc<dyn UserStore> = Arc::new(
                DatabaseService::new(&supabase.url, &supabase.key)
                    .map_err(|e| ConfigError::DatabaseError(e.to_string()))?,
            );
            Ok((
                store,
                StoreBackend::Supabase {
                    url: supabase.url.clone(),
                },
            ))
        }
        None => {
            let store: Arc<dyn UserStore> = Arc::new(MemoryStore::new());
            Ok((store, StoreBackend::Memory))
        }
    }
}

#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub secrets: Secrets,
    pub database: Arc<dyn UserStore>,
    pub store_backend: StoreBackend,
    pub bot: Bot,
}

impl Context {
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        let config = Config::new(config_file)?;
        let secrets = Secrets::from_env()?;
        let (database, store_backend) = open_store(&secrets)?;
        let bot = Bot::new(&secrets.bot_token);

        Ok(Self {
            config,
            secrets,
            database,
            store_backend,
            bot,
        })
    }
}

impl Config {
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(config_file).map_err(|_| ConfigError::FileError)?;
        let mut config = Self::from_json(&config_str)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_json(config_str: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(config_str)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT", port))?;
        }
        if let Ok(domain) = env::var("DOMAIN") {
            if !domain.is_empty() {
                self.server.public_url = domain;
            }
        }
        // Anything other than "sandbox" means live, same as the deployed bots
        if let Ok(environment) = env::var("PAYPAL_ENVIRONMENT") {
            self.paypal.environment = if environment.trim() == "sandbox" {
                PaypalEnvironment::Sandbox
            } else {
                PaypalEnvironment::Live
            };
        }
        self.server.public_url = self.server.public_url.trim_end_matches('/').to_string();
        Ok(())
    }

    pub fn is_admin(&self, telegram_id: i64) -> bool {
        self.telegram.admin_ids.contains(&telegram_id)
    }
}

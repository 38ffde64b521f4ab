use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Complete service configuration, loaded once at startup and handed to
/// each component through its constructor.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default = "default_run_mode")]
    pub run_mode: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub in_app: InAppConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Storage backend: "memory" or "postgres"
    #[serde(default = "default_database_backend")]
    pub backend: String,
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Insert the stock templates and channels into an empty store
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_email_host")]
    pub host: String,
    #[serde(default = "default_email_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address; falls back to `username` when empty
    #[serde(default)]
    pub from: String,
    /// Upgrade the SMTP session with STARTTLS
    #[serde(default = "default_true")]
    pub starttls: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_chat_channel")]
    pub default_channel: String,
    #[serde(default = "default_chat_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InAppConfig {
    /// Maximum stored notifications per recipient inbox
    #[serde(default = "default_max_inbox_size")]
    pub max_inbox_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tick interval in seconds
    #[serde(default = "default_scheduler_interval")]
    pub interval_seconds: u64,
    /// Age after which a claim with no recorded outcome is requeued
    #[serde(default = "default_claim_timeout")]
    pub claim_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total send attempts per dispatch; 1 disables retrying
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_run_mode() -> String {
    "development".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_backend() -> String {
    "memory".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/notifications".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    300 // 5 minutes
}

fn default_true() -> bool {
    true
}

fn default_email_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_email_port() -> u16 {
    587
}

fn default_chat_channel() -> String {
    "#general".to_string()
}

fn default_chat_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_max_inbox_size() -> usize {
    500
}

fn default_scheduler_interval() -> u64 {
    60 // 1 minute
}

fn default_claim_timeout() -> u64 {
    600 // 10 minutes
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter_factor() -> f64 {
    0.1
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("run_mode", run_mode.as_str())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.backend", "memory")?
            .set_default("scheduler.interval_seconds", 60)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, DATABASE__URL, EMAIL__PASSWORD, CHAT__TOKEN, ...
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.run_mode == "production" || self.run_mode == "prod"
    }
}

impl EmailConfig {
    /// Address used in the From header
    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            &self.username
        } else {
            &self.from
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_database_backend(),
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
            seed_defaults: true,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: default_email_host(),
            port: default_email_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            starttls: true,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            default_channel: default_chat_channel(),
            api_base: default_chat_api_base(),
        }
    }
}

impl Default for InAppConfig {
    fn default() -> Self {
        Self {
            max_inbox_size: default_max_inbox_size(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: default_scheduler_interval(),
            claim_timeout_seconds: default_claim_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

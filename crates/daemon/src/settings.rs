//! Daemon configuration
//!
//! Layers, lowest precedence first:
//! 1. built-in defaults
//! 2. `todocore.toml` (or the file named by `TODOCORE_CONFIG`), optional
//! 3. environment, `TODOCORE__SECTION__KEY` (e.g. `TODOCORE__REDIS__URL`)

use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use todocore_core::application::AlertPolicy;
use todocore_core::AppError;

const DEFAULT_CONFIG_FILE: &str = "todocore.toml";
const ENV_PREFIX: &str = "TODOCORE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub broker: BrokerConfig,
    pub queue: QueueConfig,
    pub mail: MailConfig,
    pub telegram: TelegramConfig,
    pub tasks_api: TasksApiConfig,
    pub scheduler: SchedulerConfig,
    pub health: HealthConfig,
    pub log: LogConfig,
}

/// Job store connection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            timeout_ms: 3_000,
        }
    }
}

/// Event broker (Redis Streams)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub url: String,
    pub flush_timeout_ms: u64,
    pub partition_key: String,
    /// Approximate per-topic stream cap; unbounded when absent
    pub max_len: Option<usize>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/1".to_string(),
            flush_timeout_ms: 5_000,
            partition_key: "MESSAGE_KEY".to_string(),
            max_len: None,
        }
    }
}

/// Embedded work queue
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// SQLite file; defaults to the platform data directory
    pub database_path: Option<String>,
    pub poll_interval_ms: u64,
    pub recovery_window_ms: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            poll_interval_ms: 500,
            recovery_window_ms: 5 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub starttls: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "noreply@todocore.local".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            username: None,
            password: None,
            starttls: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: todocore_infra_notify::DEFAULT_TELEGRAM_API.to_string(),
            token: None,
            chat_id: None,
        }
    }
}

/// CRUD service the reminder job reads tasks from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TasksApiConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl Default for TasksApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api/v1".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub lead_time_secs: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lead_time_secs: 3_600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub interval_secs: u64,
    pub probe_timeout_ms: u64,
    pub alert_policy: AlertPolicy,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15 * 60,
            probe_timeout_ms: 3_000,
            alert_policy: AlertPolicy::EveryCycle,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory of the rolling log file; defaults to the platform data directory
    pub dir: Option<String>,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the default file location and the process environment
    pub fn load() -> Result<Self, AppError> {
        let path = std::env::var(format!("{}_CONFIG", ENV_PREFIX))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let path = shellexpand::tilde(&path).into_owned();

        let builder = Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::build(builder)
    }

    /// Load from a TOML document only (no file lookup, no environment)
    pub fn from_toml(document: &str) -> Result<Self, AppError> {
        Self::build(Config::builder().add_source(File::from_str(document, FileFormat::Toml)))
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let config: AppConfig = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.scheduler.lead_time_secs < 0 {
            return Err(AppError::Config(
                "scheduler.lead_time_secs must not be negative".to_string(),
            ));
        }
        if self.health.interval_secs == 0 {
            return Err(AppError::Config(
                "health.interval_secs must be positive".to_string(),
            ));
        }
        if self.telegram.token.is_some() != self.telegram.chat_id.is_some() {
            return Err(AppError::Config(
                "telegram.token and telegram.chat_id must be set together".to_string(),
            ));
        }
        if self.mail.username.is_some() != self.mail.password.is_some() {
            return Err(AppError::Config(
                "mail.username and mail.password must be set together".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lead_time(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(self.scheduler.lead_time_secs)
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis.timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.broker.flush_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.queue.poll_interval_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.health.probe_timeout_ms)
    }

    pub fn database_path(&self) -> PathBuf {
        match &self.queue.database_path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
            None => data_dir().join("queue.db"),
        }
    }

    /// SQLite URL of the work queue
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.database_path().display())
    }

    pub fn log_dir(&self) -> PathBuf {
        match &self.log.dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => data_dir().join("logs"),
        }
    }
}

fn data_dir() -> PathBuf {
    ProjectDirs::from("", "", "todocore")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(shellexpand::tilde("~/.todocore").into_owned()))
}

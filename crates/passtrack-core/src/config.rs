use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::PasstrackError;

/// Top-level passtrack configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub autoupdate: AutoupdateConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Telegram bot credentials and admin routing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Chat that receives operational notices. Empty disables them.
    #[serde(default)]
    pub admin_chat_id: String,
}

/// Upstream status API endpoints and the per-request deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Equivalent base URLs, rotated round-robin for load distribution.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

/// SQLite storage location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Autoupdate run triggers and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoupdateConfig {
    /// 5-field cron expressions, evaluated in `timezone`.
    #[serde(default = "default_schedules")]
    pub schedules: Vec<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Pause between consecutive order checks within one run.
    #[serde(default = "default_order_delay_ms")]
    pub order_delay_ms: u64,
}

impl Default for AutoupdateConfig {
    fn default() -> Self {
        Self {
            schedules: default_schedules(),
            timezone: default_timezone(),
            order_delay_ms: default_order_delay_ms(),
        }
    }
}

/// Status image assets used for the photo cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_images_dir")]
    pub dir: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dir: default_images_dir(),
        }
    }
}

/// Per-user limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_orders_per_user")]
    pub max_orders_per_user: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_orders_per_user: default_max_orders_per_user(),
        }
    }
}

/// Logging sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily-rolling log files. Empty disables file output.
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["https://info.midpass.ru/api/request".to_string()]
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_db_path() -> String {
    "data/passtrack.db".to_string()
}

fn default_schedules() -> Vec<String> {
    vec![
        // Weekday runs and a lighter weekend pair, staggered off the hour.
        "23 9,12,15,18,21 * * 1-5".to_string(),
        "17 16,20 * * 0,6".to_string(),
    ]
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

fn default_order_delay_ms() -> u64 {
    1000
}

fn default_images_dir() -> String {
    "public/images".to_string()
}

fn default_max_orders_per_user() -> usize {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

/// Load configuration from a TOML file.
///
/// A missing file yields the defaults with a warning, so `passtrack status`
/// works out of the box; `start` still refuses to run without a bot token.
pub fn load(path: &str) -> Result<Config, PasstrackError> {
    let path = Path::new(path);

    if !path.exists() {
        warn!("config file {} not found, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| PasstrackError::Config(format!("failed to read {}: {e}", path.display())))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| PasstrackError::Config(format!("failed to parse config: {e}")))?;

    Ok(config)
}

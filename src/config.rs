//! Configuration types for qbo-sync

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Largest accepted `sync.retry.backoff_multiplier`
pub const MAX_BACKOFF_MULTIPLIER: f64 = 100.0;

/// Main configuration for [`SyncManager`](crate::SyncManager)
///
/// Settings are grouped into sub-configs:
/// - [`gateway`](GatewayConfig) - where the accounting service lives
/// - [`persistence`](PersistenceConfig) - local durable state
/// - [`sync`](SyncConfig) - retry policy and event fan-out
/// - [`export`](ExportConfig) - where exported artifacts are written
/// - [`server`](ServerIntegrationConfig) - optional REST surface
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Remote accounting service settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Data storage and state management
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Sync orchestration settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Export artifact settings
    #[serde(default)]
    pub export: ExportConfig,

    /// API and external server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Check settings that would otherwise only fail at first use
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: String| Error::Config {
            message,
            key: Some(key.to_string()),
        };

        let base = self.gateway.base_url.trim();
        if base.is_empty() {
            return Err(invalid("gateway.base_url", "base_url must not be empty".into()));
        }
        if let Err(e) = url::Url::parse(base) {
            return Err(invalid("gateway.base_url", format!("invalid base_url '{base}': {e}")));
        }
        if self.sync.event_buffer == 0 {
            return Err(invalid("sync.event_buffer", "event_buffer must be at least 1".into()));
        }
        let multiplier = self.sync.retry.backoff_multiplier;
        if !multiplier.is_finite() || !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&multiplier) {
            return Err(invalid(
                "sync.retry.backoff_multiplier",
                format!("backoff_multiplier must be between 1 and {MAX_BACKOFF_MULTIPLIER}, got {multiplier}"),
            ));
        }
        if self.sync.retry.max_attempts == 0 {
            return Err(invalid(
                "sync.retry.max_attempts",
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Remote accounting service configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GatewayConfig {
    /// Service origin, e.g. "https://books.example.com" (default: "http://localhost:5000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix in front of every endpoint (default: "/api")
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Per-request timeout (default: 120 seconds)
    ///
    /// Sync and export calls can take a long time on large companies.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./qbo-sync.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Sync orchestration configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncConfig {
    /// Retry policy applied to each module's sync trigger
    #[serde(default)]
    pub retry: RetryConfig,

    /// Capacity of the event broadcast channel (default: 256)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Export artifact configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExportConfig {
    /// Directory exported artifacts are saved to (default: "./exports")
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// What to do when an artifact with the same name already exists
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Skip the file, keep existing
    Skip,
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_user_agent() -> String {
    concat!("qbo-sync/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./qbo-sync.db")
}

fn default_event_buffer() -> usize {
    256
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("./exports")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Durations travel as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, out: S) -> Result<S::Ok, S::Error> {
        out.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(input: D) -> Result<Duration, D::Error> {
        u64::deserialize(input).map(Duration::from_secs)
    }
}

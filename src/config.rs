use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::environment::Environment;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub upstream: UpstreamConfig,

    pub environment: EnvironmentConfig,

    pub transactions: TransactionConfig,

    pub security: SecurityConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Buffer size of the transaction event bus (default: 100)
    pub event_bus_buffer_size: usize,

    /// Seed a verified demo account into the mock store on startup.
    pub seed_demo_user: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
            event_bus_buffer_size: 100,
            seed_demo_user: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Session inactivity expiry in minutes.
    pub session_ttl_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            secure_cookies: true,
            session_ttl_minutes: 60 * 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub sandbox_url: String,

    pub live_url: String,

    /// Environment used when no preference has been persisted yet.
    pub default_environment: Environment,

    pub request_timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            sandbox_url: "https://sandbox.elementpay.net/api/v1".to_string(),
            live_url: "https://api.elementpay.net/api/v1".to_string(),
            default_environment: Environment::Sandbox,
            request_timeout_seconds: 30,
            user_agent: format!("paydash/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl UpstreamConfig {
    #[must_use]
    pub fn base_url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Sandbox => &self.sandbox_url,
            Environment::Live => &self.live_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// File holding the persisted sandbox/live preference.
    pub preference_path: String,

    /// Honour the `X-Element-Environment` request header.
    pub allow_request_override: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            preference_path: "data/environment.json".to_string(),
            allow_request_override: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub poll_interval_seconds: u64,

    /// Polls before a pending transaction is given up on.
    pub max_polls: u32,

    pub max_pending_per_user: usize,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 5,
            max_polls: 120,
            max_pending_per_user: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    pub min_password_length: usize,

    /// Lifetime of an email verification code.
    pub verification_code_ttl_minutes: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
            verification_code_ttl_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            environment: EnvironmentConfig::default(),
            transactions: TransactionConfig::default(),
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("paydash").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".paydash").join("config.toml"));
        }

        paths
    }

    /// Where `init` writes when no `--config` path is given.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        for (name, raw) in [
            ("sandbox_url", &self.upstream.sandbox_url),
            ("live_url", &self.upstream.live_url),
        ] {
            if raw.trim().is_empty() {
                anyhow::bail!("upstream.{name} cannot be empty");
            }
            let parsed = url::Url::parse(raw)
                .with_context(|| format!("upstream.{name} is not a valid URL: {raw}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("upstream.{name} must use http or https, got {}", parsed.scheme());
            }
        }

        if self.server.port == 0 {
            anyhow::bail!("server.port must be > 0");
        }

        if self.transactions.poll_interval_seconds == 0 {
            anyhow::bail!("transactions.poll_interval_seconds must be > 0");
        }

        if self.security.min_password_length == 0 {
            anyhow::bail!("security.min_password_length must be > 0");
        }

        Ok(())
    }
}

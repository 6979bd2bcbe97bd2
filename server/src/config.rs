use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub orchestration: OrchestrationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// Optional database URL. If not provided, defaults to ~/orchestrator.sqlite
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

/// Tunables from spec §5 (timeouts, retry/backoff, breaker thresholds,
/// summary/idle thresholds) — the knobs every backend-calling stage and the
/// Conversation Orchestrator's expiry sweeper read from at startup.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrchestrationConfig {
    pub sg_scan_timeout_secs: u64,
    pub ap_pipeline_timeout_secs: u64,
    pub backend_call_timeout_secs: u64,
    pub backend_retry_attempts: u32,
    pub backend_retry_base_secs: u64,
    pub backend_retry_cap_secs: u64,
    pub backend_retry_jitter_pct: u8,
    pub breaker_failure_threshold: u32,
    pub breaker_recovery_timeout_secs: u64,
    pub breaker_half_open_trial_limit: u32,
    pub summary_threshold_messages: usize,
    pub session_idle_timeout_hours: i64,
    pub progress_cache_ttl_secs: u64,
}

impl Config {
    /// Load configuration from the bundled defaults, an optional file
    /// override, and `ORCH_`-prefixed environment variables.
    pub fn from_env() -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        builder = builder.add_source(File::from_str(
            include_str!("../config/default.toml"),
            FileFormat::Toml,
        ));

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(
                File::with_name(&config_file)
                    .required(false)
                    .format(FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("ORCH")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build().context("failed to build configuration")?;
        let mut result: Config = config
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        Self::apply_standard_env_vars(&mut result);
        Ok(result)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let builder = ConfigBuilder::builder()
            .add_source(File::from_str(
                include_str!("../config/default.toml"),
                FileFormat::Toml,
            ))
            .add_source(File::with_name(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix("ORCH")
                    .separator("_")
                    .try_parsing(true),
            );

        let config = builder
            .build()
            .context("failed to build configuration from file")?;
        config
            .try_deserialize()
            .context("failed to deserialize configuration from file")
    }

    fn apply_standard_env_vars(config: &mut Config) {
        if let Ok(database_url) = env::var("DATABASE_URL") {
            config.database.url = Some(database_url);
        }
        if let Ok(listen_addr) = env::var("LISTEN_ADDR") {
            config.server.listen_addr = listen_addr;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.logging.level = log_level;
        }
    }

    pub fn database_url(&self) -> String {
        match &self.database.url {
            Some(url) => url.clone(),
            None => Self::default_database_url(),
        }
    }

    pub fn default_database_url() -> String {
        if let Ok(xdg_data) = env::var("XDG_DATA_HOME") {
            return format!("sqlite://{xdg_data}/orchestrator/orchestrator.sqlite");
        }
        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        format!("sqlite://{home}/orchestrator.sqlite")
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.listen_addr, self.server.port)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "invalid log level: {}. must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ));
            }
        }

        let database_url = self.database_url();
        if !database_url.starts_with("sqlite://") {
            return Err(anyhow::anyhow!(
                "only sqlite databases are supported. url must start with 'sqlite://'. got: {}",
                database_url
            ));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server port cannot be 0"));
        }
        if self.server.workers == 0 {
            return Err(anyhow::anyhow!("server workers must be greater than 0"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!(
                "database max_connections must be greater than 0"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.orchestration.summary_threshold_messages, 20);
    }

    #[test]
    fn database_url_falls_back_to_home() {
        let config = Config::from_env().unwrap();
        let url = config.database_url();
        assert!(url.starts_with("sqlite://"));
    }

    #[test]
    fn config_validation_rejects_bad_log_level() {
        let mut config = Config::from_env().unwrap();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn server_address_combines_host_and_port() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.server_address(), "127.0.0.1:8080");
    }
}

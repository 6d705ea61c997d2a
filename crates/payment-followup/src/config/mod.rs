use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::followup::{FollowupPolicy, PolicyLoadError, RetryPolicy};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the advisor service and CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub drafting: DraftingConfig,
    pub policy_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        let policy_path = env::var("FOLLOWUP_POLICY_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            drafting: DraftingConfig::from_env()?,
            policy_path,
        })
    }

    /// Policy tables from `FOLLOWUP_POLICY_PATH`, or the built-in defaults.
    pub fn followup_policy(&self) -> Result<FollowupPolicy, PolicyLoadError> {
        match &self.policy_path {
            Some(path) => FollowupPolicy::from_path(path),
            None => Ok(FollowupPolicy::default()),
        }
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Connection and retry settings for the message drafting service.
#[derive(Debug, Clone)]
pub struct DraftingConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub retry: RetryPolicy,
}

impl DraftingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let base_url = env::var("DRAFTING_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = env::var("DRAFTING_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let temperature = parse_var("DRAFTING_TEMPERATURE", 0.2_f32)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                key: "DRAFTING_TEMPERATURE",
                value: temperature.to_string(),
            });
        }

        let max_attempts = parse_var("DRAFTING_MAX_ATTEMPTS", 3_u32)?;
        let backoff_min = parse_var("DRAFTING_BACKOFF_MIN_MS", 500_u64)?;
        let backoff_max = parse_var("DRAFTING_BACKOFF_MAX_MS", 8_000_u64)?;
        if max_attempts == 0 || backoff_min > backoff_max {
            return Err(ConfigError::InvalidValue {
                key: "DRAFTING_MAX_ATTEMPTS",
                value: format!(
                    "attempts={max_attempts}, backoff={backoff_min}..{backoff_max}ms"
                ),
            });
        }

        Ok(Self {
            api_key,
            base_url,
            model,
            temperature,
            retry: RetryPolicy {
                max_attempts,
                backoff_min: Duration::from_millis(backoff_min),
                backoff_max: Duration::from_millis(backoff_max),
            },
        })
    }

    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        _ => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("{key} has an invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "FOLLOWUP_POLICY_PATH",
            "OPENAI_API_KEY",
            "DRAFTING_BASE_URL",
            "DRAFTING_MODEL",
            "DRAFTING_TEMPERATURE",
            "DRAFTING_MAX_ATTEMPTS",
            "DRAFTING_BACKOFF_MIN_MS",
            "DRAFTING_BACKOFF_MAX_MS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert!(config.policy_path.is_none());
        assert_eq!(config.drafting.retry, RetryPolicy::default());
        assert_eq!(
            config.followup_policy().expect("default policy"),
            FollowupPolicy::default()
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn drafting_settings_are_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DRAFTING_MAX_ATTEMPTS", "5");
        env::set_var("DRAFTING_BACKOFF_MIN_MS", "100");
        env::set_var("DRAFTING_BACKOFF_MAX_MS", "400");
        let config = AppConfig::load().expect("config loads");
        assert!(!config.drafting.enabled());
        assert_eq!(config.drafting.retry.max_attempts, 5);
        assert_eq!(config.drafting.retry.backoff_max, Duration::from_millis(400));
        reset_env();
    }

    #[test]
    fn rejects_invalid_temperature() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DRAFTING_TEMPERATURE", "hot");
        let error = AppConfig::load().expect_err("invalid temperature");
        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                key: "DRAFTING_TEMPERATURE",
                ..
            }
        ));
        reset_env();
    }
}

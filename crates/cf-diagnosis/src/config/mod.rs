use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::consultation::{DuplicateRuleResolution, PolicyError, ScoringPolicy};
use crate::knowledge::RetryPolicy;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig::from_env()?,
        })
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knowledge base location, scoring policy, and snapshot retry settings.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub knowledge_dir: PathBuf,
    pub policy: ScoringPolicy,
    pub retry: RetryPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            knowledge_dir: PathBuf::from("data"),
            policy: ScoringPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let knowledge_dir = env::var("CF_KNOWLEDGE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.knowledge_dir);

        let acceptance_threshold = match env::var("CF_ACCEPTANCE_THRESHOLD") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "CF_ACCEPTANCE_THRESHOLD",
                    value: raw.clone(),
                })?,
            Err(_) => defaults.policy.acceptance_threshold,
        };

        let duplicate_rules = match env::var("CF_DUPLICATE_RULES") {
            Ok(raw) => raw
                .parse::<DuplicateRuleResolution>()
                .map_err(|_| ConfigError::InvalidDuplicateRules { value: raw.clone() })?,
            Err(_) => defaults.policy.duplicate_rules,
        };

        let include_zero_evidence = match env::var("CF_INCLUDE_ZERO_EVIDENCE") {
            Ok(raw) => parse_bool("CF_INCLUDE_ZERO_EVIDENCE", &raw)?,
            Err(_) => defaults.policy.include_zero_evidence,
        };

        let differential_limit = parse_number(
            "CF_DIFFERENTIAL_LIMIT",
            defaults.policy.differential_limit,
        )?;

        let policy = ScoringPolicy {
            acceptance_threshold,
            duplicate_rules,
            include_zero_evidence,
            differential_limit,
        };
        policy.validate().map_err(ConfigError::InvalidPolicy)?;

        let max_retries = parse_number("CF_SNAPSHOT_MAX_RETRIES", defaults.retry.max_retries)?;
        let backoff_ms = parse_number(
            "CF_SNAPSHOT_BACKOFF_MS",
            defaults.retry.initial_backoff.as_millis() as u64,
        )?;

        Ok(Self {
            knowledge_dir,
            policy,
            retry: RetryPolicy {
                max_retries,
                initial_backoff: Duration::from_millis(backoff_ms),
                max_backoff: defaults.retry.max_backoff,
            },
        })
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: raw.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidBool { key: &'static str, value: String },
    InvalidDuplicateRules { value: String },
    InvalidPolicy(PolicyError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be numeric, got '{value}'")
            }
            ConfigError::InvalidBool { key, value } => {
                write!(f, "{key} must be true or false, got '{value}'")
            }
            ConfigError::InvalidDuplicateRules { value } => {
                write!(f, "CF_DUPLICATE_RULES must be 'max' or 'accumulate', got '{value}'")
            }
            ConfigError::InvalidPolicy(err) => write!(f, "invalid scoring policy: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPolicy(err) => Some(err),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidBool { .. }
            | ConfigError::InvalidDuplicateRules { .. } => None,
        }
    }
}

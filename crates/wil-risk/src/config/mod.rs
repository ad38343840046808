use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::placements::fairness::DEFAULT_DISPARITY_ALERT_POINTS;
use crate::placements::scoring::{
    ScoringConfig, DEFAULT_NO_RESPONSE_WINDOW_DAYS, DEFAULT_SUSTAINABLE_DAILY_HOURS,
};

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
    pub risk: RiskEngineConfig,
    pub governance: GovernanceConfig,
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

        let no_response_window_days = parse_var(
            "RISK_NO_RESPONSE_WINDOW_DAYS",
            DEFAULT_NO_RESPONSE_WINDOW_DAYS,
        )?;
        let sustainable_daily_hours = parse_var(
            "RISK_SUSTAINABLE_DAILY_HOURS",
            DEFAULT_SUSTAINABLE_DAILY_HOURS,
        )?;
        let disparity_alert_points = parse_var(
            "FAIRNESS_DISPARITY_ALERT_POINTS",
            DEFAULT_DISPARITY_ALERT_POINTS,
        )?;

        let store_path = env::var("GOVERNANCE_STORE_PATH")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            risk: RiskEngineConfig {
                scoring: ScoringConfig::new(no_response_window_days, sustainable_daily_hours),
                disparity_alert_points,
            },
            governance: GovernanceConfig { store_path },
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        _ => Ok(default),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Scoring dials and the fairness alert threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskEngineConfig {
    pub scoring: ScoringConfig,
    pub disparity_alert_points: f64,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            disparity_alert_points: DEFAULT_DISPARITY_ALERT_POINTS,
        }
    }
}

/// Where governance records live. `None` keeps them in process memory.
#[derive(Debug, Clone, Default)]
pub struct GovernanceConfig {
    pub store_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    MissingValue { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} must be a valid number"),
            ConfigError::MissingValue { key } => write!(f, "{key} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::MissingValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::assessment::{
    AssessmentSettings, HubSpotFormTarget, ReadinessThresholds, ThresholdError,
    DEFAULT_FORMS_ENDPOINT, DEFAULT_IDLE_TTL, DEFAULT_MAX_ATTEMPTS, DEFAULT_SUBMISSION_TIMEOUT,
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
    pub assessment: AssessmentConfig,
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
            assessment: AssessmentConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Questionnaire tunables and the optional CRM destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentConfig {
    pub submission_timeout: Duration,
    pub thresholds: ReadinessThresholds,
    pub hubspot: Option<HubSpotFormTarget>,
    pub idle_ttl: Duration,
    pub max_attempts: usize,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            submission_timeout: DEFAULT_SUBMISSION_TIMEOUT,
            thresholds: ReadinessThresholds::default(),
            hubspot: None,
            idle_ttl: DEFAULT_IDLE_TTL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl AssessmentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let submission_timeout = match env::var("AIQ_SUBMIT_TIMEOUT_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => return Err(ConfigError::InvalidTimeout { value: raw }),
            },
            Err(_) => DEFAULT_SUBMISSION_TIMEOUT,
        };

        let defaults = ReadinessThresholds::default();
        let medium = threshold_var("AIQ_READINESS_MEDIUM", defaults.medium_from())?;
        let high = threshold_var("AIQ_READINESS_HIGH", defaults.high_from())?;
        let thresholds = ReadinessThresholds::new(medium, high)
            .map_err(|source| ConfigError::InvalidThresholds { source })?;

        let portal_id = non_empty_var("AIQ_HUBSPOT_PORTAL_ID");
        let form_id = non_empty_var("AIQ_HUBSPOT_FORM_ID");
        let hubspot = match (portal_id, form_id) {
            (Some(portal_id), Some(form_id)) => Some(HubSpotFormTarget {
                endpoint: non_empty_var("AIQ_HUBSPOT_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_FORMS_ENDPOINT.to_string()),
                portal_id,
                form_id,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteHubSpot),
        };

        let idle_ttl = match positive_var("AIQ_SESSION_IDLE_SECS")? {
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_IDLE_TTL,
        };
        let max_attempts = match positive_var("AIQ_MAX_ATTEMPTS")? {
            Some(limit) => usize::try_from(limit).unwrap_or(usize::MAX),
            None => DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            submission_timeout,
            thresholds,
            hubspot,
            idle_ttl,
            max_attempts,
        })
    }

    pub fn settings(&self) -> AssessmentSettings {
        AssessmentSettings {
            thresholds: self.thresholds,
            submission_timeout: self.submission_timeout,
            idle_ttl: self.idle_ttl,
            max_attempts: self.max_attempts,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn positive_var(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(Some(value)),
            _ => Err(ConfigError::InvalidSessionLimit { key, value: raw }),
        },
        Err(_) => Ok(None),
    }
}

fn threshold_var(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidThreshold { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout { value: String },
    InvalidThreshold { key: &'static str, value: String },
    InvalidThresholds { source: ThresholdError },
    IncompleteHubSpot,
    InvalidSessionLimit { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout { value } => write!(
                f,
                "AIQ_SUBMIT_TIMEOUT_MS must be a positive number of milliseconds, got '{}'",
                value
            ),
            ConfigError::InvalidThreshold { key, value } => {
                write!(f, "{} must be a whole percentage, got '{}'", key, value)
            }
            ConfigError::InvalidThresholds { source } => {
                write!(f, "readiness thresholds rejected: {}", source)
            }
            ConfigError::IncompleteHubSpot => write!(
                f,
                "AIQ_HUBSPOT_PORTAL_ID and AIQ_HUBSPOT_FORM_ID must be set together"
            ),
            ConfigError::InvalidSessionLimit { key, value } => {
                write!(f, "{} must be a positive whole number, got '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidThresholds { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout { .. }
            | ConfigError::InvalidThreshold { .. }
            | ConfigError::IncompleteHubSpot
            | ConfigError::InvalidSessionLimit { .. } => None,
        }
    }
}

//! Configuration for the MEDONE session gate

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session gate configuration, shared by every page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// How long a session stays valid after login
    #[serde(default = "default_session_timeout", with = "humantime_duration")]
    pub session_timeout: Duration,

    /// Period of the recurring authentication check on gated pages
    #[serde(default = "default_check_interval", with = "humantime_duration")]
    pub check_interval: Duration,

    /// Pause between a successful login and the navigation to the dashboard
    #[serde(default = "default_login_redirect_delay", with = "humantime_duration")]
    pub login_redirect_delay: Duration,

    /// The single accepted username.
    #[serde(default = "default_username")]
    pub username: String,

    /// The single accepted password, compared in plaintext.
    #[serde(default = "default_password")]
    pub password: String,

    /// Display label stored in the session record
    #[serde(default = "default_user_role")]
    pub user_role: String,

    /// Whether logout asks for confirmation. Applies to every page alike.
    #[serde(default)]
    pub logout_policy: LogoutPolicy,

    /// Log level filter string. Overridden by RUST_LOG.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Logout confirmation behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoutPolicy {
    /// Ask "Are you sure you want to logout?" first
    #[default]
    Confirm,
    /// Log out without asking
    Immediate,
}

impl std::str::FromStr for LogoutPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirm" => Ok(LogoutPolicy::Confirm),
            "immediate" => Ok(LogoutPolicy::Immediate),
            other => Err(ConfigError::Invalid(format!(
                "logout_policy must be \"confirm\" or \"immediate\", got {:?}",
                other
            ))),
        }
    }
}

// Default value functions for serde
fn default_session_timeout() -> Duration {
    Duration::from_secs(8 * 60 * 60)
}

fn default_check_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_login_redirect_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "medone2025".to_string()
}

fn default_user_role() -> String {
    "Administrator".to_string()
}

fn default_log_level() -> String {
    "medone_gate=info".to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_timeout: default_session_timeout(),
            check_interval: default_check_interval(),
            login_redirect_delay: default_login_redirect_delay(),
            username: default_username(),
            password: default_password(),
            user_role: default_user_role(),
            logout_policy: LogoutPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl GateConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: GateConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable values are reported rather than silently ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("MEDONE_SESSION_TIMEOUT") {
            config.session_timeout = parse_duration("MEDONE_SESSION_TIMEOUT", &v)?;
        }
        if let Ok(v) = std::env::var("MEDONE_CHECK_INTERVAL") {
            config.check_interval = parse_duration("MEDONE_CHECK_INTERVAL", &v)?;
        }
        if let Ok(v) = std::env::var("MEDONE_LOGIN_REDIRECT_DELAY") {
            config.login_redirect_delay = parse_duration("MEDONE_LOGIN_REDIRECT_DELAY", &v)?;
        }
        if let Ok(v) = std::env::var("MEDONE_USERNAME") {
            config.username = v;
        }
        if let Ok(v) = std::env::var("MEDONE_PASSWORD") {
            config.password = v;
        }
        if let Ok(v) = std::env::var("MEDONE_USER_ROLE") {
            config.user_role = v;
        }
        if let Ok(v) = std::env::var("MEDONE_LOGOUT_POLICY") {
            config.logout_policy = v.parse()?;
        }
        if let Ok(v) = std::env::var("MEDONE_LOG_LEVEL") {
            config.log_level = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file if it exists, otherwise from environment
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("MEDONE_CONFIG") {
            return Self::from_file(&path);
        }

        let default_path = "medone_gate.toml";
        if std::path::Path::new(default_path).exists() {
            return Self::from_file(default_path);
        }

        Self::from_env()
    }

    /// Reject settings the gate cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "session_timeout must be greater than zero".to_string(),
            ));
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "check_interval must be greater than zero".to_string(),
            ));
        }
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ConfigError::Invalid(
                "username and password must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_duration(var: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value)
        .map_err(|e| ConfigError::Parse(format!("{}={:?}: {}", var, value, e)))
}

/// Serde adapter for human-friendly durations ("8h", "60s", "1500ms").
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert_eq!(config.session_timeout, Duration::from_secs(28_800));
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.login_redirect_delay, Duration::from_millis(1500));
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "medone2025");
        assert_eq!(config.logout_policy, LogoutPolicy::Confirm);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_parse_durations() {
        let toml = r#"
            session_timeout = "30m"
            check_interval = "15s"
            login_redirect_delay = "200ms"
            logout_policy = "immediate"
        "#;

        let config: GateConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.session_timeout, Duration::from_secs(1800));
        assert_eq!(config.check_interval, Duration::from_secs(15));
        assert_eq!(config.login_redirect_delay, Duration::from_millis(200));
        assert_eq!(config.logout_policy, LogoutPolicy::Immediate);
        assert_eq!(config.user_role, "Administrator");
    }

    #[test]
    fn test_config_rejects_bad_duration() {
        let err = toml::from_str::<GateConfig>(r#"session_timeout = "forever""#);
        assert!(err.is_err());
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let config = GateConfig {
            check_interval: Duration::ZERO,
            ..GateConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = GateConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("session_timeout = \"8h\""));
        let back: GateConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.session_timeout, config.session_timeout);
    }

    #[test]
    fn test_logout_policy_from_str() {
        assert_eq!("Confirm".parse::<LogoutPolicy>().unwrap(), LogoutPolicy::Confirm);
        assert!("sometimes".parse::<LogoutPolicy>().is_err());
    }
}

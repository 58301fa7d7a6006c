//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Read every tunable from process environment variables.
//! - Derive the chat client settings, including the API key lookup chain.
//!
//! # Invariants
//! - The chat API key is the first non-blank of `API_KEY`, `VITE_API_KEY`,
//!   `REACT_APP_API_KEY`.
//! - Validation happens once in `AppConfig::load`; accessors never fail.

use crate::chat::{ChatConfig, HAVEN_PERSONA};
use envconfig::Envconfig;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, Envconfig)]
pub struct AppConfig {
    #[envconfig(from = "SAFEHAVEN_API_BASE_URL", default = "http://localhost:5000/api")]
    pub api_base_url: String,

    #[envconfig(from = "SAFEHAVEN_HTTP_TIMEOUT_SECS", default = "10")]
    pub http_timeout_secs: u64,

    #[envconfig(from = "SAFEHAVEN_DB_PATH", default = "safehaven.db")]
    pub db_path: String,

    #[envconfig(from = "SAFEHAVEN_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[envconfig(from = "SAFEHAVEN_LOG_DIR")]
    pub log_dir: Option<String>,

    #[envconfig(from = "SAFEHAVEN_CHAT_MODEL", default = "gemini-2.5-flash")]
    pub chat_model: String,

    #[envconfig(
        from = "SAFEHAVEN_CHAT_ENDPOINT",
        default = "https://generativelanguage.googleapis.com/v1beta"
    )]
    pub chat_endpoint: String,

    #[envconfig(from = "SAFEHAVEN_CHAT_TEMPERATURE", default = "0.7")]
    pub chat_temperature: f32,

    #[envconfig(from = "API_KEY")]
    pub api_key: Option<String>,

    #[envconfig(from = "VITE_API_KEY")]
    pub vite_api_key: Option<String>,

    #[envconfig(from = "REACT_APP_API_KEY")]
    pub react_app_api_key: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Env(envconfig::Error),
    InvalidTimeout,
    InvalidTemperature(f32),
    BlankValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env(err) => write!(f, "{err}"),
            Self::InvalidTimeout => {
                write!(f, "SAFEHAVEN_HTTP_TIMEOUT_SECS must be greater than zero")
            }
            Self::InvalidTemperature(value) => write!(
                f,
                "SAFEHAVEN_CHAT_TEMPERATURE must be within 0.0..=2.0, got {value}"
            ),
            Self::BlankValue(name) => write!(f, "{name} cannot be blank"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Env(err) => Some(err),
            _ => None,
        }
    }
}

impl From<envconfig::Error> for ConfigError {
    fn from(value: envconfig::Error) -> Self {
        Self::Env(value)
    }
}

impl AppConfig {
    /// Reads and validates configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::init_from_env()?.validated()
    }

    /// Reads and validates configuration from an explicit variable map.
    pub fn load_from(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::init_from_hashmap(vars)?.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if !(0.0..=2.0).contains(&self.chat_temperature) {
            return Err(ConfigError::InvalidTemperature(self.chat_temperature));
        }
        for (name, value) in [
            ("SAFEHAVEN_API_BASE_URL", &self.api_base_url),
            ("SAFEHAVEN_DB_PATH", &self.db_path),
            ("SAFEHAVEN_CHAT_MODEL", &self.chat_model),
            ("SAFEHAVEN_CHAT_ENDPOINT", &self.chat_endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::BlankValue(name));
            }
        }
        Ok(self)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(self.db_path.trim())
    }

    /// Log directory; defaults to `safehaven-logs` under the system temp dir.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("safehaven-logs"))
    }

    pub fn api_key(&self) -> Option<&str> {
        [&self.api_key, &self.vite_api_key, &self.react_app_api_key]
            .into_iter()
            .filter_map(|key| key.as_deref())
            .map(str::trim)
            .find(|key| !key.is_empty())
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            api_key: self.api_key().map(str::to_string),
            model: self.chat_model.trim().to_string(),
            endpoint: self.chat_endpoint.trim().to_string(),
            system_instruction: HAVEN_PERSONA.to_string(),
            temperature: self.chat_temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_API_BASE_URL};
    use crate::chat::{DEFAULT_CHAT_ENDPOINT, DEFAULT_CHAT_MODEL, DEFAULT_TEMPERATURE};
    use std::collections::HashMap;
    use std::time::Duration;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = AppConfig::load_from(&HashMap::new()).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.chat_endpoint, DEFAULT_CHAT_ENDPOINT);
        assert!((config.chat_temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
        assert!(config.api_key().is_none());
        assert!(config.log_dir().ends_with("safehaven-logs"));
    }

    #[test]
    fn api_key_chain_skips_blank_entries() {
        let config = AppConfig::load_from(&vars(&[
            ("API_KEY", "  "),
            ("VITE_API_KEY", "vite-key"),
            ("REACT_APP_API_KEY", "react-key"),
        ]))
        .unwrap();
        assert_eq!(config.api_key(), Some("vite-key"));
        assert_eq!(config.chat_config().api_key.as_deref(), Some("vite-key"));

        let config = AppConfig::load_from(&vars(&[("REACT_APP_API_KEY", "react-key")])).unwrap();
        assert_eq!(config.api_key(), Some("react-key"));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            AppConfig::load_from(&vars(&[("SAFEHAVEN_HTTP_TIMEOUT_SECS", "0")])),
            Err(ConfigError::InvalidTimeout)
        ));
        assert!(matches!(
            AppConfig::load_from(&vars(&[("SAFEHAVEN_CHAT_TEMPERATURE", "3.5")])),
            Err(ConfigError::InvalidTemperature(_))
        ));
        assert!(matches!(
            AppConfig::load_from(&vars(&[("SAFEHAVEN_HTTP_TIMEOUT_SECS", "soon")])),
            Err(ConfigError::Env(_))
        ));
        assert!(matches!(
            AppConfig::load_from(&vars(&[("SAFEHAVEN_DB_PATH", " ")])),
            Err(ConfigError::BlankValue("SAFEHAVEN_DB_PATH"))
        ));
    }
}

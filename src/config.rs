//! Configuration management for Turnstile.
//!
//! Settings are layered, lowest precedence first: built-in defaults, an
//! optional YAML file, then `TURNSTILE__`-prefixed environment variables
//! (`TURNSTILE__LIMITER__RATE=20`). Command-line flags are applied on top by
//! the binary.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Result, TurnstileError};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "TURNSTILE";

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Token bucket configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

/// Token bucket configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Refills per second; the bucket is reset to full every `1 / rate` seconds
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// Bucket size, the largest burst admitted between two refills
    #[serde(default = "default_capacity")]
    pub capacity: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            capacity: default_capacity(),
        }
    }
}

fn default_rate() -> f64 {
    10.0
}

fn default_capacity() -> u64 {
    10
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl TurnstileConfig {
    /// Load configuration from a YAML file path.
    ///
    /// Only the file is consulted; use [`TurnstileConfig::load`] for the
    /// layered configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TurnstileConfig =
            serde_yaml::from_str(&contents).map_err(|e| TurnstileError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load layered configuration: defaults, optional YAML file, environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        let config: TurnstileConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the limiter cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.limiter.rate.is_finite() || self.limiter.rate <= 0.0 {
            return Err(TurnstileError::InvalidRate(self.limiter.rate));
        }
        if self.limiter.capacity == 0 {
            return Err(TurnstileError::InvalidCapacity(self.limiter.capacity));
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn env_from(vars: &[(&str, &str)]) -> Environment {
        environment().source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn test_defaults() {
        let config = TurnstileConfig::default();
        assert_eq!(config.server.http_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.limiter.rate, 10.0);
        assert_eq!(config.limiter.capacity, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let file = write_yaml(
            r#"
limiter:
  rate: 2.5
logging:
  format: json
"#,
        );

        let config = TurnstileConfig::from_file(file.path()).unwrap();
        assert_eq!(config.limiter.rate, 2.5);
        assert_eq!(config.limiter.capacity, 10);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_from_file_rejects_zero_capacity() {
        let file = write_yaml("limiter:\n  capacity: 0\n");
        let err = TurnstileConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, TurnstileError::InvalidCapacity(0)));
    }

    #[test]
    fn test_from_file_rejects_malformed_yaml() {
        let file = write_yaml("limiter: [not, a, map\n");
        let err = TurnstileConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, TurnstileError::Config(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let err = TurnstileConfig::from_file("/nonexistent/turnstile.yaml").unwrap_err();
        assert!(matches!(err, TurnstileError::Io(_)));
    }

    #[test]
    fn test_load_without_sources_uses_defaults() {
        let config = TurnstileConfig::load_with_env(None, env_from(&[])).unwrap();
        assert_eq!(config, TurnstileConfig::default());
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_yaml(
            r#"
server:
  http_addr: "127.0.0.1:9000"
limiter:
  rate: 5
  capacity: 20
"#,
        );

        let env = env_from(&[
            ("TURNSTILE__LIMITER__CAPACITY", "50"),
            ("TURNSTILE__LOGGING__LEVEL", "debug"),
        ]);
        let config = TurnstileConfig::load_with_env(Some(file.path()), env).unwrap();

        assert_eq!(config.server.http_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.limiter.rate, 5.0);
        assert_eq!(config.limiter.capacity, 50);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_rejects_negative_rate() {
        let env = env_from(&[("TURNSTILE__LIMITER__RATE", "-3")]);
        let err = TurnstileConfig::load_with_env(None, env).unwrap_err();
        assert!(matches!(err, TurnstileError::InvalidRate(_)));
    }
}

//! Configuration loading from carekeeper.toml.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// One year.
const MAX_TTL_HOURS: i64 = 24 * 366;
/// Ten years.
const MAX_TRIAL_DAYS: i64 = 3_660;

/// Top-level configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

/// HTTP listener settings.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Listen address. The `PORT` environment variable replaces its port.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest request body accepted on routes with an input contract.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    /// Database file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,

    /// How long a request may wait on the identity provider before it is
    /// treated as unauthenticated.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionConfig {
    /// Length of the subscription granted at registration.
    #[serde(default = "default_trial_days")]
    pub trial_days: i64,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            trial_days: default_trial_days(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_body_limit() -> usize {
    64 * 1024
}

fn default_ttl_hours() -> i64 {
    24 * 7
}

fn default_resolve_timeout_ms() -> u64 {
    2_000
}

fn default_trial_days() -> i64 {
    30
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TTL_HOURS).contains(&self.session.ttl_hours) {
            return Err(ConfigError::Invalid(format!(
                "session.ttl_hours must be between 1 and {MAX_TTL_HOURS}"
            )));
        }
        if self.session.resolve_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "session.resolve_timeout_ms must be positive".into(),
            ));
        }
        if !(1..=MAX_TRIAL_DAYS).contains(&self.subscription.trial_days) {
            return Err(ConfigError::Invalid(format!(
                "subscription.trial_days must be between 1 and {MAX_TRIAL_DAYS}"
            )));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.body_limit_bytes must be positive".into(),
            ));
        }
        self.bind_addr(None)?;
        Ok(())
    }

    /// Listen address, with `port` (usually `$PORT`) replacing the configured port.
    pub fn bind_addr(&self, port: Option<&str>) -> Result<SocketAddr, ConfigError> {
        let mut addr: SocketAddr = self
            .server
            .bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad bind address '{}'", self.server.bind)))?;

        if let Some(port) = port {
            let port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("bad port '{port}'")))?;
            addr.set_port(port);
        }
        Ok(addr)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session.ttl_hours)
    }

    pub fn trial_period(&self) -> chrono::Duration {
        chrono::Duration::days(self.subscription.trial_days)
    }

    pub fn resolve_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.session.resolve_timeout_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert_eq!(config.trial_period(), chrono::Duration::days(30));
        assert_eq!(config.session_ttl(), chrono::Duration::hours(168));
        assert_eq!(config.resolve_timeout(), std::time::Duration::from_secs(2));
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[server]
bind = "127.0.0.1:8080"

[storage]
path = "/tmp/care.db"

[session]
ttl_hours = 12
resolve_timeout_ms = 500

[subscription]
trial_days = 14
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.bind_addr(None).unwrap().port(), 8080);
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/care.db")));
        assert_eq!(config.session_ttl(), chrono::Duration::hours(12));
        assert_eq!(config.trial_period(), chrono::Duration::days(14));
    }

    #[test]
    fn test_upper_bounds_accepted() {
        let config = Config::parse(&format!(
            "[session]\nttl_hours = {MAX_TTL_HOURS}\n[subscription]\ntrial_days = {MAX_TRIAL_DAYS}"
        ))
        .unwrap();
        assert_eq!(config.trial_period(), chrono::Duration::days(MAX_TRIAL_DAYS));
        assert_eq!(config.session_ttl(), chrono::Duration::hours(MAX_TTL_HOURS));
    }

    #[test]
    fn test_port_override() {
        let config = Config::default();
        let addr = config.bind_addr(Some("5001")).unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:5001");
        assert!(config.bind_addr(Some("not-a-port")).is_err());
    }

    #[test]
    fn test_rejects_invalid_values() {
        for toml in [
            "[subscription]\ntrial_days = 0",
            "[session]\nttl_hours = -1",
            "[session]\nttl_hours = 9223372036854775807",
            "[subscription]\ntrial_days = 1000000000",
            "[server]\nbind = \"nowhere\"",
        ] {
            assert!(
                matches!(Config::parse(toml), Err(ConfigError::Invalid(_))),
                "{toml}"
            );
        }
        assert!(matches!(
            Config::parse("[server"),
            Err(ConfigError::Parse(_))
        ));
    }
}

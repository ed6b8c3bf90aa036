//! Server configuration.
//!
//! Loaded from `vitrine.toml` (or the file named by `VITRINE_CONFIG`), then
//! overridden by environment variables.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vitrine_alerts::{EscalationPolicy, PanicPolicy};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "vitrine.toml";

/// Environment variable names.
pub mod env_vars {
    pub const CONFIG: &str = "VITRINE_CONFIG";
    pub const HOST: &str = "VITRINE_HOST";
    pub const PORT: &str = "VITRINE_PORT";
    pub const JWT_SECRET: &str = "VITRINE_JWT_SECRET";
    /// Accepted for older deployments, raises a deprecation alert.
    pub const LEGACY_JWT_SECRET: &str = "JWT_SECRET";
    pub const ENV: &str = "VITRINE_ENV";
    pub const WS_MODE: &str = "VITRINE_WS_MODE";
    pub const HEARTBEAT_SECS: &str = "VITRINE_HEARTBEAT_SECS";
    pub const EXIT_ON_PANIC: &str = "VITRINE_EXIT_ON_PANIC";
    pub const PANIC_GRACE_MS: &str = "VITRINE_PANIC_GRACE_MS";
    pub const NOTIFY_CONSOLE: &str = "VITRINE_NOTIFY_CONSOLE";
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Deployment mode. Production redacts internal error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// WebSocket deployment variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsMode {
    /// Only `/ws/alerts`.
    Dedicated,
    /// `/ws/realtime`, `/ws/notifications` and `/ws/alerts` through one handler.
    #[default]
    Unified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    pub mode: WsMode,
    pub heartbeat_secs: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            mode: WsMode::default(),
            heartbeat_secs: 30,
        }
    }
}

impl WsConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanicConfig {
    pub exit_on_panic: bool,
    pub grace_ms: u64,
}

impl Default for PanicConfig {
    fn default() -> Self {
        Self {
            exit_on_panic: true,
            grace_ms: 1000,
        }
    }
}

impl PanicConfig {
    pub fn policy(&self) -> PanicPolicy {
        PanicPolicy {
            exit_on_panic: self.exit_on_panic,
            grace: Duration::from_millis(self.grace_ms),
        }
    }
}

/// Notification channels urgent alerts are dispatched to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Print `high`/`critical` alerts to stdout.
    pub console: bool,
    /// Include the alert's user and `data` in console output.
    pub console_details: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            console: true,
            console_details: true,
        }
    }
}

/// Full server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Secret for validating WebSocket `authenticate` tokens. Without it
    /// every token is rejected.
    pub jwt_secret: Option<String>,
    pub environment: Environment,
    pub ws: WsConfig,
    pub panic: PanicConfig,
    pub notifications: NotificationsConfig,
    /// Per-type escalation delay overrides in milliseconds.
    pub escalation: EscalationPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            jwt_secret: None,
            environment: Environment::default(),
            ws: WsConfig::default(),
            panic: PanicConfig::default(),
            notifications: NotificationsConfig::default(),
            escalation: EscalationPolicy::default(),
        }
    }
}

/// Something worth reporting about the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNotice {
    Deprecated { feature: String, message: String },
}

/// A loaded configuration and the notices raised while loading it.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ServerConfig,
    pub source: Option<PathBuf>,
    pub notices: Vec<ConfigNotice>,
}

impl ServerConfig {
    /// Load from the config file (if present) and the process environment.
    pub fn load() -> Result<LoadedConfig, ConfigError> {
        let path = std::env::var(env_vars::CONFIG)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path, |key| std::env::var(key).ok())
    }

    /// Load from `path` (skipped when missing) with `env` as the variable lookup.
    pub fn load_from(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig, ConfigError> {
        let (mut config, source) = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::info!(category = "config", path = %path.display(), "Loaded config file");
            (toml::from_str::<ServerConfig>(&text)?, Some(path.to_path_buf()))
        } else {
            (ServerConfig::default(), None)
        };

        let notices = config.apply_env(env)?;
        Ok(LoadedConfig {
            config,
            source,
            notices,
        })
    }

    /// Apply environment overrides on top of the current values.
    pub fn apply_env(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<ConfigNotice>, ConfigError> {
        let mut notices = Vec::new();

        if let Some(host) = env(env_vars::HOST) {
            self.host = host;
        }
        if let Some(port) = env(env_vars::PORT) {
            self.port = parse(env_vars::PORT, &port)?;
        }

        if let Some(secret) = env(env_vars::JWT_SECRET) {
            self.jwt_secret = Some(secret);
        } else if let Some(secret) = env(env_vars::LEGACY_JWT_SECRET) {
            self.jwt_secret = Some(secret);
            notices.push(ConfigNotice::Deprecated {
                feature: env_vars::LEGACY_JWT_SECRET.to_string(),
                message: format!(
                    "La variable {} est obsolète, utilisez {}",
                    env_vars::LEGACY_JWT_SECRET,
                    env_vars::JWT_SECRET
                ),
            });
        }

        if let Some(value) = env(env_vars::ENV) {
            self.environment = match value.to_lowercase().as_str() {
                "development" | "dev" => Environment::Development,
                "production" | "prod" => Environment::Production,
                _ => return Err(invalid(env_vars::ENV, value)),
            };
        }
        if let Some(value) = env(env_vars::WS_MODE) {
            self.ws.mode = match value.to_lowercase().as_str() {
                "dedicated" => WsMode::Dedicated,
                "unified" => WsMode::Unified,
                _ => return Err(invalid(env_vars::WS_MODE, value)),
            };
        }
        if let Some(value) = env(env_vars::HEARTBEAT_SECS) {
            self.ws.heartbeat_secs = parse(env_vars::HEARTBEAT_SECS, &value)?;
        }
        if let Some(value) = env(env_vars::EXIT_ON_PANIC) {
            self.panic.exit_on_panic = parse(env_vars::EXIT_ON_PANIC, &value)?;
        }
        if let Some(value) = env(env_vars::PANIC_GRACE_MS) {
            self.panic.grace_ms = parse(env_vars::PANIC_GRACE_MS, &value)?;
        }
        if let Some(value) = env(env_vars::NOTIFY_CONSOLE) {
            self.notifications.console = parse(env_vars::NOTIFY_CONSOLE, &value)?;
        }

        Ok(notices)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| invalid("host", format!("{}:{}", self.host, self.port)))
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value.to_string()))
}

fn invalid(key: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidValue { key, value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vitrine_alerts::AlertType;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file() {
        let loaded = ServerConfig::load_from(Path::new("/nonexistent/vitrine.toml"), env_from(&[])).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.port, 3001);
        assert_eq!(loaded.config.ws.heartbeat_secs, 30);
        assert_eq!(loaded.config.ws.mode, WsMode::Unified);
        assert!(loaded.notices.is_empty());
    }

    #[test]
    fn test_file_then_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vitrine.toml");
        std::fs::write(
            &path,
            r#"
port = 8080
environment = "production"

[ws]
mode = "dedicated"

[notifications]
console_details = false

[escalation]
SYSTEM = 120000
"#,
        )
        .unwrap();

        let loaded = ServerConfig::load_from(&path, env_from(&[("VITRINE_PORT", "9090")])).unwrap();
        let config = loaded.config;
        assert_eq!(config.port, 9090);
        assert!(config.environment.is_production());
        assert_eq!(config.ws.mode, WsMode::Dedicated);
        assert_eq!(config.ws.heartbeat_secs, 30);
        assert!(config.notifications.console);
        assert!(!config.notifications.console_details);
        assert_eq!(config.escalation.delay_ms(AlertType::System), 120_000);
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_legacy_secret_is_deprecated() {
        let mut config = ServerConfig::default();
        let notices = config.apply_env(env_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(notices.len(), 1);

        let mut config = ServerConfig::default();
        let notices = config
            .apply_env(env_from(&[("JWT_SECRET", "old"), ("VITRINE_JWT_SECRET", "new")]))
            .unwrap();
        assert_eq!(config.jwt_secret.as_deref(), Some("new"));
        assert!(notices.is_empty());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = ServerConfig::default();
        assert!(config.apply_env(env_from(&[("VITRINE_PORT", "abc")])).is_err());
        assert!(config.apply_env(env_from(&[("VITRINE_WS_MODE", "both")])).is_err());
        assert!(config.apply_env(env_from(&[("VITRINE_EXIT_ON_PANIC", "false")])).is_ok());
        assert!(!config.panic.exit_on_panic);
        assert!(config.apply_env(env_from(&[("VITRINE_NOTIFY_CONSOLE", "off")])).is_err());
        assert!(config.apply_env(env_from(&[("VITRINE_NOTIFY_CONSOLE", "false")])).is_ok());
        assert!(!config.notifications.console);
    }

    #[test]
    fn test_bind_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:3001");
    }
}

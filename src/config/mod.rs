// Configuration module entry point
// Loads layered configuration and owns the shared application state

mod state;
mod types;

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
#[cfg(test)]
use config::FileFormat;
use std::net::SocketAddr;

use crate::environment::EnvSource;

// Re-export public types
pub use state::AppState;
pub use types::{AuthConfig, Config, HealthConfig};

/// Environment variable the notebook server reads its token from
pub const TOKEN_ENV_VAR: &str = "JUPYTER_TOKEN";

const REDACTED: &str = "<redacted>";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = defaults()?
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                Environment::with_prefix("APOD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from an in-memory TOML document layered over the defaults
    #[cfg(test)]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    /// Fill in the auth token from `JUPYTER_TOKEN` when none was configured
    pub fn apply_token_fallback(&mut self, env: &dyn EnvSource) {
        if !self.auth.has_token() {
            self.auth.token = env.var(TOKEN_ENV_VAR).filter(|t| !t.is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.base_url.starts_with('/') {
            return Err(ConfigError::Message(format!(
                "server.base_url must start with '/', got '{}'",
                self.server.base_url
            )));
        }

        if self.auth.enabled && !self.auth.has_token() {
            return Err(ConfigError::Message(format!(
                "auth is enabled but no token is configured (set auth.token or {TOKEN_ENV_VAR})"
            )));
        }

        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Render the effective configuration as TOML with the token hidden
    pub fn to_toml_redacted(&self) -> Result<String, toml::ser::Error> {
        let mut redacted = self.clone();
        if redacted.auth.token.is_some() {
            redacted.auth.token = Some(REDACTED.to_string());
        }
        toml::to_string_pretty(&redacted)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8888)?
        .set_default("server.base_url", "/")?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("performance.keep_alive_timeout", 75)?
        .set_default("performance.read_timeout", 30)?
        .set_default("performance.write_timeout", 30)?
        .set_default("performance.shutdown_grace", 5)?
        .set_default("http.server_name", "apod-env-server/0.1")?
        .set_default("http.enable_cors", false)?
        .set_default("auth.enabled", true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_apply_without_file() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8888);
        assert_eq!(cfg.server.base_url, "/");
        assert!(cfg.auth.enabled);
        assert!(cfg.auth.token.is_none());
        assert!(cfg.health.enabled);
        assert_eq!(cfg.health.liveness_path, "/healthz");
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [server]
            port = 9999
            base_url = "/user/alice/"

            [auth]
            token = "abc123"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9999);
        assert_eq!(cfg.server.base_url, "/user/alice/");
        assert_eq!(cfg.auth.token.as_deref(), Some("abc123"));
        assert_eq!(cfg.server.host, "127.0.0.1");
    }

    #[test]
    fn test_validate_requires_token_when_auth_enabled() {
        let cfg = Config::from_toml_str("").unwrap();
        assert!(cfg.validate().is_err());

        let cfg = Config::from_toml_str("[auth]\nenabled = false").unwrap();
        assert!(cfg.validate().is_ok());

        let cfg = Config::from_toml_str("[auth]\ntoken = \"\"").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_base_url() {
        let cfg = Config::from_toml_str(
            "[server]\nbase_url = \"lab\"\n[auth]\nenabled = false",
        )
        .unwrap();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("base_url"), "unexpected error: {err}");
    }

    #[test]
    fn test_token_fallback_from_env() {
        let mut env = HashMap::new();
        env.insert(TOKEN_ENV_VAR.to_string(), "from-env".to_string());

        let mut cfg = Config::from_toml_str("").unwrap();
        cfg.apply_token_fallback(&env);
        assert_eq!(cfg.auth.token.as_deref(), Some("from-env"));
        assert!(cfg.validate().is_ok());

        // An explicit token wins over the environment
        let mut cfg = Config::from_toml_str("[auth]\ntoken = \"explicit\"").unwrap();
        cfg.apply_token_fallback(&env);
        assert_eq!(cfg.auth.token.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_dump_redacts_token() {
        let cfg = Config::from_toml_str("[auth]\ntoken = \"s3cret\"").unwrap();
        let dumped = cfg.to_toml_redacted().unwrap();
        assert!(!dumped.contains("s3cret"));
        assert!(dumped.contains(REDACTED));
        assert!(dumped.contains("[server]"));
    }
}

//! Server configuration types.
//!
//! `ServerConfig` mirrors `config.toml` in the data directory. Every field has
//! a default so a missing file still yields a usable (if secret-less) config.

use secrecy::SecretString;
use serde::Deserialize;

/// Top-level configuration for the chat server.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// sqlx SQLite URL. `None` means `{data_dir}/stockdesk.db`.
    #[serde(default)]
    pub database_url: Option<String>,

    /// HS256 signing key shared with the auth service. Required to serve.
    #[serde(default)]
    pub jwt_secret: Option<SecretString>,

    /// Lifetime of tokens minted by `sdesk token`.
    #[serde(default = "default_jwt_expiration_secs")]
    pub jwt_expiration_secs: u64,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origin. `None` allows any origin.
    #[serde(default)]
    pub frontend_url: Option<String>,

    /// Capacity of each connection's outbound queue.
    ///
    /// Pushes never wait on a full queue: the event is dropped and logged.
    /// That includes the sender's own echo or error event, so a client that
    /// stops reading can miss feedback for messages that were still stored.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

fn default_jwt_expiration_secs() -> u64 {
    3600
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_outbound_buffer() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration_secs(),
            host: default_host(),
            port: default_port(),
            frontend_url: None,
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_server_config_default_values() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.jwt_expiration_secs, 3600);
        assert_eq!(config.outbound_buffer, 256);
        assert!(config.jwt_secret.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
jwt_secret = "s3cret"
port = 9100
"#,
        )
        .unwrap();
        assert_eq!(
            config.jwt_secret.as_ref().map(|s| s.expose_secret()),
            Some("s3cret")
        );
        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ServerConfig {
            jwt_secret: Some(SecretString::from("s3cret".to_string())),
            ..ServerConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("REDACTED"));
    }
}

//! Server configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.stockdesk/` in
//! production) into a [`ServerConfig`], then applies environment overrides.
//! A missing or malformed file falls back to defaults.

use std::path::Path;

use secrecy::SecretString;
use stockdesk_types::config::ServerConfig;

pub const DATABASE_URL_ENV: &str = "STOCKDESK_DATABASE_URL";
pub const JWT_SECRET_ENV: &str = "STOCKDESK_JWT_SECRET";

/// Load `{data_dir}/config.toml` and apply `STOCKDESK_*` overrides.
pub async fn load_server_config(data_dir: &Path) -> ServerConfig {
    let mut config = read_config_file(data_dir).await;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

async fn read_config_file(data_dir: &Path) -> ServerConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ServerConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ServerConfig::default();
        }
    };

    match toml::from_str::<ServerConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            ServerConfig::default()
        }
    }
}

/// Apply environment overrides, looked up through `lookup`. Empty values are
/// ignored.
fn apply_overrides(config: &mut ServerConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(DATABASE_URL_ENV) {
        config.database_url = Some(url);
    }
    if let Some(secret) = non_empty(JWT_SECRET_ENV) {
        config.jwt_secret = Some(SecretString::from(secret));
    }
}

/// The database URL to open: the configured one, or `stockdesk.db` inside
/// `data_dir`.
pub fn resolve_database_url(config: &ServerConfig, data_dir: &Path) -> String {
    config.database_url.clone().unwrap_or_else(|| {
        format!("sqlite://{}?mode=rwc", data_dir.join("stockdesk.db").display())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = read_config_file(tmp.path()).await;
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.jwt_secret.is_none());
    }

    #[tokio::test]
    async fn valid_file_is_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
jwt_secret = "from-file"
port = 9100
frontend_url = "http://localhost:3000"
outbound_buffer = 32
"#,
        )
        .await
        .unwrap();

        let config = read_config_file(tmp.path()).await;
        assert_eq!(config.jwt_secret.as_ref().map(|s| s.expose_secret()), Some("from-file"));
        assert_eq!(config.port, 9100);
        assert_eq!(config.frontend_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.outbound_buffer, 32);
        assert_eq!(config.jwt_expiration_secs, 3600);
    }

    #[tokio::test]
    async fn malformed_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "port = \"not a number")
            .await
            .unwrap();

        let config = read_config_file(tmp.path()).await;
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn env_overrides_win_and_blank_values_are_ignored() {
        let mut config = ServerConfig {
            jwt_secret: Some(SecretString::from("from-file".to_string())),
            ..ServerConfig::default()
        };
        let env: HashMap<&str, &str> = HashMap::from([
            (DATABASE_URL_ENV, "sqlite::memory:"),
            (JWT_SECRET_ENV, "  "),
        ]);

        apply_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.jwt_secret.as_ref().map(|s| s.expose_secret()), Some("from-file"));
    }

    #[test]
    fn database_url_defaults_into_data_dir() {
        let data_dir = PathBuf::from("/srv/stockdesk");
        let url = resolve_database_url(&ServerConfig::default(), &data_dir);
        assert_eq!(url, "sqlite:///srv/stockdesk/stockdesk.db?mode=rwc");

        let explicit = ServerConfig {
            database_url: Some("sqlite://other.db".to_string()),
            ..ServerConfig::default()
        };
        assert_eq!(resolve_database_url(&explicit, &data_dir), "sqlite://other.db");
    }
}

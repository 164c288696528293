//! Data directory resolution.
//!
//! The data directory holds `config.toml` and, unless a database URL is
//! configured, `stockdesk.db`.

use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "STOCKDESK_DATA_DIR";

/// Resolve the data directory.
///
/// Priority:
/// 1. `STOCKDESK_DATA_DIR` environment variable
/// 2. `~/.stockdesk`
/// 3. `.stockdesk` in the working directory
pub fn resolve_data_dir() -> PathBuf {
    resolve_data_dir_from(std::env::var(DATA_DIR_ENV).ok(), dirs::home_dir())
}

fn resolve_data_dir_from(env_dir: Option<String>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    match home {
        Some(home) => home.join(".stockdesk"),
        None => PathBuf::from(".stockdesk"),
    }
}

/// Create the data directory if it does not exist yet.
pub async fn ensure_data_dir(path: &Path) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(path).await
}

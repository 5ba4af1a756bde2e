use std::path::PathBuf;

use crate::config::helpers::optional_env;
use crate::error::ConfigError;

/// Binding store location.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl DatabaseConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let path = optional_env("OPSBOT_DB_PATH")?
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);
        Ok(Self { path })
    }
}

/// Default libSQL file: `~/.opsbot/opsbot.db`.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".opsbot")
        .join("opsbot.db")
}

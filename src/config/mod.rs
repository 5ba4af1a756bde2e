//! Configuration for opsbot.
//!
//! Everything comes from env vars, read once at startup. `./.env` and
//! `~/.opsbot/.env` are loaded via dotenvy first; dotenvy never overwrites
//! variables that are already set.

mod channels;
mod cluster;
mod database;
pub(crate) mod helpers;

use std::path::PathBuf;

use crate::error::ConfigError;

pub use self::channels::{
    ChannelsConfig, DEFAULT_SLACK_API_BASE_URL, HttpConfig, ReplConfig, SlackConfig,
};
pub use self::cluster::ClusterConfig;
pub use self::database::{DatabaseConfig, default_db_path};

/// Main configuration for the bot.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cluster: ClusterConfig,
    pub channels: ChannelsConfig,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Loads both `./.env` (higher priority) and `~/.opsbot/.env` before
    /// resolving.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        crate::bootstrap::load_opsbot_env();
        Self::build()
    }

    /// Resolve from whatever is already in the environment.
    pub(crate) fn build() -> Result<Self, ConfigError> {
        Ok(Self {
            database: DatabaseConfig::resolve()?,
            cluster: ClusterConfig::resolve()?,
            channels: ChannelsConfig::resolve()?,
        })
    }

    /// Override the database path (CLI flag wins over env).
    pub fn with_db_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.database.path = path;
        }
        self
    }
}

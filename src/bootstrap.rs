//! Bootstrap helpers for opsbot.
//!
//! Credentials such as `SLACK_API_TOKEN` can live in `~/.opsbot/.env`
//! (standard dotenvy format) so the bot can be started without exporting
//! them in the shell.

use std::path::PathBuf;

/// Path to the opsbot-specific `.env` file: `~/.opsbot/.env`.
pub fn opsbot_env_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".opsbot")
        .join(".env")
}

/// Load env vars from `~/.opsbot/.env` (in addition to the standard `.env`).
///
/// Call this **after** `dotenvy::dotenv()` so that the standard `./.env`
/// takes priority. dotenvy never overwrites existing env vars, so the
/// effective priority is:
///
///   explicit env vars > `./.env` > `~/.opsbot/.env`
pub fn load_opsbot_env() {
    let path = opsbot_env_path();
    if path.exists()
        && let Err(e) = dotenvy::from_path(&path)
    {
        tracing::warn!("Failed to load {}: {}", path.display(), e);
    }
}

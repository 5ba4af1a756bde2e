//! Error types for opsbot.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Authentication failed for channel {name}: {reason}")]
    AuthFailed { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from the external cluster CLI.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Invalid output from {command}: {reason}")]
    InvalidOutput { command: String, reason: String },
}

/// Coarse classification of a [`CommandError`], used by logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    Usage,
    NotFound,
    Constraint,
    Backend,
}

/// Failure of a chat command.
///
/// The `Display` output is exactly the text sent back to the conversation.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Malformed command arguments.
    #[error("{0}")]
    Usage(String),

    /// No binding for the user, or no pod matching the binding.
    #[error("{0}")]
    NotFound(String),

    /// The target exists but cannot be bound (e.g. several containers).
    #[error("{0}")]
    Constraint(String),

    #[error("{0}")]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Cluster(#[from] ClusterError),
}

impl CommandError {
    pub fn kind(&self) -> CommandErrorKind {
        match self {
            Self::Usage(_) => CommandErrorKind::Usage,
            Self::NotFound(_) => CommandErrorKind::NotFound,
            Self::Constraint(_) => CommandErrorKind::Constraint,
            Self::Database(_) | Self::Cluster(_) => CommandErrorKind::Backend,
        }
    }

    /// `No app has been set for <user>`.
    pub fn no_binding(user: &str) -> Self {
        Self::NotFound(format!("No app has been set for {user}"))
    }
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_display_is_reply_text() {
        let err = CommandError::no_binding("<@U1>");
        assert_eq!(err.to_string(), "No app has been set for <@U1>");
        assert_eq!(err.kind(), CommandErrorKind::NotFound);
    }

    #[test]
    fn backend_errors_keep_their_message() {
        let err = CommandError::from(ClusterError::CommandFailed {
            command: "kubectl logs api-1".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "pods \"api-1\" not found".to_string(),
        });
        assert_eq!(err.kind(), CommandErrorKind::Backend);
        assert_eq!(
            err.to_string(),
            "kubectl logs api-1 exited with exit status: 1: pods \"api-1\" not found"
        );
    }
}

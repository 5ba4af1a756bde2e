use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_optional_env};
use crate::error::ConfigError;

/// Channel configurations.
#[derive(Debug, Clone)]
pub struct ChannelsConfig {
    /// Present only when both Slack credentials are set.
    pub slack: Option<SlackConfig>,
    pub http: HttpConfig,
    pub repl: ReplConfig,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Bot token used for `chat.postMessage`.
    pub api_token: SecretString,
    /// Events API signing secret.
    pub signing_secret: SecretString,
    pub api_base_url: String,
}

/// Bind address for the Slack Events webhook.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct ReplConfig {
    /// Sender identity attached to every REPL line.
    pub user_id: String,
}

pub const DEFAULT_SLACK_API_BASE_URL: &str = "https://slack.com/api";

impl ChannelsConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let api_token = optional_env("SLACK_API_TOKEN")?;
        let signing_secret = optional_env("SLACK_SIGNING_SECRET")?;
        let slack = match (api_token, signing_secret) {
            (Some(token), Some(secret)) => Some(SlackConfig {
                api_token: SecretString::from(token),
                signing_secret: SecretString::from(secret),
                api_base_url: optional_env("SLACK_API_BASE_URL")?
                    .unwrap_or_else(|| DEFAULT_SLACK_API_BASE_URL.to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingRequired {
                    key: "SLACK_SIGNING_SECRET".to_string(),
                    hint: "SLACK_API_TOKEN is set; the Events API also needs the app signing secret"
                        .to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingRequired {
                    key: "SLACK_API_TOKEN".to_string(),
                    hint: "SLACK_SIGNING_SECRET is set; replies need the bot token".to_string(),
                });
            }
        };

        let http = HttpConfig {
            host: optional_env("HTTP_HOST")?.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_optional_env("HTTP_PORT", 3000u16)?,
        };

        let repl = ReplConfig {
            user_id: match optional_env("OPSBOT_REPL_USER")? {
                Some(user) => user,
                None => optional_env("USER")?.unwrap_or_else(|| "local".to_string()),
            },
        };

        Ok(Self { slack, http, repl })
    }

    /// Slack settings, or an error naming what `serve` needs.
    pub fn require_slack(&self) -> Result<&SlackConfig, ConfigError> {
        self.slack.as_ref().ok_or_else(|| ConfigError::MissingRequired {
            key: "SLACK_API_TOKEN".to_string(),
            hint: "set SLACK_API_TOKEN and SLACK_SIGNING_SECRET to serve Slack events".to_string(),
        })
    }
}

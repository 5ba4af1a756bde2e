use crate::cluster::locator::MultipleMatchPolicy;
use crate::config::helpers::{normalize_variant, optional_env};
use crate::error::ConfigError;

/// How the cluster CLI is invoked and how ambiguous lookups resolve.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Executable used for every query (default: `kubectl`).
    pub kubectl_bin: String,
    /// Optional kubeconfig context passed as `--context`.
    pub context: Option<String>,
    pub multiple_matches: MultipleMatchPolicy,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubectl_bin: "kubectl".to_string(),
            context: None,
            multiple_matches: MultipleMatchPolicy::First,
        }
    }
}

impl ClusterConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let multiple_matches = match optional_env("OPSBOT_MULTIPLE_MATCHES")? {
            Some(raw) => parse_multiple_matches(&raw, "OPSBOT_MULTIPLE_MATCHES")?,
            None => MultipleMatchPolicy::First,
        };

        Ok(Self {
            kubectl_bin: optional_env("KUBECTL_BIN")?.unwrap_or_else(|| "kubectl".to_string()),
            context: optional_env("KUBECTL_CONTEXT")?,
            multiple_matches,
        })
    }
}

fn parse_multiple_matches(value: &str, key: &str) -> Result<MultipleMatchPolicy, ConfigError> {
    match normalize_variant(value).as_str() {
        "first" => Ok(MultipleMatchPolicy::First),
        "reject" => Ok(MultipleMatchPolicy::Reject),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected 'first' or 'reject', got '{value}'"),
        }),
    }
}

//! `kubectl` subprocess client.

use async_trait::async_trait;
use tokio::process::Command;

use crate::cluster::{ClusterClient, PodRecord, parse_pod_list};
use crate::config::ClusterConfig;
use crate::error::ClusterError;

/// Runs the cluster CLI with an argument vector (no shell involved).
#[derive(Debug, Clone)]
pub struct Kubectl {
    program: String,
    context: Option<String>,
}

impl Kubectl {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            context: None,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            program: config.kubectl_bin.clone(),
            context: config.context.clone(),
        }
    }

    /// Pass `--context <name>` on every call.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn args<'a>(&'a self, args: &[&'a str]) -> Vec<&'a str> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(ref context) = self.context {
            full.push("--context");
            full.push(context.as_str());
        }
        full.extend_from_slice(args);
        full
    }

    /// Run with `args`, returning stdout on a zero exit status.
    async fn run(&self, args: &[&str]) -> Result<String, ClusterError> {
        let args = self.args(args);
        let command_line = format!("{} {}", self.program, args.join(" "));
        tracing::info!("Executing {}", command_line);

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ClusterError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ClusterError::CommandFailed {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Client version string, used by `opsbot doctor`.
    pub async fn client_version(&self) -> Result<String, ClusterError> {
        let out = self.run(&["version", "--client"]).await?;
        Ok(out.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

#[async_trait]
impl ClusterClient for Kubectl {
    async fn query_instances(
        &self,
        application: &str,
        namespace: &str,
    ) -> Result<Vec<PodRecord>, ClusterError> {
        let selector = format!("--selector=app={application}");
        let ns = format!("--namespace={namespace}");
        let args = ["get", "pods", selector.as_str(), ns.as_str(), "-ojson"];
        let stdout = self.run(&args).await?;

        parse_pod_list(&stdout).map_err(|e| ClusterError::InvalidOutput {
            command: format!("{} {}", self.program, self.args(&args).join(" ")),
            reason: e.to_string(),
        })
    }

    async fn fetch_logs(&self, instance_id: &str, namespace: &str) -> Result<String, ClusterError> {
        let ns = format!("--namespace={namespace}");
        self.run(&["logs", instance_id, ns.as_str()]).await
    }

    async fn fetch_description(
        &self,
        instance_id: &str,
        namespace: &str,
    ) -> Result<String, ClusterError> {
        let ns = format!("--namespace={namespace}");
        self.run(&["describe", "pod", instance_id, ns.as_str()]).await
    }
}

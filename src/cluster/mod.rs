//! External cluster access.
//!
//! The bot never talks to the Kubernetes API directly: every lookup goes
//! through a [`ClusterClient`], normally the `kubectl` binary.

pub mod fake;
pub mod kubectl;
pub mod locator;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ClusterError;

pub use self::fake::FakeCluster;
pub use self::kubectl::Kubectl;
pub use self::locator::{Locator, MultipleMatchPolicy, ResolvedInstance};

/// One pod returned by a selector query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRecord {
    pub name: String,
    pub container_count: usize,
}

impl PodRecord {
    pub fn new(name: impl Into<String>, container_count: usize) -> Self {
        Self {
            name: name.into(),
            container_count,
        }
    }
}

/// Opaque synchronous-looking calls into the cluster.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Pods labelled `app=<application>` in `namespace`, in the order the
    /// cluster returned them.
    async fn query_instances(
        &self,
        application: &str,
        namespace: &str,
    ) -> Result<Vec<PodRecord>, ClusterError>;

    /// Raw log output of a pod.
    async fn fetch_logs(&self, instance_id: &str, namespace: &str) -> Result<String, ClusterError>;

    /// Raw describe output of a pod.
    async fn fetch_description(
        &self,
        instance_id: &str,
        namespace: &str,
    ) -> Result<String, ClusterError>;
}

// `kubectl get pods -o json` shape, reduced to the fields we read.
#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<PodItem>,
}

#[derive(Debug, Deserialize)]
struct PodItem {
    metadata: PodMetadata,
    #[serde(default)]
    spec: PodSpec,
}

#[derive(Debug, Deserialize)]
struct PodMetadata {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PodSpec {
    #[serde(default)]
    containers: Vec<serde_json::Value>,
}

/// Decode a `kubectl get pods -o json` document.
pub fn parse_pod_list(json: &str) -> Result<Vec<PodRecord>, serde_json::Error> {
    let list: PodList = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .map(|item| PodRecord {
            name: item.metadata.name,
            container_count: item.spec.containers.len(),
        })
        .collect())
}

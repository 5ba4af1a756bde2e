//! Resolve an (application, namespace) pair to one running pod.

use std::sync::Arc;

use crate::cluster::ClusterClient;
use crate::error::CommandError;

/// What to do when a selector matches more than one pod.
///
/// The cluster decides the order of query results, so `First` is not a
/// stable choice across restarts of the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultipleMatchPolicy {
    /// Take the first pod the cluster returned.
    #[default]
    First,
    /// Refuse to pick one.
    Reject,
}

/// A pod picked for one command invocation. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstance {
    pub instance_id: String,
    /// Containers in the selected pod.
    pub container_count: usize,
    /// Pods the selector matched in total.
    pub match_count: usize,
}

/// Looks up pods through a [`ClusterClient`].
#[derive(Clone)]
pub struct Locator {
    cluster: Arc<dyn ClusterClient>,
    policy: MultipleMatchPolicy,
}

impl Locator {
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self {
            cluster,
            policy: MultipleMatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MultipleMatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterClient> {
        &self.cluster
    }

    /// Find the pod currently serving `application` in `namespace`.
    ///
    /// Zero matches is `NotFound`. Container count is reported, not checked.
    pub async fn resolve(
        &self,
        application: &str,
        namespace: &str,
    ) -> Result<ResolvedInstance, CommandError> {
        let pods = self.cluster.query_instances(application, namespace).await?;
        let match_count = pods.len();

        let Some(first) = pods.into_iter().next() else {
            return Err(CommandError::NotFound(format!(
                "{application} not found in {namespace}"
            )));
        };

        if match_count > 1 {
            match self.policy {
                MultipleMatchPolicy::First => {
                    tracing::warn!(
                        application,
                        namespace,
                        match_count,
                        pod = %first.name,
                        "selector matched several pods, using the first"
                    );
                }
                MultipleMatchPolicy::Reject => {
                    return Err(CommandError::Constraint(format!(
                        "{application} matches {match_count} pods in {namespace}"
                    )));
                }
            }
        }

        Ok(ResolvedInstance {
            instance_id: first.name,
            container_count: first.container_count,
            match_count,
        })
    }
}

//! Fake cluster client for testing

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cluster::{ClusterClient, PodRecord};
use crate::error::ClusterError;

/// Recorded cluster call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    Query { application: String, namespace: String },
    Logs { instance_id: String, namespace: String },
    Describe { instance_id: String, namespace: String },
}

#[derive(Default)]
struct FakeClusterState {
    pods: HashMap<(String, String), Vec<PodRecord>>,
    logs: HashMap<String, String>,
    descriptions: HashMap<String, String>,
    calls: Vec<ClusterCall>,
}

/// In-memory cluster with scripted pods and outputs
#[derive(Clone, Default)]
pub struct FakeCluster {
    inner: Arc<Mutex<FakeClusterState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pods returned for `app=<application>` in `namespace`.
    pub fn with_pods(self, application: &str, namespace: &str, pods: Vec<PodRecord>) -> Self {
        self.set_pods(application, namespace, pods);
        self
    }

    pub fn with_logs(self, instance_id: &str, logs: &str) -> Self {
        self.inner
            .lock()
            .logs
            .insert(instance_id.to_string(), logs.to_string());
        self
    }

    pub fn with_description(self, instance_id: &str, description: &str) -> Self {
        self.inner
            .lock()
            .descriptions
            .insert(instance_id.to_string(), description.to_string());
        self
    }

    /// Replace the pods for a selector, e.g. after a rollout.
    pub fn set_pods(&self, application: &str, namespace: &str, pods: Vec<PodRecord>) {
        self.inner
            .lock()
            .pods
            .insert((application.to_string(), namespace.to_string()), pods);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ClusterCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn query_instances(
        &self,
        application: &str,
        namespace: &str,
    ) -> Result<Vec<PodRecord>, ClusterError> {
        let mut state = self.inner.lock();
        state.calls.push(ClusterCall::Query {
            application: application.to_string(),
            namespace: namespace.to_string(),
        });
        Ok(state
            .pods
            .get(&(application.to_string(), namespace.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_logs(&self, instance_id: &str, namespace: &str) -> Result<String, ClusterError> {
        let mut state = self.inner.lock();
        state.calls.push(ClusterCall::Logs {
            instance_id: instance_id.to_string(),
            namespace: namespace.to_string(),
        });
        Ok(state.logs.get(instance_id).cloned().unwrap_or_default())
    }

    async fn fetch_description(
        &self,
        instance_id: &str,
        namespace: &str,
    ) -> Result<String, ClusterError> {
        let mut state = self.inner.lock();
        state.calls.push(ClusterCall::Describe {
            instance_id: instance_id.to_string(),
            namespace: namespace.to_string(),
        });
        Ok(state
            .descriptions
            .get(instance_id)
            .cloned()
            .unwrap_or_default())
    }
}

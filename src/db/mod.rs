//! Binding persistence.
//!
//! A binding maps a chat user to the (application, namespace) pair their
//! follow-up commands target. There is at most one binding per user and
//! writing a new one replaces the old one.

pub mod libsql;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;

pub use self::libsql::LibSqlBindingStore;

/// A user's currently selected target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub user: String,
    pub application: String,
    pub namespace: String,
}

/// Keyed store of user bindings.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Create the backing table if it does not exist. Safe on every startup.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Current binding for `user`. A user never seen before is `Ok(None)`.
    async fn get_binding(&self, user: &str) -> Result<Option<Binding>, DatabaseError>;

    /// Replace any binding for `user`.
    async fn put_binding(
        &self,
        user: &str,
        application: &str,
        namespace: &str,
    ) -> Result<(), DatabaseError>;
}

/// Process-local store, lost on restart. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryBindingStore {
    bindings: RwLock<HashMap<String, Binding>>,
}

impl InMemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bindings.
    pub async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bindings.read().await.is_empty()
    }
}

#[async_trait]
impl BindingStore for InMemoryBindingStore {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn get_binding(&self, user: &str) -> Result<Option<Binding>, DatabaseError> {
        Ok(self.bindings.read().await.get(user).cloned())
    }

    async fn put_binding(
        &self,
        user: &str,
        application: &str,
        namespace: &str,
    ) -> Result<(), DatabaseError> {
        self.bindings.write().await.insert(
            user.to_string(),
            Binding {
                user: user.to_string(),
                application: application.to_string(),
                namespace: namespace.to_string(),
            },
        );
        Ok(())
    }
}

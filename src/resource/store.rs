//! Resource store with per-resource locking

use super::Resource;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Handle to one resource row; holding the mutex is holding the
/// per-resource lock that serializes publisher validation, consumer
/// resolution and timeout reconciliation against each other.
pub type ResourceHandle = Arc<Mutex<Resource>>;

/// Registry of all resources the coordinator owns, keyed by code
pub struct ResourceStore {
    entries: RwLock<HashMap<String, ResourceHandle>>,
}

impl ResourceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace a resource row
    pub async fn insert(&self, resource: Resource) {
        let code = resource.code().to_string();
        let mut entries = self.entries.write().await;
        entries.insert(code, Arc::new(Mutex::new(resource)));
    }

    /// Get the lock handle for a resource
    pub async fn handle(&self, code: &str) -> Option<ResourceHandle> {
        let entries = self.entries.read().await;
        entries.get(code).cloned()
    }

    /// Read-only copy of a resource row
    pub async fn snapshot(&self, code: &str) -> Option<Resource> {
        let handle = self.handle(code).await?;
        let guard = handle.lock().await;
        Some(guard.clone())
    }

    /// Number of resources registered
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

//! In-process worker registry

use async_trait::async_trait;
use maestro_core::{MaestroError, Result, WorkerDescriptor};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::document::validate_worker_name;
use crate::WorkerRegistry;

/// Registry held in memory, used for tests and embedding
#[derive(Default)]
pub struct MemoryRegistry {
    workers: RwLock<BTreeMap<String, WorkerDescriptor>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the given workers (later duplicates ignored)
    pub fn with_workers(workers: impl IntoIterator<Item = WorkerDescriptor>) -> Self {
        let mut map = BTreeMap::new();
        for worker in workers {
            map.entry(worker.name.clone()).or_insert(worker);
        }
        Self {
            workers: RwLock::new(map),
        }
    }
}

#[async_trait]
impl WorkerRegistry for MemoryRegistry {
    async fn list(&self) -> Result<Vec<WorkerDescriptor>> {
        Ok(self.workers.read().await.values().cloned().collect())
    }

    async fn create(&self, descriptor: WorkerDescriptor) -> Result<WorkerDescriptor> {
        validate_worker_name(&descriptor.name)?;

        let mut workers = self.workers.write().await;
        if workers.contains_key(&descriptor.name) {
            return Err(MaestroError::RegistryConflict(descriptor.name));
        }
        workers.insert(descriptor.name.clone(), descriptor.clone());
        Ok(descriptor)
    }

    async fn get(&self, name: &str) -> Result<Option<WorkerDescriptor>> {
        Ok(self.workers.read().await.get(name).cloned())
    }
}

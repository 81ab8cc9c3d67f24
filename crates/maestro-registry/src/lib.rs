//! # maestro-registry
//!
//! Worker registry for Maestro orchestration.
//!
//! Workers are capability-tagged descriptors. On disk each worker is one
//! markdown document with TOML front matter; the directory of documents is
//! the registry. The orchestration core only reads descriptors and may ask
//! for missing ones to be created.
//!
//! ## Concurrency
//!
//! Registries are read-mostly and may be listed concurrently. Creation is
//! serialized per registry and a duplicate name is rejected with
//! [`MaestroError::RegistryConflict`](maestro_core::MaestroError::RegistryConflict).

mod builtin;
mod document;
mod file;
mod memory;

use async_trait::async_trait;
use maestro_core::{Result, WorkerDescriptor};

pub use builtin::{builtin_worker, builtin_workers};
pub use document::{parse_worker_document, render_worker_document, DOCUMENT_EXTENSION};
pub use file::FileRegistry;
pub use memory::MemoryRegistry;

/// Store of worker descriptors (allows mocking in tests)
#[async_trait]
pub trait WorkerRegistry: Send + Sync {
    /// List every worker, sorted by name
    async fn list(&self) -> Result<Vec<WorkerDescriptor>>;

    /// Persist a new worker; an existing name is a conflict
    async fn create(&self, descriptor: WorkerDescriptor) -> Result<WorkerDescriptor>;

    /// Look up a single worker by name
    async fn get(&self, name: &str) -> Result<Option<WorkerDescriptor>> {
        Ok(self.list().await?.into_iter().find(|w| w.name == name))
    }
}

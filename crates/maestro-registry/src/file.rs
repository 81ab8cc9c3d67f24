//! Directory-backed worker registry

use async_trait::async_trait;
use maestro_core::{MaestroError, Result, WorkerDescriptor};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::document::{
    parse_worker_document, render_worker_document, validate_worker_name, DOCUMENT_EXTENSION,
};
use crate::WorkerRegistry;

/// Registry reading and writing one document per worker in a directory
pub struct FileRegistry {
    directory: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRegistry {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", name, DOCUMENT_EXTENSION))
    }

    async fn read_documents(&self) -> Result<Vec<(PathBuf, WorkerDescriptor)>> {
        if !fs::try_exists(&self.directory).await? {
            debug!("Worker directory {:?} does not exist", self.directory);
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping unreadable worker document {:?}: {}", path, e);
                    continue;
                }
            };
            match parse_worker_document(&content) {
                Ok(descriptor) => documents.push((path, descriptor)),
                Err(e) => warn!("Skipping worker document {:?}: {}", path, e),
            }
        }

        Ok(documents)
    }
}

#[async_trait]
impl WorkerRegistry for FileRegistry {
    #[instrument(skip(self), fields(dir = %self.directory.display()))]
    async fn list(&self) -> Result<Vec<WorkerDescriptor>> {
        let mut by_name: BTreeMap<String, WorkerDescriptor> = BTreeMap::new();

        for (path, descriptor) in self.read_documents().await? {
            if by_name.contains_key(&descriptor.name) {
                warn!(
                    "Duplicate worker '{}' in {:?}, keeping the first definition",
                    descriptor.name, path
                );
                continue;
            }
            by_name.insert(descriptor.name.clone(), descriptor);
        }

        debug!("Loaded {} workers", by_name.len());
        Ok(by_name.into_values().collect())
    }

    #[instrument(skip(self, descriptor), fields(worker = %descriptor.name))]
    async fn create(&self, descriptor: WorkerDescriptor) -> Result<WorkerDescriptor> {
        validate_worker_name(&descriptor.name)?;

        let _guard = self.write_lock.lock().await;

        if self.list().await?.iter().any(|w| w.name == descriptor.name) {
            return Err(MaestroError::RegistryConflict(descriptor.name));
        }

        fs::create_dir_all(&self.directory).await?;

        let path = self.document_path(&descriptor.name);
        let content = render_worker_document(&descriptor)?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(MaestroError::RegistryConflict(descriptor.name));
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        info!("Created worker document {:?}", path);
        Ok(descriptor)
    }
}

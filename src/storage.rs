use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

/// Opaque blob store for list images, keyed by list id. The data layer only
/// ever stores, probes and deletes whole blobs; format is the caller's
/// business.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put_image(&self, list_id: Uuid, body: Bytes) -> anyhow::Result<()>;
    async fn image_exists(&self, list_id: Uuid) -> bool;
    async fn delete_image(&self, list_id: Uuid) -> anyhow::Result<()>;
}

/// Filesystem-backed image store: `<data_dir>/images/<list_id>.img`.
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("images"),
        }
    }

    fn file_for(&self, list_id: Uuid) -> PathBuf {
        self.root.join(format!("{list_id}.img"))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put_image(&self, list_id: Uuid, body: Bytes) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("create images dir")?;
        tokio::fs::write(self.file_for(list_id), &body)
            .await
            .context("write image")?;
        debug!(list_id = %list_id, bytes = body.len(), "image stored");
        Ok(())
    }

    async fn image_exists(&self, list_id: Uuid) -> bool {
        tokio::fs::try_exists(self.file_for(list_id))
            .await
            .unwrap_or(false)
    }

    async fn delete_image(&self, list_id: Uuid) -> anyhow::Result<()> {
        match tokio::fs::remove_file(self.file_for(list_id)).await {
            Ok(()) => {
                debug!(list_id = %list_id, "image deleted");
                Ok(())
            }
            // Deleting an image that was never stored is not an error.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("delete image"),
        }
    }
}

/// In-memory image store for tests and the fake app state.
#[derive(Default)]
pub struct MemoryImageStore {
    blobs: Mutex<HashMap<Uuid, Bytes>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn put_image(&self, list_id: Uuid, body: Bytes) -> anyhow::Result<()> {
        self.blobs.lock().unwrap().insert(list_id, body);
        Ok(())
    }

    async fn image_exists(&self, list_id: Uuid) -> bool {
        self.blobs.lock().unwrap().contains_key(&list_id)
    }

    async fn delete_image(&self, list_id: Uuid) -> anyhow::Result<()> {
        self.blobs.lock().unwrap().remove(&list_id);
        Ok(())
    }
}

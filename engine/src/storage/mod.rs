//! Single-blob key-value persistence for the conversation store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tracing::warn;

/// Key the whole store is saved under.
pub const STORAGE_KEY: &str = "chat_ui_sim_convos_v1";

/// A place to keep one opaque blob. Reads and writes always cover the
/// whole blob.
pub trait BlobStorage: Send + Sync {
    fn load_blob(&self) -> Result<Option<Vec<u8>>>;
    fn save_blob(&self, blob: &[u8]) -> Result<()>;
}

/// Blob kept in a sled database on disk.
#[derive(Clone)]
pub struct SledStorage {
    db: sled::Db,
}

impl SledStorage {
    const TREE: &'static str = "chatter";

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("failed to create storage directory {:?}", path))?;
        let db = sled::open(path)
            .with_context(|| format!("failed to open sled database at {:?}", path))?;
        Ok(Self { db })
    }

    /// Throwaway database removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .context("failed to open temporary sled database")?;
        Ok(Self { db })
    }

    fn tree(&self) -> sled::Result<sled::Tree> {
        self.db.open_tree(Self::TREE)
    }

    /// Flush to disk. Inside a tokio runtime the flush runs on the blocking
    /// pool so callers holding async locks are not stalled.
    fn flush(tree: sled::Tree) -> Result<()> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    if let Err(error) = tree.flush() {
                        warn!(%error, "failed to flush storage");
                    }
                });
            }
            Err(_) => {
                tree.flush()?;
            }
        }
        Ok(())
    }
}

impl BlobStorage for SledStorage {
    fn load_blob(&self) -> Result<Option<Vec<u8>>> {
        let tree = self.tree()?;
        Ok(tree.get(STORAGE_KEY)?.map(|v| v.to_vec()))
    }

    fn save_blob(&self, blob: &[u8]) -> Result<()> {
        let tree = self.tree()?;
        tree.insert(STORAGE_KEY, blob)?;
        Self::flush(tree)
    }
}

/// In-process blob. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<Vec<u8>>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(blob.into()))),
        }
    }
}

impl BlobStorage for MemoryStorage {
    fn load_blob(&self) -> Result<Option<Vec<u8>>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        Ok(slot.clone())
    }

    fn save_blob(&self, blob: &[u8]) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        *slot = Some(blob.to_vec());
        Ok(())
    }
}

use crate::config::AppConfig;
use crate::session::{ChatSession, SessionEvent};
use crate::storage::{BlobStorage, MemoryStorage, SledStorage};
use crate::store::ConversationStore;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Process-wide handles, built once at startup.
pub struct AppState {
    config: AppConfig,
    session: ChatSession,
}

impl AppState {
    /// Open storage as configured, load the store and start a session.
    pub fn open(config: AppConfig) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>)> {
        let storage: Arc<dyn BlobStorage> = if config.ephemeral {
            info!("using in-memory storage");
            Arc::new(MemoryStorage::new())
        } else {
            info!(data_dir = %config.data_dir.display(), "opening storage");
            Arc::new(SledStorage::open(&config.data_dir)?)
        };
        Ok(Self::with_storage(config, storage))
    }

    pub fn with_storage(
        config: AppConfig,
        storage: Arc<dyn BlobStorage>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let store = ConversationStore::load(storage);
        let (session, events) = ChatSession::new(store, config.timing.clone());
        (Arc::new(Self { config, session }), events)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn build_id(&self) -> &str {
        &self.config.build_id
    }
}

//! Conversation store: the list of conversations, the active pointer, and
//! full-blob persistence after every mutation.
//!
//! Operations that name a conversation or message which no longer exists are
//! silent no-ops. Timer-driven callers rely on this when a conversation is
//! deleted while an exchange is still in flight.

mod snapshot;

pub use snapshot::StoreSnapshot;

use std::sync::Arc;

use anyhow::{Context, Result};
use chatter_messaging::export;
use chatter_messaging::{Conversation, ConversationId, DeliveryStatus, Message, MessageId};
use tracing::{debug, warn};

use crate::storage::BlobStorage;

/// CSV export of a conversation, with the suggested file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
}

pub struct ConversationStore {
    convos: Vec<Conversation>,
    active_id: Option<ConversationId>,
    storage: Arc<dyn BlobStorage>,
}

impl ConversationStore {
    /// Read the persisted store, falling back to the demo conversation when
    /// the blob is missing, unreadable or empty. The first conversation is
    /// activated when nothing valid is active.
    pub fn load(storage: Arc<dyn BlobStorage>) -> Self {
        let persisted = match storage.load_blob() {
            Ok(Some(blob)) => match StoreSnapshot::from_blob(&blob) {
                Ok(snapshot) if !snapshot.convos.is_empty() => Some(snapshot),
                Ok(_) => {
                    debug!("persisted store has no conversations");
                    None
                }
                Err(error) => {
                    warn!(%error, "persisted store is corrupt, starting over");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                warn!(error = %format!("{error:#}"), "failed to read persisted store");
                None
            }
        };

        let bootstrapped = persisted.is_none();
        let snapshot = persisted.unwrap_or_else(StoreSnapshot::bootstrap);
        let mut store = Self {
            convos: snapshot.convos,
            active_id: snapshot.active_id,
            storage,
        };

        let active_valid = store
            .active_id
            .as_ref()
            .is_some_and(|id| store.contains(id));
        if !active_valid {
            store.active_id = store.convos.first().map(|c| c.id.clone());
        }
        if bootstrapped || !active_valid {
            store.persist();
        }

        debug!(
            conversations = store.convos.len(),
            bootstrapped, "conversation store loaded"
        );
        store
    }

    /// Write the whole store to storage.
    pub fn save(&self) -> Result<()> {
        let blob = StoreSnapshot::capture(&self.convos, self.active_id.as_ref())
            .to_blob()
            .context("failed to serialize conversation store")?;
        self.storage
            .save_blob(&blob)
            .context("failed to write conversation store")
    }

    fn persist(&self) {
        if let Err(error) = self.save() {
            warn!(error = %format!("{error:#}"), "failed to persist conversation store");
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.convos
    }

    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        self.convos.iter().find(|c| &c.id == id)
    }

    fn conversation_mut(&mut self, id: &ConversationId) -> Option<&mut Conversation> {
        self.convos.iter_mut().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.conversation(id).is_some()
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.active_id.as_ref()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_id.as_ref().and_then(|id| self.conversation(id))
    }

    /// Insert a new empty conversation at the front and make it active.
    pub fn create_conversation(
        &mut self,
        title: impl Into<String>,
        avatar: impl Into<String>,
    ) -> ConversationId {
        let conversation = Conversation::new(title, avatar);
        let id = conversation.id.clone();
        debug!(conversation = %id, title = %conversation.title, "conversation created");
        self.convos.insert(0, conversation);
        self.active_id = Some(id.clone());
        self.persist();
        id
    }

    /// Remove a conversation. When it was active, the first remaining
    /// conversation (if any) becomes active.
    pub fn delete_conversation(&mut self, id: &ConversationId) {
        let before = self.convos.len();
        self.convos.retain(|c| &c.id != id);
        if self.convos.len() != before {
            debug!(conversation = %id, "conversation deleted");
        }
        if self.active_id.as_ref() == Some(id) {
            self.active_id = self.convos.first().map(|c| c.id.clone());
        }
        self.persist();
    }

    /// Switch the active conversation. Unknown ids leave it unchanged.
    pub fn set_active(&mut self, id: &ConversationId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.active_id = Some(id.clone());
        self.persist();
        true
    }

    /// Append to a conversation's timeline. Returns `false` when the
    /// conversation is gone.
    pub fn append_message(&mut self, conversation_id: &ConversationId, message: Message) -> bool {
        let Some(conversation) = self.conversation_mut(conversation_id) else {
            debug!(conversation = %conversation_id, "append skipped, conversation gone");
            return false;
        };
        conversation.messages.push(message);
        self.persist();
        true
    }

    /// Move a message's status forward. Regressions and unknown ids are
    /// ignored.
    pub fn update_message_status(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        status: DeliveryStatus,
    ) -> bool {
        let advanced = self
            .conversation_mut(conversation_id)
            .and_then(|c| c.message_mut(message_id))
            .is_some_and(|m| m.advance(status));
        if advanced {
            self.persist();
        }
        advanced
    }

    pub fn remove_message(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Option<Message> {
        let removed = self
            .conversation_mut(conversation_id)
            .and_then(|c| c.remove_message(message_id));
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    /// Drop every message of a conversation.
    pub fn clear_messages(&mut self, conversation_id: &ConversationId) -> bool {
        let Some(conversation) = self.conversation_mut(conversation_id) else {
            return false;
        };
        conversation.messages.clear();
        self.persist();
        true
    }

    pub fn export_csv(&self, conversation_id: &ConversationId) -> Option<CsvExport> {
        self.conversation(conversation_id).map(|c| CsvExport {
            file_name: export::export_file_name(c),
            contents: export::to_csv(c),
        })
    }

    pub fn export_active_csv(&self) -> Option<CsvExport> {
        self.active_id.as_ref().and_then(|id| self.export_csv(id))
    }

    /// Persistable view of the current state.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::capture(&self.convos, self.active_id.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chatter_messaging::Sender;

    fn empty_store() -> (ConversationStore, MemoryStorage) {
        let storage = MemoryStorage::with_blob(r#"{"convos":[{"id":"c_seed","title":"Seed","avatar":"🧠","messages":[]}],"activeId":"c_seed"}"#);
        let mut store = ConversationStore::load(Arc::new(storage.clone()));
        store.delete_conversation(&ConversationId::from("c_seed"));
        (store, storage)
    }

    fn persisted(storage: &MemoryStorage) -> StoreSnapshot {
        let blob = storage.load_blob().unwrap().unwrap();
        StoreSnapshot::from_blob(&blob).unwrap()
    }

    fn assert_active_valid(store: &ConversationStore) {
        match store.active_id() {
            Some(id) => assert!(store.contains(id)),
            None => assert!(store.conversations().is_empty()),
        }
    }

    #[test]
    fn missing_blob_bootstraps_demo() {
        let storage = MemoryStorage::new();
        let store = ConversationStore::load(Arc::new(storage.clone()));

        assert_eq!(store.conversations().len(), 1);
        let active = store.active_conversation().unwrap();
        assert_eq!(active.messages.len(), 1);
        assert_eq!(active.messages[0].sender, Sender::Bot);
        // Bootstrap is written back immediately.
        assert_eq!(persisted(&storage), store.snapshot());
    }

    #[test]
    fn corrupt_blob_bootstraps_demo() {
        let storage = MemoryStorage::with_blob("{not json");
        let store = ConversationStore::load(Arc::new(storage));
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.active_conversation().unwrap().messages.len(), 1);
    }

    #[test]
    fn empty_list_bootstraps_demo() {
        let storage = MemoryStorage::with_blob(r#"{"convos":[],"activeId":null}"#);
        let store = ConversationStore::load(Arc::new(storage));
        assert_eq!(store.conversations().len(), 1);
        assert!(store.active_id().is_some());
    }

    #[test]
    fn dangling_active_id_falls_back_to_first() {
        let storage = MemoryStorage::with_blob(
            r#"{"convos":[{"id":"c_a","title":"A","avatar":"🦊","messages":[]},{"id":"c_b","title":"B","avatar":"🧠","messages":[]}],"activeId":"c_gone"}"#,
        );
        let store = ConversationStore::load(Arc::new(storage));
        assert_eq!(store.active_id(), Some(&ConversationId::from("c_a")));
    }

    #[test]
    fn create_inserts_at_front_and_activates() {
        let (mut store, storage) = empty_store();
        let first = store.create_conversation("First", "💬");
        let second = store.create_conversation("Second", "🦊");

        let ids: Vec<_> = store.conversations().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![second.clone(), first]);
        assert_eq!(store.active_id(), Some(&second));
        assert_eq!(persisted(&storage).active_id, Some(second));
    }

    #[test]
    fn delete_active_moves_to_first_remaining() {
        let (mut store, _storage) = empty_store();
        let a = store.create_conversation("A", "💬");
        let b = store.create_conversation("B", "💬");
        let c = store.create_conversation("C", "💬");

        store.delete_conversation(&c);
        assert_eq!(store.active_id(), Some(&b));

        store.set_active(&a);
        store.delete_conversation(&b);
        assert_eq!(store.active_id(), Some(&a));

        store.delete_conversation(&a);
        assert!(store.active_id().is_none());
        assert!(store.active_conversation().is_none());
    }

    #[test]
    fn delete_unknown_is_noop() {
        let (mut store, _storage) = empty_store();
        let a = store.create_conversation("A", "💬");
        store.delete_conversation(&ConversationId::from("c_missing"));
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.active_id(), Some(&a));
    }

    #[test]
    fn active_id_stays_valid_across_sequences() {
        let (mut store, _storage) = empty_store();
        let mut created = Vec::new();
        for round in 0..24 {
            match round % 5 {
                0 | 1 | 3 => created.push(store.create_conversation(format!("c{round}"), "💬")),
                2 => {
                    if let Some(id) = created.first().cloned() {
                        store.delete_conversation(&id);
                        created.remove(0);
                    }
                }
                _ => {
                    if let Some(id) = created.pop() {
                        store.delete_conversation(&id);
                    }
                }
            }
            assert_active_valid(&store);
        }
        while let Some(id) = created.pop() {
            store.delete_conversation(&id);
            assert_active_valid(&store);
        }
        assert!(store.active_id().is_none());
    }

    #[test]
    fn append_to_deleted_conversation_is_noop() {
        let (mut store, storage) = empty_store();
        let id = store.create_conversation("Doomed", "💬");
        store.delete_conversation(&id);

        assert!(!store.append_message(&id, Message::reply("late")));
        assert!(persisted(&storage).convos.is_empty());
    }

    #[test]
    fn status_updates_are_forward_only() {
        let (mut store, _storage) = empty_store();
        let conversation = store.create_conversation("Test", "💬");
        let message = Message::outgoing("hello", None);
        let message_id = message.id.clone();
        store.append_message(&conversation, message);

        assert!(store.update_message_status(&conversation, &message_id, DeliveryStatus::Read));
        assert!(!store.update_message_status(&conversation, &message_id, DeliveryStatus::Sent));
        assert!(!store.update_message_status(&conversation, &MessageId::new(), DeliveryStatus::Read));

        let status = store
            .conversation(&conversation)
            .and_then(|c| c.message(&message_id))
            .map(|m| m.status);
        assert_eq!(status, Some(DeliveryStatus::Read));
    }

    #[test]
    fn typing_placeholder_is_never_saved() {
        let (mut store, storage) = empty_store();
        let conversation = store.create_conversation("Test", "💬");
        let placeholder = Message::typing_placeholder();
        let placeholder_id = placeholder.id.clone();
        store.append_message(&conversation, placeholder);

        assert_eq!(store.conversation(&conversation).unwrap().messages.len(), 1);
        assert!(persisted(&storage).convos[0].messages.is_empty());

        assert!(store.remove_message(&conversation, &placeholder_id).is_some());
        assert!(store.remove_message(&conversation, &placeholder_id).is_none());
    }

    #[test]
    fn save_then_load_reproduces_state() {
        let (mut store, storage) = empty_store();
        let a = store.create_conversation("A", "💬");
        store.append_message(&a, Message::outgoing("hello", Some("data:image/png;base64,AA".into())));
        store.append_message(&a, Message::reply("Hello! How can I help you today?"));
        let b = store.create_conversation("B", "🦊");
        store.set_active(&a);
        store.save().unwrap();

        let reloaded = ConversationStore::load(Arc::new(storage));
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert_eq!(reloaded.active_id(), Some(&a));
        assert!(reloaded.contains(&b));
    }

    #[test]
    fn clear_and_export() {
        let (mut store, _storage) = empty_store();
        assert!(store.export_active_csv().is_none());

        let id = store.create_conversation("Road trip", "🦊");
        store.append_message(&id, Message::outgoing("hello", None));
        let export = store.export_active_csv().unwrap();
        assert_eq!(export.file_name, "Road_trip_export.csv");
        assert_eq!(export.contents.lines().count(), 2);

        assert!(store.clear_messages(&id));
        assert_eq!(store.active_conversation().unwrap().messages.len(), 0);
        assert!(!store.clear_messages(&ConversationId::from("c_missing")));
    }

    #[test]
    fn set_active_rejects_unknown() {
        let (mut store, _storage) = empty_store();
        let id = store.create_conversation("A", "💬");
        assert!(!store.set_active(&ConversationId::from("c_missing")));
        assert_eq!(store.active_id(), Some(&id));
    }
}

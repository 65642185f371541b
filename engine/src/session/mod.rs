//! Chat session: the owned handle drivers talk to.
//!
//! The session wraps the conversation store, starts a simulated exchange for
//! every submitted message and reports each change on an event channel. The
//! events carry no state; drivers pull a [`SessionView`] to re-render.

mod exchange;

use std::sync::Arc;

use chatter_messaging::replies::{ReplyTable, TimingPolicy};
use chatter_messaging::{Conversation, ConversationId, DeliveryStatus, Message, MessageId};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::store::{ConversationStore, CsvExport};
use exchange::ExchangeTask;

/// Title and avatar used when a message is sent with no conversation open.
pub const DEFAULT_TITLE: &str = "New Chat";
pub const DEFAULT_AVATAR: &str = "💬";

/// Something in the store changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConversationsChanged,
    MessageAppended {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    StatusChanged {
        conversation_id: ConversationId,
        message_id: MessageId,
        status: DeliveryStatus,
    },
    TypingStarted {
        conversation_id: ConversationId,
    },
    ReplyArrived {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
}

/// Handle to an in-flight exchange.
#[derive(Debug)]
pub struct Exchange {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub handle: JoinHandle<()>,
}

/// Sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub avatar: String,
    pub preview: String,
    pub is_active: bool,
}

/// Everything a driver needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub conversations: Vec<ConversationSummary>,
    pub active: Option<Conversation>,
}

#[derive(Clone)]
pub struct ChatSession {
    store: Arc<Mutex<ConversationStore>>,
    timing: TimingPolicy,
    replies: Arc<ReplyTable>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ChatSession {
    pub fn new(
        store: ConversationStore,
        timing: TimingPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            store: Arc::new(Mutex::new(store)),
            timing,
            replies: Arc::new(ReplyTable::default()),
            events,
        };
        (session, events_rx)
    }

    pub fn with_replies(mut self, replies: ReplyTable) -> Self {
        self.replies = Arc::new(replies);
        self
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Send `text` (and an optional image reference) to the active
    /// conversation. Blank text without an image is ignored. Opens a new
    /// conversation first when none is active.
    pub async fn submit(&self, text: &str, img_url: Option<String>) -> Option<Exchange> {
        let text = text.trim();
        if text.is_empty() && img_url.is_none() {
            debug!("ignoring empty submission");
            return None;
        }

        let mut store = self.store.lock().await;
        let conversation_id = match store.active_id().cloned() {
            Some(id) => id,
            None => {
                let id = store.create_conversation(DEFAULT_TITLE, DEFAULT_AVATAR);
                self.emit(SessionEvent::ConversationsChanged);
                id
            }
        };

        let message = Message::outgoing(text, img_url);
        let message_id = message.id.clone();
        store.append_message(&conversation_id, message);
        drop(store);

        self.emit(SessionEvent::MessageAppended {
            conversation_id: conversation_id.clone(),
            message_id: message_id.clone(),
        });

        let task = ExchangeTask {
            store: Arc::clone(&self.store),
            timing: self.timing.clone(),
            replies: Arc::clone(&self.replies),
            events: self.events.clone(),
            conversation_id: conversation_id.clone(),
            message_id: message_id.clone(),
            text: text.to_string(),
        };
        let handle = tokio::spawn(task.run());

        Some(Exchange {
            conversation_id,
            message_id,
            handle,
        })
    }

    pub async fn create_conversation(&self, title: &str, avatar: &str) -> ConversationId {
        let id = self.store.lock().await.create_conversation(title, avatar);
        self.emit(SessionEvent::ConversationsChanged);
        id
    }

    pub async fn delete_conversation(&self, id: &ConversationId) {
        self.store.lock().await.delete_conversation(id);
        self.emit(SessionEvent::ConversationsChanged);
    }

    pub async fn select(&self, id: &ConversationId) -> bool {
        let selected = self.store.lock().await.set_active(id);
        if selected {
            self.emit(SessionEvent::ConversationsChanged);
        }
        selected
    }

    /// Empty the active conversation's timeline.
    pub async fn clear_active(&self) -> bool {
        let mut store = self.store.lock().await;
        let Some(id) = store.active_id().cloned() else {
            return false;
        };
        let cleared = store.clear_messages(&id);
        drop(store);
        if cleared {
            self.emit(SessionEvent::ConversationsChanged);
        }
        cleared
    }

    pub async fn export_active(&self) -> Option<CsvExport> {
        self.store.lock().await.export_active_csv()
    }

    pub async fn active_id(&self) -> Option<ConversationId> {
        self.store.lock().await.active_id().cloned()
    }

    pub async fn view(&self) -> SessionView {
        let store = self.store.lock().await;
        let active_id = store.active_id();
        let conversations = store
            .conversations()
            .iter()
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                title: c.title.clone(),
                avatar: c.avatar.clone(),
                preview: c.preview(),
                is_active: active_id == Some(&c.id),
            })
            .collect();
        SessionView {
            conversations,
            active: store.active_conversation().cloned(),
        }
    }

    /// Read access to the underlying store.
    pub async fn inspect<R>(&self, f: impl FnOnce(&ConversationStore) -> R) -> R {
        f(&*self.store.lock().await)
    }
}

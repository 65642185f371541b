use chatter_messaging::{now_ms, Conversation, ConversationId, DeliveryStatus, Message, MessageId, Sender};
use serde::{Deserialize, Serialize};

const WELCOME_TEXT: &str = "Hey! I am Chatter — a simulated bot. Say hi 👋";
const HOUR_MS: i64 = 60 * 60 * 1000;

/// On-disk layout of the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub convos: Vec<Conversation>,
    #[serde(rename = "activeId", default)]
    pub active_id: Option<ConversationId>,
}

impl StoreSnapshot {
    /// Persistable copy of the given state with typing placeholders dropped.
    pub fn capture(convos: &[Conversation], active_id: Option<&ConversationId>) -> Self {
        let convos = convos
            .iter()
            .map(|c| Conversation {
                id: c.id.clone(),
                title: c.title.clone(),
                avatar: c.avatar.clone(),
                messages: c.messages.iter().filter(|m| !m.typing).cloned().collect(),
            })
            .collect();
        Self {
            convos,
            active_id: active_id.cloned(),
        }
    }

    pub fn to_blob(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_blob(blob: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(blob)
    }

    /// First-run state: one demo conversation holding a welcome message.
    pub fn bootstrap() -> Self {
        let welcome = Message {
            id: MessageId::new(),
            sender: Sender::Bot,
            text: WELCOME_TEXT.to_string(),
            ts: now_ms() - HOUR_MS,
            status: DeliveryStatus::Read,
            img_url: None,
            typing: false,
        };
        let mut demo = Conversation::new("Welcome Bot", "🤖");
        demo.messages.push(welcome);
        Self {
            convos: vec![demo],
            active_id: None,
        }
    }
}

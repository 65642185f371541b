//! Conversation and message models shared by the Chatter engine and its drivers.

pub mod export;
pub mod replies;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn prefixed_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Unique identifier assigned to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(prefixed_id("c"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Unique identifier assigned to a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> Self {
        Self(prefixed_id("m"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The local user.
    Me,
    /// The simulated peer.
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Me => "me",
            Sender::Bot => "bot",
        }
    }
}

/// Delivery state of a message. Variants are ordered; a message only ever
/// moves to a later variant.
///
/// Records written without a status read as `Sent`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    #[serde(rename = "sending")]
    Pending,
    #[default]
    #[serde(rename = "sent")]
    Sent,
    #[serde(rename = "read")]
    Read,
}

/// A single entry in a conversation timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    #[serde(rename = "who")]
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    pub ts: i64,
    #[serde(default)]
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    /// Typing placeholder shown while the bot "writes". Never persisted.
    #[serde(skip)]
    pub typing: bool,
}

impl Message {
    /// Outgoing message from the local user, waiting to be sent.
    pub fn outgoing(text: impl Into<String>, img_url: Option<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Me,
            text: text.into(),
            ts: now_ms(),
            status: DeliveryStatus::Pending,
            img_url,
            typing: false,
        }
    }

    /// Reply from the bot. Replies arrive already read.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Bot,
            text: text.into(),
            ts: now_ms(),
            status: DeliveryStatus::Read,
            img_url: None,
            typing: false,
        }
    }

    pub fn typing_placeholder() -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Bot,
            text: String::new(),
            ts: now_ms(),
            status: DeliveryStatus::Pending,
            img_url: None,
            typing: true,
        }
    }

    pub fn is_mine(&self) -> bool {
        self.sender == Sender::Me
    }

    /// Move the status forward. Returns `false` and leaves the message
    /// untouched when `next` is not strictly later than the current status.
    pub fn advance(&mut self, next: DeliveryStatus) -> bool {
        if next > self.status {
            self.status = next;
            true
        } else {
            false
        }
    }
}

/// A conversation thread with its ordered messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub avatar: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(title: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            title: title.into(),
            avatar: avatar.into(),
            messages: Vec::new(),
        }
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }

    /// Remove a message by id, returning it if it was present.
    pub fn remove_message(&mut self, id: &MessageId) -> Option<Message> {
        let pos = self.messages.iter().position(|m| &m.id == id)?;
        Some(self.messages.remove(pos))
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| !m.typing)
    }

    /// Number of real messages, excluding typing placeholders.
    pub fn message_count(&self) -> usize {
        self.messages.iter().filter(|m| !m.typing).count()
    }

    pub fn is_typing(&self) -> bool {
        self.messages.iter().any(|m| m.typing)
    }

    /// One-line summary used by conversation lists.
    pub fn preview(&self) -> String {
        match self.last_message() {
            Some(last) if last.is_mine() => format!("You: {}", last.text),
            Some(last) => last.text.clone(),
            None => "No messages".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_regresses() {
        let mut message = Message::outgoing("hello", None);
        assert_eq!(message.status, DeliveryStatus::Pending);

        assert!(message.advance(DeliveryStatus::Sent));
        assert!(message.advance(DeliveryStatus::Read));
        assert!(!message.advance(DeliveryStatus::Sent));
        assert!(!message.advance(DeliveryStatus::Pending));
        assert!(!message.advance(DeliveryStatus::Read));
        assert_eq!(message.status, DeliveryStatus::Read);
    }

    #[test]
    fn status_can_skip_forward() {
        let mut message = Message::outgoing("hello", None);
        assert!(message.advance(DeliveryStatus::Read));
        assert_eq!(message.status, DeliveryStatus::Read);
    }

    #[test]
    fn message_uses_storage_field_names() {
        let mut message = Message::outgoing("hi", Some("data:image/png;base64,AAAA".into()));
        message.ts = 1_700_000_000_000;
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["who"], "me");
        assert_eq!(value["status"], "sending");
        assert_eq!(value["ts"], 1_700_000_000_000_i64);
        assert_eq!(value["imgUrl"], "data:image/png;base64,AAAA");
        assert!(value.get("typing").is_none());
    }

    #[test]
    fn missing_status_reads_as_sent() {
        let message: Message =
            serde_json::from_str(r#"{"id":"m_1","who":"bot","text":"yo","ts":5}"#).unwrap();
        assert_eq!(message.status, DeliveryStatus::Sent);
        assert_eq!(message.img_url, None);
        assert!(!message.typing);
    }

    #[test]
    fn preview_follows_last_real_message() {
        let mut conversation = Conversation::new("Test", "💬");
        assert_eq!(conversation.preview(), "No messages");

        conversation.messages.push(Message::outgoing("hello", None));
        assert_eq!(conversation.preview(), "You: hello");

        conversation.messages.push(Message::typing_placeholder());
        assert_eq!(conversation.preview(), "You: hello");
        assert_eq!(conversation.message_count(), 1);
        assert!(conversation.is_typing());

        conversation.messages.push(Message::reply("Hello! How can I help you today?"));
        assert_eq!(conversation.preview(), "Hello! How can I help you today?");
    }

    #[test]
    fn ids_carry_prefix() {
        assert!(ConversationId::new().as_str().starts_with("c_"));
        assert!(MessageId::new().as_str().starts_with("m_"));
        assert_ne!(MessageId::new(), MessageId::new());
    }
}

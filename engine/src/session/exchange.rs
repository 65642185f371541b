//! One simulated round trip: mark the outgoing message sent, show the bot
//! typing, then swap the placeholder for the reply.

use std::sync::Arc;

use chatter_messaging::replies::{ReplyTable, TimingPolicy};
use chatter_messaging::{ConversationId, DeliveryStatus, Message, MessageId};
use chrono::Local;
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;
use tracing::debug;

use super::SessionEvent;
use crate::store::ConversationStore;

pub(super) struct ExchangeTask {
    pub store: Arc<Mutex<ConversationStore>>,
    pub timing: TimingPolicy,
    pub replies: Arc<ReplyTable>,
    pub events: mpsc::UnboundedSender<SessionEvent>,
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub text: String,
}

impl ExchangeTask {
    pub async fn run(self) {
        sleep(self.timing.send_delay()).await;

        {
            let mut store = self.store.lock().await;
            if !store.contains(&self.conversation_id) {
                debug!(conversation = %self.conversation_id, "conversation gone before send");
                return;
            }
            if store.update_message_status(
                &self.conversation_id,
                &self.message_id,
                DeliveryStatus::Sent,
            ) {
                self.emit(SessionEvent::StatusChanged {
                    conversation_id: self.conversation_id.clone(),
                    message_id: self.message_id.clone(),
                    status: DeliveryStatus::Sent,
                });
            }
        }

        let reply = self.replies.select(&self.text, Local::now().time());
        let placeholder = Message::typing_placeholder();
        let placeholder_id = placeholder.id.clone();

        {
            let mut store = self.store.lock().await;
            if !store.append_message(&self.conversation_id, placeholder) {
                return;
            }
            self.emit(SessionEvent::TypingStarted {
                conversation_id: self.conversation_id.clone(),
            });
        }

        sleep(self.timing.typing_delay(&reply)).await;

        let mut store = self.store.lock().await;
        store.remove_message(&self.conversation_id, &placeholder_id);
        let reply = Message::reply(reply);
        let reply_id = reply.id.clone();
        if !store.append_message(&self.conversation_id, reply) {
            debug!(conversation = %self.conversation_id, "conversation gone before reply");
            return;
        }
        debug!(conversation = %self.conversation_id, message = %reply_id, "reply delivered");
        self.emit(SessionEvent::ReplyArrived {
            conversation_id: self.conversation_id.clone(),
            message_id: reply_id,
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

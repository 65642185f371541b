//! Plain-text export of a conversation timeline.

use crate::{Conversation, Message};
use chrono::{DateTime, SecondsFormat, Utc};

const HEADER: [&str; 3] = ["who", "text", "timestamp"];

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// RFC 3339 UTC timestamp with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub fn format_timestamp(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn row(message: &Message) -> String {
    [
        quote(message.sender.as_str()),
        quote(&message.text),
        quote(&format_timestamp(message.ts)),
    ]
    .join(",")
}

/// Render the conversation as quoted CSV: a `who,text,timestamp` header and
/// one row per message. Typing placeholders are skipped.
pub fn to_csv(conversation: &Conversation) -> String {
    let header = HEADER.iter().map(|h| quote(h)).collect::<Vec<_>>().join(",");
    std::iter::once(header)
        .chain(
            conversation
                .messages
                .iter()
                .filter(|m| !m.typing)
                .map(row),
        )
        .collect::<Vec<_>>()
        .join("\n")
}

/// Suggested file name for an export of `conversation`. Each run of
/// whitespace in the title becomes one `_`, including runs at either end.
pub fn export_file_name(conversation: &Conversation) -> String {
    let mut stem = String::with_capacity(conversation.title.len());
    let mut in_space = false;
    for ch in conversation.title.chars() {
        if ch.is_whitespace() {
            if !in_space {
                stem.push('_');
            }
            in_space = true;
        } else {
            stem.push(ch);
            in_space = false;
        }
    }
    format!("{}_export.csv", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeliveryStatus, MessageId, Sender};

    fn message(sender: Sender, text: &str, ts: i64) -> Message {
        Message {
            id: MessageId::new(),
            sender,
            text: text.to_string(),
            ts,
            status: DeliveryStatus::Read,
            img_url: None,
            typing: false,
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut conversation = Conversation::new("Test", "💬");
        conversation.messages.push(message(Sender::Me, "hello", 0));
        conversation
            .messages
            .push(message(Sender::Bot, "Hello! How can I help you today?", 1_500));

        let csv = to_csv(&conversation);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#""who","text","timestamp""#);
        assert_eq!(lines[1], r#""me","hello","1970-01-01T00:00:00.000Z""#);
        assert_eq!(
            lines[2],
            r#""bot","Hello! How can I help you today?","1970-01-01T00:00:01.500Z""#
        );
    }

    #[test]
    fn quotes_are_doubled() {
        let mut conversation = Conversation::new("Quotes", "💬");
        conversation
            .messages
            .push(message(Sender::Me, r#"she said "hi", twice"#, 0));

        let csv = to_csv(&conversation);
        assert!(csv.ends_with(r#""me","she said ""hi"", twice","1970-01-01T00:00:00.000Z""#));
    }

    #[test]
    fn placeholders_are_not_exported() {
        let mut conversation = Conversation::new("Typing", "🤖");
        conversation.messages.push(Message::typing_placeholder());
        assert_eq!(to_csv(&conversation).lines().count(), 1);
    }

    #[test]
    fn file_name_collapses_whitespace() {
        let conversation = Conversation::new("Welcome   Bot chat", "🤖");
        assert_eq!(export_file_name(&conversation), "Welcome_Bot_chat_export.csv");
    }

    #[test]
    fn file_name_keeps_edge_whitespace_runs() {
        let padded = Conversation::new(" Bot ", "🤖");
        assert_eq!(export_file_name(&padded), "_Bot__export.csv");

        let tabs = Conversation::new("\t\tNew Chat \n", "💬");
        assert_eq!(export_file_name(&tabs), "_New_Chat__export.csv");
    }
}

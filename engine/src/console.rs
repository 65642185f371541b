//! Line-oriented terminal driver: command parsing and plain-text rendering.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use chatter_messaging::{Conversation, ConversationId, DeliveryStatus, Message, Sender};
use chrono::{Local, TimeZone};
use rand::seq::SliceRandom;

use crate::session::{ChatSession, SessionView};

const AVATARS: [&str; 5] = ["🤖", "💬", "🦊", "👩‍💻", "🧠"];

pub const HELP: &str = "\
Type a message and press Enter to send it.
  /new [title]          start a conversation
  /list                 list conversations
  /open <n|id>          switch conversation
  /delete [n|id]        delete a conversation (default: current)
  /clear                remove all messages in the current conversation
  /export [path]        write the current conversation as CSV
  /attach <file> [text] send an image with optional text
  /help                 show this help
  /quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New(Option<String>),
    List,
    Open(String),
    Delete(Option<String>),
    Clear,
    Export(Option<PathBuf>),
    Attach { path: PathBuf, text: String },
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),
    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> std::result::Result<Self, CommandError> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Send(line.to_string()));
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let arg = (!arg.is_empty()).then(|| arg.to_string());

        match name {
            "new" => Ok(Command::New(arg)),
            "list" | "ls" => Ok(Command::List),
            "open" => arg.map(Command::Open).ok_or(CommandError::MissingArgument("open")),
            "delete" | "rm" => Ok(Command::Delete(arg)),
            "clear" => Ok(Command::Clear),
            "export" => Ok(Command::Export(arg.map(PathBuf::from))),
            "attach" => {
                let arg = arg.ok_or(CommandError::MissingArgument("attach"))?;
                let (path, text) = match arg.split_once(char::is_whitespace) {
                    Some((path, text)) => (path, text.trim()),
                    None => (arg.as_str(), ""),
                };
                Ok(Command::Attach {
                    path: PathBuf::from(path),
                    text: text.to_string(),
                })
            }
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Resolve a 1-based list position or a raw conversation id.
fn resolve(view: &SessionView, reference: &str) -> Option<ConversationId> {
    if let Ok(index) = reference.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| view.conversations.get(i))
            .map(|c| c.id.clone());
    }
    view.conversations
        .iter()
        .find(|c| c.id.as_str() == reference)
        .map(|c| c.id.clone())
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Inline an image file as a data URL.
pub fn image_data_url(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime_for(path), encoded))
}

/// Run one command. Returns a line of feedback for the user, if any.
pub async fn execute(session: &ChatSession, command: Command) -> Result<Option<String>> {
    match command {
        Command::Send(text) => {
            session.submit(&text, None).await;
            Ok(None)
        }
        Command::New(title) => {
            let title = title.unwrap_or_else(|| "New Chat".to_string());
            let avatar = AVATARS.choose(&mut rand::thread_rng()).copied().unwrap_or("💬");
            session.create_conversation(&title, avatar).await;
            Ok(None)
        }
        Command::List => Ok(Some(render_sidebar(&session.view().await))),
        Command::Open(reference) => {
            let view = session.view().await;
            match resolve(&view, &reference) {
                Some(id) => {
                    session.select(&id).await;
                    Ok(None)
                }
                None => Ok(Some(format!("no conversation matches {reference}"))),
            }
        }
        Command::Delete(reference) => {
            let view = session.view().await;
            let target = match reference {
                Some(reference) => resolve(&view, &reference),
                None => view.active.as_ref().map(|c| c.id.clone()),
            };
            match target {
                Some(id) => {
                    session.delete_conversation(&id).await;
                    Ok(None)
                }
                None => Ok(Some("nothing to delete".to_string())),
            }
        }
        Command::Clear => {
            if session.clear_active().await {
                Ok(None)
            } else {
                Ok(Some("no conversation selected".to_string()))
            }
        }
        Command::Export(path) => {
            let Some(export) = session.export_active().await else {
                return Ok(Some("No conversation to export".to_string()));
            };
            let path = path.unwrap_or_else(|| PathBuf::from(&export.file_name));
            fs::write(&path, export.contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(Some(format!("exported to {}", path.display())))
        }
        Command::Attach { path, text } => {
            let url = image_data_url(&path)?;
            session.submit(&text, Some(url)).await;
            Ok(None)
        }
        Command::Help => Ok(Some(HELP.to_string())),
        Command::Quit => Ok(None),
    }
}

fn clock(ts_ms: i64) -> String {
    Local
        .timestamp_millis_opt(ts_ms)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

fn status_mark(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Pending => "…",
        DeliveryStatus::Sent => "✓",
        DeliveryStatus::Read => "✓✓",
    }
}

pub fn render_message(message: &Message) -> String {
    if message.typing {
        return "🤖  typing…".to_string();
    }
    let mut body = message.text.clone();
    if message.img_url.is_some() {
        body = if body.is_empty() {
            "[image]".to_string()
        } else {
            format!("[image] {body}")
        };
    }
    let meta = format!("{} {}", clock(message.ts), status_mark(message.status));
    match message.sender {
        Sender::Me => format!("{:>60}  🧑\n{:>62}", body, meta),
        Sender::Bot => format!("🤖  {}\n    {}", body, meta),
    }
}

pub fn render_conversation(conversation: Option<&Conversation>) -> String {
    let Some(conversation) = conversation else {
        return "No conversation selected. Type /new to start one.".to_string();
    };
    let mut out = format!(
        "── {} {} ({} message(s)) ──",
        conversation.avatar,
        conversation.title,
        conversation.message_count()
    );
    for message in &conversation.messages {
        out.push('\n');
        out.push_str(&render_message(message));
    }
    out
}

pub fn render_sidebar(view: &SessionView) -> String {
    if view.conversations.is_empty() {
        return "No conversations.".to_string();
    }
    view.conversations
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let marker = if c.is_active { '>' } else { ' ' };
            format!("{marker}{:>2}. {} {}  {}", i + 1, c.avatar, c.title, c.preview)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render(view: &SessionView) -> String {
    render_conversation(view.active.as_ref())
}

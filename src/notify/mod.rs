//! Chat notification delivery.
//!
//! Sessions talk to an abstract [`Notifier`]; delivery failures are handled
//! inside the implementation and never propagate into session loops.

pub mod telegram;

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

pub use telegram::TelegramNotifier;

/// Outbound chat message delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a message to a chat. `markdown` requests formatted delivery;
    /// implementations fall back to plain text when formatting fails.
    async fn send(&self, chat_id: i64, text: &str, markdown: bool);
}

/// Notifier that writes messages to the log. Used when no chat transport is
/// configured and for one-shot CLI commands.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, chat_id: i64, text: &str, _markdown: bool) {
        info!(chat_id, "{}", text);
    }
}

/// Notifier that records messages in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(i64, String, bool)>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages recorded so far.
    pub fn messages(&self) -> Vec<(i64, String, bool)> {
        self.messages.lock().unwrap().clone()
    }

    /// Message texts only.
    pub fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, text: &str, markdown: bool) {
        self.messages
            .lock()
            .unwrap()
            .push((chat_id, text.to_string(), markdown));
    }
}

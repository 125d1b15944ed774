//! In-memory, append-only message log.
use chat_common::{ChatMessage, MessageId};
use chrono::{DateTime, Utc};

/// Ordered record of every message still present in the room.
///
/// The log is not synchronized on its own; [`ChatHub`](super::ChatHub) owns
/// it behind the same lock as the connection registry.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<ChatMessage>,
    last_id: MessageId,
    last_time: Option<DateTime<Utc>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new message at the tail and return it.
    ///
    /// Timestamps never go backwards, even if the wall clock does.
    pub fn append(&mut self, author: &str, body: String) -> ChatMessage {
        self.last_id += 1;

        let now = Utc::now();
        let time = match self.last_time {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.last_time = Some(time);

        let message = ChatMessage {
            id: self.last_id,
            user: author.to_string(),
            content: body,
            time,
        };
        self.entries.push(message.clone());
        message
    }

    /// Current contents in creation order
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.entries.clone()
    }

    /// Delete the entry with `id`. Survivors keep their ids and order.
    pub fn remove_by_id(&mut self, id: MessageId) -> bool {
        // Entries are appended with increasing ids, so the vector stays sorted.
        match self.entries.binary_search_by_key(&id, |m| m.id) {
            Ok(index) => {
                self.entries.remove(index);
                true
            },
            Err(_) => false,
        }
    }

    pub fn count_by_author(&self, author: &str) -> usize {
        self.entries.iter().filter(|m| m.user == author).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

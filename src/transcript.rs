//! Conversation transcript: the single source of truth for one session.
//!
//! The transcript is append-only with one exception: while an assistant
//! response streams, the most recently appended entry (and only that entry)
//! grows chunk by chunk. Every entry gets a stable opaque id at creation
//! time; selections are keyed by id, so filtering never shifts what the user
//! marked.

use crate::api::{ChatMessage, Role};
use crate::styles::StyleProfile;
use serde::{Deserialize, Serialize};

/// Stable opaque identifier assigned to a message at append time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MessageId(u64);

#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
}

pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
    streaming: bool,
}

impl Transcript {
    /// Seed a transcript with a persona: its system prompt first, then the
    /// persona's opening assistant message.
    pub fn for_style(style: &StyleProfile) -> Self {
        let mut transcript = Self::empty();
        transcript.push(Role::System, style.system_prompt);
        transcript.push(Role::Assistant, style.opening_message);
        transcript
    }

    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 0,
            streaming: false,
        }
    }

    fn push(&mut self, role: Role, content: impl Into<String>) -> MessageId {
        assert!(
            !self.streaming,
            "Cannot append while a response is streaming"
        );
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            role,
            content: content.into(),
        });
        id
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        self.push(Role::User, content)
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> MessageId {
        self.push(Role::Assistant, content)
    }

    /// Open an empty assistant entry for an in-flight streamed response.
    /// Until [`finish_streaming`](Self::finish_streaming) is called, only
    /// this entry may change, and only by concatenation.
    pub fn begin_streaming(&mut self) -> MessageId {
        let id = self.push(Role::Assistant, "");
        self.streaming = true;
        id
    }

    /// Concatenate one streamed chunk onto the in-flight assistant entry.
    ///
    /// # Panics
    /// Panics if no streamed response is in flight.
    pub fn push_chunk(&mut self, text: &str) {
        assert!(self.streaming, "No streamed response in flight");
        let last = self
            .messages
            .last_mut()
            .expect("streaming flag set on empty transcript");
        last.content.push_str(text);
    }

    /// Seal the in-flight assistant entry. The transcript is append-only
    /// again after this.
    pub fn finish_streaming(&mut self) {
        self.streaming = false;
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// The rendered view: every entry except the system persona.
    /// Selection and pairing operate on this view.
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The full message list for an outbound completion request:
    /// system persona first, then every turn in order.
    pub fn request_messages(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

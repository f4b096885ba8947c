use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
    System,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One text fragment of a streamed completion, delivered in arrival order.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatChunk {
    pub role: Role,
    pub content: String,
}

impl ChatChunk {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatChunk {
            role,
            content: content.into(),
        }
    }

    /// Terminal chunk carrying a human-readable failure annotation.
    ///
    /// Streamed completions never fail through the caller's await; a transport
    /// failure mid-stream arrives as one last chunk whose text starts with
    /// this annotation, and the stream ends after it.
    pub fn error_annotation(err: impl std::fmt::Display) -> Self {
        ChatChunk {
            role: Role::Assistant,
            content: format!("\n\nError: {}", err),
        }
    }
}

impl From<ChatChunk> for ChatMessage {
    fn from(chunk: ChatChunk) -> Self {
        ChatMessage {
            role: chunk.role,
            content: chunk.content,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatRequest {
    pub(crate) messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        ChatRequest { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

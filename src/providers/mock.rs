//! Simulated chat backend for offline development.
//!
//! Detects the active persona from the system message and answers with a
//! canned, style-appropriate critique. Streaming mode drips the reply word
//! by word with a small delay so the consumer's chunk path is exercised.

use crate::api::{ChatChunk, ChatMessage, ChatRequest, Role};
use crate::error::StreamError;
use crate::styles::{self, StyleProfile};
use crate::{ChatModel, ChatStream};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use std::time::Duration;

const REPLY_DELAY: Duration = Duration::from_millis(400);
const CHUNK_DELAY: Duration = Duration::from_millis(25);

#[derive(Clone, Default)]
pub struct MockChatModel;

impl MockChatModel {
    pub fn new() -> Self {
        MockChatModel
    }

    fn active_style(request: &ChatRequest) -> Option<&'static StyleProfile> {
        let system = request
            .messages()
            .iter()
            .find(|m| m.role == Role::System)?;
        styles::STYLES
            .iter()
            .find(|s| s.system_prompt == system.content)
    }

    fn last_user_text(request: &ChatRequest) -> &str {
        request
            .messages()
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    fn head_of(text: &str, chars: usize) -> String {
        text.chars().take(chars).collect()
    }

    fn reply_for(request: &ChatRequest) -> String {
        let last = Self::last_user_text(request);

        match Self::active_style(request).map(|s| s.id) {
            Some("minimalist") => format!(
                "[simulated] I see \"{}...\". Try deleting every adjective in \
                 that sentence and keeping only the verbs. What's left?",
                Self::head_of(last, 18)
            ),
            Some("sensory") => "[simulated] This reads flat. Close your eyes: what \
                 did that moment smell like? Work that one detail into the sentence."
                .to_string(),
            Some("logical") => format!(
                "[simulated] Interesting claim, but where's the evidence? \
                 \"{}...\" stands unsupported so far.",
                Self::head_of(last, 24)
            ),
            _ => format!(
                "[simulated] Received: {}. Keep revising in the current style.",
                Self::head_of(last, 40)
            ),
        }
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatMessage> {
        tokio::time::sleep(REPLY_DELAY).await;
        Ok(ChatMessage::assistant(Self::reply_for(request)))
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream, StreamError> {
        let reply = Self::reply_for(request);
        let words: Vec<String> = reply
            .split_inclusive(' ')
            .map(|w| w.to_string())
            .collect();

        let stream = stream::iter(words).then(|word| async move {
            tokio::time::sleep(CHUNK_DELAY).await;
            ChatChunk::new(Role::Assistant, word)
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_style(style_id: &str, user: &str) -> ChatRequest {
        let style = styles::by_id(style_id).unwrap();
        ChatRequest::new(vec![
            ChatMessage::system(style.system_prompt),
            ChatMessage::user(user),
        ])
    }

    #[tokio::test]
    async fn reply_matches_the_active_persona() {
        let request = request_with_style("logical", "Everyone agrees the city is dying.");
        let reply = MockChatModel::new().chat(&request).await.unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.contains("evidence"));
        assert!(reply.content.contains("Everyone agrees"));
    }

    #[tokio::test]
    async fn streamed_chunks_reassemble_to_the_full_reply() {
        let request = request_with_style("minimalist", "The very beautiful old house.");
        let model = MockChatModel::new();

        let full = MockChatModel::reply_for(&request);
        let mut streamed = String::new();
        let mut stream = model.stream_chat(&request).await.unwrap();
        while let Some(chunk) = stream.next().await {
            streamed.push_str(&chunk.content);
        }

        assert_eq!(streamed, full);
    }

    #[test]
    fn unknown_system_prompt_falls_back_to_generic_reply() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("You are a pirate."),
            ChatMessage::user("Arr."),
        ]);
        assert!(MockChatModel::reply_for(&request).contains("Received"));
    }
}

use crate::api::{ChatChunk, ChatMessage, ChatRequest, Role};
use crate::client::{Client, LineEvent};
use crate::error::StreamError;
use crate::{ChatModel, ChatStream};
use async_trait::async_trait;
use futures::StreamExt;

use super::api::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};

const END_OF_STREAM: &str = "[DONE]";

/// Classify one protocol line of the event stream.
///
/// Only `data:`-prefixed lines carry events; the `[DONE]` payload is the
/// end-of-stream sentinel. Everything else (blank lines, keep-alives) is
/// ignored.
fn classify_line(line: &str) -> LineEvent<'_> {
    match line.trim().strip_prefix("data:") {
        Some(payload) => {
            let payload = payload.trim();
            if payload == END_OF_STREAM {
                LineEvent::Done
            } else {
                LineEvent::Data(payload)
            }
        }
        None => LineEvent::Ignore,
    }
}

#[derive(Clone)]
pub struct DeepSeekChatModel {
    client: Client,
    base_url: String,
    model_name: String,
    temperature: f64,
    enable_thinking: bool,
}

impl DeepSeekChatModel {
    pub fn new(
        client: Client,
        base_url: String,
        model_name: String,
        temperature: f64,
        enable_thinking: bool,
    ) -> Self {
        DeepSeekChatModel {
            client,
            base_url,
            model_name,
            temperature,
            enable_thinking,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn wire_request(&self, request: &ChatRequest, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest::from_request(
            self.model_name.clone(),
            self.temperature,
            self.enable_thinking,
            request,
            stream,
        )
    }
}

#[async_trait]
impl ChatModel for DeepSeekChatModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatMessage> {
        let wire = self.wire_request(request, false);
        let response: ChatCompletionResponse = self.client.post(self.chat_url(), &wire).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Completion response carried no choices"))?;
        Ok(ChatMessage {
            role: choice.message.role,
            content: choice.message.content,
        })
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream, StreamError> {
        let wire = self.wire_request(request, true);

        let stream = self
            .client
            .post_stream::<_, _, _, ChatCompletionChunk>(self.chat_url(), &wire, classify_line)
            .await?;

        // A delta fragment becomes a chunk only when it carries text; a
        // mid-stream transport failure becomes one final annotated chunk, so
        // the consumer's await side never raises.
        let chat_stream = stream.filter_map(|item| {
            futures::future::ready(match item {
                Ok(chunk) => match chunk.choices.into_iter().next() {
                    Some(choice) => {
                        let role = choice.delta.role.unwrap_or(Role::Assistant);
                        choice
                            .delta
                            .content
                            .filter(|text| !text.is_empty())
                            .map(|text| ChatChunk::new(role, text))
                    }
                    None => None,
                },
                Err(e) => Some(ChatChunk::error_annotation(e)),
            })
        });

        Ok(Box::pin(chat_stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_lines_are_classified_as_events() {
        match classify_line("data: {\"id\":\"x\"}") {
            LineEvent::Data(payload) => assert_eq!(payload, "{\"id\":\"x\"}"),
            _ => panic!("expected data"),
        }
    }

    #[test]
    fn done_payload_is_the_sentinel() {
        assert!(matches!(classify_line("data: [DONE]"), LineEvent::Done));
        assert!(matches!(classify_line("data:[DONE]"), LineEvent::Done));
    }

    #[test]
    fn other_lines_are_ignored() {
        assert!(matches!(classify_line(""), LineEvent::Ignore));
        assert!(matches!(classify_line(": keep-alive"), LineEvent::Ignore));
        assert!(matches!(classify_line("event: ping"), LineEvent::Ignore));
    }
}

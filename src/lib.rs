use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;

pub mod api;
pub mod archive;
mod client;
pub mod error;
pub mod providers;
pub mod reconcile;
pub mod styles;
pub mod transcript;

pub use api::{ChatChunk, ChatMessage, ChatRequest, Role};
pub use error::{AuthError, FetchError, StreamError, SyncError, ValidationError};

/// A finite, non-restartable stream of completion fragments, delivered
/// exactly once each, in arrival order.
pub type ChatStream = Pin<Box<dyn Stream<Item = ChatChunk> + Send>>;

#[async_trait]
pub trait ChatModel {
    fn name(&self) -> &str;

    /// One-shot completion: the full reply in a single response body.
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatMessage>;

    /// Streamed completion. Fails only if the initial request is rejected;
    /// once the stream exists, failures arrive in-band as a final annotated
    /// chunk and the stream simply ends.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream, StreamError>;
}

// Blanket implementation for Arc<dyn ChatModel> to make it easier to work with
#[async_trait]
impl ChatModel for Arc<dyn ChatModel + Send + Sync> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<ChatMessage> {
        (**self).chat(request).await
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream, StreamError> {
        (**self).stream_chat(request).await
    }
}

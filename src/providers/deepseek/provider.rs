use crate::ChatModel;
use crate::client::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::sync::Arc;

use super::chat::DeepSeekChatModel;

/// OpenAI-compatible completion backend (DeepSeek wire format).
#[derive(Clone)]
pub struct DeepSeekProvider {
    client: Client,
    base_url: String,
}

impl DeepSeekProvider {
    /// Create a provider against a base URL (e.g. for proxying or
    /// API-compatible services). The bearer key is baked into every request.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .expect("Invalid API key format"),
        );

        DeepSeekProvider {
            client: Client::with_headers(headers),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn create_chat_model(
        &self,
        model_name: &str,
        temperature: f64,
        enable_thinking: bool,
    ) -> Arc<dyn ChatModel + Send + Sync> {
        Arc::new(DeepSeekChatModel::new(
            self.client.clone(),
            self.base_url.clone(),
            model_name.to_string(),
            temperature,
            enable_thinking,
        ))
    }
}

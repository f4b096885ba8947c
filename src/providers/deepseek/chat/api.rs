use crate::api::{ChatMessage, ChatRequest, Role};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl From<&ChatMessage> for Message {
    fn from(msg: &ChatMessage) -> Self {
        Message {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Sent as "none" when the model's reasoning mode is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

impl ChatCompletionRequest {
    pub fn from_request(
        model: String,
        temperature: f64,
        enable_thinking: bool,
        request: &ChatRequest,
        stream: bool,
    ) -> Self {
        ChatCompletionRequest {
            model,
            messages: request.messages().iter().map(|m| m.into()).collect(),
            temperature,
            stream: if stream { Some(true) } else { None },
            reasoning_effort: if enable_thinking {
                None
            } else {
                Some("none".to_string())
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatCompletionChoice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatCompletionChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatCompletionChunkChoice {
    pub index: u32,
    pub delta: ChatCompletionChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatCompletionChunkChoice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_temperature_and_disabled_reasoning() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let wire = ChatCompletionRequest::from_request(
            "deepseek-chat".into(),
            0.7,
            false,
            &request,
            false,
        );

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["model"], "deepseek-chat");
        assert_eq!(json["temperature"], 0.7);
        assert_eq!(json["reasoning_effort"], "none");
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn streaming_request_sets_stream_and_thinking_omits_effort() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let wire = ChatCompletionRequest::from_request(
            "deepseek-chat".into(),
            0.7,
            true,
            &request,
            true,
        );

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["stream"], true);
        assert!(json.get("reasoning_effort").is_none());
    }
}

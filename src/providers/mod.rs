pub mod deepseek;
pub mod mock;

pub use deepseek::DeepSeekProvider;
pub use mock::MockChatModel;

use crate::ChatModel;
use std::sync::Arc;
use tracing::info;

/// Resolve the chat backend once at startup.
///
/// The simulated backend is used when forced by configuration or when no API
/// key is present; otherwise the real backend is built from the settings.
pub fn create_chat_model(settings: &config::ChatSettings) -> Arc<dyn ChatModel + Send + Sync> {
    if settings.use_simulated {
        info!("chat backend: simulated (forced by configuration)");
        return Arc::new(MockChatModel::new());
    }

    match settings.api_key.as_deref() {
        Some(api_key) => {
            info!(model = %settings.model, "chat backend: {}", settings.base_url);
            DeepSeekProvider::new(&settings.base_url, api_key).create_chat_model(
                &settings.model,
                settings.temperature,
                settings.enable_thinking,
            )
        }
        None => {
            info!("chat backend: simulated (no API key configured)");
            Arc::new(MockChatModel::new())
        }
    }
}

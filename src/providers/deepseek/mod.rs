pub mod chat;
pub mod provider;

pub use chat::DeepSeekChatModel;
pub use provider::DeepSeekProvider;

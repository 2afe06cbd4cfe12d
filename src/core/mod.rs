pub mod engine;
pub mod moderation;
pub mod openrouter;

pub use crate::domain::model::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, GenerateResponse, RequestCycle, Stage,
};
pub use crate::domain::ports::{CompletionClient, ConfigProvider};
pub use crate::utils::error::Result;

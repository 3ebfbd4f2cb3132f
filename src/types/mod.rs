// Public modules
pub mod chat_completion;
pub mod message;
pub mod model;

// Re-exports
pub use chat_completion::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessageParam, ChatRole, CompletionUsage,
    DEFAULT_TEMPERATURE,
};
pub use message::{Message, MessageRole};
pub use model::{Model, Provider};

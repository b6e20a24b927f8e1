pub mod core;
pub mod models;
pub mod tokenizer;

pub use self::core::{CompletionRequest, Conversation};
pub use models::{
    ChatModel, CompletionResult, FitOptions, FittedPrompt, Message, Role, Transcript,
};
pub use tokenizer::{BoxedTokenCounter, Cl100kCounter, Token, TokenCounter, split_at_budget};

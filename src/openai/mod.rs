pub mod core;

pub use self::core::{
    BoxedCompletionService, ChatResponse, CompletionService, FinishReason, OpenAiClient, Usage,
};

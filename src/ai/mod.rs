pub mod chat;
pub mod prompt;
pub mod summarizer;
pub mod testing;

pub use summarizer::Summarizer;

//! Test utilities for integration tests
use serde_json::json;

pub use recap::ai::testing::char_counter;

/// A chat completion response body as an OpenAI compatible API
/// would send it.
pub fn completion_body(model: &str, content: &str) -> String {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1694268190,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
    .to_string()
}

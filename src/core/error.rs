use thiserror::Error;

/// Failures from fitting a prompt into a model's token limit.
///
/// None of these are retryable as-is. They surface to the caller
/// unchanged, including through the summarizer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BudgetError {
    #[error("invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("the prompt must contain at least 2 messages: system and user")]
    EmptyConversation,

    #[error("the system prompt is too long ({tokens} tokens), it must be at most {limit} tokens")]
    SystemPromptTooLong { tokens: usize, limit: usize },

    #[error("the prompt is too long ({tokens} tokens), it must be at most {limit} tokens")]
    PromptTooLong { tokens: usize, limit: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SummaryError {
    #[error("summary cancelled after {completed} completion(s)")]
    Cancelled { completed: usize },

    // The remaining text did not shrink between two chunks
    #[error("summary stalled: {remaining} bytes of text left but no room to make progress")]
    Stalled { remaining: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_error_messages() {
        let err = BudgetError::PromptTooLong {
            tokens: 4500,
            limit: 4000,
        };
        assert_eq!(
            err.to_string(),
            "the prompt is too long (4500 tokens), it must be at most 4000 tokens"
        );

        let err = BudgetError::SystemPromptTooLong {
            tokens: 9000,
            limit: 8000,
        };
        assert!(err.to_string().starts_with("the system prompt is too long"));
    }

    #[test]
    fn test_budget_error_survives_anyhow() {
        let err: anyhow::Error = BudgetError::EmptyConversation.into();
        assert_eq!(
            err.downcast_ref::<BudgetError>(),
            Some(&BudgetError::EmptyConversation)
        );
    }
}

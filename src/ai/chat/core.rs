use anyhow::{Error, Result};

use super::models::{
    ChatModel, CompletionResult, FitOptions, FittedPrompt, Message, Role, Transcript,
};
use super::tokenizer::{BoxedTokenCounter, split_at_budget};
use crate::core::BudgetError;
use crate::openai::{CompletionService, FinishReason};

/// The ways an oversized prompt can be brought under the limit, in
/// order of least information lost.
#[derive(Debug, PartialEq, Eq)]
enum Strategy {
    UpgradeModel(ChatModel),
    RemoveOldest,
    TruncateLast,
}

impl Strategy {
    fn next(model: ChatModel, prompt_len: usize, tokens: usize, options: &FitOptions) -> Option<Self> {
        if options.allow_model_upgrade {
            if let Some(upgrade) = model.upgrade_for(tokens) {
                return Some(Strategy::UpgradeModel(upgrade));
            }
        }
        if prompt_len > 2 && options.allow_message_removal {
            return Some(Strategy::RemoveOldest);
        }
        if prompt_len == 2 && options.allow_message_truncation {
            return Some(Strategy::TruncateLast);
        }
        None
    }
}

/// A stateful chat with an LLM that keeps every prompt within the
/// active model's token limit.
///
/// The system prompt is kept separately and only prepended when a
/// prompt is built. Model upgrades made while fitting a prompt stick
/// until `reset_model` is called.
///
/// Not meant to be shared between concurrent completions, a
/// conversation is driven one turn at a time.
pub struct Conversation {
    model: ChatModel,
    initial_model: ChatModel,
    system_prompt: String,
    transcript: Transcript,
    counter: BoxedTokenCounter,
}

impl Conversation {
    pub fn new(model: ChatModel, system_prompt: &str, counter: BoxedTokenCounter) -> Self {
        Self {
            model,
            initial_model: model,
            system_prompt: system_prompt.to_string(),
            transcript: Transcript::new(),
            counter,
        }
    }

    pub fn with_history(mut self, messages: Vec<Message>) -> Result<Self, BudgetError> {
        self.transcript = Transcript::new_with_messages(messages)?;
        Ok(self)
    }

    pub fn model(&self) -> ChatModel {
        self.model
    }

    /// Reverts any upgrade back to the model the conversation started with.
    pub fn reset_model(&mut self) {
        self.model = self.initial_model;
    }

    pub fn set_system_prompt(&mut self, system_prompt: &str) {
        self.system_prompt = system_prompt.to_string();
    }

    pub fn history(&self) -> &Transcript {
        &self.transcript
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// `[system, ...history, user]` for the next turn.
    pub fn prompt_for(&self, user_message: &str) -> Vec<Message> {
        let mut prompt = Vec::with_capacity(self.transcript.len() + 2);
        prompt.push(Message::system(&self.system_prompt));
        prompt.extend(self.transcript.iter().cloned());
        prompt.push(Message::user(user_message));
        prompt
    }

    /// Shortens `prompt` until it fits the model's token limit using
    /// the strategies allowed by `options`, re-measuring after each
    /// change. Upgrading is tried at most once per call, removal drops
    /// the oldest non-system message until two remain and truncation
    /// of the last message ends the fitting. Removal stays enabled
    /// across steps, unlike upgrading.
    ///
    /// Only truncation produces a non-empty `cut_remainder`.
    pub fn fit(&mut self, prompt: Vec<Message>, options: FitOptions) -> Result<FittedPrompt, BudgetError> {
        match prompt.first() {
            None => {
                return Err(BudgetError::InvalidPrompt(
                    "the prompt must not be empty".to_string(),
                ));
            }
            Some(first) if first.role != Role::System => {
                return Err(BudgetError::InvalidPrompt(
                    "the first message must be the system prompt".to_string(),
                ));
            }
            _ => {}
        }
        if prompt.len() < 2 {
            return Err(BudgetError::EmptyConversation);
        }

        let mut prompt = prompt;
        let mut options = options;

        loop {
            let limit = self.model.token_limit();
            let counts: Vec<usize> = prompt
                .iter()
                .map(|m| self.counter.count(&m.content))
                .collect();
            let system_tokens = counts[0];
            let total: usize = counts.iter().sum();

            tracing::debug!(
                "Prompt of {} messages is {} tokens ({} system), {} limit is {}",
                prompt.len(),
                total,
                system_tokens,
                self.model,
                limit
            );

            if system_tokens > limit {
                return Err(BudgetError::SystemPromptTooLong {
                    tokens: system_tokens,
                    limit,
                });
            }
            if total <= limit {
                return Ok(FittedPrompt {
                    messages: prompt,
                    cut_remainder: String::new(),
                    model: self.model,
                });
            }

            match Strategy::next(self.model, prompt.len(), total, &options) {
                Some(Strategy::UpgradeModel(model)) => {
                    tracing::info!(
                        "Upgrading model from {} to {} to fit a {} token prompt",
                        self.model,
                        model,
                        total
                    );
                    self.model = model;
                    options.allow_model_upgrade = false;
                }
                Some(Strategy::RemoveOldest) => {
                    tracing::info!(
                        "The prompt is too long, dropping the oldest message from the chat history"
                    );
                    prompt.remove(1);
                }
                Some(Strategy::TruncateLast) => {
                    let user_limit = limit - system_tokens;
                    let last = &prompt[1];
                    let (head, cut_remainder) =
                        split_at_budget(self.counter.as_ref(), &last.content, user_limit);
                    tracing::warn!(
                        "The prompt is too long, cutting the last message to {} tokens",
                        user_limit
                    );
                    let messages = vec![prompt[0].clone(), Message::new(last.role, &head)];
                    return Ok(FittedPrompt {
                        messages,
                        cut_remainder,
                        model: self.model,
                    });
                }
                None => {
                    return Err(BudgetError::PromptTooLong {
                        tokens: total,
                        limit,
                    });
                }
            }
        }
    }

    /// Runs the next turn: fits `[system, ...history, user]`, requests
    /// a completion with the fitted model and, unless the request is
    /// ephemeral, appends the user message that was sent and the reply
    /// to the history.
    pub async fn complete(
        &mut self,
        service: &(dyn CompletionService + Send + Sync),
        request: CompletionRequest,
    ) -> Result<CompletionResult, Error> {
        let prompt = self.prompt_for(&request.user_message);
        let fitted = self.fit(prompt, request.options)?;

        let response = service
            .complete(fitted.model, &fitted.messages, request.temperature)
            .await?;

        if response.finish_reason == FinishReason::Length {
            tracing::warn!("Completion from {} was cut off at the token limit", fitted.model);
        }

        if !request.ephemeral {
            if let Some(sent) = fitted.messages.last() {
                self.transcript.push(sent.clone())?;
            }
            self.transcript.push(Message::assistant(&response.content))?;
        }

        Ok(CompletionResult {
            content: response.content,
            finish_reason: response.finish_reason,
            usage: response.usage,
            model: fitted.model,
            cut_prompt: fitted.cut_remainder,
        })
    }
}

/// Parameters for a single turn in a `Conversation`.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    user_message: String,
    temperature: f32,
    options: FitOptions,
    ephemeral: bool,
}

impl CompletionRequest {
    pub fn new(user_message: &str) -> Self {
        Self {
            user_message: user_message.to_string(),
            temperature: 0.7,
            options: FitOptions::default(),
            ephemeral: false,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn options(mut self, options: FitOptions) -> Self {
        self.options = options;
        self
    }

    /// Don't record this turn in the history.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

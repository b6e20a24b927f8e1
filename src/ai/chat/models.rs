//! The core models for fitting a chat with an LLM into a token budget.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::BudgetError;
use crate::openai::{FinishReason, Usage};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }

    pub fn system(content: &str) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: &str) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Chronological USER/ASSISTANT history. Never holds a system
/// message, that is prepended when a prompt is built.
#[derive(Default, Clone, Debug)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn new_with_messages(messages: Vec<Message>) -> Result<Self, BudgetError> {
        let mut transcript = Self::new();
        for msg in messages {
            transcript.push(msg)?;
        }
        Ok(transcript)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.0.clone()
    }

    pub fn push(&mut self, msg: Message) -> Result<(), BudgetError> {
        if msg.role == Role::System {
            return Err(BudgetError::InvalidPrompt(
                "system messages can not be stored in the chat history".to_string(),
            ));
        }
        self.0.push(msg);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }
}

#[derive(Debug, Error)]
#[error("unknown chat model: {0}")]
pub struct UnknownModel(String);

/// A chat completion target. Each variant has a fixed token limit
/// for the full message sequence sent to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChatModel {
    #[default]
    Gpt35Turbo,
    Gpt4,
    Gpt4_32k,
}

impl ChatModel {
    pub const ALL: [ChatModel; 3] = [ChatModel::Gpt35Turbo, ChatModel::Gpt4, ChatModel::Gpt4_32k];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatModel::Gpt35Turbo => "gpt-3.5-turbo",
            ChatModel::Gpt4 => "gpt-4",
            ChatModel::Gpt4_32k => "gpt-4-32k",
        }
    }

    pub fn token_limit(&self) -> usize {
        match self {
            ChatModel::Gpt35Turbo => 4000,
            ChatModel::Gpt4 => 8000,
            ChatModel::Gpt4_32k => 32000,
        }
    }

    /// Picks a variant with a strictly larger limit for a prompt of
    /// `tokens`: the smallest one that holds it, otherwise the
    /// largest one available.
    pub fn upgrade_for(&self, tokens: usize) -> Option<ChatModel> {
        let mut larger: Vec<ChatModel> = Self::ALL
            .into_iter()
            .filter(|m| m.token_limit() > self.token_limit())
            .collect();
        larger.sort_by_key(|m| m.token_limit());

        larger
            .iter()
            .copied()
            .find(|m| m.token_limit() >= tokens)
            .or_else(|| larger.last().copied())
    }

    /// The smallest variant whose limit holds `tokens`.
    pub fn smallest_fitting(tokens: usize) -> Option<ChatModel> {
        Self::ALL
            .into_iter()
            .filter(|m| m.token_limit() >= tokens)
            .min_by_key(|m| m.token_limit())
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatModel {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

impl Serialize for ChatModel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Which strategies the budgeter may use when a prompt is over the
/// model's limit. Tried in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitOptions {
    pub allow_model_upgrade: bool,
    pub allow_message_removal: bool,
    pub allow_message_truncation: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            allow_model_upgrade: false,
            allow_message_removal: true,
            allow_message_truncation: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FittedPrompt {
    pub messages: Vec<Message>,
    /// Trailing text cut from the last message, empty if nothing was cut
    pub cut_remainder: String,
    pub model: ChatModel,
}

#[derive(Clone, Debug)]
pub struct CompletionResult {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    pub model: ChatModel,
    pub cut_prompt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
    }

    #[test]
    fn test_message_new() {
        let msg = Message::user("Hello world");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"user","content":"Hello world"}"#
        );
    }

    #[test]
    fn test_transcript_rejects_system_messages() {
        let mut transcript = Transcript::new();
        assert!(transcript.push(Message::user("hi")).is_ok());
        assert!(matches!(
            transcript.push(Message::system("nope")),
            Err(BudgetError::InvalidPrompt(_))
        ));
        assert_eq!(transcript.len(), 1);

        let result = Transcript::new_with_messages(vec![
            Message::user("hi"),
            Message::system("nope"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_model_names() {
        for model in ChatModel::ALL {
            assert_eq!(model.as_str().parse::<ChatModel>().unwrap(), model);
        }
        assert!("gpt-5".parse::<ChatModel>().is_err());
        assert_eq!(
            serde_json::to_string(&ChatModel::Gpt4).unwrap(),
            r#""gpt-4""#
        );
    }

    #[test]
    fn test_upgrade_for() {
        // Smallest larger model that holds the prompt
        assert_eq!(ChatModel::Gpt35Turbo.upgrade_for(6000), Some(ChatModel::Gpt4));
        assert_eq!(
            ChatModel::Gpt35Turbo.upgrade_for(9000),
            Some(ChatModel::Gpt4_32k)
        );
        // Nothing holds it, go as large as possible
        assert_eq!(
            ChatModel::Gpt35Turbo.upgrade_for(100_000),
            Some(ChatModel::Gpt4_32k)
        );
        assert_eq!(ChatModel::Gpt4_32k.upgrade_for(100_000), None);
    }

    #[test]
    fn test_smallest_fitting() {
        assert_eq!(ChatModel::smallest_fitting(10), Some(ChatModel::Gpt35Turbo));
        assert_eq!(ChatModel::smallest_fitting(4001), Some(ChatModel::Gpt4));
        assert_eq!(ChatModel::smallest_fitting(32001), None);
    }
}

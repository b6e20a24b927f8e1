//! Test doubles for the token counter and the completion service,
//! shared by unit and integration tests.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Error, Result, anyhow, bail};
use async_trait::async_trait;

use crate::ai::chat::{BoxedTokenCounter, ChatModel, Conversation, Message, Token, TokenCounter};
use crate::openai::{ChatResponse, CompletionService, FinishReason, Usage};

/// One token per character so budgets are easy to reason about.
pub struct CharCounter;

impl TokenCounter for CharCounter {
    fn encode(&self, text: &str) -> Vec<Token> {
        text.chars().map(|c| c as Token).collect()
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        tokens
            .iter()
            .map(|t| {
                u32::try_from(*t)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(anyhow!("Invalid token {}", t))
            })
            .collect()
    }
}

pub fn char_counter() -> BoxedTokenCounter {
    Arc::new(CharCounter)
}

pub fn conversation(model: ChatModel, system_prompt: &str) -> Conversation {
    Conversation::new(model, system_prompt, char_counter())
}

/// Replies with canned content in order and records every prompt.
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<(ChatModel, Vec<Message>)>>,
}

impl ScriptedService {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(ChatModel, Vec<Message>)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn complete(
        &self,
        model: ChatModel,
        messages: &[Message],
        _temperature: f32,
    ) -> Result<ChatResponse, Error> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push((model, messages.to_vec()));
        let Some(content) = self.replies.lock().unwrap_or_else(|e| e.into_inner()).pop_front() else {
            bail!("No scripted reply left");
        };
        Ok(ChatResponse {
            content,
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        })
    }
}

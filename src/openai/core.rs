use std::sync::Arc;
use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ai::chat::{ChatModel, Message};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    ContentFilter,
    #[serde(other)]
    Other,
}

/// A completion reply validated at the API boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
    // Some OpenAI compatible servers send null here
    finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
struct ReplyBody {
    choices: Vec<ReplyChoice>,
    #[serde(default)]
    usage: Usage,
}

impl TryFrom<ReplyBody> for ChatResponse {
    type Error = Error;

    fn try_from(body: ReplyBody) -> Result<Self, Self::Error> {
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or(anyhow!("Completion response is missing choices"))?;
        let content = choice
            .message
            .content
            .ok_or(anyhow!("Completion response is missing message content"))?;

        Ok(ChatResponse {
            content,
            finish_reason: choice.finish_reason.unwrap_or_default(),
            usage: body.usage,
        })
    }
}

/// The remote chat completion call. Failures are returned as is,
/// there is no retrying here.
#[async_trait]
pub trait CompletionService {
    async fn complete(
        &self,
        model: ChatModel,
        messages: &[Message],
        temperature: f32,
    ) -> Result<ChatResponse, Error>;
}

pub type BoxedCompletionService = Arc<dyn CompletionService + Send + Sync + 'static>;

/// Client for any OpenAI compatible `/v1/chat/completions` API.
#[derive(Clone)]
pub struct OpenAiClient {
    api_hostname: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_hostname: &str, api_key: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn boxed(self) -> BoxedCompletionService {
        Arc::new(self)
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(
        &self,
        model: ChatModel,
        messages: &[Message],
        temperature: f32,
    ) -> Result<ChatResponse, Error> {
        let payload = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
        });
        let url = format!(
            "{}/v1/chat/completions",
            self.api_hostname.trim_end_matches("/")
        );
        let body: ReplyBody = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(60 * 10))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let response = ChatResponse::try_from(body)?;
        tracing::debug!(
            "Completion from {}: {} prompt tokens, {} completion tokens",
            model,
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );
        Ok(response)
    }
}

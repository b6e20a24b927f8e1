//! Summarizes text of any length by working through it one token
//! budget sized chunk at a time. Each chunk's prompt carries the
//! summary accumulated so far and the budgeter's cut remainder
//! becomes the next chunk.
use anyhow::{Error, Result};
use handlebars::Handlebars;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::chat::{CompletionRequest, Conversation, FitOptions};
use super::prompt::{Prompt, SUMMARY_SYSTEM_PROMPT, TEMPLATE_TRAILER, templates, words_limit_text};
use crate::core::SummaryError;
use crate::openai::BoxedCompletionService;

const SUBJECT_MARKER: &str = "Subject:";
const KEY_POINT_MARKER: &str = "-";

/// Drops any chatter the model put before `marker`. Content without
/// the marker is kept as is.
pub fn extract_from(content: &str, marker: &str) -> String {
    match content.find(marker) {
        Some(idx) => content[idx..].to_string(),
        None => content.to_string(),
    }
}

// The cut remainder of a rendered prompt without the template's trailer
fn remaining_text(cut_prompt: &str) -> &str {
    cut_prompt.strip_suffix(TEMPLATE_TRAILER).unwrap_or(cut_prompt)
}

pub struct Summarizer {
    conversation: Conversation,
    service: BoxedCompletionService,
    templates: Handlebars<'static>,
    system_prompt: String,
    allow_model_upgrade: bool,
    allow_recursion: bool,
    cancel: Option<CancellationToken>,
}

impl Summarizer {
    pub fn new(conversation: Conversation, service: BoxedCompletionService) -> Result<Self> {
        Ok(Self {
            conversation,
            service,
            templates: templates()?,
            system_prompt: SUMMARY_SYSTEM_PROMPT.to_string(),
            allow_model_upgrade: false,
            allow_recursion: true,
            cancel: None,
        })
    }

    pub fn allow_model_upgrade(mut self, allow: bool) -> Self {
        self.allow_model_upgrade = allow;
        self
    }

    /// When disabled only the first chunk of an oversized text is
    /// summarized.
    pub fn allow_recursion(mut self, allow: bool) -> Self {
        self.allow_recursion = allow;
        self
    }

    pub fn system_prompt(mut self, system_prompt: &str) -> Self {
        self.system_prompt = system_prompt.to_string();
        self
    }

    /// Stop before requesting the next chunk once `token` is cancelled.
    /// A completion already in flight is not interrupted.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    fn user_message(
        &self,
        text: &str,
        words_limit: Option<usize>,
        previous_summary: Option<&str>,
    ) -> Result<String, Error> {
        let words_limit_text = words_limit_text(words_limit);
        let rendered = match previous_summary {
            None => self.templates.render(
                &Prompt::Summary.to_string(),
                &json!({"words_limit_text": words_limit_text, "text": text}),
            )?,
            Some(previous_summary) => self.templates.render(
                &Prompt::SummaryContinuation.to_string(),
                &json!({
                    "words_limit_text": words_limit_text,
                    "previous_summary": previous_summary,
                    "text": text,
                }),
            )?,
        };
        Ok(rendered)
    }

    /// Summarizes `text`, continuing from `previous_summary` if given.
    ///
    /// Issues one completion per chunk, strictly in order. Any error
    /// fails the whole summary, nothing partial is returned.
    pub async fn summarize(
        &mut self,
        text: &str,
        words_limit: Option<usize>,
        temperature: f32,
        previous_summary: Option<&str>,
    ) -> Result<String, Error> {
        self.conversation.set_system_prompt(&self.system_prompt);

        let options = FitOptions {
            allow_model_upgrade: self.allow_model_upgrade,
            allow_message_removal: false,
            allow_message_truncation: true,
        };

        let mut text = text.to_string();
        let mut summary = previous_summary.map(str::to_string);
        let mut completed = 0;

        loop {
            let user_message = self.user_message(&text, words_limit, summary.as_deref())?;
            let request = CompletionRequest::new(&user_message)
                .temperature(temperature)
                .options(options)
                .ephemeral();
            let result = self
                .conversation
                .complete(self.service.as_ref(), request)
                .await?;
            completed += 1;

            let merged = match summary.take() {
                Some(previous) => {
                    let new_points = extract_from(&result.content, KEY_POINT_MARKER);
                    format!("{}\n{}", previous, new_points)
                }
                None => extract_from(&result.content, SUBJECT_MARKER),
            };

            let remainder = remaining_text(&result.cut_prompt);
            if remainder.trim().is_empty() || !self.allow_recursion {
                return Ok(merged);
            }

            tracing::info!(
                "Summarized chunk {}, {} bytes of text left",
                completed,
                remainder.len()
            );

            if remainder.len() >= text.len() {
                return Err(SummaryError::Stalled {
                    remaining: remainder.len(),
                }
                .into());
            }
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                tracing::info!("Summary cancelled after {} chunk(s)", completed);
                return Err(SummaryError::Cancelled { completed }.into());
            }

            text = remainder.to_string();
            summary = Some(merged);
        }
    }
}

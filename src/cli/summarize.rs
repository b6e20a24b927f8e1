use anyhow::Result;
use std::path::PathBuf;

use crate::ai::Summarizer;
use crate::ai::chat::{ChatModel, Cl100kCounter, Conversation};
use crate::core::AppConfig;
use crate::openai::OpenAiClient;

use super::read_input;

pub struct SummarizeArgs {
    pub file: Option<PathBuf>,
    pub words_limit: Option<usize>,
    pub temperature: f32,
    pub model: Option<ChatModel>,
    pub allow_model_upgrade: bool,
    pub allow_recursion: bool,
}

pub async fn run(args: SummarizeArgs) -> Result<()> {
    let config = AppConfig::from_env()?;
    let text = read_input(args.file.as_deref())?;
    let model = args.model.unwrap_or(config.openai_model);

    let service = OpenAiClient::new(&config.openai_api_hostname, &config.openai_api_key).boxed();
    let conversation = Conversation::new(model, "", Cl100kCounter::boxed()?);
    let mut summarizer = Summarizer::new(conversation, service)?
        .allow_model_upgrade(args.allow_model_upgrade || config.allow_model_upgrade)
        .allow_recursion(args.allow_recursion);

    tracing::info!(
        "Summarizing {} tokens of text with {}",
        summarizer.conversation().count_tokens(&text),
        model
    );
    let summary = summarizer
        .summarize(&text, args.words_limit, args.temperature, None)
        .await?;
    println!("{}", summary);

    Ok(())
}

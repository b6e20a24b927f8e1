use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::chat::{ChatModel, Cl100kCounter, CompletionRequest, Conversation};
use crate::core::AppConfig;
use crate::openai::OpenAiClient;

pub async fn run(model: Option<ChatModel>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    let config = AppConfig::from_env()?;
    let service = OpenAiClient::new(&config.openai_api_hostname, &config.openai_api_key).boxed();
    let mut conversation = Conversation::new(
        model.unwrap_or(config.openai_model),
        &config.system_message,
        Cl100kCounter::boxed()?,
    );

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(err) = rl.add_history_entry(line.as_str()) {
                    tracing::debug!("Failed to add history entry: {}", err);
                }

                // Old turns are dropped from the prompt before the new
                // message gets cut
                let request = CompletionRequest::new(&line);
                match conversation.complete(service.as_ref(), request).await {
                    Ok(resp) => {
                        println!("{}", resp.content);
                        if !resp.cut_prompt.is_empty() {
                            tracing::warn!(
                                "Your message was too long, the last {} characters were not sent",
                                resp.cut_prompt.chars().count()
                            );
                        }
                    }
                    Err(err) => println!("Error: {:#}", err),
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

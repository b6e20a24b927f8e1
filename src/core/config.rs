use std::env;

use anyhow::{Result, anyhow};

use crate::ai::chat::ChatModel;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub openai_model: ChatModel,
    pub allow_model_upgrade: bool,
    pub system_message: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let openai_api_hostname =
            env::var("RECAP_LLM_HOST").unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model = match env::var("RECAP_MODEL") {
            Ok(name) => name.parse::<ChatModel>()?,
            Err(_) => ChatModel::default(),
        };
        let allow_model_upgrade = match env::var("RECAP_ALLOW_MODEL_UPGRADE") {
            Ok(value) => parse_flag(&value)
                .ok_or_else(|| anyhow!("Invalid value for RECAP_ALLOW_MODEL_UPGRADE: {}", value))?,
            Err(_) => false,
        };
        let system_message = env::var("RECAP_SYSTEM_MESSAGE")
            .unwrap_or_else(|_| "You are a helpful assistant.".to_string());

        Ok(Self {
            openai_api_hostname,
            openai_api_key,
            openai_model,
            allow_model_upgrade,
            system_message,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

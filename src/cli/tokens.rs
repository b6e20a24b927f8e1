use anyhow::Result;
use std::path::Path;

use crate::ai::chat::{ChatModel, Cl100kCounter, TokenCounter};

use super::read_input;

pub fn run(file: Option<&Path>) -> Result<()> {
    let text = read_input(file)?;
    let tokens = Cl100kCounter::new()?.count(&text);

    println!("Tokens: {}", tokens);
    match ChatModel::smallest_fitting(tokens) {
        Some(model) => println!("Fits: {} ({} token limit)", model, model.token_limit()),
        None => println!("Fits: none, the text will be summarized in chunks"),
    }

    Ok(())
}

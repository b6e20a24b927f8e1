//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. This is ideal since the text
//! being summarized should be considered untrusted.

use std::fmt;

use handlebars::{Handlebars, TemplateError};

#[derive(Debug)]
pub enum Prompt {
    Summary,
    SummaryContinuation,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<Prompt> for String {
    fn from(item: Prompt) -> String {
        format!("{:?}", item)
    }
}

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates summaries of texts extracted from PDF files or webpages.";

const SUMMARY_PROMPT: &str = r"Generate an executive summary of the text in the following format{{words_limit_text}}:
Subject: [theme]
Key points:
- ...

The text is:
{{text}}
";

const SUMMARY_CONTINUATION_PROMPT: &str = r"
You have generated the following summary from the beginning of a text to summarize:
{{previous_summary}}

Now, generate more key points for the next part of text in the following format{{words_limit_text}}:
- ...

The next part of text is: {{text}}
";

/// Every summary template ends with this after the text, so it is
/// also the tail of any remainder cut from a rendered prompt.
pub const TEMPLATE_TRAILER: &str = "\n";

pub fn templates<'a>() -> Result<Handlebars<'a>, TemplateError> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // Prompts are plain text, not HTML
    registry.register_escape_fn(handlebars::no_escape);
    registry.register_template_string(&Prompt::Summary.to_string(), SUMMARY_PROMPT)?;
    registry.register_template_string(
        &Prompt::SummaryContinuation.to_string(),
        SUMMARY_CONTINUATION_PROMPT,
    )?;
    Ok(registry)
}

/// The optional word cap appended to the format instructions.
pub fn words_limit_text(words_limit: Option<usize>) -> String {
    match words_limit {
        Some(limit) => format!(" and less than {} words", limit),
        None => String::new(),
    }
}

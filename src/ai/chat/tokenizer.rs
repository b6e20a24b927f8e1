//! Token counting for budgeting prompts. Counts must agree with the
//! target model's tokenization or the budget is meaningless.
use std::sync::Arc;

use anyhow::Result;
use tiktoken_rs::CoreBPE;

pub type Token = usize;

pub trait TokenCounter {
    fn encode(&self, text: &str) -> Vec<Token>;
    fn decode(&self, tokens: &[Token]) -> Result<String>;

    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

pub type BoxedTokenCounter = Arc<dyn TokenCounter + Send + Sync + 'static>;

/// The `cl100k_base` encoding used by the GPT-3.5 and GPT-4 families.
pub struct Cl100kCounter {
    bpe: CoreBPE,
}

impl Cl100kCounter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            bpe: tiktoken_rs::cl100k_base()?,
        })
    }

    pub fn boxed() -> Result<BoxedTokenCounter> {
        Ok(Arc::new(Self::new()?))
    }
}

impl TokenCounter for Cl100kCounter {
    fn encode(&self, text: &str) -> Vec<Token> {
        self.bpe.encode_with_special_tokens(text)
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        self.bpe.decode(tokens.to_vec())
    }
}

/// Splits `text` into the longest prefix that counts at most `budget`
/// tokens and the rest. The two halves concatenate back to `text`.
pub fn split_at_budget(counter: &dyn TokenCounter, text: &str, budget: usize) -> (String, String) {
    let tokens = counter.encode(text);
    let mut take = budget.min(tokens.len());

    while take > 0 {
        // A prefix can end in the middle of a multi-byte character
        // which won't decode, back off until it does
        if let Ok(prefix) = counter.decode(&tokens[..take]) {
            let split = prefix_boundary(text, &prefix);
            let (head, tail) = text.split_at(split);
            if counter.count(head) <= budget {
                return (head.to_string(), tail.to_string());
            }
        }
        take -= 1;
    }

    (String::new(), text.to_string())
}

// Byte offset in `text` where the decoded `prefix` ends. Falls back to
// the nearest char boundary if the decoding isn't a literal prefix.
fn prefix_boundary(text: &str, prefix: &str) -> usize {
    if text.starts_with(prefix) {
        return prefix.len();
    }
    let mut split = prefix.len().min(text.len());
    while !text.is_char_boundary(split) {
        split -= 1;
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::CharCounter;

    #[test]
    fn test_cl100k_count() {
        let counter = Cl100kCounter::new().unwrap();
        assert_eq!(counter.count(""), 0);
        assert!(counter.count("Hello world") >= 2);
        let tokens = counter.encode("Hello world");
        assert_eq!(counter.decode(&tokens).unwrap(), "Hello world");
    }

    #[test]
    fn test_split_at_budget_is_lossless() {
        let counter = Cl100kCounter::new().unwrap();
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let (head, tail) = split_at_budget(&counter, &text, 25);

        assert!(counter.count(&head) <= 25);
        assert!(!tail.is_empty());
        assert_eq!(format!("{}{}", head, tail), text);
    }

    #[test]
    fn test_split_at_budget_multibyte() {
        let counter = Cl100kCounter::new().unwrap();
        let text = "日本語のテキストを要約します。".repeat(10);
        for budget in 1..20 {
            let (head, tail) = split_at_budget(&counter, &text, budget);
            assert!(counter.count(&head) <= budget);
            assert_eq!(format!("{}{}", head, tail), text);
        }
    }

    #[test]
    fn test_split_at_budget_whole_text_fits() {
        let counter = CharCounter;
        let (head, tail) = split_at_budget(&counter, "abc", 10);
        assert_eq!(head, "abc");
        assert_eq!(tail, "");
    }

    #[test]
    fn test_split_at_budget_zero() {
        let counter = CharCounter;
        let (head, tail) = split_at_budget(&counter, "abc", 0);
        assert_eq!(head, "");
        assert_eq!(tail, "abc");
    }
}

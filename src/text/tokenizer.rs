//! Splits raw social-media sentences into the tokens the engine works on.

use crate::core::classifier::{is_emoticon, is_placeholder};
use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholders, numbers with inner punctuation, words with inner
/// apostrophes, punctuation runs, then any other single character.
static PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<[UR]>|\d[\d\-/':.,]+\d|\w[\w']*\w|[.,!?;:"'()/\\]+|\S"#).expect("token pattern is valid")
});

/// Tokenizes a sentence.
///
/// Mentions, hashtags, links and emoticons are kept whole. Everything else is
/// cut into parts, and parts written entirely in capitals are lowercased.
pub fn tokenize(sentence: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw in sentence.split_whitespace() {
        let token = raw.replace(['`', '\u{2019}'], "'");
        if token.starts_with('#') || token.starts_with('@') || token.contains("http") || is_emoticon(&token) {
            tokens.push(token);
            continue;
        }
        for part in PART.find_iter(&token).map(|m| m.as_str()) {
            if is_shouted(part) && !is_placeholder(&token) {
                tokens.push(part.to_lowercase());
            } else {
                tokens.push(part.to_string());
            }
        }
    }
    tokens
}

/// Sentences cut off by the platform end with an ellipsis token.
pub fn is_truncated(sentence: &str) -> bool {
    matches!(sentence.split_whitespace().last(), Some("\u{2026}") | Some("..."))
}

/// Has cased letters and none of them is lowercase.
fn is_shouted(part: &str) -> bool {
    part.chars().any(char::is_uppercase) && !part.chars().any(char::is_lowercase)
}

//! Decides which tokens of a sentence are candidates for rewriting.

use crate::core::types::TokenClass;
use crate::fuzzy::lexicon::Lexicon;
use once_cell::sync::Lazy;
use regex::Regex;

/// Western emoticons (eyes, optional nose, mouth, in either direction),
/// hearts and eastern faces, matched at the start of a token.
static EMOTICON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:",
        r"[<>]?[:;=8>xX][-o*']?[)\](\[dDpPxX/:}{@|\\S]",
        r"|[)\](\[dDpPxX/:}{@|\\S][-o*']?[:;=8<xX][<>]?",
        r"|<[/\\]?3",
        r"|\(?\(?#?[>\-^*+o~][_.|oO,][<\-^*+o~][#;]?\)?\)?",
        r")"
    ))
    .expect("emoticon pattern is valid")
});

/// User and url placeholders left by corpus anonymization.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<[UR]>").expect("placeholder pattern is valid"));

pub fn is_emoticon(token: &str) -> bool {
    EMOTICON.is_match(token)
}

pub fn is_placeholder(token: &str) -> bool {
    PLACEHOLDER.is_match(token)
}

/// Mentions, hashtags, links and anonymization placeholders.
pub fn is_social_marker(token: &str) -> bool {
    is_placeholder(token) || token.starts_with('#') || token.starts_with('@') || token.contains("http")
}

/// Capitalized but not shouting, and not at the start of the sentence.
pub fn looks_like_name(token: &str, index: usize) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) => index != 0 && first.is_uppercase() && !second.is_uppercase(),
        _ => false,
    }
}

/// Every way to cut `token` into two lexicon words, as `"left right"` phrases.
/// The left part has at least two characters and the right part at least three.
pub fn compound_splits(token: &str, lexicon: &Lexicon) -> Vec<String> {
    let boundaries: Vec<usize> = token.char_indices().map(|(i, _)| i).collect();
    let len = boundaries.len();
    (2..len.saturating_sub(2))
        .map(|split| boundaries[split])
        .filter(|&at| lexicon.contains_word(&token[..at]) && lexicon.contains_word(&token[at..]))
        .map(|at| format!("{} {}", &token[..at], &token[at..]))
        .collect()
}

/// Classifies one token; the first matching rule wins.
pub fn classify(token: &str, index: usize, lexicon: &Lexicon, allow_compounds: bool) -> TokenClass {
    if !token.chars().any(|c| c.is_ascii_alphabetic()) || is_emoticon(token) {
        return TokenClass::Skip;
    }
    if is_social_marker(token) {
        return TokenClass::Skip;
    }
    if looks_like_name(token, index) {
        return TokenClass::Skip;
    }
    if allow_compounds && !compound_splits(token, lexicon).is_empty() {
        return TokenClass::Skip;
    }
    if lexicon.contains_word(token) {
        TokenClass::InVocab
    } else {
        TokenClass::OutOfVocab
    }
}

pub fn classify_sentence(tokens: &[String], lexicon: &Lexicon, allow_compounds: bool) -> Vec<TokenClass> {
    tokens
        .iter()
        .enumerate()
        .map(|(index, token)| classify(token, index, lexicon, allow_compounds))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::from_words(["i", "going", "to", "the", "store", "sun", "shine", "under"], true)
    }

    #[test]
    fn test_emoticons() {
        for face in [":)", ":-(", ";P", "xD", "<3", "</3", "(:", "^_^", "o.O", ":D!!"] {
            assert!(is_emoticon(face), "{face} should be an emoticon");
        }
        for word in ["hello", "going", "store"] {
            assert!(!is_emoticon(word), "{word} is not an emoticon");
        }
    }

    #[test]
    fn test_skip_rules() {
        let lexicon = lexicon();
        for token in ["!!", "123", ":)", "@user", "#tbt", "<U>", "<R>", "https://t.co/x"] {
            assert_eq!(classify(token, 1, &lexicon, false), TokenClass::Skip, "{token}");
        }
    }

    #[test]
    fn test_names() {
        let lexicon = lexicon();
        assert_eq!(classify("London", 3, &lexicon, false), TokenClass::Skip);
        // First token of the sentence and fully capitalized tokens are not names.
        assert_eq!(classify("Going", 0, &lexicon, false), TokenClass::InVocab);
        assert_eq!(classify("GOING", 2, &lexicon, false), TokenClass::InVocab);
        assert!(!looks_like_name("I", 4));
    }

    #[test]
    fn test_vocabulary_classes() {
        let lexicon = lexicon();
        assert_eq!(classify("goin", 1, &lexicon, false), TokenClass::OutOfVocab);
        assert_eq!(classify("store", 4, &lexicon, false), TokenClass::InVocab);
    }

    #[test]
    fn test_compound_splits() {
        let lexicon = lexicon();
        assert_eq!(compound_splits("sunshine", &lexicon), vec!["sun shine"]);
        // The right half needs three characters, so "goingto" does not split.
        assert!(compound_splits("goingto", &lexicon).is_empty());
        assert!(compound_splits("tostore", &lexicon) == vec!["to store"]);
        assert!(compound_splits("ab", &lexicon).is_empty());
    }

    #[test]
    fn test_compound_rule_only_when_enabled() {
        let lexicon = lexicon();
        assert_eq!(classify("sunshine", 1, &lexicon, true), TokenClass::Skip);
        assert_eq!(classify("sunshine", 1, &lexicon, false), TokenClass::OutOfVocab);
    }

    #[test]
    fn test_classify_sentence() {
        let tokens: Vec<String> = ["I", "goin", "to", "the", "store", "!"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let classes = classify_sentence(&tokens, &lexicon(), false);
        assert_eq!(
            classes,
            vec![
                TokenClass::InVocab,
                TokenClass::OutOfVocab,
                TokenClass::InVocab,
                TokenClass::InVocab,
                TokenClass::InVocab,
                TokenClass::Skip,
            ]
        );
    }
}

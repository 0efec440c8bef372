//! Reads sentences from a plain-text corpus or from tweet JSON lines.

use crate::error::Result;
use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::io::{BufRead, Lines};
use tracing::{debug, warn};

static NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").expect("newline pattern is valid"));

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// One sentence per line.
    #[default]
    Text,
    /// One tweet object per line.
    TweetJson,
}

/// Iterator over the sentences of a corpus.
pub struct CorpusReader<R> {
    lines: Lines<R>,
    format: InputFormat,
    line_no: usize,
    skipped: usize,
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R, format: InputFormat) -> Self {
        CorpusReader {
            lines: reader.lines(),
            format,
            line_no: 0,
            skipped: 0,
        }
    }

    /// Lines dropped so far: blank lines, retweets, truncated tweets and broken JSON.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                self.skipped += 1;
                continue;
            }
            let sentence = match self.format {
                InputFormat::Text => Some(line),
                InputFormat::TweetJson => match serde_json::from_str::<Value>(&line) {
                    Ok(tweet) => tweet_text(&tweet),
                    Err(e) => {
                        warn!(line = self.line_no, error = %e, "skipping malformed tweet");
                        None
                    }
                },
            };
            match sentence {
                Some(sentence) => return Some(Ok(sentence)),
                None => {
                    debug!(line = self.line_no, "corpus line skipped");
                    self.skipped += 1;
                }
            }
        }
    }
}

/// Full text of an original tweet, or `None` for retweets and for tweets whose
/// full text is not available.
pub fn tweet_text(tweet: &Value) -> Option<String> {
    if tweet.get("retweeted_status").is_some() {
        return None;
    }
    let text = match tweet.get("extended_tweet").and_then(|e| e.get("full_text")) {
        Some(full_text) => full_text.as_str()?,
        None if tweet.get("truncated").and_then(Value::as_bool) == Some(true) => return None,
        None => tweet.get("text")?.as_str()?,
    };
    Some(unescape(&NEWLINES.replace_all(text, " ")))
}

/// Undoes the HTML escaping the platform applies to tweet text.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

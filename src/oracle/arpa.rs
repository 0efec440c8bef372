//! Back-off n-gram language model read from an ARPA text file.

use crate::error::{NormError, Result};
use crate::oracle::LanguageModel;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

const BOS: &str = "<s>";
const EOS: &str = "</s>";
const UNK: &str = "<unk>";

/// Log10 probability given to words the model has never seen and that it
/// has no `<unk>` entry for.
pub const UNKNOWN_LOG_PROB: f64 = -100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct NgramEntry {
    log_prob: f64,
    backoff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Data,
    Ngrams(usize),
    End,
}

/// An in-memory ARPA model. Scores are log10 probabilities with Katz-style
/// back-off, the way common n-gram toolkits score a sentence.
pub struct ArpaModel {
    order: usize,
    ngrams: HashMap<String, NgramEntry>,
}

impl ArpaModel {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let model = Self::from_reader(reader)?;
        info!(path = %path.display(), order = model.order, ngrams = model.ngrams.len(), "language model loaded");
        Ok(model)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut section = Section::Preamble;
        let mut order = 0;
        let mut ngrams = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "\\data\\" {
                section = Section::Data;
                continue;
            }
            if line == "\\end\\" {
                section = Section::End;
                break;
            }
            if let Some(n) = parse_section_header(line) {
                if n == 0 || n > order {
                    return Err(NormError::language_model(format!(
                        "line {}: unexpected section {line}",
                        line_no + 1
                    )));
                }
                section = Section::Ngrams(n);
                continue;
            }
            match section {
                Section::Preamble => {}
                Section::Data => {
                    let n = line
                        .strip_prefix("ngram ")
                        .and_then(|rest| rest.split('=').next())
                        .and_then(|n| n.trim().parse::<usize>().ok())
                        .ok_or_else(|| {
                            NormError::language_model(format!("line {}: bad count {line:?}", line_no + 1))
                        })?;
                    order = order.max(n);
                }
                Section::Ngrams(n) => {
                    let (key, entry) = parse_entry(line, n).ok_or_else(|| {
                        NormError::language_model(format!("line {}: bad {n}-gram {line:?}", line_no + 1))
                    })?;
                    ngrams.insert(key, entry);
                }
                Section::End => unreachable!("parsing stops at \\end\\"),
            }
        }

        if section != Section::End {
            return Err(NormError::language_model("missing \\end\\ marker"));
        }
        if order == 0 {
            return Err(NormError::language_model("no n-gram counts in \\data\\ section"));
        }
        Ok(Self { order, ngrams })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    fn known(&self, word: &str) -> bool {
        self.ngrams.contains_key(word)
    }

    /// log10 p(word | history), backing off to shorter histories.
    fn conditional(&self, history: &[&str], word: &str) -> f64 {
        let longest = history.len().min(self.order.saturating_sub(1));
        let mut backoff = 0.0;
        for n in (0..=longest).rev() {
            let context = &history[history.len() - n..];
            let mut key = context.join(" ");
            if !key.is_empty() {
                key.push(' ');
            }
            key.push_str(word);
            if let Some(entry) = self.ngrams.get(&key) {
                return backoff + entry.log_prob;
            }
            if n > 0 {
                if let Some(context_entry) = self.ngrams.get(&context.join(" ")) {
                    backoff += context_entry.backoff;
                }
            }
        }
        backoff + UNKNOWN_LOG_PROB
    }
}

impl LanguageModel for ArpaModel {
    fn score(&self, text: &str, bos: bool, eos: bool) -> f64 {
        let mut history: Vec<&str> = Vec::new();
        if bos {
            history.push(BOS);
        }
        let words = text.split_whitespace().chain(eos.then_some(EOS));
        let mut total = 0.0;
        for word in words {
            let word = if self.known(word) || !self.known(UNK) { word } else { UNK };
            total += self.conditional(&history, word);
            history.push(word);
        }
        total
    }
}

fn parse_section_header(line: &str) -> Option<usize> {
    line.strip_prefix('\\')?
        .strip_suffix("-grams:")?
        .parse()
        .ok()
}

fn parse_entry(line: &str, n: usize) -> Option<(String, NgramEntry)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != n + 1 && fields.len() != n + 2 {
        return None;
    }
    let log_prob = fields[0].parse().ok()?;
    let backoff = match fields.get(n + 1) {
        Some(value) => value.parse().ok()?,
        None => 0.0,
    };
    Some((fields[1..=n].join(" "), NgramEntry { log_prob, backoff }))
}

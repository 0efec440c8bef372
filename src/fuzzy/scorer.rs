//! Edit distance, abbreviation matching and context-weighted candidate ranking.

use crate::core::context::score_in_context;
use crate::oracle::LanguageModel;
use std::cmp::min;
use std::collections::BTreeSet;

/// Ratio used in place of a zero edit-distance ratio, so exact matches win.
pub const EXACT_MATCH_BONUS: f64 = 5.0;

/// Calculate the Levenshtein distance between two strings.
/// This is the minimum number of single-character edits (insertions, deletions, or substitutions)
/// required to change one word into another.
#[allow(clippy::needless_range_loop)]
pub fn levenshtein(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let len1 = s1_chars.len();
    let len2 = s2_chars.len();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];
    for i in 0..=len1 {
        matrix[i][0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = usize::from(s1_chars[i - 1] != s2_chars[j - 1]);
            matrix[i][j] = min(
                min(
                    matrix[i - 1][j] + 1, // deletion
                    matrix[i][j - 1] + 1, // insertion
                ),
                matrix[i - 1][j - 1] + cost, // substitution
            );
        }
    }

    matrix[len1][len2]
}

/// How well `abbreviation` reads as an in-order subsequence of `token`.
///
/// For every starting letter of the abbreviation, `token` is scanned once from
/// the left, consuming abbreviation letters as they appear. The best fraction
/// of matched letters over all starts is returned, so a fully matched
/// abbreviation scores 1.0 and an empty one scores 0.
pub fn abbreviation_score(abbreviation: &str, token: &str) -> f64 {
    let letters: Vec<char> = abbreviation.chars().collect();
    if letters.is_empty() {
        return 0.0;
    }
    let mut max_score = 0;
    for start in 0..letters.len() {
        let mut score = 0;
        for letter in token.chars() {
            if letter == letters[start + score] {
                score += 1;
                if start + score == letters.len() {
                    break;
                }
            }
        }
        max_score = max_score.max(score);
        if max_score == letters.len() {
            break;
        }
    }
    max_score as f64 / letters.len() as f64
}

/// The candidates that `abbreviation` abbreviates best, with that score.
pub fn abbreviation_best_matches<'a, I>(abbreviation: &str, candidates: I) -> (BTreeSet<String>, f64)
where
    I: IntoIterator<Item = &'a String>,
{
    best_by(candidates, |candidate| abbreviation_score(abbreviation, candidate))
}

/// The candidates that best abbreviate `full_word`, with that score.
pub fn abbreviation_best_matches_reverse<'a, I>(full_word: &str, candidates: I) -> (BTreeSet<String>, f64)
where
    I: IntoIterator<Item = &'a String>,
{
    best_by(candidates, |candidate| abbreviation_score(candidate, full_word))
}

fn best_by<'a, I, F>(candidates: I, score_of: F) -> (BTreeSet<String>, f64)
where
    I: IntoIterator<Item = &'a String>,
    F: Fn(&str) -> f64,
{
    let mut best_score = 0.0;
    let mut best = BTreeSet::new();
    for candidate in candidates {
        let score = score_of(candidate);
        if score > best_score {
            best.clear();
            best_score = score;
        }
        if score == best_score {
            best.insert(candidate.clone());
        }
    }
    (best, best_score)
}

/// Ranks candidates by context probability divided by their edit-distance ratio.
pub struct Scorer<'m> {
    model: &'m dyn LanguageModel,
    exact_match_bonus: f64,
}

impl<'m> Scorer<'m> {
    pub fn new(model: &'m dyn LanguageModel) -> Self {
        Self::with_exact_match_bonus(model, EXACT_MATCH_BONUS)
    }

    pub fn with_exact_match_bonus(model: &'m dyn LanguageModel, exact_match_bonus: f64) -> Self {
        Self {
            model,
            exact_match_bonus,
        }
    }

    /// Returns the candidate with the highest `p(left cand right) / ratio`,
    /// where `ratio = levenshtein(token, cand) / len(token)`.
    /// Candidates are visited in lexical order and only a strictly higher score
    /// replaces the current best, so ties go to the lexically smallest.
    pub fn best_match(
        &self,
        token: &str,
        candidates: &BTreeSet<String>,
        left: &str,
        right: &str,
    ) -> Option<(String, f64)> {
        let token_len = token.chars().count();
        if token_len == 0 {
            return None;
        }
        let mut best: Option<(String, f64)> = None;
        for candidate in candidates {
            let probability = 10f64.powf(score_in_context(self.model, left, candidate, right));
            let mut ratio = levenshtein(token, candidate) as f64 / token_len as f64;
            if ratio == 0.0 {
                ratio = self.exact_match_bonus;
            }
            let score = probability / ratio;
            if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
                best = Some((candidate.clone(), score));
            }
        }
        best
    }
}

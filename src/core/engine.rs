use crate::config::EngineOptions;
use crate::core::classifier::{classify_sentence, compound_splits};
use crate::core::context::{CachedModel, TrigramWindow};
use crate::core::provenance::Provenance;
use crate::core::types::{
    Candidate, Change, Mode, NormalizedSentence, PositionMap, SentenceOutcome, Technique, TokenClass, TokenPair,
    TokenSlot,
};
use crate::fuzzy::clusters::ClusterIndex;
use crate::fuzzy::lexicon::Lexicon;
use crate::fuzzy::scorer::{abbreviation_best_matches, abbreviation_best_matches_reverse, Scorer};
use crate::oracle::{LanguageModel, NeighbourLookup};
use tracing::{debug, trace};

/// Everything the engine reads. Built once at start-up and never mutated.
pub struct Resources {
    pub lexicon: Lexicon,
    /// Hands out in-vocabulary cluster members, for cleaning.
    pub clusters: ClusterIndex,
    /// Hands out out-of-vocabulary cluster members, for noisifying.
    pub noisy_clusters: ClusterIndex,
    pub model: Box<dyn LanguageModel>,
    pub neighbours: Box<dyn NeighbourLookup>,
}

/// The winner for one token position.
struct Selection {
    candidate: Candidate,
    score: f64,
}

/// Rewrites sentences one at a time, either cleaning their out-of-vocabulary
/// tokens or corrupting their in-vocabulary ones.
pub struct NormalizationEngine {
    resources: Resources,
    options: EngineOptions,
}

impl NormalizationEngine {
    pub fn new(resources: Resources, options: EngineOptions) -> Self {
        Self { resources, options }
    }

    /// Classifies the tokens and runs Clean if any token is out of
    /// vocabulary, Noisify over the in-vocabulary tokens otherwise.
    pub fn process(&self, tokens: &[String]) -> SentenceOutcome {
        let classes = classify_sentence(tokens, &self.resources.lexicon, self.options.allow_compounds);
        let model = CachedModel::new(self.resources.model.as_ref());

        let outcome = if classes.contains(&TokenClass::OutOfVocab) {
            self.clean(tokens, &classes, &model)
        } else {
            self.noisify(tokens, &classes, &model)
        };
        trace!(oracle_queries = model.misses(), "sentence processed");
        outcome
    }

    fn clean(&self, tokens: &[String], classes: &[TokenClass], model: &dyn LanguageModel) -> SentenceOutcome {
        let mut positions = positions_of(classes, TokenClass::OutOfVocab);
        let scorer = Scorer::with_exact_match_bonus(model, self.options.exact_match_bonus);
        let mut changes = Vec::new();

        let indices: Vec<usize> = positions.keys().copied().collect();
        for index in indices {
            let token = &tokens[index];
            // A repaired left neighbour gives better context than the noisy one.
            let mut window = TrigramWindow::around(tokens, index);
            if let Some(TokenSlot::Resolved(previous)) = index.checked_sub(1).and_then(|p| positions.get(&p)) {
                window = window.with_left(previous);
            }

            // 1. Gather proposals from every source
            let mut proposals = Provenance::new();
            self.propose_typo(token, &window, &scorer, &mut proposals);
            self.propose_embedding(token, Mode::Clean, &mut proposals);
            self.propose_from_clusters(token, Mode::Clean, &mut proposals);
            self.propose_shortenings(token, &mut proposals);
            if !self.options.allow_compounds {
                self.propose_splits(token, &mut proposals);
            }

            // 2. Every out-of-vocabulary token must be repaired, or the sentence is dropped
            match self.select(token, &window, &proposals, model, Mode::Clean) {
                Some(selection) => {
                    changes.push(change(index, token, &selection, &proposals));
                    positions.insert(index, TokenSlot::Resolved(selection.candidate.text));
                }
                None => {
                    debug!(index, token = %token, candidates = ?proposals.texts(), "no corroborated repair, abandoning sentence");
                    return SentenceOutcome::Abandoned {
                        index,
                        token: token.clone(),
                    };
                }
            }
        }

        let cleaned = apply(tokens, &positions);
        let pairs = tokens
            .iter()
            .zip(&cleaned)
            .map(|(original, cleaned)| TokenPair::new(original, cleaned))
            .collect();
        SentenceOutcome::Emitted(NormalizedSentence {
            mode: Mode::Clean,
            pairs,
            changes,
            confidence: model.score(&cleaned.join(" "), true, true),
        })
    }

    fn noisify(&self, tokens: &[String], classes: &[TokenClass], model: &dyn LanguageModel) -> SentenceOutcome {
        let mut positions = positions_of(classes, TokenClass::InVocab);
        let mut changes = Vec::new();

        let indices: Vec<usize> = positions.keys().copied().collect();
        for index in indices {
            let token = &tokens[index];
            let window = TrigramWindow::around(tokens, index);

            let mut proposals = Provenance::new();
            self.propose_from_clusters(token, Mode::Noisify, &mut proposals);
            self.propose_embedding(token, Mode::Noisify, &mut proposals);
            if self.options.allow_compounds {
                self.propose_splits(token, &mut proposals);
            }

            if let Some(selection) = self.select(token, &window, &proposals, model, Mode::Noisify) {
                changes.push(change(index, token, &selection, &proposals));
                positions.insert(index, TokenSlot::Resolved(selection.candidate.text));
            }
        }

        if changes.is_empty() {
            return SentenceOutcome::Unchanged;
        }
        let noisified = apply(tokens, &positions);
        let pairs = noisified
            .iter()
            .zip(tokens)
            .map(|(noisy, original)| TokenPair::new(noisy, original))
            .collect();
        SentenceOutcome::Emitted(NormalizedSentence {
            mode: Mode::Noisify,
            pairs,
            changes,
            confidence: model.score(&noisified.join(" "), true, true),
        })
    }

    /// Closest lexicon words within one edit, or within the widest budget if
    /// one edit finds nothing. Only the best of them in context is proposed.
    fn propose_typo(&self, token: &str, window: &TrigramWindow, scorer: &Scorer<'_>, proposals: &mut Provenance) {
        let lexicon = &self.resources.lexicon;
        let mut typos = lexicon.suggest(token, 1);
        if typos.is_empty() && self.options.max_typo_edits > 1 {
            typos = lexicon.suggest(token, self.options.max_typo_edits);
        }
        if let Some((best, score)) = scorer.best_match(token, &typos, &window.left, &window.right) {
            trace!(token, candidate = %best, score, "typo proposal");
            proposals.add(Technique::Typo, [best]);
        }
    }

    /// First non-empty neighbour on the target side of the vocabulary.
    fn propose_embedding(&self, token: &str, mode: Mode, proposals: &mut Provenance) {
        let wants_known = mode == Mode::Clean;
        let neighbour = self
            .resources
            .neighbours
            .find(token)
            .into_iter()
            .find(|n| !n.is_empty() && self.resources.lexicon.contains_word(n) == wants_known);
        if let Some(neighbour) = neighbour {
            trace!(token, candidate = %neighbour, "embedding proposal");
            proposals.add(Technique::Embedding, [neighbour]);
        }
    }

    fn propose_from_clusters(&self, token: &str, mode: Mode, proposals: &mut Provenance) {
        let index = match mode {
            Mode::Clean => &self.resources.clusters,
            Mode::Noisify => &self.resources.noisy_clusters,
        };
        let members = index.suggest(token);
        if members.is_empty() {
            return;
        }
        let (abbreviations, score) = match mode {
            Mode::Clean => abbreviation_best_matches(token, &members),
            Mode::Noisify => abbreviation_best_matches_reverse(token, &members),
        };
        if score > self.options.abbreviation_threshold {
            trace!(token, candidates = ?abbreviations, score, "cluster abbreviation proposal");
            proposals.add(Technique::ClusterAbbreviation, abbreviations);
        }
        if let Some(common) = index.get_path(token).and_then(|path| index.most_common(path)) {
            trace!(token, candidate = common, "cluster mode proposal");
            proposals.add(Technique::ClusterCommon, [common]);
        }
    }

    /// Collapses letter repetitions ("soooo") to two and to one letter.
    fn propose_shortenings(&self, token: &str, proposals: &mut Provenance) {
        if token.chars().count() <= self.options.min_shorten_length {
            return;
        }
        for keep in [2, 1] {
            let shortened = collapse_runs(token, keep);
            if self.resources.lexicon.contains_word(&shortened) {
                proposals.add(Technique::Shorten, [shortened]);
            }
        }
    }

    fn propose_splits(&self, token: &str, proposals: &mut Provenance) {
        proposals.add(Technique::Split, compound_splits(token, &self.resources.lexicon));
    }

    /// Picks the best proposal that beats the original token in context and
    /// accepts it only if it is a real change backed by two techniques.
    ///
    /// Proposals are ranked by score, then by how many techniques back them,
    /// then lexically. Hashtags and mentions are never produced when noisifying.
    fn select(
        &self,
        token: &str,
        window: &TrigramWindow,
        proposals: &Provenance,
        model: &dyn LanguageModel,
        mode: Mode,
    ) -> Option<Selection> {
        let noisifying = mode == Mode::Noisify;
        let mut baseline = window.score(model, token);
        if noisifying {
            baseline *= self.options.noisify_baseline_factor;
        }
        let mut best: Option<Selection> = None;
        for candidate in proposals.candidates() {
            if noisifying && (candidate.text.starts_with('#') || candidate.text.starts_with('@')) {
                continue;
            }
            let score = window.score(model, &candidate.text);
            if score <= baseline {
                continue;
            }
            let better = match &best {
                None => true,
                Some(current) => {
                    score > current.score
                        || (score == current.score && candidate.provenance.len() > current.candidate.provenance.len())
                }
            };
            if better {
                best = Some(Selection { candidate, score });
            }
        }

        let selection = best?;
        let accepted = selection.candidate.text != token && selection.candidate.is_corroborated();
        debug!(
            token,
            mode = ?mode,
            winner = %selection.candidate.text,
            score = selection.score,
            baseline,
            techniques = selection.candidate.provenance.len(),
            accepted,
            "candidate selected"
        );
        accepted.then_some(selection)
    }
}

fn positions_of(classes: &[TokenClass], wanted: TokenClass) -> PositionMap {
    classes
        .iter()
        .enumerate()
        .filter(|(_, class)| **class == wanted)
        .map(|(index, _)| (index, TokenSlot::Unresolved))
        .collect()
}

fn apply(tokens: &[String], positions: &PositionMap) -> Vec<String> {
    tokens
        .iter()
        .enumerate()
        .map(|(index, token)| match positions.get(&index) {
            Some(TokenSlot::Resolved(replacement)) => replacement.clone(),
            _ => token.clone(),
        })
        .collect()
}

fn change(index: usize, token: &str, selection: &Selection, proposals: &Provenance) -> Change {
    Change {
        index,
        from: token.to_string(),
        to: selection.candidate.text.clone(),
        score: selection.score,
        candidates: proposals.texts(),
        techniques: selection.candidate.provenance.iter().copied().collect(),
    }
}

/// Shrinks every run of a repeated word character to at most `keep` copies.
pub fn collapse_runs(token: &str, keep: usize) -> String {
    let mut result = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();
    while let Some(c) = chars.next() {
        let mut run = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            run += 1;
        }
        let is_word_char = c.is_alphanumeric() || c == '_';
        let copies = if is_word_char && run > 1 { run.min(keep) } else { run };
        result.extend(std::iter::repeat(c).take(copies));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{NeighbourTable, NoNeighbours};
    use std::collections::{BTreeSet, HashMap};
    use std::io::Cursor;

    /// Scores known texts from a table and everything else very low.
    struct TableModel(HashMap<String, f64>);

    impl TableModel {
        fn new(entries: &[(&str, f64)]) -> Self {
            Self(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
        }
    }

    impl LanguageModel for TableModel {
        fn score(&self, text: &str, _bos: bool, _eos: bool) -> f64 {
            self.0.get(text).copied().unwrap_or(-20.0)
        }
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn engine_with(
        vocabulary: &[&str],
        cluster_paths: &str,
        model: TableModel,
        neighbours: Box<dyn NeighbourLookup>,
        options: EngineOptions,
    ) -> NormalizationEngine {
        let lexicon = Lexicon::from_words(vocabulary, true);
        let clusters = ClusterIndex::from_reader(Cursor::new(cluster_paths), &lexicon, false).unwrap();
        let noisy_clusters = ClusterIndex::from_reader(Cursor::new(cluster_paths), &lexicon, true).unwrap();
        NormalizationEngine::new(
            Resources {
                lexicon,
                clusters,
                noisy_clusters,
                model: Box::new(model),
                neighbours,
            },
            options,
        )
    }

    const VOCABULARY: &[&str] = &["i", "going", "gone", "to", "the", "store", "so", "good", "tomorrow"];

    #[test]
    fn test_collapse_runs() {
        assert_eq!(collapse_runs("soooo", 2), "soo");
        assert_eq!(collapse_runs("soooo", 1), "so");
        assert_eq!(collapse_runs("gooood!!!", 2), "good!!!");
        assert_eq!(collapse_runs("good", 1), "god");
        assert_eq!(collapse_runs("", 1), "");
    }

    #[test]
    fn test_clean_resolves_corroborated_candidate() {
        let model = TableModel::new(&[("i going to", -1.0), ("i goin to", -6.0), ("i gong to", -5.0)]);
        let engine = engine_with(
            VOCABULARY,
            "0110\tgoing\t50\n0110\tgoin\t10\n",
            model,
            Box::new(NoNeighbours),
            EngineOptions::default(),
        );
        let outcome = engine.process(&tokens(&["i", "goin", "to", "the", "store"]));
        let sentence = outcome.emitted().expect("sentence should be cleaned");
        assert_eq!(sentence.mode, Mode::Clean);
        assert_eq!(sentence.pairs[1], TokenPair::new("goin", "going"));
        assert_eq!(sentence.pairs[0], TokenPair::new("i", "i"));
        // Typo search and both cluster techniques propose "going".
        assert_eq!(
            sentence.changes[0].techniques,
            vec![Technique::Typo, Technique::ClusterAbbreviation, Technique::ClusterCommon]
        );
        assert_eq!(sentence.confidence, -20.0);
    }

    #[test]
    fn test_single_source_winner_is_rejected() {
        // "gone" scores best but only the embedding lookup proposes it.
        let model = TableModel::new(&[("i gone to", -1.0), ("i going to", -2.0), ("i goin to", -6.0)]);
        let neighbours = NeighbourTable::from_reader(Cursor::new("goin\tgone,going\n")).unwrap();
        let engine = engine_with(
            VOCABULARY,
            "0110\tgoing\t50\n0110\tgoin\t10\n",
            model,
            Box::new(neighbours),
            EngineOptions::default(),
        );
        let outcome = engine.process(&tokens(&["i", "goin", "to"]));
        assert_eq!(
            outcome,
            SentenceOutcome::Abandoned {
                index: 1,
                token: "goin".to_string()
            }
        );
    }

    #[test]
    fn test_corroborated_candidate_wins_ties() {
        let model = TableModel::new(&[("i tmoz", -1.0), ("i tmrw", -1.0), ("i tomorrow", -9.0)]);
        let neighbours = NeighbourTable::from_reader(Cursor::new("tomorrow\ttmrw\n")).unwrap();
        let engine = engine_with(
            VOCABULARY,
            "7\ttomorrow\t50\n7\ttmoz\t10\n7\ttmrw\t5\n",
            model,
            Box::new(neighbours),
            EngineOptions::default(),
        );
        let outcome = engine.process(&tokens(&["i", "tomorrow"]));
        let sentence = outcome.emitted().expect("sentence should be noisified");
        assert_eq!(sentence.mode, Mode::Noisify);
        // "tmoz" (cluster mode only) ties with "tmrw" (embedding and abbreviation)
        // and comes first lexically, yet the corroborated spelling wins.
        assert_eq!(sentence.pairs[1], TokenPair::new("tmrw", "tomorrow"));
        assert_eq!(sentence.pairs[0], TokenPair::new("i", "i"));
        assert_eq!(
            sentence.changes[0].techniques,
            vec![Technique::Embedding, Technique::ClusterAbbreviation]
        );
        assert_eq!(sentence.confidence, -1.0);
    }

    #[test]
    fn test_clean_fails_without_candidates() {
        let model = TableModel::new(&[]);
        let engine = engine_with(VOCABULARY, "", model, Box::new(NoNeighbours), EngineOptions::default());
        let outcome = engine.process(&tokens(&["i", "xqzvbk", "to"]));
        assert!(matches!(outcome, SentenceOutcome::Abandoned { index: 1, .. }));
        assert!(outcome.emitted().is_none());
    }

    #[test]
    fn test_noisify_silent_when_nothing_changes() {
        let model = TableModel::new(&[("the store", -1.0)]);
        let engine = engine_with(
            VOCABULARY,
            "1\tstore\t50\n1\tstor\t3\n",
            model,
            Box::new(NoNeighbours),
            EngineOptions::default(),
        );
        // "stor" is corroborated but cannot beat the original in context.
        assert_eq!(engine.process(&tokens(&["the", "store"])), SentenceOutcome::Unchanged);
        // A sentence with nothing to rewrite is also silent.
        assert_eq!(engine.process(&tokens(&["!", ":)"])), SentenceOutcome::Unchanged);
    }

    #[test]
    fn test_noisify_skips_hashtags() {
        let model = TableModel::new(&[("#good", -0.5), ("good", -3.0)]);
        let neighbours = NeighbourTable::from_reader(Cursor::new("good\t#good\n")).unwrap();
        let engine = engine_with(
            VOCABULARY,
            "1\tgood\t50\n1\t#good\t30\n",
            model,
            Box::new(neighbours),
            EngineOptions::default(),
        );
        assert_eq!(engine.process(&tokens(&["good"])), SentenceOutcome::Unchanged);
    }

    #[test]
    fn test_noisify_doubles_the_original_score() {
        // -4.0 loses to -3.0 but beats the doubled -6.0.
        let model = TableModel::new(&[("i tomorrow", -3.0), ("i tmrw", -4.0)]);
        let engine = engine_with(
            VOCABULARY,
            "7\ttomorrow\t50\n7\ttmrw\t10\n",
            model,
            Box::new(NoNeighbours),
            EngineOptions::default(),
        );
        let outcome = engine.process(&tokens(&["i", "tomorrow"]));
        let sentence = outcome.emitted().expect("sentence should be noisified");
        assert_eq!(sentence.pairs[1], TokenPair::new("tmrw", "tomorrow"));
        assert_eq!(
            sentence.changes[0].techniques,
            vec![Technique::ClusterAbbreviation, Technique::ClusterCommon]
        );

        let strict = EngineOptions {
            noisify_baseline_factor: 1.0,
            ..EngineOptions::default()
        };
        let model = TableModel::new(&[("i tomorrow", -3.0), ("i tmrw", -4.0)]);
        let engine = engine_with(VOCABULARY, "7\ttomorrow\t50\n7\ttmrw\t10\n", model, Box::new(NoNeighbours), strict);
        assert_eq!(engine.process(&tokens(&["i", "tomorrow"])), SentenceOutcome::Unchanged);
    }

    #[test]
    fn test_clean_compares_against_the_plain_score() {
        // Same margin as above, in the other direction: no doubling when cleaning.
        let model = TableModel::new(&[("i tmrw", -3.0), ("i tomorrow", -4.0)]);
        let engine = engine_with(
            VOCABULARY,
            "7\ttomorrow\t50\n7\ttmrw\t10\n",
            model,
            Box::new(NoNeighbours),
            EngineOptions::default(),
        );
        assert_eq!(
            engine.process(&tokens(&["i", "tmrw"])),
            SentenceOutcome::Abandoned {
                index: 1,
                token: "tmrw".to_string()
            }
        );
    }

    #[test]
    fn test_abbreviation_threshold_is_strict() {
        // "abcdefgxyz" abbreviates "abcdefg" with 7 of 10 letters, exactly 0.7.
        let paths = "1\tabcdefg\t5\n1\tabcdefgxyz\t1\n";
        let engine = engine_with(
            &["abcdefg"],
            paths,
            TableModel::new(&[]),
            Box::new(NoNeighbours),
            EngineOptions::default(),
        );
        let mut proposals = Provenance::new();
        engine.propose_from_clusters("abcdefgxyz", Mode::Clean, &mut proposals);
        assert_eq!(proposals.sources("abcdefg"), BTreeSet::from([Technique::ClusterCommon]));

        let lenient = EngineOptions {
            abbreviation_threshold: 0.69,
            ..EngineOptions::default()
        };
        let engine = engine_with(&["abcdefg"], paths, TableModel::new(&[]), Box::new(NoNeighbours), lenient);
        let mut proposals = Provenance::new();
        engine.propose_from_clusters("abcdefgxyz", Mode::Clean, &mut proposals);
        assert_eq!(
            proposals.sources("abcdefg"),
            BTreeSet::from([Technique::ClusterAbbreviation, Technique::ClusterCommon])
        );
    }

    #[test]
    fn test_embedding_skips_wrong_side_of_vocabulary() {
        let neighbours = NeighbourTable::from_reader(Cursor::new("going\tgone,goin,goinn\ngoin\tgoinn,going\n")).unwrap();
        let engine = engine_with(VOCABULARY, "", TableModel::new(&[]), Box::new(neighbours), EngineOptions::default());

        let mut proposals = Provenance::new();
        engine.propose_embedding("going", Mode::Noisify, &mut proposals);
        assert_eq!(proposals.texts(), vec!["goin"]);

        let mut proposals = Provenance::new();
        engine.propose_embedding("goin", Mode::Clean, &mut proposals);
        assert_eq!(proposals.texts(), vec!["going"]);
    }

    #[test]
    fn test_shortening_and_clean_left_context() {
        let model = TableModel::new(&[("so goood", -2.0), ("so good !", -1.0), ("so goood !", -9.0)]);
        let neighbours = NeighbourTable::from_reader(Cursor::new("sooo\tso\ngoood\tgood\n")).unwrap();
        let engine = engine_with(VOCABULARY, "", model, Box::new(neighbours), EngineOptions::default());
        let outcome = engine.process(&tokens(&["sooo", "goood", "!"]));
        let sentence = outcome.emitted().expect("sentence should be cleaned");
        assert_eq!(sentence.pairs[0], TokenPair::new("sooo", "so"));
        assert_eq!(sentence.pairs[1], TokenPair::new("goood", "good"));
        assert!(sentence.changes[0].techniques.contains(&Technique::Shorten));
        assert!(sentence.changes[0].techniques.contains(&Technique::Embedding));
        // "goood" is only an improvement once its left neighbour is repaired.
        assert_eq!(
            sentence.changes[1].techniques,
            vec![Technique::Typo, Technique::Embedding, Technique::Shorten]
        );
        assert_eq!(sentence.confidence, -1.0);
    }

    #[test]
    fn test_split_candidates_follow_compound_option() {
        let vocabulary = &["to", "store", "i"];
        let paths = "1\ttostore\t3\n1\tstore\t50\n";
        let model = || TableModel::new(&[("i store", -1.0), ("i to store", -5.0)]);

        // Without compounds the split is proposed while cleaning, next to the
        // typo and cluster proposals that win.
        let engine = engine_with(vocabulary, paths, model(), Box::new(NoNeighbours), EngineOptions::default());
        let outcome = engine.process(&tokens(&["i", "tostore"]));
        let sentence = outcome.emitted().expect("sentence should be cleaned");
        assert_eq!(sentence.pairs[1], TokenPair::new("tostore", "store"));
        assert_eq!(sentence.changes[0].candidates, vec!["store", "to store"]);

        // With compounds the token is skipped, leaving nothing to clean.
        let options = EngineOptions {
            allow_compounds: true,
            ..EngineOptions::default()
        };
        let engine = engine_with(vocabulary, paths, model(), Box::new(NoNeighbours), options);
        assert_eq!(engine.process(&tokens(&["i", "tostore"])), SentenceOutcome::Unchanged);
    }
}

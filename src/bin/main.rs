use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use crossterm::style::Stylize;
use lexnorm_core::config::{NeighbourSource, ResourcePaths};
use lexnorm_core::core::types::{Mode, NormalizedSentence};
use lexnorm_core::oracle::neighbours::NEIGHBOUR_COUNT;
use lexnorm_core::oracle::VectorNeighbours;
use lexnorm_core::persistence::save_neighbour_cache;
use lexnorm_core::text::corpus::{CorpusReader, InputFormat};
use lexnorm_core::text::tokenizer::{is_truncated, tokenize};
use lexnorm_core::text::writer::PairWriter;
use lexnorm_core::{EngineOptions, NormalizationEngine, SentenceOutcome};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Generates aligned noisy/normalized sentence pairs from a raw corpus.
#[derive(Parser, Debug)]
#[command(name = "lexnorm_gen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "info,lexnorm_core=debug,lexnorm_gen=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean or corrupt every sentence of a corpus
    Generate(GenerateArgs),

    /// Precompute nearest neighbours from word vectors into a binary cache
    #[command(name = "build-cache")]
    BuildCache(BuildCacheArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("neighbour_source").args(["neighbours", "neighbour_cache", "vectors"])))]
struct GenerateArgs {
    /// Input corpus
    #[arg(long)]
    data: PathBuf,

    #[arg(long, value_enum, default_value = "text")]
    format: InputFormat,

    /// Vocabulary, one word per line
    #[arg(long, env = "LEXNORM_VOCABULARY")]
    vocabulary: PathBuf,

    /// Word clusters: `path<TAB>token<TAB>count` per line
    #[arg(long, env = "LEXNORM_PATHS")]
    paths: PathBuf,

    /// ARPA language model
    #[arg(long, env = "LEXNORM_MODEL")]
    model: PathBuf,

    /// Neighbour table: `word<TAB>n1,n2,...` per line
    #[arg(long)]
    neighbours: Option<PathBuf>,

    /// Neighbour cache written by `build-cache`
    #[arg(long)]
    neighbour_cache: Option<PathBuf>,

    /// word2vec text vectors, searched on demand
    #[arg(long)]
    vectors: Option<PathBuf>,

    /// Treat tokens made of two known words as compounds
    #[arg(long)]
    allow_compounds: bool,

    /// JSON file with engine options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Receives noisified sentences, as (noisy, status, clean)
    #[arg(long)]
    output_clean: PathBuf,

    /// Receives cleaned sentences, as (noisy, status, clean)
    #[arg(long)]
    output_noisy: PathBuf,

    /// Print every accepted change with its candidates
    #[arg(long)]
    debug: bool,
}

impl GenerateArgs {
    fn neighbour_source(&self) -> NeighbourSource {
        if let Some(path) = &self.neighbours {
            NeighbourSource::Table(path.clone())
        } else if let Some(path) = &self.neighbour_cache {
            NeighbourSource::Cache(path.clone())
        } else if let Some(path) = &self.vectors {
            NeighbourSource::Vectors(path.clone())
        } else {
            NeighbourSource::None
        }
    }
}

#[derive(Args, Debug)]
struct BuildCacheArgs {
    /// word2vec text vectors
    #[arg(long)]
    vectors: PathBuf,

    /// Where to write the cache
    #[arg(long)]
    output: PathBuf,

    /// Neighbours kept per word
    #[arg(long, default_value_t = NEIGHBOUR_COUNT)]
    top_k: usize,
}

#[derive(Debug, Default)]
struct RunSummary {
    sentences: usize,
    truncated: usize,
    cleaned: usize,
    noisified: usize,
    abandoned: usize,
    unchanged: usize,
    changes: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_filter().into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    match cli.command {
        Command::Generate(args) => generate(args),
        Command::BuildCache(args) => build_cache(args),
    }
}

fn generate(args: GenerateArgs) -> Result<()> {
    let mut options = match &args.config {
        Some(path) => EngineOptions::load(path).with_context(|| format!("reading options {}", path.display()))?,
        None => EngineOptions::default(),
    };
    options.allow_compounds |= args.allow_compounds;

    let paths = ResourcePaths {
        vocabulary: args.vocabulary.clone(),
        cluster_paths: args.paths.clone(),
        language_model: args.model.clone(),
        neighbours: args.neighbour_source(),
    };
    let started = Instant::now();
    let resources = paths.load(&options).context("loading resources")?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "resources loaded");
    let engine = NormalizationEngine::new(resources, options);

    let input = File::open(&args.data).with_context(|| format!("opening corpus {}", args.data.display()))?;
    let mut corpus = CorpusReader::new(BufReader::new(input), args.format);
    let mut clean_out = PairWriter::create(&args.output_clean)
        .with_context(|| format!("creating {}", args.output_clean.display()))?;
    let mut noisy_out = PairWriter::create(&args.output_noisy)
        .with_context(|| format!("creating {}", args.output_noisy.display()))?;

    let mut summary = RunSummary::default();
    for sentence in corpus.by_ref() {
        let sentence = sentence?;
        summary.sentences += 1;
        if is_truncated(&sentence) {
            summary.truncated += 1;
            continue;
        }
        let tokens = tokenize(&sentence);
        match engine.process(&tokens) {
            SentenceOutcome::Emitted(normalized) => {
                summary.changes += normalized.changes.len();
                match normalized.mode {
                    Mode::Clean => {
                        summary.cleaned += 1;
                        noisy_out.write_sentence(&normalized)?;
                    }
                    Mode::Noisify => {
                        summary.noisified += 1;
                        clean_out.write_sentence(&normalized)?;
                    }
                }
                if args.debug {
                    print_report(&sentence, &normalized);
                }
            }
            SentenceOutcome::Abandoned { index, token } => {
                debug!(index, token = %token, "sentence abandoned");
                summary.abandoned += 1;
            }
            SentenceOutcome::Unchanged => summary.unchanged += 1,
        }
    }
    clean_out.flush()?;
    noisy_out.flush()?;

    if summary.sentences == 0 {
        warn!(path = %args.data.display(), "corpus contained no sentences");
    }
    info!(
        sentences = summary.sentences,
        skipped_lines = corpus.skipped(),
        truncated = summary.truncated,
        cleaned = summary.cleaned,
        noisified = summary.noisified,
        abandoned = summary.abandoned,
        unchanged = summary.unchanged,
        changes = summary.changes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generation finished"
    );
    Ok(())
}

fn build_cache(args: BuildCacheArgs) -> Result<()> {
    if args.top_k == 0 {
        bail!("--top-k must be at least 1");
    }
    let vectors = VectorNeighbours::load(&args.vectors)
        .with_context(|| format!("reading vectors {}", args.vectors.display()))?
        .with_top_k(args.top_k);
    let table = vectors.to_table();
    save_neighbour_cache(&table, &args.output)?;
    Ok(())
}

fn print_report(sentence: &str, normalized: &NormalizedSentence) {
    let title = match normalized.mode {
        Mode::Clean => "CLEANED".green().bold(),
        Mode::Noisify => "NOISIFIED".yellow().bold(),
    };
    eprintln!("{} {}", title, sentence.dim());
    for change in &normalized.changes {
        let techniques: Vec<&str> = change.techniques.iter().map(|t| t.name()).collect();
        eprintln!(
            "  [{}] {} -> {}  {:.3}  ({})",
            change.index,
            change.from.as_str().red(),
            change.to.as_str().cyan(),
            change.score,
            techniques.join(", ")
        );
        eprintln!("      candidates: {}", change.candidates.join(" | ").dark_grey());
    }
    let rewritten: Vec<&str> = normalized
        .pairs
        .iter()
        .map(|pair| match normalized.mode {
            Mode::Clean => pair.normalized.as_str(),
            Mode::Noisify => pair.raw.as_str(),
        })
        .collect();
    eprintln!("  => {}  (confidence {:.3})", rewritten.join(" ").bold(), normalized.confidence);
}

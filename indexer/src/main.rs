use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use lexis_core::config::NormalizerSettings;
use lexis_core::persist::{open_index, IndexPaths};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod console;
mod html;
mod pipeline;

use console::SearchMode;

#[derive(Parser)]
#[command(name = "lexis-indexer")]
#[command(about = "Normalize crawled pages, build the inverted index and TF-IDF listings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct NormalizerArgs {
    /// Stop-word list, one word per line (built-in list when omitted)
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Known typos to drop, one word per line
    #[arg(long)]
    typos: Option<PathBuf>,
    /// `form lemma` dictionary (Snowball stemmer when omitted)
    #[arg(long)]
    lemma_dict: Option<PathBuf>,
}

impl From<NormalizerArgs> for NormalizerSettings {
    fn from(args: NormalizerArgs) -> Self {
        NormalizerSettings {
            stop_words: args.stopwords,
            typos: args.typos,
            lemma_dictionary: args.lemma_dict,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from pages/<n>.html and write token and lemma listings
    Normalize {
        /// Pipeline directory (holds pages/ and index.txt)
        #[arg(long, default_value = "./output")]
        output: String,
        #[command(flatten)]
        normalizer: NormalizerArgs,
    },
    /// Write inverted_index.txt from the lemma listings
    Index {
        #[arg(long, default_value = "./output")]
        output: String,
    },
    /// Write per-document TF-IDF listings for tokens and lemmas
    Tfidf {
        #[arg(long, default_value = "./output")]
        output: String,
    },
    /// Run every step and write corpus.bin and meta.json
    Build {
        #[arg(long, default_value = "./output")]
        output: String,
        #[command(flatten)]
        normalizer: NormalizerArgs,
    },
    /// Interactive console search over a built pipeline directory
    Search {
        #[arg(long, default_value = "./output")]
        output: String,
        /// Rank by cosine similarity instead of evaluating boolean queries
        #[arg(long, default_value_t = false)]
        vector: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize { output, normalizer } => {
            pipeline::normalize_pages(&IndexPaths::new(output), &normalizer.into()).map(|_| ())
        }
        Commands::Index { output } => pipeline::write_inverted_index(&IndexPaths::new(output)),
        Commands::Tfidf { output } => pipeline::write_tfidf(&IndexPaths::new(output)),
        Commands::Build { output, normalizer } => {
            pipeline::build(&IndexPaths::new(output), &normalizer.into())
        }
        Commands::Search { output, vector } => {
            let mode = if vector { SearchMode::Vector } else { SearchMode::Boolean };
            let (snapshot, normalizer) = open_index(&IndexPaths::new(output))?;
            let stdin = io::stdin();
            console::run(&snapshot, &normalizer, mode, stdin.lock(), io::stdout().lock())
        }
    }
}

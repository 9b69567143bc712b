use anyhow::Result;
use clap::{Parser, Subcommand};
use indexer::{build_index, import_corpus, query_index};
use search_core::IdfMode;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, import and query TF-IDF + PageRank index directories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the anchor/body indexes from a crawl snapshot
    Build {
        /// Directory holding corpus.bin (crawler output)
        #[arg(long)]
        corpus: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
    },
    /// Convert JSON/JSONL document dumps (file or directory) into a corpus snapshot
    Import {
        #[arg(long)]
        input: PathBuf,
        /// Directory to write corpus.bin into
        #[arg(long)]
        output: PathBuf,
    },
    /// Run one query against an index directory
    Query {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        text: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { corpus, output, smoothed_idf } => {
            let idf_mode = if smoothed_idf { IdfMode::Smoothed } else { IdfMode::Plain };
            build_index(&corpus, &output, idf_mode)?;
        }
        Commands::Import { input, output } => {
            import_corpus(&input, &output)?;
        }
        Commands::Query { index, limit, text } => {
            for hit in query_index(&index, &text, limit)? {
                println!("{}  {}", hit.title, hit.url);
            }
        }
    }
    Ok(())
}

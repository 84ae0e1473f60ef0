// Command-line front end: replay recorded mutations onto a document, or look
// up a node by path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use mirror::{MirrorConfig, MutationRecord, ReplayEngine, ReplayStats};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "dommirror")]
#[command(about = "Replay recorded DOM mutations onto a document", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON array of mutation records and print the resulting markup
    Replay {
        /// Destination document (HTML)
        #[arg(short, long)]
        document: PathBuf,

        /// Mutation records (JSON array)
        #[arg(short, long)]
        mutations: PathBuf,

        /// Optional TOML config with [replay] and [capture] tables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log failing records and continue instead of stopping
        #[arg(long)]
        keep_going: bool,

        /// Write the markup here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the markup of the node a path resolves to
    Path {
        /// Document (HTML)
        #[arg(short, long)]
        document: PathBuf,

        /// Path such as /html/body/div[2]
        #[arg(short, long)]
        path: String,
    },
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn replay(
    document: &Path,
    mutations: &Path,
    config: Option<&Path>,
    keep_going: bool,
) -> Result<String> {
    let config = match config {
        Some(path) => MirrorConfig::load(path)?,
        None => MirrorConfig::default(),
    };
    let mut doc = html::parse_document(&read(document)?);
    let records: Vec<MutationRecord> = serde_json::from_str(&read(mutations)?)
        .with_context(|| format!("invalid mutation records in {}", mutations.display()))?;

    let mut engine = ReplayEngine::new(config.replay);
    let stats = if keep_going {
        let mut stats = ReplayStats::default();
        for (index, record) in records.iter().enumerate() {
            match engine.apply(&mut doc, record) {
                Ok(mirror::Outcome::Applied) => stats.applied += 1,
                Ok(mirror::Outcome::Skipped) => stats.skipped += 1,
                Err(err) => log::warn!("mutation #{index} failed: {err}"),
            }
        }
        stats
    } else {
        engine.apply_all(&mut doc, &records)?
    };
    log::info!(
        "{} applied, {} skipped, {} style sheets registered",
        stats.applied,
        stats.skipped,
        engine.registry().len()
    );
    Ok(doc.to_markup())
}

fn lookup(document: &Path, path: &str) -> Result<String> {
    let doc = html::parse_document(&read(document)?);
    let Some(node) = html::resolve_path(&doc, path) else {
        bail!("no node at {path}");
    };
    Ok(doc.outer_markup(node))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            document,
            mutations,
            config,
            keep_going,
            output,
        } => {
            let markup = replay(&document, &mutations, config.as_deref(), keep_going)?;
            match output {
                Some(path) => fs::write(&path, markup)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{markup}"),
            }
        }
        Commands::Path { document, path } => {
            println!("{}", lookup(&document, &path)?);
        }
    }
    Ok(())
}

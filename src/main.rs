//! Canon FTS Indexer CLI
//!
//! Builds the full-text index for a corpus edition and inspects the result.

use anyhow::{Context, Result};
use canon_fts_indexer::{
    config::Config,
    document::Language,
    indexer::CorpusIndexer,
    persistence::{database_size, load_database},
    tree::{AnchorIndex, Position},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Canon FTS Indexer - builds a contentless search index with section metadata
#[derive(Parser)]
#[command(name = "fts-indexer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from the tree definition and source documents
    Build {
        /// Path to a YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the tree definition
        #[arg(long)]
        tree: Option<PathBuf>,

        /// Folder of JSON source documents
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output path for the index (.bin or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Records per atomic batch (default: one batch per file)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Also build the auto-complete word table
        #[arg(long)]
        suggestions: bool,
    },

    /// Show information about a built index
    Info {
        /// Path to the index file
        #[arg(default_value = "assets/databases/fts-index.bin")]
        index: PathBuf,
    },

    /// Show which tree node contains a position in a file
    Resolve {
        /// File key (file name without .json)
        file: String,

        /// Page index
        page: u32,

        /// Entry index within the page
        entry: u32,

        /// Path to the tree definition
        #[arg(long, default_value = "assets/data/tree.json")]
        tree: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Build {
            config,
            tree,
            input,
            output,
            batch_size,
            suggestions,
        } => cmd_build(config, tree, input, output, batch_size, suggestions),
        Commands::Info { index } => cmd_info(index),
        Commands::Resolve {
            file,
            page,
            entry,
            tree,
        } => cmd_resolve(file, page, entry, tree),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();
}

fn cmd_build(
    config_path: Option<PathBuf>,
    tree: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    batch_size: Option<usize>,
    suggestions: bool,
) -> Result<()> {
    let mut config =
        Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    if let Some(tree) = tree {
        config.paths.tree = tree;
    }
    if let Some(input) = input {
        config.paths.input_dir = input;
    }
    if let Some(output) = output {
        config.paths.output = output;
    }
    if batch_size.is_some() {
        config.indexing.batch_size = batch_size;
    }
    if suggestions {
        config.suggestions.enabled = true;
    }

    println!("{}", "=".repeat(70));
    println!("{} - Full-Text Search Index Builder", config.edition.name);
    println!("{}", "=".repeat(70));
    println!("  Tree:    {}", config.paths.tree.display());
    println!("  Input:   {}", config.paths.input_dir.display());
    println!("  Output:  {}", config.paths.output.display());
    println!("  Edition: {} ({})", config.edition.id, config.edition.name);
    println!();

    let output = config.paths.output.clone();
    let indexer = CorpusIndexer::new(config).context("Failed to prepare indexing run")?;
    let summary = indexer.run().context("Indexing run failed")?;

    println!();
    println!("Index Built:");
    println!("  Entries indexed:  {}", summary.entries_indexed);
    println!(
        "  Files processed:  {}/{}",
        summary.files_processed, summary.files_found
    );
    println!("  Empty entries:    {}", summary.entries_dropped);
    println!("  Batches:          {}", summary.batches_committed);
    if summary.suggestions > 0 {
        println!("  Suggestions:      {}", summary.suggestions);
    }
    println!("  Build time:       {:.2?}", summary.elapsed);

    if !summary.skipped.is_empty() {
        println!();
        println!("Skipped files ({}):", summary.skipped.len());
        for skipped in &summary.skipped {
            println!("  {}: {}", skipped.file, skipped.reason);
        }
    }

    let size = database_size(&output)?;
    println!();
    println!("Index saved to: {}", output.display());
    println!("  File size: {:.2} MB", size as f64 / 1024.0 / 1024.0);

    Ok(())
}

fn cmd_info(index_path: PathBuf) -> Result<()> {
    let db = load_database(&index_path).context("Failed to load index")?;
    let size = database_size(&index_path)?;

    println!("Index Information");
    println!("{}", "─".repeat(40));
    println!("  Edition:      {} ({})", db.edition_id, db.edition_name);
    println!("  Records:      {}", db.meta.len());
    println!("  Files:        {}", db.meta.file_count());
    for language in Language::ALL {
        println!(
            "  {:<12}  {}",
            format!("{}:", language),
            db.meta.ids_for_language(language).len()
        );
    }
    println!("  Terms:        {}", db.fts.term_count());
    println!("  Tokens:       {}", db.fts.token_count());
    if let Some(suggestions) = &db.suggestions {
        println!("  Suggestions:  {}", suggestions.len());
    }
    println!("  File size:    {:.1} KB", size as f64 / 1024.0);
    println!("  Index path:   {}", index_path.display());

    Ok(())
}

fn cmd_resolve(file: String, page: u32, entry: u32, tree_path: PathBuf) -> Result<()> {
    let anchors = AnchorIndex::load(&tree_path).context("Failed to load tree definition")?;
    let position = Position::new(page, entry);

    if anchors.anchors_for(&file).is_empty() {
        println!("No tree nodes are anchored in '{}'.", file);
        return Ok(());
    }

    println!("{} @ {} -> {}", file, position, anchors.node_key_for(&file, position));
    Ok(())
}

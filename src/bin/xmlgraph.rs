//! xmlgraph CLI tool
//!
//! Builds the entity graph for a folder of XML documents once and reports what it found.
//!
//! ```text
//! xmlgraph ./data --config xmlgraph.toml
//! RUST_LOG=xmlgraph=debug xmlgraph ./data
//! ```

use clap::Parser;
use std::path::PathBuf;
use xmlgraph::{
    cache::{GraphCache, LoadOutcome},
    config::GraphConfig,
    GraphCacheError,
};

#[derive(Parser)]
#[command(name = "xmlgraph")]
#[command(author, version, about = "Builds an entity graph from a folder of XML documents", long_about = None)]
struct Cli {
    /// Top level folder holding the XML documents
    folder: Option<PathBuf>,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every diagnostic instead of a summary
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<(), GraphCacheError> {
    let Some(folder) = cli.folder.as_ref() else {
        return Err(GraphCacheError::InvalidInput(
            "Missing argument: top level folder".to_string(),
        ));
    };
    let config = match cli.config.as_ref() {
        Some(path) => GraphConfig::from_toml_file(path)?,
        None => GraphConfig::default(),
    };

    let mut cache = GraphCache::new(config);
    let report = match cache.load(folder, true)? {
        LoadOutcome::Rebuilt(report) => report,
        LoadOutcome::Reused => return Ok(()),
    };
    tracing::debug!("graph root: {:?}", cache.root());

    tracing::info!(
        "Loaded {} entities from {} files in {:?}: {} parent links, {} child links, {} edges, {} dangling references",
        report.entities,
        report.files_visited,
        report.elapsed,
        report.resolve.parent_links,
        report.resolve.child_links,
        report.resolve.edges,
        report.resolve.dangling
    );
    if cli.verbose {
        for diagnostic in report.diagnostics.iter() {
            tracing::warn!("{diagnostic}");
        }
    } else if report.has_errors() {
        tracing::warn!(
            "{} duplicate ids, {} unreadable documents (run with --verbose for details)",
            report.duplicates().count(),
            report.extraction_failures().count()
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        tracing::error!("{e}");
    }
    tracing::info!("xmlgraph exited");
    Ok(())
}

//! Binary entry point for memweave.
//!
//! Ranks, connects, and graphs memory records read from a JSON file.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use memweave::analysis::ResilientAnalyzer;
use memweave::config::EngineConfig;
use memweave::embedding::{
    BulkheadEmbedder, Embedder, EmbeddingBulkheadConfig, FallbackEmbedder, HashEmbedder,
};
use memweave::models::{AccessUpdate, MemoryRecord, SearchFilter, SearchRequest};
use memweave::observability::{self, LoggingConfig};
use memweave::services::{KnowledgeGraphBuilder, RecallService};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Memweave - relevance ranking and connection inference for memory records.
#[derive(Parser)]
#[command(name = "memweave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "MEMWEAVE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// JSON file holding an array of memory records.
    #[arg(short, long, global = true, env = "MEMWEAVE_RECORDS")]
    records: Option<PathBuf>,

    /// Embedding provider for records without embeddings.
    #[arg(long, global = true, value_enum, default_value_t = EmbedderKind::Hash)]
    embedder: EmbedderKind,

    #[command(subcommand)]
    command: Commands,
}

/// Embedding providers available from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Deterministic hash embeddings.
    Hash,
    /// No embeddings; rank lexically.
    None,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Rank records against a query.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum final score.
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Rank on vector similarity alone.
        #[arg(long)]
        vector_only: bool,

        /// Restrict to a tenant.
        #[arg(long)]
        tenant: Option<String>,

        /// Restrict to a brand.
        #[arg(long)]
        brand: Option<String>,

        /// Restrict to a customer.
        #[arg(long)]
        customer: Option<String>,

        /// Require a tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Print the score breakdown of every result.
        #[arg(long)]
        detailed: bool,
    },

    /// Suggest connections for one record.
    Connect {
        /// Source record id.
        id: String,

        /// Maximum number of suggestions.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Candidate relevance cutoff.
        #[arg(short, long)]
        threshold: Option<f32>,
    },

    /// Build a knowledge graph over all records.
    Graph {
        /// Connections explored per record (defaults to `connections.graph_limit`).
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum edge strength.
        #[arg(short, long)]
        threshold: Option<f32>,
    },

    /// Extract topics and importance.
    Analyze {
        /// Text to analyze.
        text: Option<String>,

        /// Analyze a record from the records file instead.
        #[arg(long, conflicts_with = "text")]
        id: Option<String>,
    },
}

#[derive(Serialize)]
struct SearchOutput<T: Serialize> {
    results: Vec<T>,
    access_updates: Vec<AccessUpdate>,
}

/// Main entry point.
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig::from_settings(Some(&config.logging), cli.verbose);
    if let Err(e) = observability::init_logging(logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &EngineConfig) -> Result<()> {
    let embedder = build_embedder(cli.embedder);
    let recall = config.recall_service(embedder);

    match cli.command {
        Commands::Search {
            query,
            limit,
            threshold,
            vector_only,
            tenant,
            brand,
            customer,
            tags,
            detailed,
        } => {
            let filter = SearchFilter {
                tenant_id: tenant,
                brand_id: brand,
                customer_id: customer,
                tags,
            };
            let mut options = config.search.to_options();
            if let Some(limit) = limit {
                options.limit = limit;
            }
            if let Some(threshold) = threshold {
                options.threshold = threshold;
            }
            if vector_only {
                options.hybrid = false;
            }
            let request = SearchRequest::new(query)
                .with_filter(filter)
                .with_options(options);
            cmd_search(&recall, &request, cli.records.as_deref(), detailed)
        },

        Commands::Connect {
            id,
            limit,
            threshold,
        } => {
            let mut options = config.connections.to_options();
            if let Some(limit) = limit {
                options.limit = limit;
            }
            if let Some(threshold) = threshold {
                options.threshold = threshold;
            }
            let records = load_records(cli.records.as_deref())?;
            let source = find_record(&records, &id)?;
            let service = config.connection_service(ResilientAnalyzer::heuristic());
            let suggestions = service.find_connections(&recall, source, &records, &options)?;
            print_json(&suggestions)
        },

        Commands::Graph { limit, threshold } => {
            let mut options = config.connections.to_graph_options();
            if let Some(limit) = limit {
                options.limit = limit;
            }
            if let Some(threshold) = threshold {
                options.threshold = threshold;
            }
            let records = load_records(cli.records.as_deref())?;
            let builder = KnowledgeGraphBuilder::new(
                recall,
                config.connection_service(ResilientAnalyzer::heuristic()),
            )
            .with_options(options);
            print_json(&builder.build(&records)?)
        },

        Commands::Analyze { text, id } => {
            let analyzer =
                ResilientAnalyzer::heuristic().with_max_topics(config.connections.max_topics);
            match (text, id) {
                (Some(text), _) => print_json(&analyzer.analyze_text(&text)),
                (None, Some(id)) => {
                    let records = load_records(cli.records.as_deref())?;
                    print_json(&analyzer.enrich(find_record(&records, &id)?))
                },
                (None, None) => bail!("provide text to analyze or --id"),
            }
        },
    }
}

/// Search command.
fn cmd_search(
    recall: &RecallService,
    request: &SearchRequest,
    records_path: Option<&Path>,
    detailed: bool,
) -> Result<()> {
    let records = load_records(records_path)?;
    let now = chrono::Utc::now();

    if detailed {
        let results = recall.search_detailed(request, &records)?;
        let returned: Vec<MemoryRecord> = results.iter().map(|c| c.record.clone()).collect();
        print_json(&SearchOutput {
            access_updates: AccessUpdate::for_results(&returned, now),
            results,
        })
    } else {
        let results = recall.search(request, &records)?;
        print_json(&SearchOutput {
            access_updates: AccessUpdate::for_results(&results, now),
            results,
        })
    }
}

/// Loads configuration.
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::load_default(),
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn build_embedder(kind: EmbedderKind) -> Arc<dyn Embedder> {
    match kind {
        EmbedderKind::Hash => Arc::new(BulkheadEmbedder::new(
            HashEmbedder::new(),
            EmbeddingBulkheadConfig::from_env(),
        )),
        EmbedderKind::None => Arc::new(FallbackEmbedder::new()),
    }
}

fn load_records(path: Option<&Path>) -> Result<Vec<MemoryRecord>> {
    let Some(path) = path else {
        bail!("no records file given (use --records or MEMWEAVE_RECORDS)");
    };
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let records: Vec<MemoryRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing records from {}", path.display()))?;
    tracing::debug!(count = records.len(), "Loaded records");
    Ok(records)
}

fn find_record<'a>(records: &'a [MemoryRecord], id: &str) -> Result<&'a MemoryRecord> {
    records
        .iter()
        .find(|r| r.id.as_str() == id)
        .with_context(|| format!("no record with id '{id}'"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

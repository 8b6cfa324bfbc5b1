//! # campus-kb CLI Application
//!
//! This module implements the command-line interface for the knowledge base,
//! providing access to every ingestion stage through a set of subcommands.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands:
//!   - `ingest`: Full refresh (crawl, PDFs, index)
//!   - `crawl`: Website content acquisition only
//!   - `pdf`: PDF download and extraction only
//!   - `search`: Ranked passages for a query
//!   - `stats`: Index inspection
//!   - `add`: Incremental addition of text files
//!   - `prune`: Removal of stale artifacts
//!
//! Settings come from a TOML file (`--config`, or `ingest.toml` in the
//! working directory when present); flags override it. Ctrl-C stops crawling
//! and downloading at the next request boundary.

mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use campus_kb::config::IngestConfig;
use campus_kb::crawler::{CancelSignal, CrawlEvent, Crawler, PageOutcome, cancel_channel};
use campus_kb::index::{IndexStatus, Indexer};
use campus_kb::model::Embedder;
use campus_kb::pdf::PdfPipeline;
use campus_kb::pipeline::{IngestOptions, Ingestion, QUICK_MAX_PAGES};
use campus_kb::search::{SearchOptions, SearchSystem};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use telemetry::OtelGuard;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

const DEFAULT_CONFIG_FILE: &str = "ingest.toml";

#[derive(Parser)]
#[command(author, version, about = "Crawl, extract and index a university website for retrieval", long_about = None)]
struct Cli {
    /// Configuration file (default: ingest.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl, process PDFs and build or load the index
    Ingest(IngestArgs),

    /// Crawl the seeds and save page text
    Crawl(CrawlArgs),

    /// Download configured PDFs and extract local ones
    Pdf(PdfArgs),

    /// Search the index
    Search(SearchArgs),

    /// Show index statistics
    Stats(StatsArgs),

    /// Add text files to the existing index
    Add(AddArgs),

    /// Delete artifacts whose file name contains a pattern
    Prune(PruneArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Seed URL, replaces the configured seeds (repeatable)
    #[arg(long = "seed")]
    seeds: Vec<String>,

    /// Maximum pages per seed
    #[arg(short = 'p', long)]
    max_pages: Option<u32>,

    /// Skip web crawling
    #[arg(long)]
    skip_scraping: bool,

    /// Skip PDF processing
    #[arg(long)]
    skip_pdfs: bool,

    /// Rebuild the index even if one exists
    #[arg(long)]
    force_rebuild: bool,

    /// Crawl only a few pages per seed
    #[arg(long, conflicts_with = "max_pages")]
    quick: bool,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed URL, replaces the configured seeds (repeatable)
    #[arg(long = "seed")]
    seeds: Vec<String>,

    /// Maximum pages per seed
    #[arg(short = 'p', long)]
    max_pages: Option<u32>,
}

#[derive(Args, Debug)]
struct PdfArgs {
    /// PDF URL to download in addition to the configured ones (repeatable)
    #[arg(long = "url")]
    urls: Vec<String>,

    /// Only extract PDFs already in the PDF directory
    #[arg(long)]
    local_only: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    query: String,

    /// Number of results (default: configured top_k)
    #[arg(short)]
    k: Option<usize>,

    /// Only rank passages whose source contains this string
    #[arg(short, long)]
    source: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Text files to add
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct PruneArgs {
    /// File name substring to delete (repeatable)
    #[arg(long = "pattern", required = true)]
    patterns: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel: OtelGuard = telemetry::init_tracing_subscriber(cli.log_dir.as_deref())?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest(args) => ingest_command(config, args).await,
        Commands::Crawl(args) => crawl_command(config, args).await,
        Commands::Pdf(args) => pdf_command(config, args).await,
        Commands::Search(args) => search_command(config, args).await,
        Commands::Stats(args) => stats_command(config, args).await,
        Commands::Add(args) => add_command(config, args).await,
        Commands::Prune(args) => prune_command(config, args).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<IngestConfig> {
    match path {
        Some(path) => Ok(IngestConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Ok(IngestConfig::load(Path::new(DEFAULT_CONFIG_FILE))?)
        }
        None => Ok(IngestConfig::default()),
    }
}

/// Cancellation signal flipped by Ctrl-C
fn ctrl_c_signal() -> CancelSignal {
    let (cancel_tx, cancel) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, finishing the current request...");
            let _ = cancel_tx.send(true);
        }
    });
    cancel
}

fn crawl_progress(total: u64) -> (mpsc::Sender<CrawlEvent>, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel::<CrawlEvent>(100);

    let progress_bar = ProgressBar::new(total);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let handle = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            progress_bar.inc(1);
            let status = match event.outcome {
                PageOutcome::Saved(_) => "saved",
                PageOutcome::TooShort => "skipped",
                PageOutcome::FetchFailed(_) => "failed",
                PageOutcome::WriteFailed(_) => "write failed",
            };
            progress_bar.set_message(format!("{} {}", status, event.url));
        }
        progress_bar.finish_with_message("Crawl completed");
    });

    (sender, handle)
}

fn embedding_progress() -> (mpsc::Sender<usize>, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel::<usize>(100);

    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} [{elapsed_precise}] {pos} chunks embedded")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let handle = tokio::spawn(async move {
        while let Some(count) = receiver.recv().await {
            progress_bar.inc(count as u64);
        }
        progress_bar.finish();
    });

    (sender, handle)
}

#[instrument(skip(config))]
async fn ingest_command(mut config: IngestConfig, args: IngestArgs) -> anyhow::Result<()> {
    if !args.seeds.is_empty() {
        config.crawl.seeds = args.seeds;
    }
    let max_pages = if args.quick {
        Some(QUICK_MAX_PAGES)
    } else {
        args.max_pages
    };
    let options = IngestOptions {
        max_pages,
        skip_crawl: args.skip_scraping,
        skip_pdfs: args.skip_pdfs,
        force_rebuild: args.force_rebuild,
    };

    let embedder = Embedder::from_settings(&config.embedding)?;
    let pages_per_seed = max_pages.unwrap_or(config.crawl.max_pages_per_seed);
    let total_pages = u64::from(pages_per_seed) * config.crawl.seeds.len() as u64;

    let mut ingestion = Ingestion::new(config, embedder).with_cancel(ctrl_c_signal());
    let mut handles = Vec::new();
    if !options.skip_crawl {
        let (sender, handle) = crawl_progress(total_pages);
        ingestion = ingestion.with_crawl_progress(sender);
        handles.push(handle);
    }
    let (sender, handle) = embedding_progress();
    ingestion = ingestion.with_embedding_progress(sender);
    handles.push(handle);

    let result = ingestion.run(options).await;
    for handle in handles {
        let _ = handle.await;
    }
    let report = result?;

    println!("\nIngestion summary");
    if let Some(crawl) = &report.crawl {
        println!(
            "  Pages: {} saved, {} skipped, {} failed, {} write failures",
            crawl.stats.pages_saved,
            crawl.stats.pages_skipped,
            crawl.stats.pages_failed,
            crawl.stats.write_failures
        );
        println!("  PDF links found: {}", crawl.stats.pdf_links_found);
    }
    if let Some(remote) = &report.remote_pdfs {
        println!(
            "  Remote PDFs: {} attempted, {} downloaded, {} extracted, {} failed",
            remote.attempted, remote.downloaded, remote.extracted, remote.failed
        );
    }
    if let Some(local) = &report.local_pdfs {
        println!(
            "  Local PDFs: {} total, {} extracted, {} skipped, {} failed",
            local.total, local.extracted, local.skipped, local.failed
        );
    }
    println!(
        "  Index: {} vectors in {} ({})",
        report.index.total_vectors, report.index.index_name, report.index.storage_location
    );

    Ok(())
}

#[instrument(skip(config))]
async fn crawl_command(config: IngestConfig, args: CrawlArgs) -> anyhow::Result<()> {
    let seeds = if args.seeds.is_empty() {
        config.crawl.seeds.clone()
    } else {
        args.seeds
    };
    if seeds.is_empty() {
        return Err(anyhow!(
            "no seed URLs configured; set [crawl] seeds or pass --seed"
        ));
    }

    let mut crawler_config = config.crawler_config();
    if let Some(max_pages) = args.max_pages {
        crawler_config.max_pages = max_pages;
    }
    let total_pages = u64::from(crawler_config.max_pages) * seeds.len() as u64;

    let (sender, handle) = crawl_progress(total_pages);
    let crawler = Crawler::new(crawler_config, config.content_store())?
        .with_cancel(ctrl_c_signal())
        .with_progress(sender);
    let result = crawler.crawl(&seeds).await;
    drop(crawler);
    let _ = handle.await;
    let report = result?;

    println!(
        "Saved {} pages ({} skipped, {} failed, {} write failures)",
        report.stats.pages_saved,
        report.stats.pages_skipped,
        report.stats.pages_failed,
        report.stats.write_failures
    );
    println!("Found {} PDF links", report.pdf_links.len());
    for link in &report.pdf_links {
        println!("  {}", link);
    }

    Ok(())
}

#[instrument(skip(config))]
async fn pdf_command(config: IngestConfig, args: PdfArgs) -> anyhow::Result<()> {
    let pipeline = PdfPipeline::new(config.pdf_config())?.with_cancel(ctrl_c_signal());

    if !args.local_only {
        let mut urls = config.pdf.urls.clone();
        urls.extend(args.urls);
        let stats = pipeline.process_urls(&urls).await;
        println!(
            "Remote PDFs: {} attempted, {} downloaded, {} extracted, {} failed",
            stats.attempted, stats.downloaded, stats.extracted, stats.failed
        );
    }

    let stats = pipeline.process_local_dir().await?;
    println!(
        "Local PDFs in {}: {} total, {} extracted, {} skipped, {} failed",
        pipeline.output_dir().display(),
        stats.total,
        stats.extracted,
        stats.skipped,
        stats.failed
    );

    Ok(())
}

#[instrument(skip(config))]
async fn search_command(config: IngestConfig, args: SearchArgs) -> anyhow::Result<()> {
    let embedder = Embedder::from_settings(&config.embedding)?;
    let indexer = Indexer::new(embedder, config.index_config(), config.content_store());
    let search = SearchSystem::new(Arc::new(indexer));

    let options = SearchOptions {
        limit: args.k.unwrap_or(config.retrieval.top_k),
        source_filter: args.source,
    };
    let results = search.search(&args.query, options).await?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Text => {
            println!("Found {} results", results.len());
            for (i, result) in results.iter().enumerate() {
                println!("{}. [{:.3}] {} #{}", i + 1, result.score, result.source, result.position);
                println!("   {}", result.text.replace('\n', "\n   "));
                println!();
            }
        }
    }

    Ok(())
}

#[instrument(skip(config))]
async fn stats_command(config: IngestConfig, args: StatsArgs) -> anyhow::Result<()> {
    let embedder = Embedder::from_settings(&config.embedding)?;
    let indexer = Indexer::new(embedder, config.index_config(), config.content_store());

    match (indexer.stats().await?, args.format) {
        (IndexStatus::Ready(stats), OutputFormat::Json) => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        (IndexStatus::Ready(stats), OutputFormat::Text) => {
            println!("Index: {}", stats.index_name);
            println!("Location: {}", stats.storage_location);
            println!("Vectors: {}", stats.total_vectors);
            println!("Dimensions: {}", stats.dimensions);
            println!("Embedding model: {}", stats.embedding_identity);
            println!("Generation: {}", stats.stamp);
        }
        (IndexStatus::NotFound, OutputFormat::Json) => {
            println!("{}", serde_json::json!({ "status": "not_found" }));
        }
        (IndexStatus::NotFound, OutputFormat::Text) => {
            println!("Index not found; run `campus-kb ingest` first");
        }
    }

    Ok(())
}

#[instrument(skip(config))]
async fn add_command(config: IngestConfig, args: AddArgs) -> anyhow::Result<()> {
    let mut documents = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        documents.push(campus_kb::crawler::Document {
            source,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    let embedder = Embedder::from_settings(&config.embedding)?;
    let indexer = Indexer::new(embedder, config.index_config(), config.content_store());
    let snapshot = indexer.add(documents).await?;
    info!("Index generation {} is active", snapshot.header().stamp);
    println!(
        "Added {} files; index now holds {} vectors",
        args.files.len(),
        snapshot.len()
    );

    Ok(())
}

#[instrument(skip(config))]
async fn prune_command(config: IngestConfig, args: PruneArgs) -> anyhow::Result<()> {
    let store = config.content_store();
    let deleted = store.prune(&args.patterns).await?;
    println!(
        "Deleted {} files from {}",
        deleted,
        store.root().display()
    );
    Ok(())
}

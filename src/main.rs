//! Lexicrawl main entry point
//!
//! This is the command-line interface for the Lexicrawl site indexer.

use anyhow::Context;
use clap::Parser;
use lexicrawl::config::{load_config_with_hash, Config};
use lexicrawl::morphology::{DictionaryMorphology, LemmaExtractor, Morphology};
use lexicrawl::output::{load_statistics, print_statistics};
use lexicrawl::storage::{open_storage, SharedStorage};
use lexicrawl::{IndexingService, SearchEngine, SearchRequest, SearchResponse};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Lexicrawl: a site crawler with lemma-based search
///
/// Lexicrawl crawls the configured sites, builds an inverted index of word
/// lemmas and answers ranked queries with highlighted snippets.
#[derive(Parser, Debug)]
#[command(name = "lexicrawl")]
#[command(version = "1.0.0")]
#[command(about = "A site crawler with lemma-based search", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be indexed without crawling
    #[arg(long, conflicts_with_all = ["stats", "index_page", "search"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "index_page", "search"])]
    stats: bool,

    /// Re-index a single page and exit
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "stats", "search"])]
    index_page: Option<String>,

    /// Run a search query against the index and exit
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["dry_run", "stats", "index_page"])]
    search: Option<String>,

    /// Restrict the search to one site
    #[arg(long, value_name = "URL", requires = "search")]
    site: Option<String>,

    /// Number of search results to skip
    #[arg(long, requires = "search", allow_negative_numbers = true)]
    offset: Option<i64>,

    /// Maximum number of search results
    #[arg(long, requires = "search", allow_negative_numbers = true)]
    limit: Option<i64>,

    /// Print the search response as JSON
    #[arg(long, requires = "search")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let storage = open_storage(Path::new(&config.storage.database_path))
        .with_context(|| format!("failed to open {}", config.storage.database_path))?;

    if cli.stats {
        handle_stats(&storage)?;
    } else if let Some(query) = cli.search.clone() {
        let request = SearchRequest {
            query,
            site: cli.site.clone(),
            offset: cli.offset,
            limit: cli.limit,
        };
        handle_search(config, storage, &request, cli.json)?;
    } else if let Some(url) = cli.index_page.as_deref() {
        handle_index_page(config, storage, url).await?;
    } else {
        handle_indexing(config, storage).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lexicrawl=info,warn"),
            1 => EnvFilter::new("lexicrawl=debug,info"),
            2 => EnvFilter::new("lexicrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configured dictionary, or the identity analyzer without one
fn load_morphology(config: &Config) -> anyhow::Result<Arc<dyn Morphology>> {
    match &config.morphology.dictionary_path {
        Some(path) => {
            let dictionary = DictionaryMorphology::load(Path::new(path))
                .with_context(|| format!("failed to load dictionary {}", path))?;
            Ok(Arc::new(dictionary))
        }
        None => {
            tracing::warn!("No dictionary configured, words are indexed as written");
            Ok(Arc::new(DictionaryMorphology::empty()))
        }
    }
}

/// Handles the --dry-run mode: validates config and shows what would be indexed
fn handle_dry_run(config: &Config) {
    println!("=== Lexicrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent pages per site: {}",
        config.crawler.max_concurrent_pages_open
    );
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay);
    println!("  Request timeout: {}ms", config.crawler.request_timeout);
    println!(
        "  Shutdown grace period: {}s",
        config.crawler.shutdown_grace_period
    );

    println!("\nUser Agent:");
    println!("  User-Agent: {}", config.user_agent.user_agent);
    println!("  Referer: {}", config.user_agent.referer);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!(
        "  Batch sizes: {} pages, {} lemmas, {} index entries",
        config.storage.page_batch_size,
        config.storage.lemma_batch_size,
        config.storage.index_batch_size
    );

    println!("\nMorphology:");
    match &config.morphology.dictionary_path {
        Some(path) => println!("  Dictionary: {}", path),
        None => println!("  Dictionary: none (identity analyzer)"),
    }

    println!("\nSearch:");
    println!(
        "  Frequency threshold: {}",
        config.search.frequency_threshold
    );
    println!("  Default limit: {}", config.search.default_limit);

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} ({})", site.name, site.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(storage: &SharedStorage) -> anyhow::Result<()> {
    let stats = {
        let guard = storage.lock();
        load_statistics(&*guard, false)?
    };

    print_statistics(&stats);

    Ok(())
}

/// Handles the --search mode
fn handle_search(
    config: Config,
    storage: SharedStorage,
    request: &SearchRequest,
    json: bool,
) -> anyhow::Result<()> {
    let extractor = LemmaExtractor::new(load_morphology(&config)?);
    let engine = SearchEngine::new(storage, extractor, config.search.clone())?;

    let response = engine.search(request);
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_search_response(&response);
    }

    Ok(())
}

fn print_search_response(response: &SearchResponse) {
    if let Some(error) = &response.error {
        println!("Search failed: {}", error);
        return;
    }

    println!("Found {} pages\n", response.count);
    for (i, result) in response.data.iter().enumerate() {
        println!(
            "{}. {} [{:.3}]",
            i + 1,
            if result.title.is_empty() { &result.uri } else { &result.title },
            result.relevance
        );
        println!("   {}{}", result.site, result.uri);
        println!("   {}", result.snippet);
        println!();
    }
}

/// Handles the --index-page mode
async fn handle_index_page(
    config: Config,
    storage: SharedStorage,
    url: &str,
) -> anyhow::Result<()> {
    let morphology = load_morphology(&config)?;
    let service = IndexingService::new(config, storage, morphology)?;

    if service.index_page(url).await? {
        println!("✓ Page indexed: {}", url);
    } else {
        println!("✗ Page was not indexed: {}", url);
    }

    Ok(())
}

/// Handles the main indexing run
async fn handle_indexing(config: Config, storage: SharedStorage) -> anyhow::Result<()> {
    tracing::info!("Sites to index: {}", config.sites.len());

    let morphology = load_morphology(&config)?;
    let service = IndexingService::new(config, storage, morphology)?;

    if !service.start_indexing()? {
        anyhow::bail!("indexing is already running");
    }

    tokio::select! {
        _ = service.wait_until_idle() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            tracing::info!("Received Ctrl-C, stopping indexing");
            service.stop_indexing();
            service.wait_until_idle().await;
        }
    }

    tracing::info!("Indexing finished");
    Ok(())
}

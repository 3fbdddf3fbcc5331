// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments / environment using clap
// 2. Start the result sink (store connection + unique index). If that fails
//    nothing could ever be saved, so we stop right away
// 3. Crawl the region tree; accepted results flow to the sink over a channel
// 4. Close the channel, wait for the sink to drain, print a summary
// 5. Exit with proper code (0 = crawl finished, 2 = fatal error)
//
// Rust concepts used:
// - async/await: thousands of requests, most of the time spent waiting
// - mpsc channel: many crawl tasks -> one writer task
// - Arc: the engine is shared by every crawl task
// =============================================================================

mod cli;     // src/cli.rs - command-line and environment parsing
mod crawl;   // src/crawl/ - tree traversal
mod fetch;   // src/fetch/ - HTTP retrieval and decoding
mod logging; // src/logging.rs - tracing setup
mod model;   // src/model/ - data shapes of the API
mod sink;    // src/sink/ - persistence

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::error;

// Import items we need from our modules
use cli::Cli;
use crawl::CrawlEngine;
use fetch::HttpFetcher;
use sink::{ResultSink, SinkReport};

// The #[tokio::main] attribute builds the multi-threaded runtime every crawl
// task runs on
#[tokio::main]
async fn main() {
    // Run the application and turn its outcome into a process exit code
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // Setup failed or the root was unreachable: report it and exit 2
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// This is the main application logic
// Returns:
//   Ok(0) = the whole tree was walked (individual branches may have failed)
//   Err   = setup failed or the root listing could not be fetched
async fn run() -> Result<i32> {
    // Parse flags (with environment fallbacks) into our Cli struct
    let cli = Cli::parse();
    // Logging first, so every later step can report through tracing
    logging::init_logging(&cli.log_level)?;
    // Validate the raw flags: base URL, limits, timeout
    let config = cli.into_config()?;

    println!("🗳️  Crawling {}", config.layout.root_listing(&config.root_code));
    println!(
        "📊 Terminal level: {}, per-region limit: {}",
        config.settings.terminal_level, config.settings.branch_limit
    );

    // The sink must be ready before the first record can arrive
    let sink = ResultSink::start(&config.store_url)
        .await
        .context("Failed to prepare the result store")?;

    // Bounded channel: a full buffer makes crawl tasks wait for the writer
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    // The sink runs on its own task and owns the store until the channel closes
    let sink_handle = tokio::spawn(sink.run(rx));

    // One HTTP client shared by every crawl task
    let fetcher = HttpFetcher::new(config.timeout).context("Failed to create HTTP client")?;
    let engine = CrawlEngine::new(fetcher, config.layout.clone(), config.settings);

    // `tx` moves into crawl(); once every task holding a clone finishes, the
    // channel closes and the sink drains and stops
    let crawled = engine.crawl(&config.root_code, tx).await;

    // Wait for the sink to store everything that was sent
    let report = sink_handle.await.context("Result sink task failed")?;

    // Only now surface a root failure, after the store was closed cleanly
    let regions = crawled.context("Failed to fetch the root listing")?;
    print_summary(regions, &report);
    Ok(0)
}

// Prints the end-of-run numbers
fn print_summary(regions: usize, report: &SinkReport) {
    println!();
    println!("✅ All {} top-level region(s) processed", regions);
    println!("📊 Summary:");
    println!("   📥 Received: {}", report.received);
    println!("   💾 Stored: {}", report.inserted);
    println!("   🔁 Already stored: {}", report.duplicates);
    println!("   ❌ Failed to store: {}", report.failed);
    println!("   📋 Total in store: {}", report.stored_total);
}

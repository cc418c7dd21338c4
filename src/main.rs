// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (RUST_LOG controls the level, default: info)
// 2. Parse command-line arguments using clap
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 2 = error)
//
// Logs go to stderr; results go to stdout, so `--output json` can be piped.
// =============================================================================

mod api; // src/api/ - HTTP front end
mod cli; // src/cli.rs - command-line parsing
mod crawl; // src/crawl/ - the crawl engine
mod store; // src/store/ - database persistence

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands, OutputFormat, TuningArgs};
use crawl::{CrawlConfig, CrawlReport, Crawler, HttpFetcher};
use store::LinkStore;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            url,
            depth,
            concurrency,
            output,
            database_url,
            tuning,
        } => handle_crawl(&url, depth, concurrency, output, database_url.as_deref(), &tuning).await,
        Commands::Serve { bind, port, tuning } => handle_serve(bind, port, &tuning).await,
        Commands::Show { database_url, json } => handle_show(&database_url, json).await,
    }
}

// Handles the 'crawl' subcommand
async fn handle_crawl(
    url: &str,
    depth: usize,
    concurrency: usize,
    output: OutputFormat,
    database_url: Option<&str>,
    tuning: &TuningArgs,
) -> Result<i32> {
    // Connect before crawling so a bad database URL fails fast
    let store = match output {
        OutputFormat::Sql => {
            let database_url = database_url
                .context("--output sql needs --database-url or DATABASE_URL")?;
            let store = LinkStore::connect(database_url).await?;
            println!("🗄️  Connected to database");
            Some(store)
        }
        _ => None,
    };

    // Flags from the command line override the built-in defaults
    let config = tuning.apply(CrawlConfig::new(depth, concurrency));

    // Keep stdout clean for JSON so it can be piped into jq
    if output != OutputFormat::Json {
        println!(
            "🔍 Crawling {} (depth={}, concurrency={}, output={})...",
            url, depth, concurrency, output
        );
    }

    // Run the crawl
    let crawler = Crawler::with_http(config)?;
    let report = crawler.crawl(url).await?;

    // Display or save results based on output format
    match (output, store) {
        (OutputFormat::Json, _) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        (OutputFormat::Sql, Some(store)) => {
            let inserted = store.store_links(&report).await?;
            store.close().await;
            println!(
                "💾 Stored {} new link(s) out of {} unique link(s) found",
                inserted,
                report.links.len()
            );
            print_summary(&report);
        }
        _ => print_links(&report),
    }

    Ok(0)
}

// Handles the 'serve' subcommand
async fn handle_serve(bind: IpAddr, port: u16, tuning: &TuningArgs) -> Result<i32> {
    // Requests only set depth and concurrency; the rest comes from here
    let defaults = tuning.apply(CrawlConfig::default());
    defaults.validate()?;

    let fetcher = HttpFetcher::new(defaults.fetch_timeout)?;
    let state = api::ApiState::new(Arc::new(fetcher), defaults);

    api::serve(SocketAddr::new(bind, port), state).await?;
    Ok(0)
}

// Handles the 'show' subcommand
async fn handle_show(database_url: &str, json: bool) -> Result<i32> {
    // Read everything, then close before printing
    let store = LinkStore::connect(database_url).await?;
    let rows = store.stored_links().await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(0);
    }

    // Print as a fixed-width table
    println!("\nStored Links:");
    println!("{:<6} {:<60} {:<60}", "ID", "URL", "PARENT URL");
    println!("{}", "=".repeat(126));
    for row in &rows {
        println!(
            "{:<6} {:<60} {:<60}",
            row.id,
            truncate(&row.url, 60),
            truncate(row.parent_url.as_deref().unwrap_or("-"), 60)
        );
    }
    println!("\n📋 Total: {}", rows.len());

    Ok(0)
}

// Prints the discovered links as a numbered list
fn print_links(report: &CrawlReport) {
    if report.links.is_empty() {
        println!("No links found on the page.");
        print_summary(report);
        return;
    }

    println!("Found {} unique links on {}:", report.links.len(), report.seed);
    for (i, link) in report.links.iter().enumerate() {
        println!("{}. {}", i + 1, link);
    }
    println!();
    print_summary(report);
}

fn print_summary(report: &CrawlReport) {
    let stats = &report.stats;
    println!("📊 Summary:");
    println!("   🔗 Unique links: {}", report.links.len());
    println!("   📄 Pages fetched: {}", stats.pages_fetched);
    println!("   ❌ Pages failed: {}", stats.pages_failed);
    println!("   ♻️  Duplicates skipped: {}", stats.duplicates_skipped);
    println!("   🛑 Depth limit reached: {}", stats.depth_exhausted);
    if stats.children_dropped > 0 {
        println!("   ⚠️  Pages dropped (limiter busy): {}", stats.children_dropped);
    }
    println!("   ⏱️  Time taken: {:.2}s", report.duration_seconds);
}

// Shortens long URLs for the table view
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

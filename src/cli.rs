// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Subcommands:
// - crawl: crawl from a seed URL and print / save the links found
// - serve: run the HTTP API
// - show:  list the links saved in the database
//
// Database URL and port can also come from the environment
// (DATABASE_URL, PORT), thanks to clap's `env` feature.
// =============================================================================

use std::net::IpAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::crawl::{AdmissionPolicy, CrawlConfig, ParentPolicy};

#[derive(Parser, Debug)]
#[command(
    name = "link-tracer",
    version,
    about = "Maps every link reachable from a seed URL, up to a fixed depth",
    long_about = "link-tracer fetches a page, collects its absolute http(s) links, and follows them \
                  up to --depth hops with at most --concurrency pages in flight. Each link is \
                  reported once, together with the page it was found on."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

// Where the crawl results go
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Numbered list on the terminal
    Console,
    /// Pretty-printed JSON report on stdout
    Json,
    /// Insert into the database at --database-url
    Sql,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::Console => "console",
            OutputFormat::Json => "json",
            OutputFormat::Sql => "sql",
        };
        f.write_str(name)
    }
}

// Settings shared by `crawl` and `serve`
#[derive(Args, Debug)]
pub struct TuningArgs {
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// What happens to a newly found page when all concurrency slots are busy
    ///
    /// block: wait for a slot (complete crawl)
    /// drop-when-saturated: skip the page (faster, may miss pages)
    #[arg(long, value_enum, default_value_t = AdmissionPolicy::Block)]
    pub admission: AdmissionPolicy,

    /// Which parent is recorded for a link found on several pages
    #[arg(long, value_enum, default_value_t = ParentPolicy::FirstWins)]
    pub parent_policy: ParentPolicy,

    /// Capacity of the queue of pages waiting to be crawled
    #[arg(long, default_value_t = 1024)]
    pub queue_capacity: usize,

    /// Capacity of the channel feeding the link collector
    #[arg(long, default_value_t = 1000)]
    pub sink_capacity: usize,
}

impl TuningArgs {
    pub fn apply(&self, config: CrawlConfig) -> CrawlConfig {
        CrawlConfig {
            fetch_timeout: Duration::from_secs(self.timeout_secs),
            admission: self.admission,
            parent_policy: self.parent_policy,
            queue_capacity: self.queue_capacity,
            sink_capacity: self.sink_capacity,
            ..config
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a website and list every link reachable from it
    ///
    /// Example: link-tracer crawl https://example.com --depth 2 --concurrency 10
    Crawl {
        /// Starting URL (e.g., https://example.com)
        url: String,

        /// Maximum crawl depth
        ///
        /// Depth 0 = fetch nothing
        /// Depth 1 = just the starting page (its links are still listed)
        /// Depth 2 = starting page + all pages it links to
        #[arg(long, default_value_t = 2)]
        depth: usize,

        /// Maximum number of pages fetched at the same time (at least 1)
        #[arg(long, default_value_t = 10)]
        concurrency: usize,

        /// Output method
        #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
        output: OutputFormat,

        /// Database for --output sql (e.g., sqlite://links.db)
        ///
        /// SQLite only; postgres:// URLs are rejected
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Run the HTTP API (POST /api/crawl, GET /health)
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0")]
        bind: IpAddr,

        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Show the links stored in the database
    Show {
        /// Database to read (e.g., sqlite://links.db, SQLite only)
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Output rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does #[command(flatten)] do?
//    - It pulls the fields of another Args struct into this subcommand
//    - TuningArgs is written once and shared by `crawl` and `serve`
//
// 2. What is ValueEnum?
//    - A derive that lets clap parse an enum from a string
//    - Variant names become kebab-case: DropWhenSaturated -> drop-when-saturated
//
// 3. What does env = "DATABASE_URL" do?
//    - If the flag is missing, clap reads the environment variable instead
//    - The flag still wins when both are given
// -----------------------------------------------------------------------------

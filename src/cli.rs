// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Every option can also be set through an environment variable, so the tool
// can run from a plain shell, a container or a cron job without flags:
//
//   TALLY_STORE_URL=sqlite:tally.db?mode=rwc tally-harvester
//
// Rust concepts:
// - Derive macros: clap generates the parser from the struct
// - Validation: turning raw strings into checked settings before any work
// =============================================================================

use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

use crate::crawl::{
    CrawlSettings, UrlLayout, DEFAULT_BASE_URL, DEFAULT_BRANCH_LIMIT, DEFAULT_LISTING_SEGMENT,
    DEFAULT_RESULT_SEGMENT, DEFAULT_TERMINAL_LEVEL,
};

#[derive(Parser, Debug)]
#[command(
    name = "tally-harvester",
    version,
    about = "Walk the election results API and store every confirmed polling-unit tally",
    long_about = "tally-harvester walks the region tree of the results API from the root listing \
                  down to individual polling units, downloads each unit's result document and \
                  stores the confirmed ones exactly once per unit id."
)]
pub struct Cli {
    /// Storage connection string (e.g. sqlite:tally.db?mode=rwc)
    #[arg(long, env = "TALLY_STORE_URL")]
    pub store_url: String,

    /// Base URL of the region listings
    #[arg(long, env = "TALLY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Path segment of the listing tree, swapped out to reach result documents
    #[arg(long, env = "TALLY_LISTING_SEGMENT", default_value = DEFAULT_LISTING_SEGMENT)]
    pub listing_segment: String,

    /// Path segment of the result tree
    #[arg(long, env = "TALLY_RESULT_SEGMENT", default_value = DEFAULT_RESULT_SEGMENT)]
    pub result_segment: String,

    /// Code of the root listing
    #[arg(long, env = "TALLY_ROOT_CODE", default_value = "0")]
    pub root_code: String,

    /// Level of the polling units (entries at this level are fetched as results)
    #[arg(long, env = "TALLY_TERMINAL_LEVEL", default_value_t = DEFAULT_TERMINAL_LEVEL)]
    pub terminal_level: u32,

    /// Children processed at once under each region
    ///
    /// Parallelism mostly comes from sibling regions running side by side;
    /// this only caps the fan-out of a single region.
    #[arg(long, env = "TALLY_BRANCH_LIMIT", default_value_t = DEFAULT_BRANCH_LIMIT)]
    pub branch_limit: usize,

    /// Results buffered between the crawler and the store
    #[arg(long, env = "TALLY_CHANNEL_CAPACITY", default_value_t = 20)]
    pub channel_capacity: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "TALLY_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log filter used when RUST_LOG is not set (e.g. info, debug)
    #[arg(long, env = "TALLY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

// The validated run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub store_url: String,
    pub root_code: String,
    pub layout: UrlLayout,
    pub settings: CrawlSettings,
    pub channel_capacity: usize,
    pub timeout: Duration,
}

impl Cli {
    // Checks the raw options and builds a RunConfig
    pub fn into_config(self) -> Result<RunConfig> {
        if self.branch_limit == 0 {
            bail!("--branch-limit must be at least 1");
        }
        if self.channel_capacity == 0 {
            bail!("--channel-capacity must be at least 1");
        }
        if self.timeout_secs == 0 {
            bail!("--timeout-secs must be at least 1");
        }
        if self.root_code.trim().is_empty() {
            bail!("--root-code must not be empty");
        }

        let layout = UrlLayout::new(&self.base_url, &self.listing_segment, &self.result_segment)?;

        Ok(RunConfig {
            store_url: self.store_url,
            root_code: self.root_code.trim().to_string(),
            layout,
            settings: CrawlSettings {
                terminal_level: self.terminal_level,
                branch_limit: self.branch_limit,
            },
            channel_capacity: self.channel_capacity,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure with a plain
// struct and attributes (the #[...] things).
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use bookmark_washer::checker::ProbeSettings;
use bookmark_washer::wash::{ReportFormat, WashOptions};
use clap::Parser;

// This struct represents our entire CLI application
//
// Report lines always go to stdout; logs go to stderr so the two never mix.
#[derive(Parser, Debug)]
#[command(
    name = "bookmark-washer",
    version,
    about = "Check if your browser bookmarks are still alive",
    long_about = "bookmark-washer reads a bookmark export (the HTML file Chrome, Firefox \
                  and Safari produce) and checks every link in it, printing one line per \
                  bookmark: its status (alive, dead or unknown), its URL and, when there \
                  is one, the reason."
)]
pub struct Cli {
    /// Bookmark export to check (reads standard input when omitted)
    pub file: Option<PathBuf>,

    /// Maximum number of links checked at the same time
    #[arg(
        short = 'c',
        long,
        default_value_t = 16,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub concurrency: u32,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Redirects to follow before giving up on a link
    #[arg(long, default_value_t = 5)]
    pub max_redirects: usize,

    /// Print one JSON object per line instead of tab-separated text
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            timeout: Duration::from_secs(self.timeout),
            max_redirects: self.max_redirects,
            ..ProbeSettings::default()
        }
    }

    pub fn wash_options(&self) -> WashOptions {
        WashOptions {
            concurrency: self.concurrency as usize,
            format: if self.json {
                ReportFormat::Json
            } else {
                ReportFormat::Tab
            },
        }
    }
}

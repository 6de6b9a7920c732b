// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (to stderr, so stdout stays a clean report)
// 3. Open the bookmark file, or fall back to stdin
// 4. Wash every bookmark, printing one line per result
// 5. Exit with a code that tells scripts how it went:
//    0 = all good, 1 = dead bookmarks found, 2 = error, 130 = interrupted
// =============================================================================

mod cli;

use std::fs::File;
use std::io::{self, Read};

use anyhow::{Context, Result};
use bookmark_washer::checker::HttpProber;
use bookmark_washer::wash::wash_till_done;
use clap::Parser;
use cli::Cli;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    // Exit right away: a scan blocked on stdin must not keep the runtime alive
    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let input: Box<dyn Read + Send> = match &cli.file {
        Some(path) => Box::new(
            File::open(path)
                .with_context(|| format!("error opening input bookmark file {}", path.display()))?,
        ),
        None => Box::new(io::stdin()),
    };

    let prober = HttpProber::new(cli.probe_settings()).context("failed to build HTTP client")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = wash_till_done(input, &mut out, prober, &cli.wash_options(), shutdown_signal())
        .await
        .context("wash failed")?;

    info!(
        alive = summary.alive,
        dead = summary.dead,
        unknown = summary.unknown,
        walk_errors = summary.walk_errors,
        interrupted = summary.interrupted,
        "checked {} bookmark(s)",
        summary.total()
    );

    Ok(summary.exit_code())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

// Completes on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

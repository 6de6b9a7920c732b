// src/wash/run.rs
// =============================================================================
// Runs one complete wash: bytes in, report lines out.
//
// What happens here:
// 1. Build a NetscapeWalker over the input and a Washer around it
// 2. Write each result to the output as soon as it arrives
// 3. Stop early if the shutdown future completes (Ctrl-C in the binary)
//
// Both the walker and the washer get a child of one root CancellationToken,
// so cancelling the root reaches both of them with a single call.
// =============================================================================

use std::future::Future;
use std::io::{Read, Write};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::report::{self, ReportFormat};
use super::{WashError, WashedBookmark, Washer};
use crate::bookmark::NetscapeWalker;
use crate::checker::{LivenessStatus, Prober};

/// Settings for a wash run.
#[derive(Debug, Clone)]
pub struct WashOptions {
    /// Maximum number of probes in flight
    pub concurrency: usize,
    pub format: ReportFormat,
}

impl Default for WashOptions {
    fn default() -> Self {
        Self {
            concurrency: 16,
            format: ReportFormat::Tab,
        }
    }
}

/// Counts of what a wash produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WashSummary {
    pub alive: usize,
    pub dead: usize,
    pub unknown: usize,
    pub walk_errors: usize,
    /// The run was cut short by the shutdown signal
    pub interrupted: bool,
}

impl WashSummary {
    fn record(&mut self, washed: &WashedBookmark) {
        match washed.status {
            LivenessStatus::Alive => self.alive += 1,
            LivenessStatus::Dead => self.dead += 1,
            LivenessStatus::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.alive + self.dead + self.unknown
    }

    /// Process exit code for this summary:
    /// 130 = interrupted, 2 = the bookmark file could not be read to the end,
    /// 1 = dead bookmarks found, 0 = all good.
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            130
        } else if self.walk_errors > 0 {
            2
        } else if self.dead > 0 {
            1
        } else {
            0
        }
    }
}

/// Washes every bookmark in `input`, writing one line per result to `out`,
/// until the input is exhausted or `shutdown` completes.
///
/// Lines already written when `shutdown` fires stay written; nothing further
/// is attempted.
pub async fn wash_till_done<R, W, P, F>(
    input: R,
    out: &mut W,
    prober: P,
    options: &WashOptions,
    shutdown: F,
) -> Result<WashSummary, WashError>
where
    R: Read + Send + 'static,
    W: Write,
    P: Prober + 'static,
    F: Future<Output = ()>,
{
    let root = CancellationToken::new();
    let walker = NetscapeWalker::new(input, root.child_token());
    let mut washer = Washer::new(walker, prober, options.concurrency, root.child_token())?;
    let mut summary = WashSummary::default();

    tokio::pin!(shutdown);

    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!("received shutdown signal, aborting wash");
                summary.interrupted = true;
                break Ok(());
            }
            next = washer.next() => next,
        };

        let written = match next {
            Ok(Some(washed)) => {
                summary.record(&washed);
                report::write_washed(out, &washed, options.format)
            }
            Ok(None) => {
                debug!("wash done");
                break Ok(());
            }
            Err(error) => {
                summary.walk_errors += 1;
                report::write_walk_error(out, &error, options.format)
            }
        };
        if let Err(error) = written {
            break Err(WashError::Output(error));
        }
    };

    // One abort for the walker and the washer alike
    root.cancel();
    out.flush()?;
    outcome.map(|()| summary)
}

// src/wash/mod.rs
// =============================================================================
// This module "washes" bookmarks: every bookmark that comes out of the walker
// goes through the prober and comes back out with a liveness status attached.
//
// Submodules:
// - washer: the concurrent pipeline (walker -> N probes -> one result queue)
// - run: wires a walker, a prober and a washer to an output sink, and stops
//   everything on Ctrl-C
// - report: renders results as tab-separated or JSON lines
// =============================================================================

mod report;
mod run;
mod washer;

#[cfg(test)]
mod testing;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::bookmark::Bookmark;
use crate::checker::{LivenessStatus, ProbeError, Verdict};

pub use report::ReportFormat;
pub use run::{wash_till_done, WashOptions, WashSummary};
pub use washer::Washer;

/// Errors that prevent a wash from running at all.
#[derive(Debug, Error)]
pub enum WashError {
    #[error("concurrency quota must be positive")]
    InvalidQuota,
    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

/// A bookmark together with the verdict of its probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WashedBookmark {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub status: LivenessStatus,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "error_text")]
    pub error: Option<ProbeError>,
}

impl WashedBookmark {
    pub fn new(bookmark: Bookmark, verdict: Verdict) -> Self {
        Self {
            bookmark,
            status: verdict.status,
            error: verdict.error,
        }
    }
}

// Errors are reported by their message; the enum itself is not part of the
// JSON schema.
fn error_text<S: Serializer>(error: &Option<ProbeError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.collect_str(error),
        None => serializer.serialize_none(),
    }
}

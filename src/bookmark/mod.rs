// src/bookmark/mod.rs
// =============================================================================
// This module turns a browser bookmark export into a stream of bookmarks.
//
// Submodules:
// - walker: the Walker trait and NetscapeWalker, a lazy token-level scanner
//   for the Netscape Bookmark File Format (what Chrome, Firefox and Safari
//   all export)
//
// Rust concepts:
// - Traits: Walker is a seam so the pipeline can be tested with fakes
// - async fn in traits: provided by the async-trait crate
// =============================================================================

mod walker;

#[cfg(test)]
pub(crate) mod testing;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use walker::{NetscapeWalker, WalkError, Walker};

/// One bookmark entry parsed out of the export.
///
/// The url is never empty: anchors without an href are skipped by the walker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    /// The HREF of the anchor
    pub url: String,
    /// The anchor text, whitespace-trimmed
    pub title: String,
    /// ADD_DATE converted from epoch seconds, if the anchor carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_date: Option<DateTime<Utc>>,
}

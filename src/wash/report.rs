// src/wash/report.rs
// =============================================================================
// Renders washing results, one line per result.
//
// Tab format (default):
//   dead<TAB>https://example.com/old<TAB>Gone
//   alive<TAB>https://rust-lang.org/
// JSON format (--json): one object per line, handy for jq
//   {"url":"https://example.com/old","title":"Old","status":"dead","error":"Gone"}
//
// A walker error has no URL, so it renders as "unknown", an empty URL column
// and the error text.
// =============================================================================

use std::io::{self, Write};

use serde_json::json;

use super::WashedBookmark;
use crate::bookmark::WalkError;
use crate::checker::LivenessStatus;

/// How report lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Tab,
    Json,
}

pub fn write_washed<W: Write>(
    out: &mut W,
    washed: &WashedBookmark,
    format: ReportFormat,
) -> io::Result<()> {
    match format {
        ReportFormat::Tab => {
            write!(out, "{}\t{}", washed.status, washed.bookmark.url)?;
            if let Some(error) = &washed.error {
                write!(out, "\t{error}")?;
            }
            writeln!(out)
        }
        ReportFormat::Json => {
            serde_json::to_writer(&mut *out, washed)?;
            writeln!(out)
        }
    }
}

pub fn write_walk_error<W: Write>(
    out: &mut W,
    error: &WalkError,
    format: ReportFormat,
) -> io::Result<()> {
    match format {
        ReportFormat::Tab => writeln!(out, "{}\t\t{error}", LivenessStatus::Unknown),
        ReportFormat::Json => {
            let line = json!({
                "status": LivenessStatus::Unknown,
                "error": error.to_string(),
            });
            serde_json::to_writer(&mut *out, &line)?;
            writeln!(out)
        }
    }
}

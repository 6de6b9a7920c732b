// src/checker/status.rs
// =============================================================================
// Liveness classification of HTTP status codes.
//
// Every status code lands in exactly one bucket:
// - 2xx                          -> Alive
// - DEAD_CODES                   -> Dead (the server is sure, retrying won't help)
// - RETRY_CODES                  -> worth another attempt
// - everything else (401, 403...) -> Unknown
//
// Note that Unknown is a real answer, not "not checked yet": a login wall
// (401/403) says nothing about whether the page still exists.
// =============================================================================

use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;

/// How alive a bookmarked URL is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessStatus {
    #[default]
    Unknown,
    Alive,
    Dead,
}

impl fmt::Display for LivenessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LivenessStatus::Unknown => "unknown",
            LivenessStatus::Alive => "alive",
            LivenessStatus::Dead => "dead",
        };
        f.write_str(text)
    }
}

// Codes for which we consider the URL hard dead.
const DEAD_CODES: [u16; 7] = [
    409, // Conflict: belongs to PUT, not HEAD/GET
    410, // Gone: the server knows the resource was removed
    413, // Payload Too Large: HEAD/GET carry no body
    414, // URI Too Long: a browser user would never have saved it
    422, // Unprocessable Entity: HEAD/GET carry no body
    424, // Failed Dependency: HEAD/GET have no dependencies
    501, // Not Implemented
];

// Codes that are worth another attempt.
const RETRY_CODES: [u16; 8] = [
    421, // Misdirected Request: may succeed on a new connection
    429, // Too Many Requests
    500, 502, 503, 504, 507,
    599, // Network Connect Timeout (non-standard, used by some proxies)
];

/// Maps a final response code to a liveness status.
pub fn classify(code: u16) -> LivenessStatus {
    if DEAD_CODES.contains(&code) {
        LivenessStatus::Dead
    } else if (200..300).contains(&code) {
        LivenessStatus::Alive
    } else {
        LivenessStatus::Unknown
    }
}

pub fn is_retryable_code(code: u16) -> bool {
    RETRY_CODES.contains(&code)
}

/// The reason phrase for a code ("Gone", "Not Found"), or "HTTP 599" when the
/// code has none.
pub fn status_text(code: &u16) -> String {
    StatusCode::from_u16(*code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {code}"))
}

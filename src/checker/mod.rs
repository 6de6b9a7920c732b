// src/checker/mod.rs
// =============================================================================
// This module contains all liveness checking logic.
//
// Submodules:
// - prober: probes one URL over HTTP, with retries and HEAD -> GET fallback
// - status: maps HTTP status codes to alive / dead / unknown
// - user_agent: browser User-Agent strings to send with each probe
//
// This file (mod.rs) is the module root - it re-exports the public API that
// the rest of the application uses.
// =============================================================================

mod prober;
mod status;
mod user_agent;

pub use prober::{HttpProber, ProbeError, ProbeSettings, Prober, TransportKind, Verdict};
pub use status::LivenessStatus;

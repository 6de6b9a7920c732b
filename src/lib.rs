// src/lib.rs
// =============================================================================
// bookmark-washer: check if your browser bookmarks are still alive.
//
// The pipeline, leaves first:
// - bookmark: walks a Netscape bookmark export into Bookmark records
// - checker: probes one URL and classifies it alive / dead / unknown
// - wash: runs many probes concurrently and reports the results
//
// The binary (src/main.rs) only parses arguments, sets up logging and wires
// stdin/stdout and Ctrl-C into wash::wash_till_done.
// =============================================================================

pub mod bookmark;
pub mod checker;
pub mod wash;

// src/wash/testing.rs
// =============================================================================
// Test doubles for the washing pipeline: walkers that replay a script or never
// end, and a prober that answers from a table and records how many probes ran
// at the same time.
// =============================================================================

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bookmark::{Bookmark, WalkError, Walker};
use crate::checker::{LivenessStatus, ProbeError, Prober, Verdict};

pub(crate) fn bookmark(url: &str) -> Bookmark {
    Bookmark {
        url: url.to_string(),
        title: String::new(),
        add_date: None,
    }
}

/// Replays a fixed sequence of walk results, then reports exhaustion.
pub(crate) struct FakeWalker {
    script: VecDeque<Result<Bookmark, WalkError>>,
}

impl FakeWalker {
    pub(crate) fn new(script: Vec<Result<Bookmark, WalkError>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[async_trait]
impl Walker for FakeWalker {
    async fn next(&mut self) -> Result<Option<Bookmark>, WalkError> {
        self.script.pop_front().transpose()
    }

    fn stop(&self) {}
}

/// Produces bookmarks forever.
#[derive(Default)]
pub(crate) struct EndlessWalker {
    walked: usize,
}

#[async_trait]
impl Walker for EndlessWalker {
    async fn next(&mut self) -> Result<Option<Bookmark>, WalkError> {
        self.walked += 1;
        tokio::task::yield_now().await;
        Ok(Some(bookmark(&format!("https://foo{}", self.walked))))
    }

    fn stop(&self) {}
}

/// Counters shared between a FakeProber and the test that owns it.
#[derive(Default)]
pub(crate) struct ProbeStats {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ProbeStats {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Answers from a table; URLs not in the table are Alive.
#[derive(Default)]
pub(crate) struct FakeProber {
    answers: HashMap<String, Verdict>,
    delay: Duration,
    stats: Arc<ProbeStats>,
}

impl FakeProber {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn answer(
        mut self,
        url: &str,
        status: LivenessStatus,
        error: Option<ProbeError>,
    ) -> Self {
        self.answers.insert(url.to_string(), Verdict { status, error });
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn stats(&self) -> Arc<ProbeStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, url: &str) -> Verdict {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.answers.get(url).cloned().unwrap_or(Verdict {
            status: LivenessStatus::Alive,
            error: None,
        })
    }
}

// src/wash/washer.rs
// =============================================================================
// The washer pulls bookmarks from a walker and probes them concurrently.
//
// How it works:
// 1. The first call to next() spawns a "puller" task
// 2. The puller takes one bookmark at a time from the walker, waits for a
//    free slot in the concurrency quota, then spawns a probe task with it
// 3. Each probe task sends its washed bookmark into one shared channel and
//    keeps its slot until the send goes through, so a slow reader slows the
//    walker down too
// 4. next() reads from that channel, so results come out in completion order,
//    not input order
// 5. When the walker runs dry, the puller waits for every probe it started,
//    reports the walker's error (if any) last, and closes the channel
//
// Stopping:
// - Everything races a CancellationToken, so stop() unblocks the puller, any
//   probe waiting on the network, and any caller waiting in next()
//
// Rust concepts:
// - Semaphore: a counter of permits; holding a permit = holding a slot
// - tokio::select!: wait on several futures, continue with whichever wins
// - Arc<dyn Trait>: share one prober between many tasks
// =============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use super::{WashError, WashedBookmark};
use crate::bookmark::{Bookmark, WalkError, Walker};
use crate::checker::Prober;

type Washed = Result<WashedBookmark, WalkError>;

/// Checks the liveness of every bookmark a walker produces, at most `quota`
/// at a time.
pub struct Washer {
    // Moved into the puller task on the first call to next()
    pending: Option<Puller>,
    washed: Option<mpsc::Receiver<Washed>>,
    cancel: CancellationToken,
}

impl Washer {
    /// Creates a washer. Nothing runs until the first call to `next`.
    ///
    /// Fails if `quota` is zero. Cancelling `cancel` has the same effect as
    /// calling `stop`.
    pub fn new<W, P>(
        walker: W,
        prober: P,
        quota: usize,
        cancel: CancellationToken,
    ) -> Result<Self, WashError>
    where
        W: Walker + 'static,
        P: Prober + 'static,
    {
        if quota == 0 {
            return Err(WashError::InvalidQuota);
        }

        let (tx, rx) = mpsc::channel(quota);
        let puller = Puller {
            walker: Box::new(walker),
            prober: Arc::new(prober),
            quota: Arc::new(Semaphore::new(quota)),
            washed: tx,
            probes: TaskTracker::new(),
            cancel: cancel.clone(),
        };

        Ok(Self {
            pending: Some(puller),
            washed: Some(rx),
            cancel,
        })
    }

    /// Returns the next washed bookmark.
    ///
    /// `Ok(None)` means the washer is exhausted or stopped; every later call
    /// returns it too. A walker error is returned once, after all bookmarks
    /// walked before it have been delivered.
    pub async fn next(&mut self) -> Result<Option<WashedBookmark>, WalkError> {
        if let Some(puller) = self.pending.take() {
            debug!("start washing");
            tokio::spawn(puller.run());
        }
        let Some(washed) = self.washed.as_mut() else {
            return Ok(None);
        };

        let item = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = washed.recv() => item,
        };

        match item {
            Some(Ok(bookmark)) => Ok(Some(bookmark)),
            Some(Err(error)) => Err(error),
            None => {
                // Drop the receiver so no probe can block on a full channel
                self.washed = None;
                Ok(None)
            }
        }
    }

    /// Stops the washer. Calls to `next` return `Ok(None)` shortly after.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Washer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Puller {
    walker: Box<dyn Walker>,
    prober: Arc<dyn Prober>,
    quota: Arc<Semaphore>,
    washed: mpsc::Sender<Washed>,
    probes: TaskTracker,
    cancel: CancellationToken,
}

impl Puller {
    async fn run(mut self) {
        let walk_error = self.pull_all().await;
        self.walker.stop();

        // Drain: every admitted probe delivers before the channel closes
        self.probes.close();
        self.probes.wait().await;

        if let Some(error) = walk_error {
            debug!(%error, "walker failed, reporting after drain");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {}
                _ = self.washed.send(Err(error)) => {}
            }
        }
        debug!("washing finished");
    }

    // Pulls until the walker is exhausted, fails, or the washer is stopped.
    async fn pull_all(&mut self) -> Option<WalkError> {
        loop {
            let pulled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                pulled = self.walker.next() => pulled,
            };
            let bookmark = match pulled {
                Ok(Some(bookmark)) => bookmark,
                Ok(None) => return None,
                Err(error) => return Some(error),
            };

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                permit = Arc::clone(&self.quota).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return None,
                },
            };

            self.spawn_probe(bookmark, permit);
        }
    }

    fn spawn_probe(&self, bookmark: Bookmark, permit: OwnedSemaphorePermit) {
        let prober = Arc::clone(&self.prober);
        let washed = self.washed.clone();
        let cancel = self.cancel.clone();

        self.probes.spawn(async move {
            let verdict = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                verdict = prober.probe(&bookmark.url) => verdict,
            };

            let result = WashedBookmark::new(bookmark, verdict);
            debug!(url = %result.bookmark.url, status = %result.status, "washed");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = washed.send(Ok(result)) => {}
            }
            // The slot stays taken until the result is in the channel
            drop(permit);
        });
    }
}

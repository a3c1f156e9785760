//! Worker queue for thumbnail generation.
//!
//! Entries are processed in parallel with no ordering guarantee. Successful
//! thumbnails go straight into the shared cache and are reported on the
//! result channel as they complete; files that fail to decode accumulate in
//! a mutex-guarded list that the collection drains in one synchronized step,
//! so eviction never races the index.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use super::cache::ThumbnailCache;
use super::generator;

/// Maximum number of worker threads.
const MAX_WORKERS: usize = 4;

/// Maximum number of pending requests in the queue.
const MAX_QUEUE_SIZE: usize = 1024;

/// A request to generate one thumbnail.
#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    /// Path to the source image.
    pub path: PathBuf,
    /// Square edge in pixels (thumbnail points x display scale).
    pub edge_px: u32,
    /// Scan generation active when the job was dispatched.
    pub generation: u64,
}

/// Completion notice sent back to the coordinating thread. The bitmap
/// itself is already in the cache when `ok` is true.
#[derive(Debug, Clone)]
pub struct ThumbnailOutcome {
    pub path: PathBuf,
    pub generation: u64,
    pub ok: bool,
}

/// Worker pool that fills a [`ThumbnailCache`] and reports broken files.
pub struct ThumbnailQueue {
    request_tx: Sender<ThumbnailJob>,
    result_rx: Receiver<ThumbnailOutcome>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    pending: Arc<RwLock<HashSet<PathBuf>>>,
    broken: Arc<Mutex<Vec<(PathBuf, u64)>>>,
}

impl ThumbnailQueue {
    pub fn new(workers: usize, cache: ThumbnailCache) -> Self {
        let num_workers = workers.clamp(1, MAX_WORKERS);

        let (request_tx, request_rx) = flume::bounded(MAX_QUEUE_SIZE);
        let (result_tx, result_rx) = flume::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicUsize::new(0));
        let pending = Arc::new(RwLock::new(HashSet::new()));
        let broken = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let active = Arc::clone(&active);
            let pending = Arc::clone(&pending);
            let broken = Arc::clone(&broken);
            let cache = cache.clone();

            let handle = thread::Builder::new()
                .name(format!("thumb-worker-{}", worker_id))
                .spawn(move || {
                    worker_loop(worker_id, rx, tx, shutdown, active, pending, broken, cache)
                })
                .expect("Failed to spawn thumbnail worker");
            handles.push(handle);
        }

        debug!(num_workers, "Started thumbnail worker queue");

        Self {
            request_tx,
            result_rx,
            workers: handles,
            shutdown,
            active,
            pending,
            broken,
        }
    }

    /// Submit one job. Returns false if the job was dropped (duplicate or
    /// queue full).
    pub fn submit(&self, job: ThumbnailJob) -> bool {
        {
            let pending = self.pending.read();
            if pending.contains(&job.path) {
                trace!(path = ?job.path, "Thumbnail already pending");
                return false;
            }
        }

        self.pending.write().insert(job.path.clone());

        match self.request_tx.try_send(job) {
            Ok(()) => true,
            Err(flume::TrySendError::Full(job)) => {
                warn!("Thumbnail queue full, dropping request");
                self.pending.write().remove(&job.path);
                false
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                warn!("Thumbnail queue disconnected");
                false
            }
        }
    }

    /// Submit jobs for a whole collection. Returns how many were accepted.
    pub fn submit_all(&self, jobs: Vec<ThumbnailJob>) -> usize {
        jobs.into_iter().filter(|j| self.submit(j.clone())).count()
    }

    /// Drain completion notices (non-blocking).
    pub fn poll(&self) -> Vec<ThumbnailOutcome> {
        let mut results = Vec::new();
        while let Ok(outcome) = self.result_rx.try_recv() {
            results.push(outcome);
        }
        results
    }

    /// Take the accumulated broken files in one step. The caller applies
    /// the whole batch against the live collection at once.
    pub fn take_broken(&self) -> Vec<(PathBuf, u64)> {
        std::mem::take(&mut *self.broken.lock())
    }

    /// Forget queued-but-unstarted requests so their paths can be
    /// resubmitted. Requests already picked up by a worker still complete.
    pub fn cancel_pending(&self) {
        self.pending.write().clear();
        debug!("Cancelled pending thumbnail requests");
    }

    pub fn pending_count(&self) -> usize {
        self.pending.read().len()
    }

    pub fn is_busy(&self) -> bool {
        !self.pending.read().is_empty() || self.active.load(Ordering::Relaxed) > 0
    }

    fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("Thumbnail queue shut down");
    }
}

impl Drop for ThumbnailQueue {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    worker_id: usize,
    rx: Receiver<ThumbnailJob>,
    tx: Sender<ThumbnailOutcome>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    pending: Arc<RwLock<HashSet<PathBuf>>>,
    broken: Arc<Mutex<Vec<(PathBuf, u64)>>>,
    cache: ThumbnailCache,
) {
    debug!(worker_id, "Thumbnail worker started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => {
                active.fetch_add(1, Ordering::Relaxed);

                let ok = match generator::generate(&job.path, job.edge_px) {
                    Ok(thumb) => {
                        cache.insert(&job.path, thumb);
                        true
                    }
                    Err(e) => {
                        // Expected for corrupt files; eviction handles it.
                        debug!(path = ?job.path, error = %e, "Thumbnail decode failed");
                        broken.lock().push((job.path.clone(), job.generation));
                        false
                    }
                };

                pending.write().remove(&job.path);

                let outcome = ThumbnailOutcome {
                    path: job.path,
                    generation: job.generation,
                    ok,
                };
                if tx.send(outcome).is_err() {
                    warn!(worker_id, "Failed to send thumbnail outcome");
                }

                active.fetch_sub(1, Ordering::Relaxed);
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Thumbnail worker stopped");
}

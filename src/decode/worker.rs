//! Decode worker pool for full-view bitmaps.
//!
//! Requests carry the generation number active at dispatch time; replies
//! whose generation no longer matches the latest request are discarded by
//! the caller, and workers skip requests that are already stale at pickup.
//! No in-flight decode is forcibly aborted - the worst case is a wasted
//! decode, never a stuck caller.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, Sender};
use image::RgbaImage;
use tracing::{debug, trace, warn};

use super::policy;
use super::DecodeError;
use crate::config::DisplayMetrics;
use crate::image_loader;

/// Default number of decode worker threads.
const DEFAULT_WORKERS: usize = 2;

/// Maximum number of decode worker threads.
const MAX_WORKERS: usize = 4;

/// Maximum queued decode requests before the oldest are dropped as stale.
const MAX_QUEUE_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub path: PathBuf,
    pub full_resolution: bool,
    pub display: DisplayMetrics,
    pub generation: u64,
}

#[derive(Debug)]
pub struct DecodeReply {
    pub path: PathBuf,
    pub generation: u64,
    pub result: Result<RgbaImage, DecodeError>,
}

/// Worker pool turning file references into upright display bitmaps.
pub struct AdaptiveDecoder {
    request_tx: Sender<DecodeRequest>,
    reply_rx: Receiver<DecodeReply>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl AdaptiveDecoder {
    pub fn new(workers: usize) -> Self {
        let num_workers = workers.clamp(1, MAX_WORKERS);

        let (request_tx, request_rx) = flume::bounded(MAX_QUEUE_SIZE);
        let (reply_tx, reply_rx) = flume::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let generation = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let rx = request_rx.clone();
            let tx = reply_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let generation = Arc::clone(&generation);

            let handle = thread::Builder::new()
                .name(format!("decode-worker-{}", worker_id))
                .spawn(move || worker_loop(worker_id, rx, tx, shutdown, generation))
                .expect("Failed to spawn decode worker");
            handles.push(handle);
        }

        debug!(num_workers, "Started decode worker pool");

        Self {
            request_tx,
            reply_rx,
            workers: handles,
            shutdown,
            generation,
        }
    }

    /// Request a decode for `path`, superseding any in-flight request.
    /// Returns the generation number assigned to this request.
    pub fn begin(&self, path: PathBuf, full_resolution: bool, display: DisplayMetrics) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = DecodeRequest {
            path,
            full_resolution,
            display,
            generation,
        };
        if let Err(e) = self.request_tx.try_send(request) {
            warn!(error = %e, "Failed to enqueue decode request");
        }
        generation
    }

    /// The generation of the most recent request; anything older is stale.
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drain completed decodes (non-blocking).
    pub fn drain(&self) -> Vec<DecodeReply> {
        let mut replies = Vec::new();
        while let Ok(reply) = self.reply_rx.try_recv() {
            replies.push(reply);
        }
        replies
    }

    fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        debug!("Decode worker pool shut down");
    }
}

impl Drop for AdaptiveDecoder {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<DecodeRequest>,
    tx: Sender<DecodeReply>,
    shutdown: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
) {
    debug!(worker_id, "Decode worker started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(request) => {
                // Skip requests already superseded at pickup.
                if request.generation < generation.load(Ordering::SeqCst) {
                    trace!(path = ?request.path, "Skipping stale decode request");
                    continue;
                }

                let result = decode_one(&request);
                let reply = DecodeReply {
                    path: request.path,
                    generation: request.generation,
                    result,
                };
                if tx.send(reply).is_err() {
                    break;
                }
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Decode worker stopped");
}

fn decode_one(request: &DecodeRequest) -> Result<RgbaImage, DecodeError> {
    let native_max = if request.full_resolution {
        image_loader::read_dimensions(&request.path)
            .ok()
            .map(|(w, h)| w.max(h))
    } else {
        None
    };

    let target = policy::target_max_dimension(request.display, request.full_resolution, native_max);

    match image_loader::open_image_at_most(&request.path, target) {
        Ok(img) => Ok(img.to_rgba8()),
        Err(e) => {
            warn!(path = ?request.path, error = %e, "Full decode failed");
            Err(DecodeError::Unreadable(request.path.clone()))
        }
    }
}

impl Default for AdaptiveDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

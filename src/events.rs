//! Change notifications for engine observers.
//!
//! State lives behind the coordinating thread's [`crate::CollectionBuilder`];
//! a UI layer subscribes here instead of binding to mutable fields.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum BrowseEvent {
    /// A new collection was published (open file/folder).
    CollectionReplaced { len: usize },
    /// The selection moved to `index`.
    SelectionChanged { index: usize, path: PathBuf },
    /// The collection became empty; there is no selection.
    SelectionCleared,
    /// The full-view bitmap for `path` finished decoding and was applied.
    ImageLoaded { path: PathBuf },
    /// A thumbnail for `path` is available in the cache.
    ThumbnailReady { path: PathBuf },
    /// Broken or deleted entries were removed from the collection.
    EntriesEvicted { paths: Vec<PathBuf> },
    /// A user-visible failure (save, trash, access). One per operation.
    OperationFailed { message: String },
}

pub(crate) struct EventBus {
    tx: async_channel::Sender<BrowseEvent>,
    rx: async_channel::Receiver<BrowseEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }

    /// Hand out a receiver. The channel is multi-consumer; each event is
    /// delivered to one receiver, so a single logical subscriber is the
    /// supported shape.
    pub(crate) fn subscribe(&self) -> async_channel::Receiver<BrowseEvent> {
        self.rx.clone()
    }

    pub(crate) fn emit(&self, event: BrowseEvent) {
        // The bus holds its own receiver, so the channel is never closed
        // and an unbounded try_send cannot fail.
        let _ = self.tx.try_send(event);
    }
}

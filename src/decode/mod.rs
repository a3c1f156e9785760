//! Adaptive full-view decoding.
//!
//! - `policy` - target resolution selection from display metrics
//! - `worker` - the decode worker pool with stale-response suppression

pub mod policy;
pub mod worker;

use std::path::PathBuf;

use thiserror::Error;

pub use policy::{target_max_dimension, BASE_POINTS, FULL_RES_CAP_PX};
pub use worker::{AdaptiveDecoder, DecodeReply, DecodeRequest};

#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The file exists but cannot be decoded. Surfaced to the collection
    /// as a broken-file signal, never to the user directly.
    #[error("unreadable image: {0:?}")]
    Unreadable(PathBuf),
}

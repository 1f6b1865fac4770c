//! Boundary error taxonomy.
//!
//! Engine backends and internal helpers report failures with `anyhow`; the
//! bridge converts everything to these two enums before it crosses the
//! boundary, so the caller always receives a structured, terminal error.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::bridge::receipt::{Closed, Elapsed};

/// Failure modes of `Bridge::load_model`.
///
/// All variants are non-fatal: the bridge stays usable and a retried load
/// with a valid asset recovers.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The asset identifier resolved to nothing under the asset root.
    #[error("model asset '{0}' not found")]
    AssetNotFound(String),

    /// Copying the asset to its cache destination failed.
    #[error("failed to stage model to {}: {source}", path.display())]
    CopyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine rejected the staged file.
    #[error("engine rejected model file: {0}")]
    EngineConstruction(String),

    /// Another load is currently running; the state writer is single.
    #[error("a model load is already in progress")]
    InProgress,

    /// The bridge was torn down before the load delivered a result.
    #[error("bridge shut down before the load completed")]
    BridgeClosed,
}

/// Failure modes of `Bridge::detect`.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Precondition violation, reported synchronously on the caller's
    /// thread. No worker is scheduled for this.
    #[error("no model loaded")]
    NotLoaded,

    /// The engine reported a fault for this frame. Bridge state is
    /// untouched; the next call proceeds normally.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// The caller's deadline elapsed before the engine answered. The
    /// worker finishes on its own and the late result is discarded.
    #[error("inference did not complete within {0:?}")]
    Timeout(Duration),

    /// The dispatch queue is full; the call was rejected at admission.
    #[error("too many detect calls in flight")]
    Overloaded,

    /// The bridge was torn down before the call delivered a result.
    #[error("bridge shut down before the call completed")]
    BridgeClosed,
}

impl From<Closed> for LoadError {
    fn from(_: Closed) -> Self {
        LoadError::BridgeClosed
    }
}

impl From<Closed> for DetectError {
    fn from(_: Closed) -> Self {
        DetectError::BridgeClosed
    }
}

impl From<Elapsed> for DetectError {
    fn from(elapsed: Elapsed) -> Self {
        DetectError::Timeout(elapsed.0)
    }
}

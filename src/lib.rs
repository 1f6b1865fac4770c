//! Detection Bridge
//!
//! Mediates between a host application and an opaque object-detection
//! engine: the model asset is staged and loaded exactly once, and every
//! per-frame inference request is serialized against the loaded engine
//! while all blocking work stays off the caller's thread.
//!
//! The bridge upholds four contract points:
//!
//! 1. **Load-once lifecycle**: `Unloaded → Loading → Loaded / Failed`,
//!    retry after failure, Loaded terminal for the bridge's lifetime.
//! 2. **Synchronous admission**: a detect call against an unloaded model
//!    fails on the caller's thread; no worker is ever scheduled for it.
//! 3. **Serialized engine access**: engine thread-safety is unknown, so at
//!    most one inference executes inside the engine at a time.
//! 4. **One terminal response per call**: every boundary call gets its own
//!    completion channel and receives exactly one success or error, never
//!    more, even across timeouts and teardown.
//!
//! # Module Structure
//!
//! - `bridge`: the two boundary operations, worker pool, receipts
//! - `engine`: the engine trait seam plus stub and tract backends
//! - `asset`: bundled-asset resolution and cache staging
//! - `state`: the shared lifecycle state machine
//! - `config`, `error`: ambient configuration and the boundary taxonomy

pub mod asset;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod state;

pub use asset::ModelAsset;
pub use bridge::receipt::Receipt;
pub use bridge::{Bridge, DetectReceipt, DispatchCounters, LoadReceipt};
pub use config::{BridgeConfig, DispatchSettings, EngineSettings};
pub use engine::{
    select_engine_backend, BoundingBox, Detection, DetectionResult, EngineFactory,
    InferenceEngine, StubEngine, StubEngineFactory,
};
#[cfg(feature = "backend-tract")]
pub use engine::{TractEngine, TractEngineFactory};
pub use error::{DetectError, LoadError};
pub use state::{EngineCell, Phase};

//! Inference engine seam.
//!
//! The numeric transformation is external to this crate: the bridge only
//! knows how to construct an engine from a staged model file and how to
//! hand it one frame at a time. Engines take `&mut self` for inference, so
//! serialized access is enforced by the type system, not by convention.

mod backend;
mod result;
mod stub;
#[cfg(feature = "backend-tract")]
mod tract;

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::config::BridgeConfig;

pub use backend::{EngineFactory, InferenceEngine};
pub use result::{BoundingBox, Detection, DetectionResult};
pub use stub::{StubEngine, StubEngineFactory};
#[cfg(feature = "backend-tract")]
pub use tract::{TractEngine, TractEngineFactory};

/// Select an engine factory from configuration.
///
/// `stub` is always available; `tract` requires the `backend-tract` feature.
pub fn select_engine_backend(cfg: &BridgeConfig) -> Result<Arc<dyn EngineFactory>> {
    match cfg.engine.backend.as_str() {
        "stub" => Ok(Arc::new(StubEngineFactory::new())),
        #[cfg(feature = "backend-tract")]
        "tract" => Ok(Arc::new(TractEngineFactory::new(
            cfg.engine.input_width,
            cfg.engine.input_height,
            cfg.engine.confidence_threshold,
        ))),
        other => Err(anyhow!("unknown engine backend '{}'", other)),
    }
}

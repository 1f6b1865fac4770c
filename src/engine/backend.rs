use std::path::Path;

use anyhow::Result;

use crate::engine::result::DetectionResult;

/// Inference engine trait.
///
/// Implementations own whatever model state the external engine needs and
/// transform one raw frame buffer into a `DetectionResult`. The bridge
/// never assumes an engine tolerates concurrent calls: `infer` takes
/// `&mut self` and the bridge wraps every engine in a mutex, so at most one
/// inference executes inside an engine at a time.
pub trait InferenceEngine: Send {
    /// Engine identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Run inference on a single frame.
    ///
    /// The frame slice is read-only and valid only for the duration of the
    /// call. A rejected frame is an error for that call alone; it must not
    /// poison the engine for subsequent frames.
    fn infer(&mut self, frame: &[u8]) -> Result<DetectionResult>;

    /// Optional warm-up hook, invoked once right after construction.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("name", &self.name())
            .finish()
    }
}

/// Constructor seam for engines.
///
/// The loader hands a factory the staged model path; the factory either
/// produces a ready engine or rejects the file as malformed.
pub trait EngineFactory: Send + Sync {
    /// Factory identifier, used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Construct an engine from a staged model file.
    fn load(&self, model_path: &Path) -> Result<Box<dyn InferenceEngine>>;
}

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};

use crate::engine::backend::{EngineFactory, InferenceEngine};
use crate::engine::result::{BoundingBox, Detection, DetectionResult};

/// Smallest frame the stub accepts. Anything shorter is rejected as
/// malformed, the way a real engine rejects an undecodable buffer.
pub const MIN_FRAME_BYTES: usize = 8;

const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Labels the stub emits, one per hash bucket.
const STUB_LABELS: [&str; 6] = ["person", "bicycle", "car", "motorcycle", "bus", "truck"];

/// Factory for the stub engine. Rejects empty model files so load-failure
/// paths are exercisable without a real model.
#[derive(Default)]
pub struct StubEngineFactory;

impl StubEngineFactory {
    pub fn new() -> Self {
        Self
    }
}

impl EngineFactory for StubEngineFactory {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn load(&self, model_path: &Path) -> Result<Box<dyn InferenceEngine>> {
        let bytes = std::fs::read(model_path)
            .with_context(|| format!("failed to read model file {}", model_path.display()))?;
        if bytes.is_empty() {
            return Err(anyhow!(
                "model file {} is empty",
                model_path.display()
            ));
        }
        let seed: [u8; 32] = Sha256::digest(&bytes).into();
        Ok(Box::new(StubEngine { seed }))
    }
}

/// Deterministic stand-in for a real detection engine.
///
/// Hashes the model seed together with the frame bytes and derives a
/// pseudo-detection from the digest: the same frame against the same model
/// always yields the same result, which the tests rely on.
pub struct StubEngine {
    seed: [u8; 32],
}

impl InferenceEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, frame: &[u8]) -> Result<DetectionResult> {
        if frame.len() < MIN_FRAME_BYTES {
            return Err(anyhow!(
                "malformed frame: {} bytes, need at least {}",
                frame.len(),
                MIN_FRAME_BYTES
            ));
        }

        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(frame);
        let digest: [u8; 32] = hasher.finalize().into();

        let confidence = digest[0] as f32 / 255.0;
        if confidence < CONFIDENCE_THRESHOLD {
            return Ok(DetectionResult::default());
        }

        let class_id = (digest[1] as usize) % STUB_LABELS.len();
        let x1 = (digest[2] as f32 / 255.0) * 0.5;
        let y1 = (digest[3] as f32 / 255.0) * 0.5;
        let x2 = x1 + 0.25 + (digest[4] as f32 / 255.0) * 0.25;
        let y2 = y1 + 0.25 + (digest[5] as f32 / 255.0) * 0.25;

        Ok(DetectionResult::new(vec![Detection {
            class_id: class_id as u32,
            label: STUB_LABELS[class_id].to_string(),
            confidence,
            bbox: BoundingBox {
                x1,
                y1,
                x2: x2.min(1.0),
                y2: y2.min(1.0),
            },
        }]))
    }
}

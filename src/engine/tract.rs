#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::engine::backend::{EngineFactory, InferenceEngine};
use crate::engine::result::{BoundingBox, Detection, DetectionResult};

/// Factory for the tract-onnx engine.
///
/// Frames must be raw RGB at exactly the configured input size; decoding
/// and resizing are the caller's problem.
pub struct TractEngineFactory {
    width: u32,
    height: u32,
    confidence_threshold: f32,
}

impl TractEngineFactory {
    pub fn new(width: u32, height: u32, confidence_threshold: f32) -> Self {
        Self {
            width,
            height,
            confidence_threshold,
        }
    }
}

impl EngineFactory for TractEngineFactory {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn load(&self, model_path: &Path) -> Result<Box<dyn InferenceEngine>> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, self.height as usize, self.width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Box::new(TractEngine {
            model,
            width: self.width,
            height: self.height,
            confidence_threshold: self.confidence_threshold,
        }))
    }
}

/// Tract-backed engine for classification-head ONNX models.
///
/// Emits at most one detection per frame: the top class when its score
/// clears the threshold, with a full-frame box. Box-decoding output heads
/// are left to the external engine this crate treats as opaque.
pub struct TractEngine {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
}

impl TractEngine {
    fn build_input(&self, frame: &[u8]) -> Result<Tensor> {
        let expected_len = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("model input dimensions overflow"))?;

        if frame.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes for a {}x{} frame, received {}",
                expected_len,
                self.width,
                self.height,
                frame.len()
            ));
        }

        let width = self.width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                frame[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn top_class(&self, outputs: TVec<TValue>) -> Result<Option<(u32, f32)>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let mut best: Option<(u32, f32)> = None;
        for (idx, &score) in scores.iter().enumerate() {
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((idx as u32, score));
            }
        }

        Ok(best.filter(|&(_, score)| score >= self.confidence_threshold))
    }
}

impl InferenceEngine for TractEngine {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &[u8]) -> Result<DetectionResult> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;

        match self.top_class(outputs)? {
            Some((class_id, confidence)) => Ok(DetectionResult::new(vec![Detection {
                class_id,
                label: format!("class_{class_id}"),
                confidence,
                bbox: BoundingBox {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 1.0,
                    y2: 1.0,
                },
            }])),
            None => Ok(DetectionResult::default()),
        }
    }
}

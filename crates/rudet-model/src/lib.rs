// rudet-model/src/lib.rs
// ============================================================
// rudet-model  –  Inference layer for RuDet
// Runs a YOLO-family detection network via Tract (pure Rust,
// no C deps) and hands the raw prediction tensor downstream.
// ------------------------------------------------------------
// Pipeline: Array3<f32> (H, W, C) → Tensor →
//             Array3<f32> [batch, candidates, 5+K]
// ------------------------------------------------------------
// Public API
//   * TractYolo::new(path, w, h) – load & optimise ONNX
//   * Network::forward(tensor)   – raw predictions
//   * load_class_names(path)     – coco.names-style label table
// ============================================================

//! RuDet – inference layer
//!
//! This crate provides a backend-agnostic [`Network`] trait plus a
//! concrete **`TractYolo`** implementation.  It deliberately stops at the
//! raw prediction tensor: score filtering and NMS live in `rudet-detect`,
//! so swapping the inference engine never touches the detection math.
//!
//! Input tensors come from `rudet-preprocess` (HWC, f32, 0-1).  Output is
//! the network's dense candidate tensor, `[batch, candidates, 5 + K]`,
//! validated for rank and row width before anything downstream sees it.

use ndarray::Array3;
use std::path::Path;
use thiserror::Error;
use tract_onnx::prelude::*;

pub mod labels;
pub use labels::load_class_names;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model load or inference error: {0}")]
    Tract(TractError),
    #[error("invalid input channels: expected 3, got {0}")]
    InvalidChannels(usize),
    #[error("invalid prediction shape: expected [batch, candidates, 5 + classes], got {0:?}")]
    InvalidOutputShape(Vec<usize>),
    #[error("failed to read class names: {0}")]
    Names(#[from] std::io::Error),
}

// tract's error type is an anyhow alias, so thiserror's #[from] cannot
// derive a source impl for it
impl From<TractError> for ModelError {
    fn from(err: TractError) -> Self {
        ModelError::Tract(err)
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Trait for inference backends.
pub trait Network {
    /// HWC 0-1 float image in, raw `[batch, candidates, 5+K]`
    /// predictions out.
    fn forward(&self, input: &Array3<f32>) -> Result<Array3<f32>>;
}

/// Tract-powered YOLO detector network.
pub struct TractYolo {
    model: RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>,
}

impl TractYolo {
    /// Load and optimize an ONNX detection model expecting W×H input.
    pub fn new(model_path: &Path, width: u32, height: u32) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec![1, 3, height as usize, width as usize],
                ),
            )?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self { model })
    }
}

impl Network for TractYolo {
    fn forward(&self, input: &Array3<f32>) -> Result<Array3<f32>> {
        let h = input.shape()[0];
        let w = input.shape()[1];
        let c = input.shape()[2];
        if c != 3 {
            return Err(ModelError::InvalidChannels(c));
        }

        // HWC (our ndarray) → NCHW (tract's); the two crates pin
        // different ndarray versions, so this is an element copy.
        let mut arr4 = tract_ndarray::Array4::<f32>::zeros((1, 3, h, w));
        for y in 0..h {
            for x in 0..w {
                for ch in 0..3 {
                    arr4[(0, ch, y, x)] = input[(y, x, ch)];
                }
            }
        }

        let tensor: Tensor = arr4.into_tensor();
        let outputs = self.model.run(tvec![tensor.into()])?;
        let view = outputs[0].to_array_view::<f32>()?;

        let shape = view.shape().to_vec();
        if shape.len() != 3 || shape[2] < 6 {
            return Err(ModelError::InvalidOutputShape(shape));
        }

        let (batch, candidates, fields) = (shape[0], shape[1], shape[2]);
        Ok(Array3::from_shape_fn(
            (batch, candidates, fields),
            |(i, j, k)| view[[i, j, k]],
        ))
    }
}

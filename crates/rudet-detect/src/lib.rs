// rudet-detect/src/lib.rs
// ============================================================
// rudet-detect  –  Detection post-processing core for RuDet
// Collapses a dense YOLO prediction tensor into a sparse,
// non-redundant detection list via score filtering + greedy
// non-maximum suppression.
// ------------------------------------------------------------
// Pipeline: [batch, candidates, 5+K] f32
//             → score filter → corner decode → NMS → rescale
// ------------------------------------------------------------
// Public API
//   * postprocess(preds, cfg)       – per-image detection lists
//   * decode_candidates(pred, t)    – filter + center→corner
//   * non_max_suppression(dets, t)  – greedy overlap pruning
//   * scale_to_original(dets, ..)   – map back to source pixels
// ============================================================

//! RuDet – detection post-processing layer
//!
//! The inference layer hands this crate a raw prediction tensor of shape
//! `[batch, num_candidates, 5 + K]`, each row laid out as
//! `[cx, cy, w, h, objectness, class_score_0 .. class_score_K-1]`.
//! Candidates scoring at or below the configured threshold are dropped
//! first, survivors are decoded into corner-form [`Detection`]s, and
//! greedy NMS prunes everything that overlaps a higher-scoring box by
//! more than the IoU threshold.  One detection list comes back per image,
//! in batch order.
//!
//! Everything here is pure and allocation-owned per invocation: no state
//! is shared across images, so the per-image work can run in parallel
//! (enable the `rayon` feature) without touching the algorithm.

use ndarray::{ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod decode;
pub mod nms;

pub use decode::decode_candidates;
pub use nms::non_max_suppression;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid candidate layout: expected at least 6 columns (cx, cy, w, h, objectness, class scores), got {0}")]
    InvalidLayout(usize),
}

pub type Result<T> = std::result::Result<T, DetectError>;

/// A single detection: corner-form box `[left, top, right, bottom]` in
/// model-input pixels plus combined score and class index.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox:  [f32; 4],
    pub score: f32,
    pub class: usize,
}

/// Tunables for the post-processing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostprocessConfig {
    /// Candidates whose combined score is at or below this are dropped
    /// before any geometry work.
    pub score_thresh: f32,
    /// Two kept boxes never overlap by more than this IoU.
    pub iou_thresh: f32,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            score_thresh: 0.4,
            iou_thresh: 0.5,
        }
    }
}

/// Filter, decode and suppress one image worth of raw candidates.
fn detect_image(pred: ArrayView2<f32>, cfg: &PostprocessConfig) -> Result<Vec<Detection>> {
    let dets = decode::decode_candidates(pred, cfg.score_thresh)?;
    if dets.is_empty() {
        // nothing survived the score filter – not an error
        return Ok(Vec::new());
    }
    Ok(nms::non_max_suppression(dets, cfg.iou_thresh))
}

/// Run the full post-processing chain over a raw prediction batch.
///
/// Images are processed independently; an empty result for one image
/// never affects another, and the output order matches the batch order.
/// A malformed layout (fewer than six columns) fails before any geometry
/// transform runs.
pub fn postprocess(
    preds: ArrayView3<f32>,
    cfg: &PostprocessConfig,
) -> Result<Vec<Vec<Detection>>> {
    let images: Vec<ArrayView2<f32>> = preds.outer_iter().collect();

    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        images
            .into_par_iter()
            .map(|pred| detect_image(pred, cfg))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        images
            .into_iter()
            .map(|pred| detect_image(pred, cfg))
            .collect()
    }
}

/// Map detections from model-input coordinates back to source-image pixels.
///
/// The ratios are original size over model input size, per axis.  Pure
/// arithmetic with no shared state; applied once per detection right
/// before the boxes are handed to rendering.
pub fn scale_to_original(
    dets: &[Detection],
    width_ratio: f32,
    height_ratio: f32,
) -> Vec<Detection> {
    dets.iter()
        .map(|d| Detection {
            bbox: [
                d.bbox[0] * width_ratio,
                d.bbox[1] * height_ratio,
                d.bbox[2] * width_ratio,
                d.bbox[3] * height_ratio,
            ],
            score: d.score,
            class: d.class,
        })
        .collect()
}

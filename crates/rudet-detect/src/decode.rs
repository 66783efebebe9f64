//! Candidate score filtering and box decoding.
//!
//! Raw rows arrive in center form; survivors leave as corner-form
//! [`Detection`]s.  Filtering runs before any geometry so the O(n²)
//! suppression stage only ever sees the confident few.

use std::cmp::Ordering;

use ndarray::{s, ArrayView1, ArrayView2};

use crate::{DetectError, Detection, Result};

/// Columns preceding the per-class scores: cx, cy, w, h, objectness.
const BOX_FIELDS: usize = 5;

/// Combined score (objectness × best class score) and best class index
/// for one raw candidate row.
fn best_class(row: ArrayView1<f32>) -> (f32, usize) {
    let (class, best) = row
        .slice(s![BOX_FIELDS..])
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(idx, &score)| (idx, score))
        .unwrap_or((0, 0.0));
    (row[4] * best, class)
}

/// Score-filter one image worth of raw candidates and decode the
/// survivors from center form to corner form.
///
/// A candidate survives only when its combined score is strictly above
/// `score_thresh`.  The transform runs exactly once per surviving row;
/// feeding already corner-form data back through would corrupt it.
/// Rows with fewer than six columns (no class scores at all) are a
/// malformed layout and fail fast before any geometry runs.
pub fn decode_candidates(
    pred: ArrayView2<f32>,
    score_thresh: f32,
) -> Result<Vec<Detection>> {
    let cols = pred.ncols();
    if cols < BOX_FIELDS + 1 {
        return Err(DetectError::InvalidLayout(cols));
    }

    let mut dets = Vec::new();
    for row in pred.rows() {
        let (score, class) = best_class(row);
        if score <= score_thresh {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let left = cx - w / 2.0;
        let top = cy - h / 2.0;
        dets.push(Detection {
            bbox: [left, top, left + w, top + h],
            score,
            class,
        });
    }
    Ok(dets)
}

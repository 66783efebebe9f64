//! Greedy non-maximum suppression.
//!
//! O(n²) in the candidate count, which is fine: the score filter has
//! already cut n by orders of magnitude before this stage runs.

use crate::Detection;

/// Clamped corner-form box area; inverted or zero-size boxes contribute
/// zero.
fn box_area(d: &Detection) -> f32 {
    let [left, top, right, bottom] = d.bbox;
    (right - left).max(0.0) * (bottom - top).max(0.0)
}

/// IoU of two corner-form boxes, given their precomputed areas.
///
/// A non-positive union (two degenerate boxes) yields 0 rather than NaN,
/// so degenerate candidates are never spuriously suppressed or retained
/// by an implementation-defined comparison.
fn iou(a: &Detection, b: &Detection, area_a: f32, area_b: f32) -> f32 {
    let inter_left = a.bbox[0].max(b.bbox[0]);
    let inter_top = a.bbox[1].max(b.bbox[1]);
    let inter_right = a.bbox[2].min(b.bbox[2]);
    let inter_bottom = a.bbox[3].min(b.bbox[3]);

    let overlap =
        (inter_right - inter_left).max(0.0) * (inter_bottom - inter_top).max(0.0);

    let union = area_a + area_b - overlap;
    if union <= 0.0 {
        return 0.0;
    }
    overlap / union
}

/// Greedy NMS: repeatedly keep the highest-scoring remaining candidate
/// and drop every other remaining candidate overlapping it by more than
/// `iou_thresh`.
///
/// The kept list comes back in selection order (score descending).  The
/// sort is stable, so equal scores keep their input order; `total_cmp`
/// keeps the comparator total even for malformed (NaN) scores.  A pair
/// whose IoU equals `iou_thresh` exactly survives: suppression requires
/// strictly greater overlap.  The remaining set shrinks by at least one
/// candidate per iteration, so the loop always terminates.
pub fn non_max_suppression(dets: Vec<Detection>, iou_thresh: f32) -> Vec<Detection> {
    let areas: Vec<f32> = dets.iter().map(box_area).collect();

    let mut remaining: Vec<usize> = (0..dets.len()).collect();
    remaining.sort_by(|&a, &b| dets[b].score.total_cmp(&dets[a].score));

    let mut keep: Vec<usize> = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let top = remaining[0];
        keep.push(top);

        remaining = remaining[1..]
            .iter()
            .copied()
            .filter(|&i| iou(&dets[top], &dets[i], areas[top], areas[i]) <= iou_thresh)
            .collect();
    }

    keep.into_iter().map(|i| dets[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(bbox: [f32; 4], score: f32) -> Detection {
        Detection {
            bbox,
            score,
            class: 0,
        }
    }

    #[test]
    fn identical_boxes_keep_only_the_best() {
        let dets = vec![
            det([0.0, 0.0, 10.0, 10.0], 0.6),
            det([0.0, 0.0, 10.0, 10.0], 0.9),
        ];
        let kept = non_max_suppression(dets, 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn disjoint_boxes_both_survive_in_score_order() {
        let dets = vec![
            det([100.0, 100.0, 110.0, 110.0], 0.6),
            det([0.0, 0.0, 10.0, 10.0], 0.9),
        ];
        let kept = non_max_suppression(dets, 0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.6);
    }

    #[test]
    fn iou_exactly_at_threshold_survives() {
        // areas 2 and 1, overlap 1 → IoU = 1 / (2 + 1 - 1) = 0.5 exactly
        let dets = vec![
            det([0.0, 0.0, 2.0, 1.0], 0.9),
            det([0.0, 0.0, 1.0, 1.0], 0.6),
        ];
        let kept = non_max_suppression(dets, 0.5);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn iou_just_above_threshold_is_suppressed() {
        // overlap 3 of areas 4 and 3 → IoU = 3/4
        let dets = vec![
            det([0.0, 0.0, 4.0, 1.0], 0.9),
            det([0.0, 0.0, 3.0, 1.0], 0.6),
        ];
        let kept = non_max_suppression(dets, 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn coincident_zero_area_boxes_are_both_kept() {
        // degenerate geometry: area 0, union 0 → IoU defined as 0, not NaN
        let dets = vec![
            det([5.0, 5.0, 5.0, 5.0], 0.9),
            det([5.0, 5.0, 5.0, 5.0], 0.8),
        ];
        let kept = non_max_suppression(dets, 0.5);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let dets = vec![
            det([0.0, 0.0, 10.0, 10.0], 0.7),
            det([100.0, 0.0, 110.0, 10.0], 0.7),
            det([200.0, 0.0, 210.0, 10.0], 0.7),
        ];
        let kept = non_max_suppression(dets.clone(), 0.5);
        assert_eq!(kept, dets);
    }

    #[test]
    fn kept_pairs_never_exceed_the_threshold() {
        // a pile of staggered boxes plus one far away
        let dets = vec![
            det([0.0, 0.0, 10.0, 10.0], 0.9),
            det([1.0, 1.0, 11.0, 11.0], 0.8),
            det([2.0, 2.0, 12.0, 12.0], 0.7),
            det([8.0, 8.0, 18.0, 18.0], 0.6),
            det([50.0, 50.0, 60.0, 60.0], 0.5),
        ];
        let iou_thresh = 0.5;
        let kept = non_max_suppression(dets, iou_thresh);
        assert!(!kept.is_empty());
        for (i, a) in kept.iter().enumerate() {
            for b in kept.iter().skip(i + 1) {
                assert!(iou(a, b, box_area(a), box_area(b)) <= iou_thresh);
            }
        }
    }

    #[test]
    fn selection_order_is_non_increasing_in_score() {
        let dets = vec![
            det([0.0, 0.0, 10.0, 10.0], 0.3),
            det([100.0, 0.0, 110.0, 10.0], 0.9),
            det([200.0, 0.0, 210.0, 10.0], 0.6),
            det([300.0, 0.0, 310.0, 10.0], 0.8),
        ];
        let kept = non_max_suppression(dets, 0.5);
        for pair in kept.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let kept = non_max_suppression(Vec::new(), 0.5);
        assert!(kept.is_empty());
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plan-level filtering of accepted room candidates
//!
//! Candidates that passed per-region scoring are filtered as a set: rooms
//! far below the plan's typical room size are dropped as furniture,
//! overlapping duplicates keep only the most confident one, and the result
//! is ranked by area and capped.

use crate::image_ops::{mean_std, median};
use crate::types::{RoomCandidate, ScaleContext};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Result of a filtering pass
#[derive(Debug, Clone, Default)]
pub struct Filtered {
    pub kept: Vec<RoomCandidate>,
    pub removed: usize,
}

/// Area distribution of a set of candidates; `None` when empty.
pub fn scale_context(areas: &[f64]) -> Option<ScaleContext> {
    let median_area = median(areas)?;
    let (_, std_area) = mean_std(areas.iter().copied());

    Some(ScaleContext {
        median_area,
        std_area,
        min_reasonable_area: (median_area - 2.0 * std_area).max(median_area * 0.3),
        outlier_threshold: median_area * 0.25,
    })
}

/// Drop candidates below both the reasonable minimum and the outlier threshold.
///
/// Skipped (nothing removed, no context) for fewer than `min_rooms` candidates.
pub fn filter_by_scale(
    candidates: Vec<RoomCandidate>,
    min_rooms: usize,
) -> (Filtered, Option<ScaleContext>) {
    if candidates.len() < min_rooms {
        return (
            Filtered {
                kept: candidates,
                removed: 0,
            },
            None,
        );
    }

    let areas: Vec<f64> = candidates.iter().map(|c| c.area).collect();
    let Some(context) = scale_context(&areas) else {
        return (
            Filtered {
                kept: candidates,
                removed: 0,
            },
            None,
        );
    };

    let before = candidates.len();
    let kept: Vec<RoomCandidate> = candidates
        .into_iter()
        .filter(|c| {
            let outlier = c.area < context.min_reasonable_area && c.area < context.outlier_threshold;
            if outlier {
                debug!(region = c.region, area = c.area, "dropped scale outlier");
            }
            !outlier
        })
        .collect();
    let removed = before - kept.len();

    debug!(
        median_area = context.median_area,
        min_reasonable = context.min_reasonable_area,
        removed,
        "scale context filter"
    );

    (Filtered { kept, removed }, Some(context))
}

/// Keep the most confident of every group of overlapping candidates.
///
/// Candidates are visited by confidence, highest first; one is dropped when
/// its overlap ratio with an already kept candidate exceeds `iou_threshold`.
pub fn remove_duplicates(mut candidates: Vec<RoomCandidate>, iou_threshold: f64) -> Filtered {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let before = candidates.len();
    let mut kept: Vec<RoomCandidate> = Vec::with_capacity(before);
    for candidate in candidates {
        let duplicate = kept
            .iter()
            .any(|k| candidate.bounding_box.overlap_ratio(&k.bounding_box) > iou_threshold);
        if !duplicate {
            kept.push(candidate);
        }
    }

    let removed = before - kept.len();
    Filtered { kept, removed }
}

/// Sort by area (largest first) and cap the count.
pub fn rank_and_truncate(mut candidates: Vec<RoomCandidate>, max_rooms: usize) -> Filtered {
    candidates.sort_by(|a, b| b.area.partial_cmp(&a.area).unwrap_or(Ordering::Equal));

    let removed = candidates.len().saturating_sub(max_rooms);
    if removed > 0 {
        warn!(max_rooms, removed, "room limit reached, dropping smallest rooms");
        candidates.truncate(max_rooms);
    }

    Filtered {
        kept: candidates,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, ShapeMetrics};
    use approx::assert_relative_eq;

    fn candidate(region: usize, bbox: [i32; 4], confidence: f64) -> RoomCandidate {
        let bounding_box = BoundingBox::from(bbox);
        RoomCandidate {
            region,
            bounding_box,
            area: bounding_box.area(),
            metrics: ShapeMetrics::default(),
            confidence,
        }
    }

    #[test]
    fn test_scale_context_values() {
        let context = scale_context(&[10_000.0, 12_000.0, 14_000.0, 16_000.0]).unwrap();
        assert_relative_eq!(context.median_area, 13_000.0);
        assert_relative_eq!(context.outlier_threshold, 3_250.0);
        // std = sqrt(5_000_000) ≈ 2236; median - 2 std > 0.3 median
        assert_relative_eq!(
            context.min_reasonable_area,
            13_000.0 - 2.0 * 5_000_000f64.sqrt(),
            epsilon = 1e-6
        );
        assert!(scale_context(&[]).is_none());
    }

    #[test]
    fn test_scale_filter_drops_furniture() {
        let rooms = vec![
            candidate(0, [0, 0, 200, 200], 0.9),
            candidate(1, [300, 0, 500, 200], 0.9),
            candidate(2, [0, 300, 200, 500], 0.9),
            candidate(3, [300, 300, 500, 500], 0.9),
            // Bed-sized: 60x60
            candidate(4, [600, 0, 660, 60], 0.9),
        ];

        let (filtered, context) = filter_by_scale(rooms, 4);
        assert!(context.is_some());
        assert_eq!(filtered.removed, 1);
        assert!(filtered.kept.iter().all(|c| c.region != 4));
    }

    #[test]
    fn test_scale_filter_needs_enough_rooms() {
        let rooms = vec![
            candidate(0, [0, 0, 200, 200], 0.9),
            candidate(1, [300, 0, 500, 200], 0.9),
            candidate(4, [600, 0, 660, 60], 0.9),
        ];

        let (filtered, context) = filter_by_scale(rooms, 4);
        assert!(context.is_none());
        assert_eq!(filtered.kept.len(), 3);
    }

    #[test]
    fn test_duplicates_keep_higher_confidence() {
        let rooms = vec![
            candidate(0, [0, 0, 100, 100], 0.5),
            candidate(1, [5, 5, 100, 100], 0.8),
            candidate(2, [200, 0, 300, 100], 0.4),
        ];

        let filtered = remove_duplicates(rooms, 0.5);
        assert_eq!(filtered.removed, 1);
        let ids: Vec<usize> = filtered.kept.iter().map(|c| c.region).collect();
        assert_eq!(ids, vec![1, 2]);

        for (i, a) in filtered.kept.iter().enumerate() {
            for b in &filtered.kept[i + 1..] {
                assert!(a.bounding_box.overlap_ratio(&b.bounding_box) <= 0.5);
            }
        }
    }

    #[test]
    fn test_rank_and_truncate() {
        let rooms = vec![
            candidate(0, [0, 0, 10, 10], 0.5),
            candidate(1, [0, 0, 30, 30], 0.5),
            candidate(2, [0, 0, 20, 20], 0.5),
        ];

        let ranked = rank_and_truncate(rooms, 2);
        assert_eq!(ranked.removed, 1);
        let ids: Vec<usize> = ranked.kept.iter().map(|c| c.region).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}

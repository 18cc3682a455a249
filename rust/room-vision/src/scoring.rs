// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Confidence scoring of candidate regions
//!
//! Each candidate gets four component scores (solidity, extent, aspect
//! ratio, size plausibility) combined with weights chosen by blueprint
//! style. CAD drawings lean on aspect ratio because hollow-outline fills
//! make solidity and extent unreliable.

use crate::config::DetectionConfig;
use crate::hierarchy::{polygon_area, Region};
use crate::types::{BlueprintStyle, RoomCandidate, ShapeMetrics};
use imageproc::geometry::convex_hull;

/// Aspect ratio up to which a shape scores fully
const ASPECT_FULL: f64 = 3.0;
/// Aspect ratio beyond which a shape scores zero
const ASPECT_MAX: f64 = 8.0;
/// Size score outside the typical room band
const ATYPICAL_SIZE_SCORE: f64 = 0.5;

/// Weight of each component score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub solidity: f64,
    pub extent: f64,
    pub aspect: f64,
    pub size: f64,
}

impl ScoreWeights {
    pub fn for_style(style: BlueprintStyle) -> Self {
        if style.is_cad() {
            Self {
                solidity: 0.1,
                extent: 0.2,
                aspect: 0.5,
                size: 0.2,
            }
        } else if style.is_line_drawing() {
            Self {
                solidity: 0.3,
                extent: 0.3,
                aspect: 0.3,
                size: 0.1,
            }
        } else {
            Self {
                solidity: 0.25,
                extent: 0.25,
                aspect: 0.3,
                size: 0.2,
            }
        }
    }

    pub fn combine(&self, metrics: &ShapeMetrics) -> f64 {
        self.solidity * metrics.solidity_score
            + self.extent * metrics.extent_score
            + self.aspect * metrics.aspect_score
            + self.size * metrics.size_score
    }
}

/// 1.0 up to ratio 3, linear decay to 0.5 at ratio 8, 0 beyond.
pub fn aspect_score(aspect_ratio: f64) -> f64 {
    if aspect_ratio <= ASPECT_FULL {
        1.0
    } else if aspect_ratio <= ASPECT_MAX {
        1.0 - (aspect_ratio - ASPECT_FULL) / (ASPECT_MAX - ASPECT_FULL) * 0.5
    } else {
        0.0
    }
}

/// 1.0 inside the typical room band (exclusive), 0.5 otherwise.
pub fn size_score(area: f64, config: &DetectionConfig) -> f64 {
    if area > config.typical_room_area_min && area < config.typical_room_area_max {
        1.0
    } else {
        ATYPICAL_SIZE_SCORE
    }
}

/// Shape metrics and component scores of a traced region
pub fn shape_metrics(region: &Region, config: &DetectionConfig) -> ShapeMetrics {
    let area = region.area;

    let hull = convex_hull(region.points.as_slice());
    let hull_area = polygon_area(&hull);
    let solidity = if hull_area > 0.0 { area / hull_area } else { 0.0 };

    let bbox_area = region.bounding_box.area();
    let extent = if bbox_area > 0.0 { area / bbox_area } else { 0.0 };

    let aspect_ratio = region.bounding_box.aspect_ratio();

    ShapeMetrics {
        solidity,
        extent,
        aspect_ratio,
        solidity_score: solidity.min(1.0),
        extent_score: extent.min(1.0),
        aspect_score: aspect_score(aspect_ratio),
        size_score: size_score(area, config),
    }
}

/// Score a region as a room candidate.
pub fn score_region(region: &Region, style: BlueprintStyle, config: &DetectionConfig) -> RoomCandidate {
    let metrics = shape_metrics(region, config);
    let confidence = ScoreWeights::for_style(style).combine(&metrics);

    RoomCandidate {
        region: region.id,
        bounding_box: region.bounding_box,
        area: region.area,
        metrics,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{BorderKind, RegionTree};
    use approx::assert_relative_eq;
    use imageproc::point::Point;

    const ALL_STYLES: [BlueprintStyle; 6] = [
        BlueprintStyle::CleanCad,
        BlueprintStyle::DetailedCad,
        BlueprintStyle::SimpleLineDrawing,
        BlueprintStyle::DetailedLineDrawing,
        BlueprintStyle::Scanned,
        BlueprintStyle::MixedStyle,
    ];

    fn region(points: Vec<(i32, i32)>) -> Region {
        let points = points.into_iter().map(|(x, y)| Point::new(x, y)).collect();
        let tree = RegionTree::from_borders(vec![(points, None, BorderKind::Outer)]);
        tree.get(0).cloned().unwrap()
    }

    #[test]
    fn test_aspect_score_curve() {
        assert_relative_eq!(aspect_score(1.0), 1.0);
        assert_relative_eq!(aspect_score(3.0), 1.0);
        assert_relative_eq!(aspect_score(5.5), 0.75);
        assert_relative_eq!(aspect_score(8.0), 0.5);
        assert_relative_eq!(aspect_score(8.01), 0.0);
        assert_relative_eq!(aspect_score(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_aspect_score_monotonic_for_every_style() {
        let metrics = |aspect: f64| ShapeMetrics {
            solidity_score: 1.0,
            extent_score: 1.0,
            aspect_score: aspect_score(aspect),
            size_score: 1.0,
            ..Default::default()
        };

        for style in ALL_STYLES {
            let weights = ScoreWeights::for_style(style);
            let mut previous = f64::INFINITY;
            let mut aspect = 3.0;
            while aspect < 12.0 {
                let score = weights.combine(&metrics(aspect));
                assert!(score <= previous + 1e-12, "{style} not monotonic at {aspect}");
                previous = score;
                aspect += 0.25;
            }
            // The aspect component contributes nothing beyond 8
            let beyond = weights.combine(&metrics(9.0));
            let zero = weights.combine(&ShapeMetrics {
                aspect_score: 0.0,
                ..metrics(9.0)
            });
            assert_relative_eq!(beyond, zero);
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        for style in ALL_STYLES {
            let w = ScoreWeights::for_style(style);
            assert_relative_eq!(w.solidity + w.extent + w.aspect + w.size, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rectangle_metrics() {
        let config = DetectionConfig::default();
        let rect = region(vec![(0, 0), (200, 0), (200, 100), (0, 100)]);
        let metrics = shape_metrics(&rect, &config);

        assert_relative_eq!(metrics.solidity, 1.0);
        // Border through pixel centres: 200x100 inside a 201x101 box
        assert_relative_eq!(metrics.extent, 20000.0 / (201.0 * 101.0));
        assert_relative_eq!(metrics.aspect_ratio, 201.0 / 101.0);
        assert_relative_eq!(metrics.size_score, 1.0);
    }

    #[test]
    fn test_concave_shape_has_low_solidity() {
        let config = DetectionConfig::default();
        // L shape
        let l_shape = region(vec![(0, 0), (100, 0), (100, 10), (10, 10), (10, 100), (0, 100)]);
        let metrics = shape_metrics(&l_shape, &config);
        assert!(metrics.solidity < 0.5);
        assert_relative_eq!(metrics.size_score, 0.5);
    }

    #[test]
    fn test_cad_weights_tolerate_hollow_outlines() {
        let config = DetectionConfig::default();
        let l_shape = region(vec![(0, 0), (100, 0), (100, 10), (10, 10), (10, 100), (0, 100)]);

        let cad = score_region(&l_shape, BlueprintStyle::CleanCad, &config);
        let sketch = score_region(&l_shape, BlueprintStyle::SimpleLineDrawing, &config);
        assert!(cad.confidence > sketch.confidence);
        assert_eq!(cad.region, 0);
    }
}

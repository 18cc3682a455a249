// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room extraction from a conditioned mask

use crate::config::{DetectionConfig, ParameterSet};
use crate::filter::{filter_by_scale, rank_and_truncate, remove_duplicates};
use crate::hierarchy::{select_candidates, RegionTree};
use crate::normalize::normalize_all;
use crate::scoring::score_region;
use crate::types::{BlueprintStyle, DetectionStats, Point2D, Room, RoomCandidate, RoomType};
use image::GrayImage;
use tracing::{debug, info};

/// Rooms plus the counters gathered while extracting them
#[derive(Debug, Clone, Default)]
pub struct RoomExtraction {
    pub rooms: Vec<Room>,
    pub stats: DetectionStats,
}

/// Extract rooms from a mask (open space 255, walls 0).
///
/// # Arguments
///
/// * `mask` - Conditioned binary mask
/// * `style` - Blueprint style, selects the scoring weights
/// * `params` - Effective parameters (area floor, solidity gate)
/// * `config` - Global extraction constants
pub fn extract_rooms(
    mask: &GrayImage,
    style: BlueprintStyle,
    params: &ParameterSet,
    config: &DetectionConfig,
) -> Vec<Room> {
    extract_rooms_with_stats(mask, style, params, config).rooms
}

/// Same as [`extract_rooms`], keeping the per-stage counters.
pub fn extract_rooms_with_stats(
    mask: &GrayImage,
    style: BlueprintStyle,
    params: &ParameterSet,
    config: &DetectionConfig,
) -> RoomExtraction {
    let mut stats = DetectionStats::default();

    // Step 1: Trace region hierarchy
    let tree = RegionTree::from_mask(mask);
    stats.regions_found = tree.len();

    // Step 2: Candidate selection
    let area_band = (params.min_room_area_pixels(), config.max_room_area_pixels);
    let selection = select_candidates(&tree, area_band, config);
    stats.hierarchy_candidates = selection.from_hierarchy;
    stats.fallback_candidates = selection.from_fallback;

    // Step 3: Dimension gate, scoring and thresholds
    let mut accepted: Vec<RoomCandidate> = Vec::new();
    for region in selection.regions.iter().filter_map(|&id| tree.get(id)) {
        let bbox = region.bounding_box;
        if bbox.width() < config.min_room_dimension || bbox.height() < config.min_room_dimension {
            debug!(
                region = region.id,
                width = bbox.width(),
                height = bbox.height(),
                "rejected: below minimum dimension"
            );
            stats.rejected_dimension += 1;
            continue;
        }

        let candidate = score_region(region, style, config);
        if candidate.metrics.solidity < params.min_solidity() {
            debug!(
                region = region.id,
                solidity = candidate.metrics.solidity,
                "rejected: low solidity"
            );
            stats.rejected_solidity += 1;
            continue;
        }
        if candidate.confidence < config.min_confidence_score {
            debug!(
                region = region.id,
                confidence = candidate.confidence,
                "rejected: low confidence"
            );
            stats.rejected_score += 1;
            continue;
        }

        accepted.push(candidate);
    }
    stats.accepted = accepted.len();

    // Step 4: Plan-level filters
    let (scaled, scale_context) = filter_by_scale(accepted, config.scale_context_min_rooms);
    stats.removed_scale_outliers = scaled.removed;
    stats.scale_context = scale_context;

    let unique = remove_duplicates(scaled.kept, config.iou_threshold);
    stats.removed_duplicates = unique.removed;

    let ranked = rank_and_truncate(unique.kept, config.max_rooms);
    stats.truncated = ranked.removed;

    // Step 5: Build rooms
    let rooms: Vec<Room> = ranked
        .kept
        .into_iter()
        .enumerate()
        .filter_map(|(i, candidate)| {
            let region = tree.get(candidate.region)?;
            let outline: Vec<Point2D> = region
                .points
                .iter()
                .map(|p| Point2D::new(p.x as f64, p.y as f64))
                .collect();
            let epsilon = config.polygon_epsilon_ratio * perimeter(&outline);

            let room_type = if candidate.metrics.aspect_ratio > config.hallway_aspect_ratio {
                RoomType::Hallway
            } else {
                RoomType::Room
            };

            Some(Room {
                id: format!("room_{i:03}"),
                bounding_box: candidate.bounding_box,
                polygon: simplify_polygon(&outline, epsilon),
                area_pixels: candidate.area,
                confidence: candidate.confidence,
                metrics: candidate.metrics,
                room_type,
                blueprint_style: style,
                bounding_box_normalized: [0.0; 4],
                polygon_normalized: Vec::new(),
                area_normalized: 0.0,
            })
        })
        .collect();

    info!(
        regions = stats.regions_found,
        candidates = selection.regions.len(),
        accepted = stats.accepted,
        rooms = rooms.len(),
        "room extraction complete"
    );

    RoomExtraction {
        rooms: normalize_all(rooms, mask.width(), mask.height()),
        stats,
    }
}

/// Length of a closed outline
pub fn perimeter(points: &[Point2D]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.distance_to(b))
        .sum()
}

/// Simplify a closed outline with Douglas-Peucker.
///
/// Index `n` stands for the start point again, so the first span runs the
/// whole ring and splits at the point farthest from the start. Spans are
/// refined from a work stack; the kept points come back in ring order.
pub fn simplify_polygon(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let at = |i: usize| &points[i % n];

    let mut keep = vec![false; n];
    keep[0] = true;
    let mut spans = vec![(0, n)];

    while let Some((start, end)) = spans.pop() {
        if end - start < 2 {
            continue;
        }
        let (first, last) = (at(start), at(end));
        let (split, max_dist) = (start + 1..end)
            .map(|i| (i, perpendicular_distance(at(i), first, last)))
            .fold((start, 0.0), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        if max_dist > epsilon {
            keep[split] = true;
            spans.push((start, split));
            spans.push((split, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}

/// Distance from a point to the line through two others (to the start point
/// when they coincide)
fn perpendicular_distance(point: &Point2D, line_start: &Point2D, line_end: &Point2D) -> f64 {
    let direction = line_end.to_nalgebra() - line_start.to_nalgebra();
    let offset = point.to_nalgebra() - line_start.to_nalgebra();
    let length = direction.norm();
    if length < 1e-5 {
        return offset.norm();
    }
    (offset.x * direction.y - offset.y * direction.x).abs() / length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterOverrides;
    use image::Luma;

    /// Walls (0) over `[5, w-5) × [5, h-5)` with white rooms carved out
    fn plan(width: u32, height: u32, rooms: &[[u32; 4]]) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let in_block = x >= 5 && x < width - 5 && y >= 5 && y < height - 5;
            let in_room = rooms
                .iter()
                .any(|r| x >= r[0] && x < r[2] && y >= r[1] && y < r[3]);
            if in_block && !in_room {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn test_simplify_drops_jitter() {
        let outline = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.1),
            Point2D::new(2.0, -0.1),
            Point2D::new(3.0, 0.0),
            Point2D::new(4.0, 0.0),
            Point2D::new(4.0, 4.0),
            Point2D::new(0.0, 4.0),
        ];

        let simplified = simplify_polygon(&outline, 0.5);
        assert_eq!(simplified, vec![outline[0], outline[4], outline[5], outline[6]]);
    }

    #[test]
    fn test_perpendicular_distance() {
        let point = Point2D::new(5.0, 5.0);
        let start = Point2D::new(0.0, 0.0);
        let end = Point2D::new(10.0, 0.0);

        let dist = perpendicular_distance(&point, &start, &end);
        assert!((dist - 5.0).abs() < 0.001);
        // Degenerate line
        assert!((perpendicular_distance(&point, &start, &start) - 50f64.sqrt()).abs() < 0.001);
    }

    #[test]
    fn test_simplify_closed_ring() {
        // Border of a 10x4 rectangle, one point per pixel
        let mut outline = Vec::new();
        outline.extend((0..10).map(|x| Point2D::new(x as f64, 0.0)));
        outline.extend((0..4).map(|y| Point2D::new(10.0, y as f64)));
        outline.extend((1..=10).rev().map(|x| Point2D::new(x as f64, 4.0)));
        outline.extend((1..=4).rev().map(|y| Point2D::new(0.0, y as f64)));

        let polygon = simplify_polygon(&outline, 0.5);
        assert_eq!(
            polygon,
            vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(10.0, 0.0),
                Point2D::new(10.0, 4.0),
                Point2D::new(0.0, 4.0),
            ]
        );
        assert!((perimeter(&polygon) - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_rooms() {
        let mask = plan(400, 300, &[[20, 20, 130, 280], [140, 20, 250, 280], [260, 20, 380, 280]]);
        let extraction = extract_rooms_with_stats(
            &mask,
            BlueprintStyle::CleanCad,
            &ParameterSet::default(),
            &DetectionConfig::default(),
        );
        let rooms = &extraction.rooms;

        assert_eq!(rooms.len(), 3);
        assert_eq!(extraction.stats.hierarchy_candidates, 3);
        assert_eq!(extraction.stats.fallback_candidates, 0);

        // Largest first
        assert_eq!(rooms[0].id, "room_000");
        assert_eq!(rooms[0].bounding_box.to_array(), [260, 20, 380, 280]);
        for room in rooms {
            assert_eq!(room.polygon.len(), 4);
            assert_eq!(room.room_type, RoomType::Room);
            assert!(room.confidence >= 0.3);
            assert!(room.bounding_box_normalized.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_hallway_classification() {
        let mask = plan(600, 300, &[[20, 20, 400, 80], [420, 20, 580, 280]]);
        let config = DetectionConfig {
            // Keep the building outline out of the size scan
            max_room_area_pixels: 150_000.0,
            ..Default::default()
        };
        let rooms = extract_rooms(&mask, BlueprintStyle::CleanCad, &ParameterSet::default(), &config);

        assert_eq!(rooms.len(), 2);
        let hallway = rooms
            .iter()
            .find(|r| r.bounding_box.to_array() == [20, 20, 400, 80])
            .expect("hallway detected");
        assert_eq!(hallway.room_type, RoomType::Hallway);
        assert!(rooms.iter().any(|r| r.room_type == RoomType::Room));
    }

    #[test]
    fn test_narrow_closet_rejected() {
        let mask = plan(400, 300, &[[20, 20, 180, 280], [190, 20, 350, 280], [360, 20, 390, 280]]);
        let extraction = extract_rooms_with_stats(
            &mask,
            BlueprintStyle::CleanCad,
            &ParameterSet::default(),
            &DetectionConfig::default(),
        );

        assert_eq!(extraction.stats.rejected_dimension, 1);
        assert_eq!(extraction.rooms.len(), 2);
        assert!(extraction.rooms.iter().all(|r| r.bounding_box.width() >= 50));
    }

    #[test]
    fn test_solidity_gate() {
        // L-shaped room plus two rectangles
        let mask = plan(
            400,
            300,
            &[[20, 20, 100, 280], [100, 20, 200, 100], [210, 20, 380, 140], [210, 150, 380, 280]],
        );
        let config = DetectionConfig::default();

        let lenient = extract_rooms_with_stats(&mask, BlueprintStyle::CleanCad, &ParameterSet::default(), &config);
        assert_eq!(lenient.rooms.len(), 3);
        assert_eq!(lenient.stats.rejected_solidity, 0);

        let strict_params = ParameterSet::default()
            .merge(&ParameterOverrides {
                min_solidity: Some(0.9),
                ..Default::default()
            })
            .unwrap();
        let strict = extract_rooms_with_stats(&mask, BlueprintStyle::CleanCad, &strict_params, &config);
        assert_eq!(strict.stats.rejected_solidity, 1);
        assert_eq!(strict.rooms.len(), 2);
        assert!(strict.rooms.iter().all(|r| r.metrics.solidity >= 0.9));
    }

    #[test]
    fn test_solid_walls_yield_nothing() {
        let mask = GrayImage::new(200, 200);
        let extraction = extract_rooms_with_stats(
            &mask,
            BlueprintStyle::Scanned,
            &ParameterSet::default(),
            &DetectionConfig::default(),
        );
        assert!(extraction.rooms.is_empty());
        assert_eq!(extraction.stats.regions_found, 0);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Doorway detection and room connectivity
//!
//! Two detectors run over the pre-fill mask (space 255, walls 0):
//! - door swing arcs, found with a gradient Hough circle transform and kept
//!   only when the circle is partially drawn
//! - wall breaks, the narrow passages of open space that vanish under an
//!   opening wider than the largest door, measured along the wall they
//!   interrupt
//!
//! Detections are merged by proximity, mapped to the rooms whose boundary
//! they sit on, and capped relative to the room count.

use crate::config::DoorwayConfig;
use crate::hierarchy::polygon_area;
use crate::image_ops::{canny_edges, erode, invert, kernel_radius, morphological_open, subtract, KernelShape};
use crate::normalize::normalize_all;
use crate::types::{BoundingBox, Doorway, DoorwayGeometry, DoorwayKind, Point2D, Room};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::point::Point;
use std::cmp::Ordering;
use std::f64::consts::PI;
use tracing::{debug, info, warn};

/// Half-width of the radius window used to score a circle's support
const RADIUS_WINDOW: i64 = 2;

/// Minimum ratio of interrupted wall run to break span
const GAP_ELONGATION: f64 = 1.5;

/// Circle found by the Hough transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point2D,
    pub radius: f64,
    pub votes: u32,
}

/// Detect doorways in a pre-fill mask.
///
/// # Arguments
///
/// * `mask` - Binary mask, open space 255 and walls 0
/// * `rooms` - Finalized rooms for connectivity mapping, if any
/// * `config` - Doorway detection parameters
///
/// # Returns
///
/// Doorways ordered by confidence, with ids and normalized coordinates
pub fn detect_doorways(mask: &GrayImage, rooms: Option<&[Room]>, config: &DoorwayConfig) -> Vec<Doorway> {
    let arcs = detect_arcs(mask, config);
    let gaps = detect_gaps(mask, config);
    debug!(arcs = arcs.len(), gaps = gaps.len(), "raw doorway detections");

    let mut doorways = arcs;
    doorways.extend(gaps);
    let mut doorways = deduplicate(doorways, config.dedup_radius);

    let rooms = rooms.filter(|r| !r.is_empty());
    if let Some(rooms) = rooms {
        doorways = connect_rooms(doorways, rooms, config);
        if config.require_room_proximity {
            let before = doorways.len();
            doorways.retain(|d| !d.connects_rooms.is_empty());
            debug!(dropped = before - doorways.len(), "dropped doorways away from rooms");
        }
    }

    let limit = match rooms {
        Some(rooms) => rooms.len() * config.max_doorways_per_room,
        None => config.max_doorways_without_rooms,
    };
    let doorways = cap_doorways(doorways, limit);

    let doorways: Vec<Doorway> = doorways
        .into_iter()
        .enumerate()
        .map(|(i, door)| Doorway {
            id: format!("door_{i:03}"),
            ..door
        })
        .collect();

    info!(doorways = doorways.len(), "doorway detection complete");
    normalize_all(doorways, mask.width(), mask.height())
}

fn new_doorway(
    kind: DoorwayKind,
    center: Point2D,
    geometry: DoorwayGeometry,
    confidence: f64,
    bounding_box: BoundingBox,
) -> Doorway {
    Doorway {
        id: String::new(),
        center,
        kind,
        geometry,
        confidence,
        bounding_box,
        connects_rooms: Vec::new(),
        center_normalized: [0.0; 2],
        bounding_box_normalized: [0.0; 4],
        radius_normalized: None,
    }
}

// ─── Arc detection ───

/// Door swing arcs: partially drawn circles in the wall layer.
pub fn detect_arcs(mask: &GrayImage, config: &DoorwayConfig) -> Vec<Doorway> {
    let strokes = invert(mask);
    let edges = canny_edges(&strokes);

    hough_circles(&edges, &strokes, config)
        .into_iter()
        .filter_map(|circle| {
            let coverage = arc_coverage(&strokes, &circle.center, circle.radius, config.arc_samples);
            let accepted = is_partial_arc(coverage, config);
            debug!(
                x = circle.center.x,
                y = circle.center.y,
                radius = circle.radius,
                votes = circle.votes,
                coverage,
                accepted,
                "circle candidate"
            );
            if !accepted {
                return None;
            }

            let r = circle.radius;
            let (cx, cy) = (circle.center.x, circle.center.y);
            let bbox = BoundingBox::new(
                (cx - r).round() as i32,
                (cy - r).round() as i32,
                (cx + r).round() as i32,
                (cy + r).round() as i32,
            );
            Some(new_doorway(
                DoorwayKind::Arc,
                circle.center,
                DoorwayGeometry::Arc { radius: r },
                config.arc_confidence,
                bbox,
            ))
        })
        .collect()
}

/// Coverage strictly inside the configured band
pub fn is_partial_arc(coverage: f64, config: &DoorwayConfig) -> bool {
    coverage > config.min_arc_coverage && coverage < config.max_arc_coverage
}

/// Fraction of evenly spaced perimeter samples that land on a stroke.
///
/// A sample counts when any pixel of its 3×3 neighbourhood is set.
pub fn arc_coverage(strokes: &GrayImage, center: &Point2D, radius: f64, samples: usize) -> f64 {
    if samples == 0 {
        return 0.0;
    }
    let (width, height) = (strokes.width() as i64, strokes.height() as i64);

    let hits = (0..samples)
        .filter(|&i| {
            let angle = 2.0 * PI * i as f64 / samples as f64;
            let px = (center.x + radius * angle.cos()).round() as i64;
            let py = (center.y + radius * angle.sin()).round() as i64;

            (-1..=1).any(|dy| {
                (-1..=1).any(|dx| {
                    let (x, y) = (px + dx, py + dy);
                    x >= 0
                        && y >= 0
                        && x < width
                        && y < height
                        && strokes.get_pixel(x as u32, y as u32).0[0] > 0
                })
            })
        })
        .count();

    hits as f64 / samples as f64
}

/// Gradient Hough circle transform.
///
/// Every edge pixel votes along its gradient line, both ways, at each radius
/// of the configured band. Accumulator peaks with enough votes become
/// centres (strongest first, at least `hough_min_distance` apart); each
/// centre takes the radius with the most edge support.
pub fn hough_circles(edges: &GrayImage, source: &GrayImage, config: &DoorwayConfig) -> Vec<Circle> {
    let (width, height) = edges.dimensions();
    if width < 3 || height < 3 {
        return Vec::new();
    }

    let gx = horizontal_sobel(source);
    let gy = vertical_sobel(source);

    let w = width as i64;
    let h = height as i64;
    let mut accumulator = vec![0u32; (width * height) as usize];
    let mut edge_points: Vec<(i64, i64)> = Vec::new();

    // Vote
    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        edge_points.push((x as i64, y as i64));

        let dx = gx.get_pixel(x, y).0[0] as f64;
        let dy = gy.get_pixel(x, y).0[0] as f64;
        let magnitude = dx.hypot(dy);
        if magnitude < 1e-6 {
            continue;
        }
        let (ux, uy) = (dx / magnitude, dy / magnitude);

        for r in config.min_arc_radius..=config.max_arc_radius {
            for sign in [-1.0, 1.0] {
                let cx = (x as f64 + sign * r as f64 * ux).round() as i64;
                let cy = (y as f64 + sign * r as f64 * uy).round() as i64;
                if cx >= 0 && cy >= 0 && cx < w && cy < h {
                    accumulator[(cy * w + cx) as usize] += 1;
                }
            }
        }
    }

    // Local maxima above threshold
    let mut peaks: Vec<(i64, i64, u32)> = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let votes = accumulator[(y * w + x) as usize];
            if votes < config.hough_vote_threshold {
                continue;
            }
            let is_peak = (-1..=1).all(|dy| {
                (-1..=1).all(|dx| accumulator[((y + dy) * w + (x + dx)) as usize] <= votes)
            });
            if is_peak {
                peaks.push((x, y, votes));
            }
        }
    }
    peaks.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)).then(a.0.cmp(&b.0)));

    let mut circles: Vec<Circle> = Vec::new();
    for (x, y, votes) in peaks {
        let center = Point2D::new(x as f64, y as f64);
        if circles
            .iter()
            .any(|c| c.center.distance_to(&center) < config.hough_min_distance)
        {
            continue;
        }
        if let Some(radius) = estimate_radius(&edge_points, &center, config) {
            circles.push(Circle {
                center,
                radius,
                votes,
            });
        }
    }

    circles
}

/// Radius in band whose ±2 px ring holds the most edge pixels.
fn estimate_radius(edge_points: &[(i64, i64)], center: &Point2D, config: &DoorwayConfig) -> Option<f64> {
    let min_r = config.min_arc_radius as i64;
    let max_r = config.max_arc_radius as i64;
    let mut histogram = vec![0u32; (max_r + RADIUS_WINDOW + 1) as usize];

    for &(x, y) in edge_points {
        let d = Point2D::new(x as f64, y as f64).distance_to(center).round() as i64;
        if d >= min_r - RADIUS_WINDOW && d <= max_r + RADIUS_WINDOW && d >= 0 {
            histogram[d as usize] += 1;
        }
    }

    let mut best: Option<(i64, u32)> = None;
    for r in min_r..=max_r {
        let lo = (r - RADIUS_WINDOW).max(0) as usize;
        let hi = (r + RADIUS_WINDOW) as usize;
        let support: u32 = histogram[lo..=hi].iter().sum();
        if best.map_or(true, |(_, s)| support > s) {
            best = Some((r, support));
        }
    }

    best.filter(|&(_, support)| support >= config.hough_vote_threshold)
        .map(|(r, _)| r as f64)
}

// ─── Gap detection ───

/// A wall break measured against the wall it interrupts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallOpening {
    /// Extent along the wall (the door width)
    pub span: f64,
    /// Extent through the wall (the wall thickness)
    pub depth: f64,
    /// Unbroken wall on both sides of the break plus the break itself
    pub wall_run: f64,
}

/// Wall breaks: open space narrower than the widest door.
///
/// Breaks are the open space removed by a square opening just wider than
/// `max_door_width`, eroded by `gap_detection_kernel` to drop slivers. Each
/// is measured against its wall: the span along the wall must be door
/// sized, the depth through it no more than the widest door, and the
/// interrupted wall run longer than 1.5 spans.
pub fn detect_gaps(mask: &GrayImage, config: &DoorwayConfig) -> Vec<Doorway> {
    // Odd square kernel just wider than the widest door
    let bridge_size = (config.max_door_width.ceil() as u32) | 1;
    let opened = morphological_open(mask, KernelShape::Rect, bridge_size);
    let breaks = subtract(mask, &opened);
    let eroded = erode(&breaks, KernelShape::Rect, config.gap_detection_kernel);
    let grow = kernel_radius(config.gap_detection_kernel) as i32;

    find_contours::<i32>(&eroded)
        .into_iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .filter_map(|contour| {
            let area = polygon_area(&contour.points);
            if area < config.min_gap_area {
                return None;
            }

            // Traced extent, grown back by the erosion
            let traced = BoundingBox::from_pixels(contour.points.iter().map(|p| (p.x, p.y)))?;
            let bbox = BoundingBox::new(
                traced.x_min - grow,
                traced.y_min - grow,
                traced.x_max + grow,
                traced.y_max + grow,
            );

            let opening = measure_opening(mask, &bbox)?;
            let door_sized = opening.span >= config.min_door_width && opening.span <= config.max_door_width;
            let accepted = door_sized
                && opening.depth <= config.max_door_width
                && opening.wall_run > opening.span * GAP_ELONGATION;
            debug!(
                x_min = bbox.x_min,
                y_min = bbox.y_min,
                span = opening.span,
                depth = opening.depth,
                wall_run = opening.wall_run,
                accepted,
                "wall break candidate"
            );
            if !accepted {
                return None;
            }

            let center = polygon_centroid(&contour.points).unwrap_or_else(|| bbox.center());
            Some(new_doorway(
                DoorwayKind::Gap,
                center,
                DoorwayGeometry::Gap {
                    width: opening.span,
                    length: opening.depth,
                },
                config.gap_confidence,
                bbox,
            ))
        })
        .collect()
}

/// Measure a break box against the wall around it.
///
/// Probes one pixel past each side on the box's centre lines. The wall runs
/// along the axis whose two ends are wall, and both sides across that axis
/// must be open. Returns `None` for any other arrangement (pockets closed on
/// all sides, corners, narrow corridors).
pub fn measure_opening(mask: &GrayImage, bbox: &BoundingBox) -> Option<WallOpening> {
    let cx = (bbox.x_min + bbox.x_max - 1) / 2;
    let cy = (bbox.y_min + bbox.y_max - 1) / 2;
    let width = bbox.width() as f64;
    let height = bbox.height() as f64;

    let left = (bbox.x_min - 1, cy);
    let right = (bbox.x_max, cy);
    let top = (cx, bbox.y_min - 1);
    let bottom = (cx, bbox.y_max);
    let wall = |(x, y): (i32, i32)| is_wall(mask, x, y);

    if wall(left) && wall(right) && !wall(top) && !wall(bottom) {
        // Horizontal wall
        let run = wall_run(mask, left, (-1, 0)) + wall_run(mask, right, (1, 0));
        Some(WallOpening {
            span: width,
            depth: height,
            wall_run: run + width,
        })
    } else if wall(top) && wall(bottom) && !wall(left) && !wall(right) {
        // Vertical wall
        let run = wall_run(mask, top, (0, -1)) + wall_run(mask, bottom, (0, 1));
        Some(WallOpening {
            span: height,
            depth: width,
            wall_run: run + height,
        })
    } else {
        None
    }
}

/// Wall pixel (mask value 0) inside the image
fn is_wall(mask: &GrayImage, x: i32, y: i32) -> bool {
    x >= 0
        && y >= 0
        && (x as u32) < mask.width()
        && (y as u32) < mask.height()
        && mask.get_pixel(x as u32, y as u32).0[0] == 0
}

/// Consecutive wall pixels from `start` in direction `step`
fn wall_run(mask: &GrayImage, start: (i32, i32), step: (i32, i32)) -> f64 {
    let (mut x, mut y) = start;
    let mut run = 0u32;
    while is_wall(mask, x, y) {
        run += 1;
        x += step.0;
        y += step.1;
    }
    run as f64
}

/// Area centroid of a closed polygon; `None` when degenerate
fn polygon_centroid(points: &[Point<i32>]) -> Option<Point2D> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let (mut a, mut cx, mut cy) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let cross = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
        a += cross;
        cx += (p.x + q.x) as f64 * cross;
        cy += (p.y + q.y) as f64 * cross;
    }

    if a.abs() < 1e-9 {
        return None;
    }
    Some(Point2D::new(cx / (3.0 * a), cy / (3.0 * a)))
}

// ─── Merging and connectivity ───

fn by_confidence_desc(a: &Doorway, b: &Doorway) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
}

/// Keep the most confident doorway among centres closer than `radius`.
pub fn deduplicate(mut doorways: Vec<Doorway>, radius: f64) -> Vec<Doorway> {
    doorways.sort_by(by_confidence_desc);

    let mut kept: Vec<Doorway> = Vec::with_capacity(doorways.len());
    for door in doorways {
        if !kept.iter().any(|k| k.center.distance_to(&door.center) < radius) {
            kept.push(door);
        }
    }
    kept
}

/// Whether `center` lies in `bbox` grown by `margin` and within `margin`
/// of one of its edges.
pub fn touches_boundary(center: &Point2D, bbox: &BoundingBox, margin: f64) -> bool {
    let (x1, y1) = (bbox.x_min as f64, bbox.y_min as f64);
    let (x2, y2) = (bbox.x_max as f64, bbox.y_max as f64);

    let inside = center.x >= x1 - margin
        && center.x <= x2 + margin
        && center.y >= y1 - margin
        && center.y <= y2 + margin;

    inside
        && ((center.x - x1).abs() < margin
            || (center.x - x2).abs() < margin
            || (center.y - y1).abs() < margin
            || (center.y - y2).abs() < margin)
}

/// Record the rooms each doorway opens onto.
///
/// A wall break goes through the wall, so its centre sits half the wall
/// depth away from either room; its margin grows by that much. Doorways touching no
/// room lose half their confidence.
pub fn connect_rooms(doorways: Vec<Doorway>, rooms: &[Room], config: &DoorwayConfig) -> Vec<Doorway> {
    doorways
        .into_iter()
        .map(|door| {
            let margin = match door.geometry {
                DoorwayGeometry::Gap { length, .. } => config.room_margin + length / 2.0,
                DoorwayGeometry::Arc { .. } => config.room_margin,
            };

            let connects_rooms: Vec<String> = rooms
                .iter()
                .filter(|room| touches_boundary(&door.center, &room.bounding_box, margin))
                .map(|room| room.id.clone())
                .collect();

            let confidence = if connects_rooms.is_empty() {
                door.confidence * 0.5
            } else {
                door.confidence
            };

            Doorway {
                connects_rooms,
                confidence,
                ..door
            }
        })
        .collect()
}

/// Keep at most `limit` doorways, highest confidence first.
pub fn cap_doorways(mut doorways: Vec<Doorway>, limit: usize) -> Vec<Doorway> {
    if doorways.len() > limit {
        warn!(
            found = doorways.len(),
            limit, "too many doorways, keeping the most confident"
        );
        doorways.sort_by(by_confidence_desc);
        doorways.truncate(limit);
    }
    doorways
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for room and doorway detection

use crate::config::{DetectionMode, ParameterSet};
use nalgebra::Point2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D point (simplified for serialization)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        nalgebra::distance(&self.to_nalgebra(), &other.to_nalgebra())
    }
}

/// Axis-aligned pixel rectangle, `max` exclusive (`x_max = x + w`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    pub fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Tight box around integer pixel coordinates; `max` is one past the last pixel.
    pub fn from_pixels<I>(pixels: I) -> Option<Self>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut iter = pixels.into_iter();
        let (x0, y0) = iter.next()?;
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (x0, y0, x0, y0);
        for (x, y) in iter {
            x_min = x_min.min(x);
            y_min = y_min.min(y);
            x_max = x_max.max(x);
            y_max = y_max.max(y);
        }
        Some(Self::new(x_min, y_min, x_max + 1, y_max + 1))
    }

    pub fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> i32 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width().max(0) as f64 * self.height().max(0) as f64
    }

    /// `max(w, h) / min(w, h)`, infinite for degenerate boxes.
    pub fn aspect_ratio(&self) -> f64 {
        let w = self.width() as f64;
        let h = self.height() as f64;
        let short = w.min(h);
        if short <= 0.0 {
            f64::INFINITY
        } else {
            w.max(h) / short
        }
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(
            (self.x_min + self.x_max) as f64 / 2.0,
            (self.y_min + self.y_max) as f64 / 2.0,
        )
    }

    /// Intersection area divided by union area.
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f64 {
        let ix_min = self.x_min.max(other.x_min);
        let iy_min = self.y_min.max(other.y_min);
        let ix_max = self.x_max.min(other.x_max);
        let iy_max = self.y_max.min(other.y_max);

        if ix_max <= ix_min || iy_max <= iy_min {
            return 0.0;
        }

        let intersection = (ix_max - ix_min) as f64 * (iy_max - iy_min) as f64;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    pub fn to_array(&self) -> [i32; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from(b: [i32; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

/// Visual style of a blueprint, used to pick processing parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintStyle {
    CleanCad,
    DetailedCad,
    SimpleLineDrawing,
    DetailedLineDrawing,
    Scanned,
    MixedStyle,
}

impl BlueprintStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlueprintStyle::CleanCad => "clean_cad",
            BlueprintStyle::DetailedCad => "detailed_cad",
            BlueprintStyle::SimpleLineDrawing => "simple_line_drawing",
            BlueprintStyle::DetailedLineDrawing => "detailed_line_drawing",
            BlueprintStyle::Scanned => "scanned",
            BlueprintStyle::MixedStyle => "mixed_style",
        }
    }

    pub fn is_cad(&self) -> bool {
        matches!(self, BlueprintStyle::CleanCad | BlueprintStyle::DetailedCad)
    }

    pub fn is_line_drawing(&self) -> bool {
        matches!(
            self,
            BlueprintStyle::SimpleLineDrawing | BlueprintStyle::DetailedLineDrawing
        )
    }
}

impl fmt::Display for BlueprintStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural characteristics measured on a grayscale raster
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StyleProfile {
    pub style: BlueprintStyle,
    /// Estimated wall thickness in pixels
    pub wall_thickness: f64,
    /// Fraction of pixels on edges (0.0 - 1.0)
    pub line_density: f64,
    /// Intensity standard deviation / 128
    pub contrast: f64,
    /// Laplacian variance, normalized and clipped to 0.0 - 1.0
    pub noise: f64,
}

/// Shape-quality metrics and their component scores
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ShapeMetrics {
    pub solidity: f64,
    pub extent: f64,
    pub aspect_ratio: f64,
    pub solidity_score: f64,
    pub extent_score: f64,
    pub aspect_score: f64,
    pub size_score: f64,
}

/// A scored region that may still be dropped by later filters
#[derive(Debug, Clone, PartialEq)]
pub struct RoomCandidate {
    /// Index of the source region in its [`crate::hierarchy::RegionTree`]
    pub region: usize,
    pub bounding_box: BoundingBox,
    /// Enclosed area of the traced border (px²)
    pub area: f64,
    pub metrics: ShapeMetrics,
    /// Weighted confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// Room classification by elongation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Room,
    Hallway,
}

/// Final detected room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    /// Stable identifier (`room_000`, ...)
    pub id: String,
    pub bounding_box: BoundingBox,
    /// Simplified boundary polygon in pixels
    pub polygon: Vec<Point2D>,
    /// Enclosed area in square pixels
    pub area_pixels: f64,
    pub confidence: f64,
    pub metrics: ShapeMetrics,
    pub room_type: RoomType,
    pub blueprint_style: BlueprintStyle,
    /// `[x_min, y_min, x_max, y_max]` in 0.0 - 1.0, 4 decimals
    pub bounding_box_normalized: [f64; 4],
    pub polygon_normalized: Vec<[f64; 2]>,
    pub area_normalized: f64,
}

/// How a doorway was found
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoorwayKind {
    Arc,
    Gap,
}

/// Detection-specific geometry of a doorway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DoorwayGeometry {
    /// Door swing arc; `radius` ≈ door leaf width
    Arc { radius: f64 },
    /// Wall break; `width` runs along the wall, `length` through it
    Gap { width: f64, length: f64 },
}

/// Detected doorway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doorway {
    /// `door_000`, ... (assigned after final ordering)
    pub id: String,
    pub center: Point2D,
    pub kind: DoorwayKind,
    pub geometry: DoorwayGeometry,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    /// Ids of rooms whose boundary this doorway touches
    pub connects_rooms: Vec<String>,
    pub center_normalized: [f64; 2],
    pub bounding_box_normalized: [f64; 4],
    /// Arc radius relative to image width
    pub radius_normalized: Option<f64>,
}

impl Doorway {
    pub fn radius(&self) -> Option<f64> {
        match self.geometry {
            DoorwayGeometry::Arc { radius } => Some(radius),
            DoorwayGeometry::Gap { .. } => None,
        }
    }
}

/// Size distribution of accepted rooms
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ScaleContext {
    pub median_area: f64,
    pub std_area: f64,
    pub min_reasonable_area: f64,
    pub outlier_threshold: f64,
}

/// Counters collected while extracting rooms
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DetectionStats {
    pub regions_found: usize,
    pub hierarchy_candidates: usize,
    pub fallback_candidates: usize,
    pub rejected_dimension: usize,
    pub rejected_solidity: usize,
    pub rejected_score: usize,
    pub accepted: usize,
    pub removed_scale_outliers: usize,
    pub removed_duplicates: usize,
    pub truncated: usize,
    pub scale_context: Option<ScaleContext>,
}

/// Complete detection result for one raster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorPlanDetection {
    pub rooms: Vec<Room>,
    pub doorways: Vec<Doorway>,
    pub profile: StyleProfile,
    pub parameters: ParameterSet,
    pub mode: DetectionMode,
    pub stats: DetectionStats,
    /// Size of the raster the geometry refers to
    pub image_width: u32,
    pub image_height: u32,
    /// Size of the raster handed to the pipeline
    pub original_width: u32,
    pub original_height: u32,
    /// `original_height / image_height`
    pub scale_factor: f64,
}

impl FloorPlanDetection {
    /// Rooms reachable from each room through a single doorway
    pub fn adjacency(&self) -> FxHashMap<String, Vec<String>> {
        let mut graph: FxHashMap<String, Vec<String>> = self
            .rooms
            .iter()
            .map(|room| (room.id.clone(), Vec::new()))
            .collect();

        for door in &self.doorways {
            for a in &door.connects_rooms {
                for b in &door.connects_rooms {
                    if a == b {
                        continue;
                    }
                    let neighbors = graph.entry(a.clone()).or_default();
                    if !neighbors.contains(b) {
                        neighbors.push(b.clone());
                    }
                }
            }
        }

        graph
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }
}

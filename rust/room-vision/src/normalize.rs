// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pixel ↔ normalized coordinate conversion
//!
//! Normalized values are fractions of the image width (x) and height (y),
//! rounded to 4 decimals. Normalizing only reads pixel fields, so applying
//! it twice gives the same entity.

use crate::types::{BoundingBox, Doorway, Point2D, Room};

const COORD_DECIMALS: i32 = 4;
const AREA_DECIMALS: i32 = 6;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn dims(width: u32, height: u32) -> (f64, f64) {
    (width.max(1) as f64, height.max(1) as f64)
}

/// `[x_min, y_min, x_max, y_max]` as fractions of the image size
pub fn normalize_box(bbox: &BoundingBox, width: u32, height: u32) -> [f64; 4] {
    let (w, h) = dims(width, height);
    [
        round_to(bbox.x_min as f64 / w, COORD_DECIMALS),
        round_to(bbox.y_min as f64 / h, COORD_DECIMALS),
        round_to(bbox.x_max as f64 / w, COORD_DECIMALS),
        round_to(bbox.y_max as f64 / h, COORD_DECIMALS),
    ]
}

pub fn normalize_point(point: &Point2D, width: u32, height: u32) -> [f64; 2] {
    let (w, h) = dims(width, height);
    [
        round_to(point.x / w, COORD_DECIMALS),
        round_to(point.y / h, COORD_DECIMALS),
    ]
}

/// Pixel rectangle for a normalized box on a `width`×`height` canvas
pub fn denormalize_box(normalized: [f64; 4], width: u32, height: u32) -> BoundingBox {
    let (w, h) = (width as f64, height as f64);
    BoundingBox::new(
        (normalized[0] * w).round() as i32,
        (normalized[1] * h).round() as i32,
        (normalized[2] * w).round() as i32,
        (normalized[3] * h).round() as i32,
    )
}

/// Entities that carry a normalized view of their pixel geometry
pub trait Normalize {
    /// Fill the normalized fields from the pixel fields.
    fn normalize(self, width: u32, height: u32) -> Self;
}

impl Normalize for Room {
    fn normalize(self, width: u32, height: u32) -> Self {
        let bounding_box_normalized = normalize_box(&self.bounding_box, width, height);
        let polygon_normalized = self
            .polygon
            .iter()
            .map(|p| normalize_point(p, width, height))
            .collect();
        let norm_w = bounding_box_normalized[2] - bounding_box_normalized[0];
        let norm_h = bounding_box_normalized[3] - bounding_box_normalized[1];

        Room {
            bounding_box_normalized,
            polygon_normalized,
            area_normalized: round_to(norm_w * norm_h, AREA_DECIMALS),
            ..self
        }
    }
}

impl Normalize for Doorway {
    fn normalize(self, width: u32, height: u32) -> Self {
        let radius_normalized = self
            .radius()
            .map(|r| round_to(r / width.max(1) as f64, COORD_DECIMALS));

        Doorway {
            center_normalized: normalize_point(&self.center, width, height),
            bounding_box_normalized: normalize_box(&self.bounding_box, width, height),
            radius_normalized,
            ..self
        }
    }
}

/// Normalize a batch of entities against one image size.
pub fn normalize_all<T: Normalize>(items: Vec<T>, width: u32, height: u32) -> Vec<T> {
    items
        .into_iter()
        .map(|item| item.normalize(width, height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlueprintStyle, DoorwayGeometry, DoorwayKind, RoomType, ShapeMetrics};
    use approx::assert_relative_eq;

    fn room(bbox: [i32; 4]) -> Room {
        let bounding_box = BoundingBox::from(bbox);
        Room {
            id: "room_000".to_string(),
            bounding_box,
            polygon: vec![
                Point2D::new(bbox[0] as f64, bbox[1] as f64),
                Point2D::new(bbox[2] as f64, bbox[3] as f64),
            ],
            area_pixels: bounding_box.area(),
            confidence: 0.9,
            metrics: ShapeMetrics::default(),
            room_type: RoomType::Room,
            blueprint_style: BlueprintStyle::CleanCad,
            bounding_box_normalized: [0.0; 4],
            polygon_normalized: Vec::new(),
            area_normalized: 0.0,
        }
    }

    #[test]
    fn test_normalize_room() {
        let normalized = room([400, 100, 1000, 500]).normalize(2000, 1500);
        assert_eq!(normalized.bounding_box_normalized, [0.2, 0.0667, 0.5, 0.3333]);
        assert_relative_eq!(normalized.area_normalized, 0.079980, epsilon = 1e-9);
        assert_eq!(normalized.polygon_normalized[1], [0.5, 0.3333]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = room([123, 45, 678, 910]).normalize(1234, 987);
        let twice = once.clone().normalize(1234, 987);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_denormalize_recovers_pixels() {
        let (w, h) = (1999, 1333);
        for bbox in [[0, 0, 1999, 1333], [17, 911, 643, 1200], [1500, 3, 1998, 4]] {
            let original = BoundingBox::from(bbox);
            let back = denormalize_box(normalize_box(&original, w, h), w, h);
            for (a, b) in original.to_array().iter().zip(back.to_array()) {
                assert!((a - b).abs() <= 1, "{original:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn test_normalize_arc_doorway() {
        let door = Doorway {
            id: "door_000".to_string(),
            center: Point2D::new(500.0, 300.0),
            kind: DoorwayKind::Arc,
            geometry: DoorwayGeometry::Arc { radius: 40.0 },
            confidence: 0.8,
            bounding_box: BoundingBox::new(460, 260, 540, 340),
            connects_rooms: Vec::new(),
            center_normalized: [0.0; 2],
            bounding_box_normalized: [0.0; 4],
            radius_normalized: None,
        }
        .normalize(1000, 600);

        assert_eq!(door.center_normalized, [0.5, 0.5]);
        assert_eq!(door.radius_normalized, Some(0.04));
        assert_eq!(door.bounding_box_normalized, [0.46, 0.4333, 0.54, 0.5667]);
    }
}

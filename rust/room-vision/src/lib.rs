// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adaptive room and doorway detection for raster floor plans
//!
//! This crate provides a complete pipeline for:
//! 1. Profiling the drawing style of a floor plan (wall thickness, line
//!    density, contrast, noise) and deriving processing parameters from it
//! 2. Conditioning the raster into a binary wall/space mask
//! 3. Extracting rooms from the nested region hierarchy of that mask,
//!    scored and filtered against the plan's own room-size scale
//! 4. Detecting doorways (swing arcs and wall breaks) and the rooms they
//!    connect
//!
//! # Usage
//!
//! ```rust,ignore
//! use roomview_vision::{detect_floor_plan, DetectionConfig, DetectionMode};
//!
//! let raster = image::open("plan.png")?.to_luma8();
//! let detection = detect_floor_plan(&raster, &DetectionConfig::default(), DetectionMode::Adaptive)?;
//!
//! for room in &detection.rooms {
//!     println!("{} {:?} {:.0} px²", room.id, room.room_type, room.area_pixels);
//! }
//! let graph = detection.adjacency();
//! ```

pub mod conditioner;
pub mod config;
pub mod doorway;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod image_ops;
pub mod normalize;
pub mod room_detector;
pub mod scoring;
pub mod style;
pub mod types;

// Re-export commonly used types and functions
pub use conditioner::{condition, ConditionedMask};
pub use config::{DetectionConfig, DetectionMode, DoorwayConfig, ParameterOverrides, ParameterSet, PRESET_NAMES};
pub use doorway::detect_doorways;
pub use error::{Error, Result};
pub use image_ops::rgba_to_grayscale;
pub use normalize::{denormalize_box, normalize_all, Normalize};
pub use room_detector::{extract_rooms, extract_rooms_with_stats, RoomExtraction};
pub use style::{analyze_style, profile_style};
pub use types::{
    BlueprintStyle, BoundingBox, DetectionStats, Doorway, DoorwayGeometry, DoorwayKind, FloorPlanDetection,
    Point2D, Room, RoomType, ScaleContext, StyleProfile,
};

use image::GrayImage;
use image_ops::resize_to_max_dimension;
use tracing::info;

/// High-level function to detect rooms and doorways in a grayscale raster
///
/// This runs the full detection pipeline:
/// 1. Downscale to `config.max_dimension`
/// 2. Style analysis
/// 3. Parameter selection (adaptive or fixed)
/// 4. Mask conditioning
/// 5. Room extraction
/// 6. Doorway detection and connectivity
///
/// # Arguments
///
/// * `raster` - Grayscale image of the floor plan (dark ink on light paper)
/// * `config` - Detection configuration
/// * `mode` - Where the processing parameters come from
///
/// # Returns
///
/// A `FloorPlanDetection` whose geometry refers to the processed raster
pub fn detect_floor_plan(
    raster: &GrayImage,
    config: &DetectionConfig,
    mode: DetectionMode,
) -> Result<FloorPlanDetection> {
    let (original_width, original_height) = raster.dimensions();
    if original_width == 0 || original_height == 0 {
        return Err(Error::EmptyRaster {
            width: original_width,
            height: original_height,
        });
    }
    config.validate()?;

    // Step 1: Bound the working size
    let (image, scale_factor) = resize_to_max_dimension(raster, config.max_dimension);
    let (width, height) = image.dimensions();

    // Step 2-3: Style and parameters
    let profile = profile_style(&image);
    let parameters = match mode {
        DetectionMode::Adaptive => ParameterSet::for_style(&profile),
        DetectionMode::Fixed(params) => params,
    };
    parameters.validate()?;

    // Step 4: Conditioned mask
    let conditioned = condition(&image, &parameters);

    // Step 5: Rooms
    let RoomExtraction { rooms, stats } =
        extract_rooms_with_stats(&conditioned.mask, profile.style, &parameters, config);

    // Step 6: Doorways on the mask before hollow filling
    let doorways = if config.doorway.enabled {
        detect_doorways(&conditioned.pre_fill, Some(&rooms), &config.doorway)
    } else {
        Vec::new()
    };

    info!(
        style = %profile.style,
        rooms = rooms.len(),
        doorways = doorways.len(),
        width,
        height,
        scale_factor,
        "floor plan detection complete"
    );

    Ok(FloorPlanDetection {
        rooms,
        doorways,
        profile,
        parameters,
        mode,
        stats,
        image_width: width,
        image_height: height,
        original_width,
        original_height,
        scale_factor,
    })
}

/// [`detect_floor_plan`] for an RGBA byte buffer
pub fn detect_floor_plan_from_rgba(
    rgba: &[u8],
    width: u32,
    height: u32,
    config: &DetectionConfig,
    mode: DetectionMode,
) -> Result<FloorPlanDetection> {
    let grayscale = rgba_to_grayscale(rgba, width, height);
    detect_floor_plan(&grayscale, config, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_empty_raster_is_rejected() {
        let result = detect_floor_plan(&GrayImage::new(0, 10), &DetectionConfig::default(), DetectionMode::Adaptive);
        assert!(matches!(result, Err(Error::EmptyRaster { width: 0, height: 10 })));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DetectionConfig {
            min_area_ratio_to_parent: 0.9,
            max_area_ratio_to_parent: 0.5,
            ..Default::default()
        };
        let raster = GrayImage::from_pixel(64, 64, Luma([255]));
        assert!(detect_floor_plan(&raster, &config, DetectionMode::Adaptive).is_err());
    }

    #[test]
    fn test_blank_page_has_no_rooms() {
        let raster = GrayImage::from_pixel(300, 200, Luma([255]));
        let detection = detect_floor_plan(&raster, &DetectionConfig::default(), DetectionMode::Adaptive).unwrap();

        assert!(detection.rooms.is_empty());
        assert!(detection.doorways.is_empty());
        assert_eq!((detection.image_width, detection.image_height), (300, 200));
        assert_eq!(detection.scale_factor, 1.0);
    }

    #[test]
    fn test_rgba_entry_point() {
        let rgba = vec![255u8; 40 * 30 * 4];
        let detection =
            detect_floor_plan_from_rgba(&rgba, 40, 30, &DetectionConfig::default(), DetectionMode::Adaptive).unwrap();
        assert_eq!(detection.original_width, 40);
        assert!(detection.rooms.is_empty());
    }
}

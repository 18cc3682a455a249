// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detection configuration and style-tuned parameter sets
//!
//! Two layers:
//! - [`DetectionConfig`]: global constants for room extraction and doorway
//!   detection (area band, hierarchy ratios, thresholds). Loaded from JSON or
//!   built in code.
//! - [`ParameterSet`]: the image-processing parameters that vary per
//!   blueprint. Either derived from a [`StyleProfile`] (adaptive mode) or
//!   taken from a static preset (fixed mode). Instances are never modified;
//!   [`ParameterSet::merge`] returns a new validated set.

use crate::error::{Error, Result};
use crate::types::{BlueprintStyle, StyleProfile};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Kernel sizes accepted by the conditioner
const KERNEL_SIZE_RANGE: (u32, u32) = (1, 31);

/// Opening kernel bounds applied by the line-density correction
const OPEN_SIZE_CLAMP: (u32, u32) = (2, 11);

/// Names accepted by [`ParameterSet::from_preset`]
pub const PRESET_NAMES: [&str; 4] = ["clean_cad", "detailed_cad", "scanned", "hand_drawn"];

/// Image-processing parameters for one blueprint
///
/// Kernel sizes are side lengths of odd kernels: 1 is the identity and an
/// even size rounds up to the next odd side (2 acts as 3×3, 4 as 5×5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ParameterSet {
    denoise_strength: u32,
    contrast_clip_limit: f64,
    morph_close_size: u32,
    morph_open_size: u32,
    morph_dilate_size: u32,
    min_room_area_pixels: f64,
    min_solidity: f64,
    fill_hollow_rooms: bool,
    remove_text: bool,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            denoise_strength: 10,
            contrast_clip_limit: 2.0,
            morph_close_size: 3,
            morph_open_size: 5,
            morph_dilate_size: 2,
            min_room_area_pixels: 5000.0,
            min_solidity: 0.6,
            fill_hollow_rooms: false,
            remove_text: false,
        }
    }
}

/// Optional replacements for [`ParameterSet`] fields
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParameterOverrides {
    pub denoise_strength: Option<u32>,
    pub contrast_clip_limit: Option<f64>,
    pub morph_close_size: Option<u32>,
    pub morph_open_size: Option<u32>,
    pub morph_dilate_size: Option<u32>,
    pub min_room_area_pixels: Option<f64>,
    pub min_solidity: Option<f64>,
    pub fill_hollow_rooms: Option<bool>,
    pub remove_text: Option<bool>,
}

impl ParameterSet {
    /// Denoising strength (0 disables denoising)
    pub fn denoise_strength(&self) -> u32 {
        self.denoise_strength
    }

    /// CLAHE clip limit
    pub fn contrast_clip_limit(&self) -> f64 {
        self.contrast_clip_limit
    }

    /// Square kernel that bridges small wall gaps
    pub fn morph_close_size(&self) -> u32 {
        self.morph_close_size
    }

    /// Elliptical kernel that erases sub-wall detail
    pub fn morph_open_size(&self) -> u32 {
        self.morph_open_size
    }

    /// Square kernel that thickens walls before tracing
    pub fn morph_dilate_size(&self) -> u32 {
        self.morph_dilate_size
    }

    pub fn min_room_area_pixels(&self) -> f64 {
        self.min_room_area_pixels
    }

    pub fn min_solidity(&self) -> f64 {
        self.min_solidity
    }

    /// Merge double-line wall outlines into solid walls
    pub fn fill_hollow_rooms(&self) -> bool {
        self.fill_hollow_rooms
    }

    /// Erase text-like components before region extraction
    pub fn remove_text(&self) -> bool {
        self.remove_text
    }

    /// Derive parameters from a measured style profile.
    ///
    /// Starts from per-style base values, then nudges the opening kernel by
    /// line density and the minimum room area by wall thickness.
    pub fn for_style(profile: &StyleProfile) -> Self {
        let base = Self::default();
        let mut params = match profile.style {
            BlueprintStyle::CleanCad => Self {
                morph_open_size: 3,
                min_room_area_pixels: 4000.0,
                denoise_strength: 5,
                morph_close_size: 7,
                fill_hollow_rooms: true,
                ..base
            },
            BlueprintStyle::DetailedCad => Self {
                morph_open_size: 9,
                min_room_area_pixels: 8000.0,
                denoise_strength: 10,
                fill_hollow_rooms: true,
                ..base
            },
            BlueprintStyle::SimpleLineDrawing => Self {
                morph_open_size: 2,
                min_room_area_pixels: 3000.0,
                morph_close_size: 5,
                denoise_strength: 5,
                ..base
            },
            BlueprintStyle::DetailedLineDrawing => Self {
                morph_open_size: 5,
                min_room_area_pixels: 5000.0,
                morph_close_size: 4,
                ..base
            },
            BlueprintStyle::Scanned => Self {
                morph_open_size: 6,
                denoise_strength: 15,
                min_room_area_pixels: 6000.0,
                ..base
            },
            BlueprintStyle::MixedStyle => base,
        };

        if profile.line_density > 0.08 {
            params.morph_open_size = (params.morph_open_size + 2).min(OPEN_SIZE_CLAMP.1);
        } else if profile.line_density < 0.03 {
            params.morph_open_size = params
                .morph_open_size
                .saturating_sub(2)
                .max(OPEN_SIZE_CLAMP.0);
        }

        // Thick walls are never mistaken for rooms, so smaller rooms are safe.
        if profile.wall_thickness > 10.0 {
            params.min_room_area_pixels = (params.min_room_area_pixels * 0.8).floor();
        } else if profile.wall_thickness < 5.0 {
            params.min_room_area_pixels = (params.min_room_area_pixels * 1.2).floor();
        }

        // Filled CAD walls leave hollow outlines with low solidity.
        params.min_solidity = if profile.style.is_cad() { 0.2 } else { 0.3 };

        debug!(
            style = %profile.style,
            open = params.morph_open_size,
            close = params.morph_close_size,
            min_area = params.min_room_area_pixels,
            "derived adaptive parameters"
        );

        params
    }

    /// Static parameters for a named preset.
    pub fn from_preset(name: &str) -> Result<Self> {
        let overrides = preset_overrides(name)?;
        Self::default().merge(&overrides)
    }

    /// Return a new set with the given fields replaced, validated.
    pub fn merge(&self, overrides: &ParameterOverrides) -> Result<Self> {
        let merged = Self {
            denoise_strength: overrides.denoise_strength.unwrap_or(self.denoise_strength),
            contrast_clip_limit: overrides
                .contrast_clip_limit
                .unwrap_or(self.contrast_clip_limit),
            morph_close_size: overrides.morph_close_size.unwrap_or(self.morph_close_size),
            morph_open_size: overrides.morph_open_size.unwrap_or(self.morph_open_size),
            morph_dilate_size: overrides.morph_dilate_size.unwrap_or(self.morph_dilate_size),
            min_room_area_pixels: overrides
                .min_room_area_pixels
                .unwrap_or(self.min_room_area_pixels),
            min_solidity: overrides.min_solidity.unwrap_or(self.min_solidity),
            fill_hollow_rooms: overrides.fill_hollow_rooms.unwrap_or(self.fill_hollow_rooms),
            remove_text: overrides.remove_text.unwrap_or(self.remove_text),
        };
        merged.validate()?;
        Ok(merged)
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        let (kmin, kmax) = KERNEL_SIZE_RANGE;
        for (name, value) in [
            ("morph_close_size", self.morph_close_size),
            ("morph_open_size", self.morph_open_size),
            ("morph_dilate_size", self.morph_dilate_size),
        ] {
            check_range(name, value as f64, kmin as f64, kmax as f64)?;
        }
        check_range("denoise_strength", self.denoise_strength as f64, 0.0, 30.0)?;
        check_range("contrast_clip_limit", self.contrast_clip_limit, 0.1, 40.0)?;
        check_range("min_room_area_pixels", self.min_room_area_pixels, 1.0, 1e9)?;
        check_range("min_solidity", self.min_solidity, 0.0, 1.0)?;
        Ok(())
    }
}

fn preset_overrides(name: &str) -> Result<ParameterOverrides> {
    let overrides = match name {
        "clean_cad" => ParameterOverrides {
            morph_open_size: Some(3),
            min_room_area_pixels: Some(5000.0),
            min_solidity: Some(0.6),
            ..Default::default()
        },
        "detailed_cad" => ParameterOverrides {
            morph_open_size: Some(7),
            min_room_area_pixels: Some(8000.0),
            min_solidity: Some(0.7),
            ..Default::default()
        },
        "scanned" => ParameterOverrides {
            denoise_strength: Some(15),
            morph_open_size: Some(5),
            min_room_area_pixels: Some(6000.0),
            min_solidity: Some(0.5),
            remove_text: Some(true),
            ..Default::default()
        },
        "hand_drawn" => ParameterOverrides {
            morph_open_size: Some(4),
            min_room_area_pixels: Some(4000.0),
            min_solidity: Some(0.4),
            remove_text: Some(true),
            ..Default::default()
        },
        other => {
            return Err(Error::UnknownPreset {
                name: other.to_string(),
                available: PRESET_NAMES.join(", "),
            })
        }
    };
    Ok(overrides)
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_nan() || value < min || value > max {
        return Err(Error::out_of_range(name, value, min, max));
    }
    Ok(())
}

fn check_order(lower: &'static str, lower_value: f64, upper: &'static str, upper_value: f64) -> Result<()> {
    if lower_value >= upper_value {
        return Err(Error::InvalidRange {
            lower,
            lower_value,
            upper,
            upper_value,
        });
    }
    Ok(())
}

/// How the [`ParameterSet`] for a run is produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", content = "parameters", rename_all = "lowercase")]
pub enum DetectionMode {
    /// Derive parameters from the analysed style
    Adaptive,
    /// Use the given parameters as-is
    Fixed(ParameterSet),
}

impl Default for DetectionMode {
    fn default() -> Self {
        DetectionMode::Adaptive
    }
}

/// Configuration for doorway detection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DoorwayConfig {
    /// Run doorway detection at all
    pub enabled: bool,
    /// Door width band for wall breaks (pixels)
    pub min_door_width: f64,
    pub max_door_width: f64,
    /// Radius band for door swing arcs (pixels)
    pub min_arc_radius: u32,
    pub max_arc_radius: u32,
    /// Square kernel used to erode the break layer
    pub gap_detection_kernel: u32,
    /// Breaks smaller than this (px²) are noise
    pub min_gap_area: f64,
    /// Accepted fraction of the circle covered by edges (exclusive bounds)
    pub min_arc_coverage: f64,
    pub max_arc_coverage: f64,
    /// Perimeter samples for the coverage test
    pub arc_samples: usize,
    /// Minimum accumulator votes for a circle centre
    pub hough_vote_threshold: u32,
    /// Minimum distance between circle centres (pixels)
    pub hough_min_distance: f64,
    /// Centres closer than this are the same doorway (pixels)
    pub dedup_radius: f64,
    /// Room bounding-box expansion for connectivity (pixels)
    pub room_margin: f64,
    /// Drop doorways that touch no room
    pub require_room_proximity: bool,
    pub max_doorways_per_room: usize,
    /// Cap when no rooms are supplied
    pub max_doorways_without_rooms: usize,
    pub arc_confidence: f64,
    pub gap_confidence: f64,
}

impl Default for DoorwayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_door_width: 20.0,
            max_door_width: 60.0,
            min_arc_radius: 25,
            max_arc_radius: 50,
            gap_detection_kernel: 3,
            min_gap_area: 100.0,
            min_arc_coverage: 0.20,
            max_arc_coverage: 0.45,
            arc_samples: 36,
            hough_vote_threshold: 15,
            hough_min_distance: 30.0,
            dedup_radius: 20.0,
            room_margin: 10.0,
            require_room_proximity: true,
            max_doorways_per_room: 6,
            max_doorways_without_rooms: 50,
            arc_confidence: 0.8,
            gap_confidence: 0.5,
        }
    }
}

impl DoorwayConfig {
    pub fn validate(&self) -> Result<()> {
        check_range("min_door_width", self.min_door_width, 1.0, 1e4)?;
        check_order("min_door_width", self.min_door_width, "max_door_width", self.max_door_width)?;
        check_range("min_arc_radius", self.min_arc_radius as f64, 1.0, 1e4)?;
        check_order(
            "min_arc_radius",
            self.min_arc_radius as f64,
            "max_arc_radius",
            self.max_arc_radius as f64,
        )?;
        check_range(
            "gap_detection_kernel",
            self.gap_detection_kernel as f64,
            KERNEL_SIZE_RANGE.0 as f64,
            KERNEL_SIZE_RANGE.1 as f64,
        )?;
        check_range("min_arc_coverage", self.min_arc_coverage, 0.0, 1.0)?;
        check_range("max_arc_coverage", self.max_arc_coverage, 0.0, 1.0)?;
        check_order(
            "min_arc_coverage",
            self.min_arc_coverage,
            "max_arc_coverage",
            self.max_arc_coverage,
        )?;
        check_range("arc_samples", self.arc_samples as f64, 4.0, 3600.0)?;
        check_range("arc_confidence", self.arc_confidence, 0.0, 1.0)?;
        check_range("gap_confidence", self.gap_confidence, 0.0, 1.0)?;
        check_range("room_margin", self.room_margin, 0.0, 1e4)?;
        Ok(())
    }
}

/// Configuration for room extraction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Upper bound of the room area band (square pixels); the lower bound
    /// comes from [`ParameterSet::min_room_area_pixels`]
    pub max_room_area_pixels: f64,
    /// Minimum bounding-box width and height (pixels)
    pub min_room_dimension: i32,
    /// Aspect ratio above which a room is a hallway
    pub hallway_aspect_ratio: f64,
    /// Accepted room/parent area ratio (exclusive bounds)
    pub min_area_ratio_to_parent: f64,
    pub max_area_ratio_to_parent: f64,
    /// Score below which a candidate is rejected
    pub min_confidence_score: f64,
    /// Area band that earns the full size score
    pub typical_room_area_min: f64,
    pub typical_room_area_max: f64,
    /// Overlap ratio above which the weaker room is a duplicate
    pub iou_threshold: f64,
    pub max_rooms: usize,
    /// Run the flat size scan when the hierarchy yields fewer candidates
    pub min_candidates_before_fallback: usize,
    /// Scale-context filtering needs at least this many rooms
    pub scale_context_min_rooms: usize,
    /// Polygon simplification tolerance as a fraction of the perimeter
    pub polygon_epsilon_ratio: f64,
    /// Longest raster side after preparation (pixels)
    pub max_dimension: u32,
    pub doorway: DoorwayConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_room_area_pixels: 500_000.0,
            min_room_dimension: 50,
            hallway_aspect_ratio: 4.0,
            min_area_ratio_to_parent: 0.05,
            max_area_ratio_to_parent: 0.85,
            min_confidence_score: 0.3,
            typical_room_area_min: 5000.0,
            typical_room_area_max: 100_000.0,
            iou_threshold: 0.5,
            max_rooms: 50,
            min_candidates_before_fallback: 3,
            scale_context_min_rooms: 4,
            polygon_epsilon_ratio: 0.005,
            max_dimension: 2000,
            doorway: DoorwayConfig::default(),
        }
    }
}

impl DetectionConfig {
    /// Parse and validate a JSON configuration; missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DetectionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Copy of this config with the preset's extraction overrides applied.
    pub fn with_preset(&self, name: &str) -> Result<Self> {
        // Validates the name even for presets without extraction overrides.
        preset_overrides(name)?;
        let mut config = self.clone();
        if name == "detailed_cad" {
            config.min_area_ratio_to_parent = 0.10;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_range("max_room_area_pixels", self.max_room_area_pixels, 1.0, 1e12)?;
        check_range("min_room_dimension", self.min_room_dimension as f64, 1.0, 1e5)?;
        check_range("hallway_aspect_ratio", self.hallway_aspect_ratio, 1.0, 100.0)?;
        check_range("min_area_ratio_to_parent", self.min_area_ratio_to_parent, 0.0, 1.0)?;
        check_range("max_area_ratio_to_parent", self.max_area_ratio_to_parent, 0.0, 1.0)?;
        check_order(
            "min_area_ratio_to_parent",
            self.min_area_ratio_to_parent,
            "max_area_ratio_to_parent",
            self.max_area_ratio_to_parent,
        )?;
        check_range("min_confidence_score", self.min_confidence_score, 0.0, 1.0)?;
        check_order(
            "typical_room_area_min",
            self.typical_room_area_min,
            "typical_room_area_max",
            self.typical_room_area_max,
        )?;
        check_range("iou_threshold", self.iou_threshold, 0.0, 1.0)?;
        check_range("max_rooms", self.max_rooms as f64, 1.0, 1e6)?;
        check_range("polygon_epsilon_ratio", self.polygon_epsilon_ratio, 0.0, 0.5)?;
        check_range("max_dimension", self.max_dimension as f64, 16.0, 1e5)?;
        self.doorway.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(style: BlueprintStyle, wall_thickness: f64, line_density: f64) -> StyleProfile {
        StyleProfile {
            style,
            wall_thickness,
            line_density,
            contrast: 0.8,
            noise: 0.1,
        }
    }

    #[test]
    fn test_clean_cad_parameters() {
        let params = ParameterSet::for_style(&profile(BlueprintStyle::CleanCad, 9.0, 0.04));
        assert_eq!(params.morph_open_size(), 3);
        assert_eq!(params.morph_close_size(), 7);
        assert!(params.fill_hollow_rooms());
        assert_eq!(params.min_room_area_pixels(), 4000.0);
        assert_eq!(params.min_solidity(), 0.2);
    }

    #[test]
    fn test_line_density_correction_is_clamped() {
        // Dense detail pushes the opening kernel up, capped at 11
        let dense = ParameterSet::for_style(&profile(BlueprintStyle::DetailedCad, 9.0, 0.2));
        assert_eq!(dense.morph_open_size(), 11);

        // Sparse lines pull it down, floored at 2
        let sparse =
            ParameterSet::for_style(&profile(BlueprintStyle::SimpleLineDrawing, 6.0, 0.01));
        assert_eq!(sparse.morph_open_size(), 2);
        assert_eq!(sparse.min_solidity(), 0.3);
    }

    #[test]
    fn test_wall_thickness_scales_min_area() {
        let thick = ParameterSet::for_style(&profile(BlueprintStyle::DetailedCad, 14.0, 0.06));
        assert_eq!(thick.min_room_area_pixels(), 6400.0);

        let thin = ParameterSet::for_style(&profile(BlueprintStyle::DetailedLineDrawing, 3.0, 0.06));
        assert_eq!(thin.min_room_area_pixels(), 6000.0);
    }

    #[test]
    fn test_merge_returns_new_instance() {
        let base = ParameterSet::default();
        let merged = base
            .merge(&ParameterOverrides {
                morph_open_size: Some(9),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(base.morph_open_size(), 5);
        assert_eq!(merged.morph_open_size(), 9);
        assert_eq!(merged.morph_close_size(), base.morph_close_size());
    }

    #[test]
    fn test_merge_rejects_out_of_range() {
        let err = ParameterSet::default()
            .merge(&ParameterOverrides {
                min_solidity: Some(1.5),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ParameterOutOfRange {
                name: "min_solidity",
                ..
            }
        ));

        assert!(ParameterSet::default()
            .merge(&ParameterOverrides {
                morph_open_size: Some(0),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn test_presets() {
        let detailed = ParameterSet::from_preset("detailed_cad").unwrap();
        assert_eq!(detailed.morph_open_size(), 7);
        assert_eq!(detailed.min_solidity(), 0.7);

        let scanned = ParameterSet::from_preset("scanned").unwrap();
        assert!(scanned.remove_text());

        let err = ParameterSet::from_preset("watercolor").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("watercolor"));
        assert!(message.contains("hand_drawn"));
    }

    #[test]
    fn test_detection_config_preset() {
        let config = DetectionConfig::default().with_preset("detailed_cad").unwrap();
        assert_eq!(config.min_area_ratio_to_parent, 0.10);
        assert!(DetectionConfig::default().with_preset("nope").is_err());
    }

    #[test]
    fn test_detection_config_from_json() {
        let config = DetectionConfig::from_json(r#"{"max_rooms": 10, "doorway": {"room_margin": 15.0}}"#)
            .unwrap();
        assert_eq!(config.max_rooms, 10);
        assert_eq!(config.doorway.room_margin, 15.0);
        assert_eq!(config.iou_threshold, 0.5);

        let err = DetectionConfig::from_json(
            r#"{"min_area_ratio_to_parent": 0.9, "max_area_ratio_to_parent": 0.5}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }));

        assert!(matches!(
            DetectionConfig::from_json("{not json"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_detection_mode_serialization() {
        let json = serde_json::to_string(&DetectionMode::Adaptive).unwrap();
        assert_eq!(json, r#"{"mode":"adaptive"}"#);
    }
}

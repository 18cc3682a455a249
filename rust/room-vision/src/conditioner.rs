// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adaptive image conditioning
//!
//! Turns a grayscale raster into a binary mask where open space is 255 and
//! walls are 0. Morphology runs on the wall layer so that "close" bridges
//! wall gaps and "open" erases strokes thinner than a wall.

use crate::config::ParameterSet;
use crate::hierarchy::polygon_area;
use crate::image_ops::{
    clahe, denoise, dilate, invert, morphological_close, morphological_open, otsu_level,
    threshold_inverse, KernelShape,
};
use image::{GrayImage, Luma};
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Square kernel that merges double-line wall outlines (15×15 applied twice)
const HOLLOW_FILL_SIZE: u32 = 29;

/// Wall components that look like text labels
const TEXT_AREA_RANGE: (usize, usize) = (100, 3000);
const TEXT_MIN_ASPECT: f64 = 3.0;
const TEXT_MAX_SOLIDITY: f64 = 0.6;

/// Output of [`condition`]
#[derive(Debug, Clone)]
pub struct ConditionedMask {
    /// Final mask for region extraction (space 255, walls 0)
    pub mask: GrayImage,
    /// Mask before hollow filling and wall reinforcement, used for doorways
    pub pre_fill: GrayImage,
}

/// Run the conditioning pipeline with the given parameters.
pub fn condition(image: &GrayImage, params: &ParameterSet) -> ConditionedMask {
    // ─── Step 1: Noise reduction ───
    let denoised = denoise(image, params.denoise_strength());

    // ─── Step 2: Local contrast ───
    let enhanced = clahe(&denoised, params.contrast_clip_limit());

    // ─── Step 3: Binarize (walls 255) ───
    let level = otsu_level(&enhanced);
    let walls = threshold_inverse(&enhanced, level);

    // ─── Step 4: Bridge small wall gaps ───
    let walls = morphological_close(&walls, KernelShape::Rect, params.morph_close_size());

    // ─── Step 5: Erase sub-wall detail ───
    let mut walls = morphological_open(&walls, KernelShape::Ellipse, params.morph_open_size());

    if params.remove_text() {
        walls = remove_text_regions(&walls);
    }

    let pre_fill = invert(&walls);

    // ─── Step 6: Hollow fill ───
    if params.fill_hollow_rooms() {
        walls = morphological_close(&walls, KernelShape::Rect, HOLLOW_FILL_SIZE);
    }

    // ─── Step 7: Reinforce walls ───
    let walls = dilate(&walls, KernelShape::Rect, params.morph_dilate_size());

    debug!(
        otsu_level = level,
        close = params.morph_close_size(),
        open = params.morph_open_size(),
        dilate = params.morph_dilate_size(),
        hollow_fill = params.fill_hollow_rooms(),
        "conditioned mask"
    );

    ConditionedMask {
        mask: invert(&walls),
        pre_fill,
    }
}

#[derive(Default)]
struct ComponentStats {
    area: usize,
    x_min: u32,
    y_min: u32,
    x_max: u32,
    y_max: u32,
    pixels: Vec<Point<i32>>,
}

/// Erase small, elongated, sparse wall components (text labels).
pub fn remove_text_regions(walls: &GrayImage) -> GrayImage {
    let labels = connected_components(walls, Connectivity::Eight, Luma([0u8]));

    let mut components: FxHashMap<u32, ComponentStats> = FxHashMap::default();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0];
        if label == 0 {
            continue;
        }
        let stats = components.entry(label).or_insert_with(|| ComponentStats {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
            ..Default::default()
        });
        stats.area += 1;
        stats.x_min = stats.x_min.min(x);
        stats.y_min = stats.y_min.min(y);
        stats.x_max = stats.x_max.max(x);
        stats.y_max = stats.y_max.max(y);
        if stats.area <= TEXT_AREA_RANGE.1 {
            stats.pixels.push(Point::new(x as i32, y as i32));
        }
    }

    let text_labels: FxHashSet<u32> = components
        .iter()
        .filter(|(_, stats)| is_text_like(stats))
        .map(|(&label, _)| label)
        .collect();

    if text_labels.is_empty() {
        return walls.clone();
    }

    let mut filtered = walls.clone();
    for (x, y, label) in labels.enumerate_pixels() {
        if text_labels.contains(&label.0[0]) {
            filtered.put_pixel(x, y, Luma([0]));
        }
    }

    debug!(removed = text_labels.len(), "removed text-like regions");
    filtered
}

fn is_text_like(stats: &ComponentStats) -> bool {
    if stats.area < TEXT_AREA_RANGE.0 || stats.area > TEXT_AREA_RANGE.1 {
        return false;
    }

    let w = (stats.x_max - stats.x_min + 1) as f64;
    let h = (stats.y_max - stats.y_min + 1) as f64;
    if w.max(h) / w.min(h) < TEXT_MIN_ASPECT {
        return false;
    }

    let hull = imageproc::geometry::convex_hull(stats.pixels.as_slice());
    let hull_area = polygon_area(&hull);
    // Collinear pixels have no hull area; a straight bar is not text
    if hull_area <= 0.0 {
        return false;
    }
    let solidity = (stats.area as f64 / hull_area).min(1.0);
    solidity <= TEXT_MAX_SOLIDITY
}

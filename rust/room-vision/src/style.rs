// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Blueprint style analysis
//!
//! Measures wall thickness, line density, contrast and noise on a grayscale
//! raster, classifies the drawing style and derives the [`ParameterSet`] used
//! by the rest of the pipeline. Every estimator falls back to a conservative
//! default when the raster carries no evidence, so analysis never fails.

use crate::config::ParameterSet;
use crate::image_ops::{canny_edges, count_nonzero, laplacian, mean_std, median};
use crate::types::{BlueprintStyle, BoundingBox, StyleProfile};
use image::GrayImage;
use imageproc::distance_transform::Norm;
use tracing::{debug, info};

/// Thickness reported when the raster has no edges
pub const DEFAULT_WALL_THICKNESS: f64 = 5.0;

/// Filled-pixel band that marks the wall-thickness dilation step
const FILL_BAND: (f64, f64) = (0.05, 0.15);
/// Dilation steps tried, and the pixel width attributed to each
const MAX_DILATION_STEPS: u8 = 14;
const PIXELS_PER_STEP: f64 = 3.0;
/// Edge contours sampled by the thickness fallback
const FALLBACK_CONTOUR_SAMPLE: usize = 50;

const THICK_WALL_PX: f64 = 8.0;
const DENSE_LINES: f64 = 0.05;
const NOISY: f64 = 0.3;

/// Analyze a raster and derive its adaptive parameters.
pub fn analyze_style(image: &GrayImage) -> (StyleProfile, ParameterSet) {
    let profile = profile_style(image);
    let params = ParameterSet::for_style(&profile);
    (profile, params)
}

/// Measure the style profile of a raster.
pub fn profile_style(image: &GrayImage) -> StyleProfile {
    let edges = canny_edges(image);

    let wall_thickness = estimate_wall_thickness(&edges);
    let line_density = estimate_line_density(&edges);
    let contrast = estimate_contrast(image);
    let noise = estimate_noise(image);
    let style = classify_style(wall_thickness, line_density, noise);

    info!(
        %style,
        wall_thickness,
        line_density,
        contrast,
        noise,
        "analyzed blueprint style"
    );

    StyleProfile {
        style,
        wall_thickness,
        line_density,
        contrast,
        noise,
    }
}

/// Estimate wall thickness in pixels from a binary edge map.
///
/// Dilates the edges step by step; the first step whose filled ratio enters
/// the 5-15% band gives the thickness. Falls back to the median short side
/// of the first edge contours.
pub fn estimate_wall_thickness(edges: &GrayImage) -> f64 {
    let total = edges.width() as f64 * edges.height() as f64;
    if total == 0.0 || count_nonzero(edges) == 0 {
        return DEFAULT_WALL_THICKNESS;
    }

    for step in 1..=MAX_DILATION_STEPS {
        // `step` iterations of a 3x3 square kernel
        let dilated = imageproc::morphology::dilate(edges, Norm::LInf, step);
        let filled_ratio = count_nonzero(&dilated) as f64 / total;
        if filled_ratio > FILL_BAND.0 && filled_ratio < FILL_BAND.1 {
            debug!(step, filled_ratio, "thickness band reached");
            return step as f64 * PIXELS_PER_STEP;
        }
    }

    let short_sides: Vec<f64> = imageproc::contours::find_contours::<i32>(edges)
        .iter()
        .take(FALLBACK_CONTOUR_SAMPLE)
        .filter_map(|contour| BoundingBox::from_pixels(contour.points.iter().map(|p| (p.x, p.y))))
        .map(|bbox| bbox.width().min(bbox.height()) as f64)
        .collect();

    median(&short_sides).unwrap_or(DEFAULT_WALL_THICKNESS)
}

/// Fraction of pixels on edges.
pub fn estimate_line_density(edges: &GrayImage) -> f64 {
    let total = edges.width() as f64 * edges.height() as f64;
    if total == 0.0 {
        return 0.0;
    }
    count_nonzero(edges) as f64 / total
}

/// Intensity standard deviation over 128.
pub fn estimate_contrast(image: &GrayImage) -> f64 {
    let (_, std) = mean_std(image.pixels().map(|p| p.0[0] as f64));
    std / 128.0
}

/// Laplacian variance scaled by 1/1000 and clipped to 1.
pub fn estimate_noise(image: &GrayImage) -> f64 {
    let (_, std) = mean_std(laplacian(image).iter().map(|&v| v as f64));
    (std * std / 1000.0).min(1.0)
}

/// Style decision table.
///
/// Thickness and density partition every finite measurement; the noise
/// branches only catch measurements that compare false (NaN).
pub fn classify_style(wall_thickness: f64, line_density: f64, noise: f64) -> BlueprintStyle {
    if wall_thickness > THICK_WALL_PX && line_density < DENSE_LINES {
        BlueprintStyle::CleanCad
    } else if wall_thickness > THICK_WALL_PX && line_density >= DENSE_LINES {
        BlueprintStyle::DetailedCad
    } else if wall_thickness <= THICK_WALL_PX && line_density < DENSE_LINES {
        BlueprintStyle::SimpleLineDrawing
    } else if wall_thickness <= THICK_WALL_PX && line_density >= DENSE_LINES {
        BlueprintStyle::DetailedLineDrawing
    } else if noise > NOISY {
        BlueprintStyle::Scanned
    } else {
        BlueprintStyle::MixedStyle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Luma;

    #[test]
    fn test_classification_partition() {
        assert_eq!(classify_style(10.0, 0.03, 0.0), BlueprintStyle::CleanCad);
        assert_eq!(classify_style(10.0, 0.08, 0.0), BlueprintStyle::DetailedCad);
        assert_eq!(classify_style(6.0, 0.03, 0.9), BlueprintStyle::SimpleLineDrawing);
        assert_eq!(classify_style(6.0, 0.08, 0.9), BlueprintStyle::DetailedLineDrawing);
        // Boundaries: thickness 8 is thin, density 0.05 is dense
        assert_eq!(classify_style(8.0, 0.05, 0.0), BlueprintStyle::DetailedLineDrawing);
    }

    #[test]
    fn test_classification_without_measurements() {
        assert_eq!(classify_style(f64::NAN, f64::NAN, 0.5), BlueprintStyle::Scanned);
        assert_eq!(classify_style(f64::NAN, f64::NAN, 0.1), BlueprintStyle::MixedStyle);
    }

    #[test]
    fn test_uniform_raster_defaults() {
        let img = GrayImage::from_pixel(120, 80, Luma([200]));
        let profile = profile_style(&img);

        assert_relative_eq!(profile.wall_thickness, DEFAULT_WALL_THICKNESS);
        assert_relative_eq!(profile.line_density, 0.0);
        assert_relative_eq!(profile.contrast, 0.0);
        assert_relative_eq!(profile.noise, 0.0);
        assert_eq!(profile.style, BlueprintStyle::SimpleLineDrawing);
    }

    #[test]
    fn test_thickness_from_dilation_band() {
        // One vertical edge line on a 100x100 canvas: a dilation of radius r
        // fills (2r + 1) columns, entering the band at r = 3 (7%).
        let edges = GrayImage::from_fn(100, 100, |x, _| {
            if x == 50 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        assert_relative_eq!(estimate_wall_thickness(&edges), 9.0);
        assert_relative_eq!(estimate_line_density(&edges), 0.01);
    }

    #[test]
    fn test_thickness_fallback_uses_contours() {
        // A 4x4 filled square on a 10x10 canvas already fills 16%
        let edges = GrayImage::from_fn(10, 10, |x, y| {
            if (3..7).contains(&x) && (3..7).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        assert_relative_eq!(estimate_wall_thickness(&edges), 4.0);
    }

    #[test]
    fn test_contrast_of_half_black_image() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([0]) } else { Luma([255]) });
        // std of {0, 255} in equal parts is 127.5
        assert_relative_eq!(estimate_contrast(&img), 127.5 / 128.0, epsilon = 1e-9);
        assert!(estimate_noise(&img) > 0.0);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raster primitives shared by the analyzer, conditioner and doorway detector
//!
//! Binary images follow the `imageproc` convention: foreground 255,
//! background 0. Morphology helpers take kernel *sizes* (side length) and map
//! them to `imageproc` radii.

use image::imageops::FilterType;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;

/// Edge detector thresholds used throughout the crate
pub const CANNY_LOW: f32 = 50.0;
pub const CANNY_HIGH: f32 = 150.0;

/// CLAHE tile grid (tiles per axis)
const CLAHE_GRID: u32 = 8;

/// Bilateral denoising window (pixels per side) and spatial sigma
const DENOISE_WINDOW: u32 = 5;
const DENOISE_SIGMA_SPATIAL: f32 = 1.5;
/// Intensity sigma per unit of denoising strength (grey levels)
const DENOISE_SIGMA_PER_STRENGTH: f32 = 2.5;

/// Structuring element shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    /// Square kernel
    Rect,
    /// Disk kernel
    Ellipse,
}

impl KernelShape {
    fn norm(self) -> Norm {
        match self {
            KernelShape::Rect => Norm::LInf,
            KernelShape::Ellipse => Norm::L2,
        }
    }
}

/// Radius of the centred kernel that covers a `size`×`size` kernel.
///
/// Kernels are odd: size 1 is the identity and even sizes round up to the
/// next odd side (2 → 3×3, 4 → 5×5).
pub fn kernel_radius(size: u32) -> u8 {
    (size / 2).min(u8::MAX as u32) as u8
}

/// Apply Canny edge detection
pub fn canny_edges(image: &GrayImage) -> GrayImage {
    imageproc::edges::canny(image, CANNY_LOW, CANNY_HIGH)
}

/// Edge-preserving (bilateral) denoising; strength 0 leaves the image unchanged.
///
/// The intensity sigma grows with `strength`. Ink/paper steps are far
/// outside it, so strokes keep their width.
pub fn denoise(image: &GrayImage, strength: u32) -> GrayImage {
    if strength == 0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    imageproc::filter::bilateral_filter(
        image,
        DENOISE_WINDOW,
        strength as f32 * DENOISE_SIGMA_PER_STRENGTH,
        DENOISE_SIGMA_SPATIAL,
    )
}

/// Morphological dilation - expands white regions
pub fn dilate(image: &GrayImage, shape: KernelShape, size: u32) -> GrayImage {
    imageproc::morphology::dilate(image, shape.norm(), kernel_radius(size))
}

/// Morphological erosion - shrinks white regions
pub fn erode(image: &GrayImage, shape: KernelShape, size: u32) -> GrayImage {
    imageproc::morphology::erode(image, shape.norm(), kernel_radius(size))
}

/// Morphological closing (dilate then erode) - fills small gaps
pub fn morphological_close(image: &GrayImage, shape: KernelShape, size: u32) -> GrayImage {
    let dilated = dilate(image, shape, size);
    erode(&dilated, shape, size)
}

/// Morphological opening (erode then dilate) - removes small noise
pub fn morphological_open(image: &GrayImage, shape: KernelShape, size: u32) -> GrayImage {
    let eroded = erode(image, shape, size);
    dilate(&eroded, shape, size)
}

/// Invert a binary image
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        pixel.0[0] = 255 - pixel.0[0];
    }
    result
}

/// `a AND NOT b` on binary images
pub fn subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut result = a.clone();
    for (out, other) in result.pixels_mut().zip(b.pixels()) {
        if other.0[0] > 0 {
            out.0[0] = 0;
        }
    }
    result
}

/// Number of non-zero pixels
pub fn count_nonzero(image: &GrayImage) -> usize {
    image.pixels().filter(|p| p.0[0] > 0).count()
}

/// Convert RGBA bytes to grayscale image
pub fn rgba_to_grayscale(rgba: &[u8], width: u32, height: u32) -> GrayImage {
    let mut gray = GrayImage::new(width, height);

    for (i, pixel) in gray.pixels_mut().enumerate() {
        let offset = i * 4;
        if let Some(px) = rgba.get(offset..offset + 3) {
            // ITU-R BT.601 luma
            let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            *pixel = Luma([luma.round().clamp(0.0, 255.0) as u8]);
        }
    }

    gray
}

/// Downscale so the longer side is at most `max_dimension`.
///
/// Returns the raster and `original_height / new_height` (1.0 when untouched).
pub fn resize_to_max_dimension(image: &GrayImage, max_dimension: u32) -> (GrayImage, f64) {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= max_dimension || longest == 0 {
        return (image.clone(), 1.0);
    }

    let scale = max_dimension as f64 / longest as f64;
    let new_w = ((w as f64 * scale).round() as u32).max(1);
    let new_h = ((h as f64 * scale).round() as u32).max(1);
    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);

    (resized, h as f64 / new_h as f64)
}

/// Pixels strictly above `level` become background (0), the rest 255.
///
/// Dark ink becomes foreground.
pub fn threshold_inverse(image: &GrayImage, level: u8) -> GrayImage {
    let mut result = GrayImage::new(image.width(), image.height());

    for (out, pixel) in result.pixels_mut().zip(image.pixels()) {
        out.0[0] = if pixel.0[0] > level { 0 } else { 255 };
    }

    result
}

/// Calculate Otsu's optimal threshold level
pub fn otsu_level(image: &GrayImage) -> u8 {
    let mut histogram = [0u32; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = (image.width() as f64) * (image.height() as f64);
    if total_pixels == 0.0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0;
    let mut weight_background = 0.0;
    let mut max_variance = 0.0;
    let mut best_threshold = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }

        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += t as f64 * count as f64;

        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum_total - sum_background) / weight_foreground;

        let variance =
            weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);

        if variance > max_variance {
            max_variance = variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Contrast-limited adaptive histogram equalisation.
///
/// The image is split into an 8×8 grid of tiles; each tile gets a clipped,
/// redistributed histogram LUT and pixels blend the four nearest tile LUTs
/// bilinearly.
pub fn clahe(image: &GrayImage, clip_limit: f64) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let tile_w = width.div_ceil(CLAHE_GRID.min(width));
    let tile_h = height.div_ceil(CLAHE_GRID.min(height));
    // Rounding up the tile size can leave fewer, fully populated tiles
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; (tiles_x * tiles_y) as usize];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts[(ty * tiles_x + tx) as usize] = tile_lut(image, x0, y0, x1, y1, clip_limit);
        }
    }

    let mut result = GrayImage::new(width, height);
    for (x, y, out) in result.enumerate_pixels_mut() {
        let value = image.get_pixel(x, y).0[0] as usize;

        // Position relative to tile centres
        let gx = (x as f64 + 0.5) / tile_w as f64 - 0.5;
        let gy = (y as f64 + 0.5) / tile_h as f64 - 0.5;
        let tx0 = gx.floor().clamp(0.0, (tiles_x - 1) as f64) as u32;
        let ty0 = gy.floor().clamp(0.0, (tiles_y - 1) as f64) as u32;
        let tx1 = (tx0 + 1).min(tiles_x - 1);
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let fx = (gx - tx0 as f64).clamp(0.0, 1.0);
        let fy = (gy - ty0 as f64).clamp(0.0, 1.0);

        let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][value] as f64;
        let top = lut(tx0, ty0) * (1.0 - fx) + lut(tx1, ty0) * fx;
        let bottom = lut(tx0, ty1) * (1.0 - fx) + lut(tx1, ty1) * fx;
        let blended = top * (1.0 - fy) + bottom * fy;

        *out = Luma([blended.round().clamp(0.0, 255.0) as u8]);
    }

    result
}

fn tile_lut(image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f64) -> [u8; 256] {
    let mut histogram = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[image.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let pixels = ((x1 - x0) * (y1 - y0)).max(1);
    let clip = ((clip_limit * pixels as f64 / 256.0) as u32).max(1);

    let mut excess = 0u32;
    for bin in histogram.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in histogram.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u64;
    for (i, &count) in histogram.iter().enumerate() {
        cdf += count as u64;
        lut[i] = ((cdf * 255) / pixels as u64).min(255) as u8;
    }
    lut
}

/// 4-neighbour Laplacian response (border pixels replicate their neighbours).
pub fn laplacian(image: &GrayImage) -> ImageBuffer<Luma<i16>, Vec<i16>> {
    imageproc::filter::laplacian_filter(image)
}

/// Mean and population standard deviation of a sample
pub fn mean_std(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for v in values {
        count += 1;
        sum += v;
        sum_sq += v * v;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// Median of a sample (mean of the middle pair for even lengths)
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

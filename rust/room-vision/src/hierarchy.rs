// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Region hierarchy over a binary mask
//!
//! Borders are traced with Suzuki-Abe border following and stored in an
//! arena: each [`Region`] carries its parent index and the indices of its
//! children, so the containment tree can be walked without pointers.
//! Parents always precede their children in the arena.

use crate::config::DetectionConfig;
use crate::types::BoundingBox;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

/// Whether a border encloses foreground or a hole in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    Outer,
    Hole,
}

impl From<BorderType> for BorderKind {
    fn from(border: BorderType) -> Self {
        match border {
            BorderType::Outer => BorderKind::Outer,
            BorderType::Hole => BorderKind::Hole,
        }
    }
}

/// A traced closed border and its place in the hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: usize,
    pub points: Vec<Point<i32>>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub kind: BorderKind,
    /// Shoelace area of the border (px²)
    pub area: f64,
    pub bounding_box: BoundingBox,
}

impl Region {
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena of regions indexed by id
#[derive(Debug, Clone, Default)]
pub struct RegionTree {
    regions: Vec<Region>,
}

impl RegionTree {
    /// Trace every border of the foreground (non-zero) pixels.
    pub fn from_mask(mask: &GrayImage) -> Self {
        let borders = find_contours::<i32>(mask)
            .into_iter()
            .map(|contour| (contour.points, contour.parent, contour.border_type.into()));
        Self::from_borders(borders)
    }

    /// Build a tree from `(points, parent, kind)` triples.
    ///
    /// A parent that does not precede its child is dropped, which keeps the
    /// structure acyclic.
    pub fn from_borders<I>(borders: I) -> Self
    where
        I: IntoIterator<Item = (Vec<Point<i32>>, Option<usize>, BorderKind)>,
    {
        let mut regions: Vec<Region> = Vec::new();

        for (points, parent, kind) in borders {
            let id = regions.len();
            let parent = match parent {
                Some(p) if p < id => Some(p),
                Some(p) => {
                    warn!(region = id, parent = p, "ignoring forward parent reference");
                    None
                }
                None => None,
            };

            let area = polygon_area(&points);
            let bounding_box = BoundingBox::from_pixels(points.iter().map(|p| (p.x, p.y)))
                .unwrap_or(BoundingBox::new(0, 0, 0, 0));

            if let Some(p) = parent {
                regions[p].children.push(id);
            }

            regions.push(Region {
                id,
                points,
                parent,
                children: Vec::new(),
                kind,
                area,
                bounding_box,
            });
        }

        Self { regions }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Region> {
        self.regions.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn roots(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| r.is_top_level())
    }

    pub fn parent(&self, id: usize) -> Option<&Region> {
        self.get(id)?.parent.and_then(|p| self.get(p))
    }

    pub fn children(&self, id: usize) -> impl Iterator<Item = &Region> {
        self.get(id)
            .map(|r| r.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|&c| self.get(c))
    }

    /// Other regions sharing this region's parent, in tracing order
    pub fn siblings(&self, id: usize) -> Vec<usize> {
        let parent = match self.get(id) {
            Some(region) => region.parent,
            None => return Vec::new(),
        };
        self.regions
            .iter()
            .filter(|r| r.parent == parent && r.id != id)
            .map(|r| r.id)
            .collect()
    }

    /// Number of ancestors (0 for top-level regions)
    pub fn depth(&self, id: usize) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|r| r.parent);
        while let Some(p) = current {
            depth += 1;
            current = self.get(p).and_then(|r| r.parent);
        }
        depth
    }
}

/// Candidate region ids and where they came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSelection {
    pub regions: Vec<usize>,
    pub from_hierarchy: usize,
    pub from_fallback: usize,
}

/// Select room-like regions.
///
/// A candidate has a parent, an area inside `area_band`, and an area ratio
/// to its parent inside the configured open interval. When fewer than
/// `min_candidates_before_fallback` pass, every nested region whose area
/// alone is in band is added.
pub fn select_candidates(
    tree: &RegionTree,
    area_band: (f64, f64),
    config: &DetectionConfig,
) -> CandidateSelection {
    let (min_area, max_area) = area_band;
    let in_band = |region: &Region| region.area >= min_area && region.area <= max_area;

    let mut regions: Vec<usize> = tree
        .iter()
        .filter(|region| in_band(region))
        .filter(|region| {
            let Some(parent) = tree.parent(region.id) else {
                return false;
            };
            if parent.area <= 0.0 {
                return false;
            }
            let ratio = region.area / parent.area;
            ratio > config.min_area_ratio_to_parent && ratio < config.max_area_ratio_to_parent
        })
        .map(|region| region.id)
        .collect();

    let from_hierarchy = regions.len();
    let mut from_fallback = 0;

    if from_hierarchy < config.min_candidates_before_fallback {
        let mut seen: FxHashSet<usize> = regions.iter().copied().collect();
        for region in tree.iter() {
            if !region.is_top_level() && in_band(region) && seen.insert(region.id) {
                regions.push(region.id);
                from_fallback += 1;
            }
        }
        debug!(
            from_hierarchy,
            from_fallback, "hierarchy yielded few candidates, ran size scan"
        );
    }

    CandidateSelection {
        regions,
        from_hierarchy,
        from_fallback,
    }
}

/// Shoelace area of a closed polygon
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = points.len();
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }

    area.abs() / 2.0
}

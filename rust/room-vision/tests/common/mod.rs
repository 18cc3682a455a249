// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synthetic blueprints drawn with filled rectangles

#![allow(dead_code)]

use image::{GrayImage, Luma};

const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);

/// White page with black wall mass and white spaces cut out of it
pub struct Blueprint {
    image: GrayImage,
}

impl Blueprint {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::from_pixel(width, height, PAPER),
        }
    }

    /// Fill `[x0, x1) × [y0, y1)` with ink.
    pub fn walls(mut self, x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        self.fill(x0, y0, x1, y1, INK);
        self
    }

    /// Clear `[x0, x1) × [y0, y1)` back to paper.
    pub fn space(mut self, x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        self.fill(x0, y0, x1, y1, PAPER);
        self
    }

    pub fn build(self) -> GrayImage {
        self.image
    }

    fn fill(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, value: Luma<u8>) {
        let x1 = x1.min(self.image.width());
        let y1 = y1.min(self.image.height());
        for y in y0..y1 {
            for x in x0..x1 {
                self.image.put_pixel(x, y, value);
            }
        }
    }
}

/// Hallway on the left opening through 25 px doors into two rooms.
///
/// Walls are 50 px thick; rooms are
/// - hallway `[150, 350) × [100, 1400)`
/// - room A `[400, 1000) × [100, 500)`
/// - room B `[1050, 1350) × [100, 500)`
pub fn simple_plan() -> GrayImage {
    Blueprint::new(2000, 1500)
        .walls(100, 50, 1400, 1450)
        .space(150, 100, 350, 1400)
        .space(400, 100, 1000, 500)
        .space(1050, 100, 1350, 500)
        // Door hallway -> A
        .space(350, 250, 400, 275)
        // Door A -> B
        .space(1000, 250, 1050, 275)
        .build()
}

/// Centres of the two doors in [`simple_plan`]
pub const SIMPLE_PLAN_DOORS: [(f64, f64); 2] = [(374.5, 262.0), (1024.5, 262.0)];

/// The [`simple_plan`] rooms drawn as `wall` px outlines on a white page.
///
/// Interiors are
/// - hallway `[150, 350) × [100, 1400)`
/// - room A `[350 + w, 950 + w) × [100, 500)`
/// - room B `[950 + 2w, 1250 + 2w) × [100, 500)`
///
/// with 25 px doors through the hallway/A and A/B walls.
pub fn outlined_plan(wall: u32) -> GrayImage {
    let w = wall;
    Blueprint::new(2000, 1500)
        .walls(150 - w, 100 - w, 1250 + 3 * w, 100)
        .walls(150 - w, 100, 150, 1400 + w)
        .walls(150, 1400, 350 + w, 1400 + w)
        .walls(350, 100, 350 + w, 1400)
        .walls(350 + w, 500, 1250 + 3 * w, 500 + w)
        .walls(950 + w, 100, 950 + 2 * w, 500)
        .walls(1250 + 2 * w, 100, 1250 + 3 * w, 500)
        // Door hallway -> A
        .space(350, 250, 350 + w, 275)
        // Door A -> B
        .space(950 + w, 250, 950 + 2 * w, 275)
        .build()
}

/// Centres of the two doors in [`outlined_plan`]
pub fn outlined_plan_doors(wall: u32) -> [(f64, f64); 2] {
    let half = (wall as f64 - 1.0) / 2.0;
    [(350.0 + half, 262.0), (950.0 + wall as f64 + half, 262.0)]
}

/// Eight closed offices around a central corridor, 30 px walls.
pub fn office_plan() -> GrayImage {
    let mut plan = Blueprint::new(1600, 1200)
        .walls(80, 60, 1520, 1140)
        .space(120, 540, 1480, 660);

    for (x0, x1) in [(120, 440), (470, 790), (820, 1140), (1170, 1480)] {
        plan = plan.space(x0, 100, x1, 510).space(x0, 690, x1, 1100);
    }
    plan.build()
}

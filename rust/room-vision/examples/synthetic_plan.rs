// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room detection on a synthetic floor plan, adaptive vs. preset parameters
//!
//! Run with: cargo run -p roomview-vision --example synthetic_plan

use image::{GrayImage, Luma};
use roomview_vision::{detect_floor_plan, DetectionConfig, DetectionMode, FloorPlanDetection, ParameterSet};

fn main() {
    println!("=== Synthetic Floor Plan Room Detection ===\n");

    let plan = create_synthetic_floor_plan();
    let config = DetectionConfig::default();

    println!("Run 1: Adaptive parameters...");
    match detect_floor_plan(&plan, &config, DetectionMode::Adaptive) {
        Ok(detection) => report(&detection),
        Err(e) => println!("  ✗ Detection failed: {}\n", e),
    }

    println!("Run 2: Fixed 'clean_cad' preset...");
    let result = ParameterSet::from_preset("clean_cad")
        .and_then(|params| detect_floor_plan(&plan, &config, DetectionMode::Fixed(params)));
    match result {
        Ok(detection) => report(&detection),
        Err(e) => println!("  ✗ Detection failed: {}\n", e),
    }
}

fn report(detection: &FloorPlanDetection) {
    println!(
        "  Style: {} (wall {:.1}px, density {:.4})",
        detection.profile.style, detection.profile.wall_thickness, detection.profile.line_density
    );
    println!("  Rooms detected: {}", detection.rooms.len());
    for room in &detection.rooms {
        println!(
            "    {}: {:?}, area={:.0}px², confidence={:.2}, {} vertices",
            room.id,
            room.room_type,
            room.area_pixels,
            room.confidence,
            room.polygon.len()
        );
    }
    println!("  Doorways detected: {}", detection.doorways.len());
    for door in &detection.doorways {
        println!("    {}: {:?} connects {:?}", door.id, door.kind, door.connects_rooms);
    }
    println!();
}

/// Two rooms and a hallway cut out of a solid wall mass, joined by doors
fn create_synthetic_floor_plan() -> GrayImage {
    let mut img = GrayImage::from_pixel(1000, 800, Luma([255]));

    // Wall mass
    draw_rect(&mut img, 50, 50, 950, 750, 0);

    // Spaces
    draw_rect(&mut img, 100, 100, 250, 700, 255);
    draw_rect(&mut img, 300, 100, 900, 380, 255);
    draw_rect(&mut img, 300, 420, 900, 700, 255);

    // Doors from the hallway
    draw_rect(&mut img, 250, 200, 300, 225, 255);
    draw_rect(&mut img, 250, 550, 300, 575, 255);

    img
}

fn draw_rect(img: &mut GrayImage, x1: u32, y1: u32, x2: u32, y2: u32, value: u8) {
    for y in y1..y2.min(img.height()) {
        for x in x1..x2.min(img.width()) {
            img.put_pixel(x, y, Luma([value]));
        }
    }
}

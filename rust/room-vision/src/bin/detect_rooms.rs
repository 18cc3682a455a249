// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: Detect rooms and doorways in a floor plan image (JSON output)
//!
//! Usage:
//!   detect-rooms <image_path> [options]

use image::ImageReader;
use roomview_vision::{
    detect_floor_plan, DetectionConfig, DetectionMode, FloorPlanDetection, ParameterOverrides, ParameterSet,
    PRESET_NAMES,
};
use std::env;
use std::fs;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let image_path = &args[1];

    // Parse options
    let mut preset: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut output_path = String::from("rooms.json");
    let mut fixed = false;
    let mut no_doorways = false;
    let mut max_dimension: Option<u32> = None;
    let mut min_confidence: Option<f64> = None;
    let mut max_rooms: Option<usize> = None;
    let mut overrides = ParameterOverrides::default();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--preset" => preset = Some(value(&args, &mut i).to_string()),
            "--config" => config_path = Some(value(&args, &mut i).to_string()),
            "--output" => output_path = value(&args, &mut i).to_string(),
            "--fixed" => fixed = true,
            "--no-doorways" => no_doorways = true,
            "--max-dimension" => max_dimension = Some(parse(&args, &mut i)),
            "--min-confidence" => min_confidence = Some(parse(&args, &mut i)),
            "--max-rooms" => max_rooms = Some(parse(&args, &mut i)),
            "--min-room-area" => {
                overrides.min_room_area_pixels = Some(parse(&args, &mut i));
                fixed = true;
            }
            "--min-solidity" => {
                overrides.min_solidity = Some(parse(&args, &mut i));
                fixed = true;
            }
            other => {
                eprintln!("Unknown option: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    println!("=== Floor Plan Room Detection ===");
    println!();

    // Step 1: Load image
    println!("[1/3] Loading image: {}", image_path);
    let img = ImageReader::open(image_path)
        .unwrap_or_else(|e| fail(&format!("Cannot open image '{}': {}", image_path, e)))
        .decode()
        .unwrap_or_else(|e| fail(&format!("Cannot decode image '{}': {}", image_path, e)));
    let grayscale = img.to_luma8();
    println!("  Image size: {}x{} pixels", grayscale.width(), grayscale.height());

    // Step 2: Configuration layers: defaults, file, preset, flags
    println!("[2/3] Configuring detection...");
    let mut config = match &config_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .unwrap_or_else(|e| fail(&format!("Cannot read config '{}': {}", path, e)));
            DetectionConfig::from_json(&json).unwrap_or_else(|e| fail(&e.to_string()))
        }
        None => DetectionConfig::default(),
    };

    let mut params = ParameterSet::default();
    if let Some(name) = &preset {
        config = config.with_preset(name).unwrap_or_else(|e| fail(&e.to_string()));
        params = ParameterSet::from_preset(name).unwrap_or_else(|e| fail(&e.to_string()));
        fixed = true;
        println!("  Preset: {}", name);
    }

    if let Some(v) = max_dimension {
        config.max_dimension = v;
    }
    if let Some(v) = min_confidence {
        config.min_confidence_score = v;
    }
    if let Some(v) = max_rooms {
        config.max_rooms = v;
    }
    if no_doorways {
        config.doorway.enabled = false;
    }

    let mode = if fixed {
        let params = params.merge(&overrides).unwrap_or_else(|e| fail(&e.to_string()));
        println!("  Mode: fixed parameters");
        DetectionMode::Fixed(params)
    } else {
        println!("  Mode: adaptive");
        DetectionMode::Adaptive
    };

    // Step 3: Detect
    println!("[3/3] Detecting rooms and doorways...");
    let detection = detect_floor_plan(&grayscale, &config, mode).unwrap_or_else(|e| fail(&e.to_string()));
    print_summary(&detection);

    let json = serde_json::to_string_pretty(&detection).unwrap_or_else(|e| fail(&e.to_string()));
    fs::write(&output_path, json).unwrap_or_else(|e| fail(&format!("Cannot write '{}': {}", output_path, e)));
    println!();
    println!("Wrote {}", output_path);
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Value following the flag at `i`; advances `i`.
fn value<'a>(args: &'a [String], i: &mut usize) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(v) => v,
        None => fail(&format!("Missing value for {}", flag)),
    }
}

fn parse<T: std::str::FromStr>(args: &[String], i: &mut usize) -> T {
    let flag = args[*i].clone();
    let raw = value(args, i);
    raw.parse()
        .unwrap_or_else(|_| fail(&format!("Invalid value for {}: {}", flag, raw)))
}

fn print_summary(detection: &FloorPlanDetection) {
    let profile = &detection.profile;
    println!(
        "  Style: {} (wall {:.1}px, density {:.4}, contrast {:.2}, noise {:.2})",
        profile.style, profile.wall_thickness, profile.line_density, profile.contrast, profile.noise
    );
    if detection.scale_factor != 1.0 {
        println!(
            "  Downscaled to {}x{} (factor {:.3})",
            detection.image_width, detection.image_height, detection.scale_factor
        );
    }

    let stats = &detection.stats;
    println!(
        "  Regions: {} traced, {} hierarchy + {} fallback candidates",
        stats.regions_found, stats.hierarchy_candidates, stats.fallback_candidates
    );
    println!(
        "  Rejected: {} too small, {} low solidity, {} low score; {} outliers, {} duplicates",
        stats.rejected_dimension,
        stats.rejected_solidity,
        stats.rejected_score,
        stats.removed_scale_outliers,
        stats.removed_duplicates
    );

    println!();
    println!("Rooms: {}", detection.rooms.len());
    for room in &detection.rooms {
        println!(
            "  {}  {:?}  {:>9.0} px²  confidence {:.2}  {:?}",
            room.id,
            room.room_type,
            room.area_pixels,
            room.confidence,
            room.bounding_box.to_array()
        );
    }

    println!("Doorways: {}", detection.doorways.len());
    for door in &detection.doorways {
        println!(
            "  {}  {:?}  ({:.0}, {:.0})  connects {}",
            door.id,
            door.kind,
            door.center.x,
            door.center.y,
            door.connects_rooms.join(" <-> ")
        );
    }
}

fn print_usage() {
    println!(
        r#"Floor Plan Room Detection
=========================

Detects rooms and doorways in a raster floor plan and writes them as JSON.

USAGE:
  detect-rooms <image_path> [OPTIONS]

ARGUMENTS:
  <image_path>              Path to floor plan image (PNG, JPEG)

OPTIONS:
  --preset <name>           Fixed parameter preset: {}
  --fixed                   Use fixed default parameters instead of adaptive ones
  --config <path>           JSON detection config (missing fields keep defaults)
  --output <path>           Output JSON path (default: rooms.json)
  --no-doorways             Skip doorway detection
  --max-dimension <px>      Downscale the longer side to this size (default: 2000)
  --min-confidence <score>  Minimum room confidence (default: 0.3)
  --max-rooms <n>           Maximum number of rooms (default: 50)
  --min-room-area <px²>     Minimum room area (implies --fixed)
  --min-solidity <ratio>    Minimum room solidity (implies --fixed)
  -h, --help                Show this help message

Set RUST_LOG=debug for per-stage diagnostics."#,
        PRESET_NAMES.join(", ")
    );
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for room detection.

/// Result type alias for detection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by configuration and the top-level pipeline.
///
/// Detection stages themselves never fail: degenerate input yields empty
/// collections instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A preset name that is not in the preset table.
    #[error("unknown preset '{name}', available: {available}")]
    UnknownPreset { name: String, available: String },

    /// A parameter outside its allowed range.
    #[error("parameter '{name}' = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Two parameters that must be ordered are not.
    #[error("parameter '{lower}' ({lower_value}) must be below '{upper}' ({upper_value})")]
    InvalidRange {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },

    /// Configuration JSON could not be parsed.
    #[error("invalid configuration JSON: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// The raster has no pixels.
    #[error("raster is empty ({width}x{height})")]
    EmptyRaster { width: u32, height: u32 },
}

impl Error {
    /// Build a range error for a named parameter.
    pub(crate) fn out_of_range(name: &'static str, value: f64, min: f64, max: f64) -> Self {
        Error::ParameterOutOfRange {
            name,
            value,
            min,
            max,
        }
    }
}

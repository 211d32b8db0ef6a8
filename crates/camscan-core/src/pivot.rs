//! Camarilla pivot levels for a single bar.
//!
//! ```text
//! range         = H - L
//! R3            = C + range * M / 4
//! S3            = C - range * M / 4
//! central_pivot = (H + L + C) / 3
//! percent_range = (R3 - S3) / S3 * 100
//! ```
//!
//! Values are kept at full precision; rounding belongs to presentation.

use serde::Serialize;

/// Default Camarilla expansion multiplier.
pub const DEFAULT_MULTIPLIER: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CamarillaLevels {
    pub r3: f64,
    pub s3: f64,
    pub central_pivot: f64,
    /// `None` when S3 is zero.
    pub percent_range: Option<f64>,
}

pub fn compute(high: f64, low: f64, close: f64, multiplier: f64) -> CamarillaLevels {
    let half_width = (high - low) * multiplier / 4.0;
    let r3 = close + half_width;
    let s3 = close - half_width;

    let percent_range = if s3 == 0.0 {
        None
    } else {
        Some((r3 - s3) / s3 * 100.0)
    };

    CamarillaLevels {
        r3,
        s3,
        central_pivot: (high + low + close) / 3.0,
        percent_range,
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

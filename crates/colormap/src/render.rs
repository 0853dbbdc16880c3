//! Raster-to-RGBA rendering with visualization parameters.

use serde::{Deserialize, Serialize};

use crate::scheme::{Palette, Rgb};
use nbrwatch_core::raster::{Raster, RasterElement};

/// How a single-band layer is painted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    /// Value mapped to the first palette color. Values below are clamped.
    pub min: f64,
    /// Value mapped to the last palette color. Values above are clamped.
    pub max: f64,
    pub palette: Palette,
    /// Layer opacity in [0, 1], applied to every valid pixel
    pub opacity: f64,
}

impl VisParams {
    pub fn new(min: f64, max: f64, palette: Palette) -> Self {
        Self {
            min,
            max,
            palette,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// NBR composites: light to dark green over 0.3..0.8
    pub fn nbr() -> Self {
        Self::preset(0.3, 0.8, &["c8e6c9", "1b5e20"])
    }

    /// dNBR: red (loss) through cream to blue (gain) over -0.2..0.2
    pub fn delta() -> Self {
        Self::preset(-0.2, 0.2, &["D32F2F", "FFFDE7", "1976D2"])
    }

    /// Disturbed cells in a single dark red
    pub fn disturbance() -> Self {
        Self::preset(0.0, 1.0, &["7B0323"])
    }

    /// Preset by layer kind: `nbr`, `delta` or `disturbance`
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "nbr" => Some(Self::nbr()),
            "delta" | "dnbr" => Some(Self::delta()),
            "disturbance" => Some(Self::disturbance()),
            _ => None,
        }
    }

    fn preset(min: f64, max: f64, colors: &[&str]) -> Self {
        let colors: Vec<Rgb> = colors
            .iter()
            .filter_map(|c| Rgb::from_hex(c).ok())
            .collect();
        let palette = Palette::new(&colors).unwrap_or_else(|_| Palette::grayscale());
        Self::new(min, max, palette).with_opacity(0.8)
    }

    fn alpha(&self) -> u8 {
        (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Auto-detect min/max from a raster.
///
/// Scans all valid (non-nodata) cells to find the data range.
pub fn auto_params<T: RasterElement>(raster: &Raster<T>, palette: Palette) -> VisParams {
    let nodata = raster.nodata();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for val in raster.data().iter() {
        if val.is_nodata(nodata) {
            continue;
        }
        if let Some(v) = val.to_f64().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
        }
    }

    // All nodata or constant raster
    if !min.is_finite() || !max.is_finite() {
        min = 0.0;
        max = 1.0;
    } else if (max - min).abs() < f64::EPSILON {
        max = min + 1.0;
    }

    VisParams::new(min, max, palette)
}

/// Convert a raster to an RGBA pixel buffer.
///
/// Returns a `Vec<u8>` of length `rows * cols * 4` in row-major order.
/// Nodata pixels are fully transparent; valid pixels carry the layer
/// opacity as alpha.
pub fn raster_to_rgba<T: RasterElement>(raster: &Raster<T>, params: &VisParams) -> Vec<u8> {
    let nodata = raster.nodata();
    let range = params.max - params.min;
    let inv_range = if range.abs() > f64::EPSILON {
        1.0 / range
    } else {
        1.0
    };
    let alpha = params.alpha();

    let mut rgba = vec![0u8; raster.len() * 4];

    for (pixel, val) in rgba.chunks_exact_mut(4).zip(raster.data().iter()) {
        if val.is_nodata(nodata) {
            continue;
        }
        if let Some(v) = val.to_f64().filter(|v| v.is_finite()) {
            let Rgb { r, g, b } = params.palette.evaluate((v - params.min) * inv_range);
            pixel.copy_from_slice(&[r, g, b, alpha]);
        }
    }

    rgba
}

//! Change detection between two NBR composites
//!
//! - dNBR: `post - pre`, no-data wherever either composite is no-data
//! - Disturbance: dNBR cells at or below a severity threshold

use serde::{Deserialize, Serialize};

use nbrwatch_core::raster::Raster;
use nbrwatch_core::Result;

use super::band_math::{band_math, band_math_binary};
use super::indices::is_nodata_f64;

/// dNBR at or below this value flags a severe forest disturbance
pub const DEFAULT_SEVERITY_THRESHOLD: f64 = -0.15;

/// Parameters for disturbance thresholding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeParams {
    /// Largest dNBR still counted as disturbed
    pub severity_threshold: f64,
}

impl Default for ChangeParams {
    fn default() -> Self {
        Self {
            severity_threshold: DEFAULT_SEVERITY_THRESHOLD,
        }
    }
}

/// Difference of two composites on the same grid: `post - pre`.
///
/// A negative dNBR means the canopy lost NIR reflectance or gained SWIR
/// reflectance between the two periods.
pub fn delta(post: &Raster<f64>, pre: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_binary(post, pre, |post, pre| post - pre)
}

/// Restrict a dNBR raster to cells `<= params.severity_threshold`
pub fn disturbance(delta: &Raster<f64>, params: ChangeParams) -> Result<Raster<f64>> {
    let threshold = params.severity_threshold;
    band_math(delta, |d| if d <= threshold { d } else { f64::NAN })
}

/// Summary counts for a disturbance layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisturbanceStats {
    /// Cells with a valid dNBR (forest, inside the domain, observed twice)
    pub valid_cells: usize,
    /// Cells flagged as disturbed
    pub disturbed_cells: usize,
    /// `disturbed_cells / valid_cells`, 0 when nothing is valid
    pub disturbed_fraction: f64,
    /// Disturbed area in squared map units (m² for UTM grids)
    pub disturbed_area: f64,
}

impl DisturbanceStats {
    /// Disturbed area in hectares, assuming a metric CRS
    pub fn disturbed_hectares(&self) -> f64 {
        self.disturbed_area / 10_000.0
    }
}

/// Count valid and disturbed cells
pub fn disturbance_stats(delta: &Raster<f64>, disturbance: &Raster<f64>) -> DisturbanceStats {
    let count = |r: &Raster<f64>| {
        let nodata = r.nodata();
        r.data().iter().filter(|&&v| !is_nodata_f64(v, nodata)).count()
    };
    let valid_cells = count(delta);
    let disturbed_cells = count(disturbance);
    let disturbed_fraction = if valid_cells > 0 {
        disturbed_cells as f64 / valid_cells as f64
    } else {
        0.0
    };

    DisturbanceStats {
        valid_cells,
        disturbed_cells,
        disturbed_fraction,
        disturbed_area: disturbed_cells as f64 * disturbance.transform().cell_area(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbrwatch_core::GeoTransform;

    fn make(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 2, 3).unwrap();
        r.set_transform(GeoTransform::new(0.0, 40.0, 20.0, -20.0));
        r
    }

    #[test]
    fn test_delta_of_identical_composites_is_zero() {
        let a = make(vec![0.61, 0.55, f64::NAN, 0.72, 0.4, 0.33]);
        let d = delta(&a, &a).unwrap();

        assert_eq!(d.valid_count(), 5);
        for &v in d.data().iter().filter(|v| !v.is_nan()) {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_delta_propagates_nodata() {
        let post = make(vec![0.5, f64::NAN, 0.5, 0.5, 0.5, 0.5]);
        let pre = make(vec![0.6, 0.6, f64::NAN, 0.6, 0.6, 0.6]);
        let d = delta(&post, &pre).unwrap();

        assert!(d.get(0, 1).unwrap().is_nan());
        assert!(d.get(0, 2).unwrap().is_nan());
        assert!((d.get(0, 0).unwrap() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_disturbance_threshold() {
        let d = make(vec![-0.3, -0.15, -0.1499, 0.0, 0.2, f64::NAN]);
        let dist = disturbance(&d, ChangeParams::default()).unwrap();

        assert_eq!(dist.get(0, 0).unwrap(), -0.3);
        assert_eq!(dist.get(0, 1).unwrap(), -0.15);
        for &v in dist.data().iter().filter(|v| !v.is_nan()) {
            assert!(v <= DEFAULT_SEVERITY_THRESHOLD);
        }
        assert_eq!(dist.valid_count(), 2);
    }

    #[test]
    fn test_stats() {
        let d = make(vec![-0.3, -0.2, 0.1, 0.0, f64::NAN, f64::NAN]);
        let dist = disturbance(&d, ChangeParams::default()).unwrap();
        let stats = disturbance_stats(&d, &dist);

        assert_eq!(stats.valid_cells, 4);
        assert_eq!(stats.disturbed_cells, 2);
        assert!((stats.disturbed_fraction - 0.5).abs() < 1e-12);
        // 2 cells of 20 m x 20 m
        assert!((stats.disturbed_area - 800.0).abs() < 1e-9);
        assert!((stats.disturbed_hectares() - 0.08).abs() < 1e-12);
    }
}

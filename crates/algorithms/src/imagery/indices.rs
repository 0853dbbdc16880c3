//! Spectral indices
//!
//! All indices operate on single-band rasters (one band per raster) and
//! produce NaN where an input is no-data or the denominator vanishes.

use ndarray::Array2;
use crate::maybe_rayon::*;
use nbrwatch_core::raster::Raster;
use nbrwatch_core::{Error, Result};

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1] for non-negative reflectances. Pixels
/// where the bands sum to zero or either is no-data are set to NaN.
///
/// # Arguments
/// * `band_a` - Positive band
/// * `band_b` - Negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue;
                }

                row_data[col] = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

// ---------------------------------------------------------------------------
// NBR
// ---------------------------------------------------------------------------

/// Normalized Burn Ratio
///
/// `NBR = (NIR - SWIR) / (NIR + SWIR)`
///
/// On Sentinel-2 this is computed from the 20 m narrow NIR band (B8A) and
/// the first SWIR band (B11). Healthy canopy sits well above 0.3; burned,
/// felled or windthrown forest drops sharply, which is what dNBR detects.
///
/// # Arguments
/// * `nir` - Narrow near-infrared band (B8A)
/// * `swir` - Shortwave infrared band (B11)
pub fn nbr(nir: &Raster<f64>, swir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, swir)
}

// ---------------------------------------------------------------------------
// Helpers shared by the imagery modules
// ---------------------------------------------------------------------------

pub(crate) fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

pub(crate) fn check_dimensions<A, B>(a: &Raster<A>, b: &Raster<B>) -> Result<()>
where
    A: nbrwatch_core::RasterElement,
    B: nbrwatch_core::RasterElement,
{
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

/// Wrap row-major `data` in a NaN-no-data raster georeferenced like `template`
pub(crate) fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbrwatch_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 20.0, 20.0, -20.0));
        r
    }

    #[test]
    fn test_normalized_difference_basic() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(5, 5, 0.2);

        let result = normalized_difference(&a, &b).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert!((val - 0.6).abs() < 1e-10, "Expected 0.6, got {}", val);
    }

    #[test]
    fn test_nbr_healthy_and_burned() {
        // Healthy forest: bright NIR, dark SWIR.
        let healthy = nbr(&make_band(3, 3, 0.35), &make_band(3, 3, 0.12)).unwrap();
        assert!(healthy.get(1, 1).unwrap() > 0.4);

        // Burned surface: SWIR above NIR.
        let burned = nbr(&make_band(3, 3, 0.15), &make_band(3, 3, 0.25)).unwrap();
        assert!(burned.get(1, 1).unwrap() < 0.0);
    }

    #[test]
    fn test_zero_sum_is_nodata() {
        let result = nbr(&make_band(2, 2, 0.0), &make_band(2, 2, 0.0)).unwrap();
        assert_eq!(result.valid_count(), 0);
    }

    #[test]
    fn test_nodata_handling() {
        let mut nir = make_band(5, 5, 0.4);
        nir.set(2, 2, f64::NAN).unwrap();
        let swir = make_band(5, 5, 0.1);

        let result = nbr(&nir, &swir).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
        assert_eq!(result.valid_count(), 24);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = make_band(5, 5, 0.5);
        let b = make_band(3, 3, 0.5);
        assert!(matches!(
            normalized_difference(&a, &b),
            Err(Error::SizeMismatch { .. })
        ));
    }
}

//! Band math operations
//!
//! Cell-wise raster algebra on NaN-no-data `f64` rasters.

use ndarray::Array2;
use crate::maybe_rayon::*;
use nbrwatch_core::raster::Raster;
use nbrwatch_core::{Error, Result};

use super::indices::{check_dimensions, is_nodata_f64};

/// Apply a unary function to every valid cell in a raster.
///
/// No-data cells stay no-data; `f` may itself return NaN to drop a cell.
///
/// # Example
/// ```ignore
/// let reflectance = band_math(&digital_numbers, |v| v * 0.0001)?;
/// ```
pub fn band_math<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let val = unsafe { raster.get_unchecked(row, col) };
                if is_nodata_f64(val, nodata) {
                    continue;
                }
                row_data[col] = f(val);
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Combine two rasters cell by cell with `f(a, b)`.
///
/// Both rasters must have the same dimensions. No-data in either input
/// produces no-data in the output.
pub fn band_math_binary<F>(a: &Raster<f64>, b: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    check_dimensions(a, b)?;

    let (rows, cols) = a.shape();
    let nodata_a = a.nodata();
    let nodata_b = b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let va = unsafe { a.get_unchecked(row, col) };
                let vb = unsafe { b.get_unchecked(row, col) };

                if is_nodata_f64(va, nodata_a) || is_nodata_f64(vb, nodata_b) {
                    continue;
                }

                row_data[col] = f(va, vb);
            }
            row_data
        })
        .collect();

    let mut output = a.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

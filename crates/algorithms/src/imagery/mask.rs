//! Applying validity masks to rasters

use ndarray::Array2;

use crate::maybe_rayon::*;
use nbrwatch_core::raster::{GridSpec, Mask, Raster};
use nbrwatch_core::{Error, Result};

use super::indices::check_dimensions;
use super::resample::resample_nearest;

/// Keep `raster` where `mask` is non-zero, NaN elsewhere.
///
/// Cells already no-data stay no-data; a mask cell equal to the mask's
/// declared no-data value excludes the cell.
pub fn update_mask(raster: &Raster<f64>, mask: &Mask) -> Result<Raster<f64>> {
    check_dimensions(raster, mask)?;

    let (rows, cols) = raster.shape();
    let mask_nodata = mask.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let m = unsafe { mask.get_unchecked(row, col) };
                if m == 0 || mask_nodata == Some(m) {
                    continue;
                }
                let v = unsafe { raster.get_unchecked(row, col) };
                if !raster.is_nodata(v) {
                    row_data[col] = v;
                }
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

/// Bring a mask onto `target`, excluding cells the mask does not cover
pub fn align_mask(mask: &Mask, target: &GridSpec) -> Result<Mask> {
    resample_nearest(mask, target, 0)
}

/// Binary mask from a raster where any valid value above zero means "keep".
///
/// Used for the forest-extent layer, which may be stored as 0/1 integers
/// or as floats with NaN outside the forest.
pub fn mask_from_raster(raster: &Raster<f64>) -> Mask {
    let mut mask = raster.with_same_meta::<u8>(raster.rows(), raster.cols());
    for (out, &v) in mask.data_mut().iter_mut().zip(raster.data().iter()) {
        if !raster.is_nodata(v) && v > 0.0 {
            *out = 1;
        }
    }
    mask
}

//! Per-pixel temporal compositing

use ndarray::Array2;

use crate::maybe_rayon::*;
use nbrwatch_core::raster::{GridSpec, Raster};
use nbrwatch_core::{Error, Result};

use super::indices::is_nodata_f64;

/// Median of the valid observations in each cell of a stack.
///
/// Every layer must already lie on `grid`. Cells without any valid
/// observation are NaN; an empty stack therefore yields a raster with no
/// valid cell at all. With an even number of observations the two middle
/// values are averaged.
pub fn median_composite(stack: &[Raster<f64>], grid: &GridSpec) -> Result<Raster<f64>> {
    let (rows, cols) = grid.shape();
    for layer in stack {
        if layer.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: layer.rows(),
                ac: layer.cols(),
            });
        }
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values = Vec::with_capacity(stack.len());
            for (col, cell) in row_data.iter_mut().enumerate() {
                values.clear();
                values.extend(stack.iter().filter_map(|layer| {
                    let v = unsafe { layer.get_unchecked(row, col) };
                    (!is_nodata_f64(v, layer.nodata())).then_some(v)
                }));
                if let Some(m) = median(&mut values) {
                    *cell = m;
                }
            }
            row_data
        })
        .collect();

    let mut output = Raster::from_grid(grid, f64::NAN);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

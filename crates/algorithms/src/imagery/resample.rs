//! Nearest-neighbour alignment between grids of the same CRS
//!
//! Sentinel-2 quality bands come at 10 m while the NBR bands are 20 m;
//! before a 10 m mask can be applied to a 20 m scene (or a scene placed on
//! the forest-mask grid) it is sampled at the target cell centers.

use ndarray::Array2;

use crate::maybe_rayon::*;
use nbrwatch_core::crs::ensure_compatible;
use nbrwatch_core::raster::{GridSpec, Raster, RasterElement};
use nbrwatch_core::{Error, Result};

/// Sample `src` at every cell center of `target`.
///
/// Target cells falling outside `src` receive `fill`. The output carries
/// the target's georeferencing and the source's no-data value. Fails with
/// `CrsMismatch` when both grids are tagged with different CRS.
pub fn resample_nearest<T: RasterElement>(
    src: &Raster<T>,
    target: &GridSpec,
    fill: T,
) -> Result<Raster<T>> {
    ensure_compatible(src.crs(), target.crs.as_ref())?;

    if src.grid().same_as(target) {
        let mut out = src.clone();
        if out.crs().is_none() {
            out.set_crs(target.crs.clone());
        }
        return Ok(out);
    }

    let (rows, cols) = target.shape();
    let (src_rows, src_cols) = src.shape();
    let src_transform = *src.transform();
    let target_transform = target.transform;

    let data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![fill; cols];
            for (col, cell) in row_data.iter_mut().enumerate() {
                let (x, y) = target_transform.pixel_to_geo(col, row);
                let (sc, sr) = src_transform.geo_to_pixel(x, y);
                if !(sc >= 0.0 && sr >= 0.0) {
                    continue;
                }
                let (sc, sr) = (sc.floor() as usize, sr.floor() as usize);
                if sr < src_rows && sc < src_cols {
                    *cell = unsafe { src.get_unchecked(sr, sc) };
                }
            }
            row_data
        })
        .collect();

    let mut out = Raster::from_grid(target, fill);
    if out.crs().is_none() {
        out.set_crs(src.crs().cloned());
    }
    out.set_nodata(src.nodata());
    *out.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbrwatch_core::{GeoTransform, CRS};

    /// 4x4 grid of 10 m cells with value = row * 10 + col
    fn fine() -> Raster<f64> {
        let data = (0..16).map(|i| ((i / 4) * 10 + i % 4) as f64).collect();
        let mut r = Raster::from_vec(data, 4, 4).unwrap();
        r.set_transform(GeoTransform::new(1000.0, 2000.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_identity_grid_is_copied() {
        let src = fine();
        let out = resample_nearest(&src, &src.grid(), f64::NAN).unwrap();
        assert_eq!(out.data(), src.data());
    }

    #[test]
    fn test_downsample_to_20m() {
        let target = GridSpec::new(2, 2, GeoTransform::new(1000.0, 2000.0, 20.0, -20.0));
        let out = resample_nearest(&fine(), &target, f64::NAN).unwrap();

        // 20 m centers fall on the corner shared by four 10 m cells; floor
        // picks the lower-right one.
        assert_eq!(out.get(0, 0).unwrap(), 11.0);
        assert_eq!(out.get(1, 1).unwrap(), 33.0);
        assert!(out.transform().same_grid(&target.transform));
    }

    #[test]
    fn test_outside_source_gets_fill() {
        let target = GridSpec::new(2, 2, GeoTransform::new(1030.0, 2000.0, 10.0, -10.0));
        let out = resample_nearest(&fine(), &target, -1.0).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 3.0);
        assert_eq!(out.get(0, 1).unwrap(), -1.0);
    }

    #[test]
    fn test_crs_mismatch() {
        let mut src = fine();
        src.set_crs(Some(CRS::utm_32n()));
        let target = src.grid().with_crs(CRS::from_epsg(2056));
        assert!(matches!(
            resample_nearest(&src, &target, f64::NAN),
            Err(Error::CrsMismatch(_, _))
        ));
    }
}

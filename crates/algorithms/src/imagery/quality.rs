//! Cloud and terrain shadow screening of high-resolution scenes

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use nbrwatch_core::raster::{Mask, Raster};
use nbrwatch_core::{Error, Result};

use super::indices::{check_dimensions, is_nodata_f64};

/// Which quality bands to read and what counts as clear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityParams {
    /// Combined cloud / cloud-shadow classification band
    pub cloud_band: String,
    /// Terrain shadow intensity band
    pub shadow_band: String,
    /// Value of `cloud_band` for a clear observation
    pub clear_value: f64,
    /// Terrain shadow values at or above this are rejected
    pub max_shadow: f64,
}

impl Default for QualityParams {
    fn default() -> Self {
        Self {
            cloud_band: "cloudAndCloudShadowMask".to_string(),
            shadow_band: "terrainShadowMask".to_string(),
            clear_value: 0.0,
            max_shadow: 100.0,
        }
    }
}

/// Build the clear-sky mask of one high-resolution scene.
///
/// A cell is kept (`1`) when the cloud band equals `clear_value` and the
/// terrain shadow band is below `max_shadow`. A cell with no-data in
/// either band is excluded.
pub fn clear_sky_mask(
    cloud: &Raster<f64>,
    shadow: &Raster<f64>,
    params: &QualityParams,
) -> Result<Mask> {
    check_dimensions(cloud, shadow)?;

    let (rows, cols) = cloud.shape();
    let nodata_cloud = cloud.nodata();
    let nodata_shadow = shadow.nodata();
    let clear = params.clear_value;
    let max_shadow = params.max_shadow;

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for col in 0..cols {
                let c = unsafe { cloud.get_unchecked(row, col) };
                let s = unsafe { shadow.get_unchecked(row, col) };

                if is_nodata_f64(c, nodata_cloud) || is_nodata_f64(s, nodata_shadow) {
                    continue;
                }
                if (c - clear).abs() < f64::EPSILON && s < max_shadow {
                    row_data[col] = 1;
                }
            }
            row_data
        })
        .collect();

    let mut mask = cloud.with_same_meta::<u8>(rows, cols);
    *mask.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_requires_both_conditions() {
        // Columns: clear/low shadow, cloudy, deep terrain shadow, shadow at threshold
        let cloud = Raster::from_vec(vec![0.0, 1.0, 0.0, 0.0], 1, 4).unwrap();
        let shadow = Raster::from_vec(vec![20.0, 0.0, 180.0, 100.0], 1, 4).unwrap();

        let mask = clear_sky_mask(&cloud, &shadow, &QualityParams::default()).unwrap();
        let values: Vec<u8> = mask.data().iter().copied().collect();
        assert_eq!(values, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_nodata_is_not_clear() {
        let cloud = Raster::from_vec(vec![0.0, f64::NAN], 1, 2).unwrap();
        let shadow = Raster::from_vec(vec![f64::NAN, 0.0], 1, 2).unwrap();

        let mask = clear_sky_mask(&cloud, &shadow, &QualityParams::default()).unwrap();
        assert_eq!(mask.data().iter().filter(|&&v| v == 1).count(), 0);
    }

    #[test]
    fn test_custom_threshold() {
        let cloud = Raster::filled(2, 2, 0.0);
        let shadow = Raster::filled(2, 2, 60.0);
        let params = QualityParams {
            max_shadow: 50.0,
            ..QualityParams::default()
        };

        let mask = clear_sky_mask(&cloud, &shadow, &params).unwrap();
        assert!(mask.data().iter().all(|&v| v == 0));
    }
}

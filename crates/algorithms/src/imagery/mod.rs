//! Imagery building blocks of the disturbance analysis
//!
//! - Imagery sources: in-memory collections and on-disk catalogs
//! - Quality screening: clear-sky masks from the 10 m quality bands
//! - Masking and nearest-neighbour alignment between grids
//! - Spectral indices (NBR) and band math
//! - Per-pixel median compositing
//! - Change comparison: dNBR and the disturbance threshold

mod band_math;
mod catalog;
mod change_detection;
mod collection;
mod composite;
mod indices;
mod mask;
mod quality;
mod resample;

pub use band_math::{band_math, band_math_binary};
pub use catalog::{Catalog, CatalogScene};
pub use change_detection::{
    delta, disturbance, disturbance_stats, ChangeParams, DisturbanceStats,
    DEFAULT_SEVERITY_THRESHOLD,
};
pub use collection::{
    ImageCollection, ImageRecord, ImagerySource, QualityMasks, Resolution, UnmatchedPolicy,
};
pub use composite::median_composite;
pub use indices::{nbr, normalized_difference};
pub use mask::{align_mask, mask_from_raster, update_mask};
pub use quality::{clear_sky_mask, QualityParams};
pub use resample::resample_nearest;

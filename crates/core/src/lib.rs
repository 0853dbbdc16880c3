//! # nbrwatch core
//!
//! Core types and I/O shared by the nbrwatch crates.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with NaN/no-data aware helpers
//! - `GeoTransform` and `GridSpec`: cell geometry and grid identity
//! - `CRS`: lightweight coordinate reference system tag
//! - `Domain`: the analysis boundary polygon
//! - GeoTIFF reading/writing through the `tiff` crate

pub mod crs;
pub mod domain;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use domain::Domain;
pub use error::{Error, Result};
pub use raster::{GeoTransform, GridSpec, Mask, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::domain::Domain;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, GridSpec, Mask, Raster, RasterElement};
}

//! GeoTIFF reading and writing

mod native;

pub use native::{read_geotiff, read_geotiff_grid, write_geotiff, write_rgba_tiff, GeoTiffOptions};

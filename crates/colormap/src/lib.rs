//! # nbrwatch colormap
//!
//! Color mapping for the layers of a disturbance analysis.
//!
//! - [`Palette`]: hex color lists with multi-stop interpolation
//! - [`VisParams`]: min/max/palette/opacity, with the presets of the NBR,
//!   dNBR and disturbance layers
//! - [`raster_to_rgba`]: single-band raster to an RGBA buffer
//! - [`Style`] and [`StyleRegistry`]: band expressions in the OpenLayers
//!   JSON array form, evaluated per pixel over several input bands
//!
//! ## Usage
//!
//! ```ignore
//! use nbrwatch_colormap::{raster_to_rgba, VisParams};
//!
//! let rgba = raster_to_rgba(&delta, &VisParams::delta());
//! ```

mod error;
mod render;
mod scheme;
mod style;

pub use error::{Result, StyleError};
pub use render::{auto_params, raster_to_rgba, VisParams};
pub use scheme::{Palette, Rgb};
pub use style::{Expr, Normalization, Style, StyleRegistry};

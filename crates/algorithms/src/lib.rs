//! # nbrwatch algorithms
//!
//! Forest disturbance detection from Sentinel-2 imagery using the
//! Normalized Burn Ratio (NBR).
//!
//! ## Modules
//!
//! - **temporal**: reference date validation and pre/post window resolution
//! - **imagery**: quality masks, resolution alignment, NBR, median composites,
//!   dNBR and severity thresholding, image collections and on-disk catalogs
//! - **analysis**: the end-to-end disturbance computation

pub mod analysis;
pub mod imagery;
pub mod temporal;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{
        build_composite, compute_disturbance, AnalysisParams, AnalysisSummary, Composite,
        CompositeReport, DisturbanceResult,
    };
    pub use crate::imagery::{
        delta, disturbance, nbr, Catalog, ChangeParams, ImageCollection, ImageRecord,
        ImagerySource, Resolution, UnmatchedPolicy,
    };
    pub use crate::temporal::{
        parse_reference_date, resolve_windows, AnalysisWindows, DateInputError, TimeWindow,
    };
    pub use nbrwatch_core::prelude::*;
}

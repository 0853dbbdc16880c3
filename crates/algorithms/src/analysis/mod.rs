//! End-to-end disturbance analysis
//!
//! Resolves the pre/post windows of a reference date, builds one masked
//! NBR composite per window and compares them.

mod composite;
mod disturbance;
mod params;
mod summary;

pub use composite::{build_composite, Composite, CompositeReport};
pub use disturbance::{compute_disturbance, DisturbanceResult};
pub use params::{AnalysisParams, NbrBands};
pub use summary::{AnalysisSummary, LegendEntry};

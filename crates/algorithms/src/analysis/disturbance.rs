//! Pre/post comparison of a reference date

use chrono::NaiveDate;
use tracing::info;

use nbrwatch_core::raster::{Mask, Raster};
use nbrwatch_core::{Domain, Result};

use super::composite::{build_composite, Composite};
use super::summary::AnalysisSummary;
use super::AnalysisParams;
use crate::imagery::{delta, disturbance, disturbance_stats, DisturbanceStats, ImagerySource};
use crate::temporal::{resolve_windows, AnalysisWindows};

/// Everything a disturbance analysis produces
#[derive(Debug, Clone)]
pub struct DisturbanceResult {
    pub reference: NaiveDate,
    pub windows: AnalysisWindows,
    pub pre_composite: Composite,
    pub post_composite: Composite,
    /// dNBR, `post - pre`
    pub delta: Raster<f64>,
    /// dNBR at or below the severity threshold, NaN elsewhere
    pub disturbance: Raster<f64>,
    pub pre_year: i32,
    pub post_year: i32,
    pub severity_threshold: f64,
    pub stats: DisturbanceStats,
}

impl DisturbanceResult {
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary::from_result(self)
    }
}

/// Compare the NBR composite of the `params.window_days` following
/// `reference` with the same period one year earlier.
///
/// `reference` must already be validated; see
/// [`parse_reference_date`](crate::temporal::parse_reference_date).
pub fn compute_disturbance<S>(
    source: &S,
    domain: &Domain,
    forest_mask: &Mask,
    reference: NaiveDate,
    params: &AnalysisParams,
) -> Result<DisturbanceResult>
where
    S: ImagerySource + ?Sized,
{
    params.validate()?;

    let windows = resolve_windows(reference, params.window_days)?;
    info!(
        reference = %reference,
        post = %windows.post,
        pre = %windows.pre,
        "analysis windows"
    );

    let post_composite = build_composite(source, &windows.post, domain, forest_mask, params)?;
    let pre_composite = build_composite(source, &windows.pre, domain, forest_mask, params)?;

    let delta = delta(&post_composite.raster, &pre_composite.raster)?;
    let disturbance = disturbance(&delta, params.change_params())?;
    let stats = disturbance_stats(&delta, &disturbance);

    info!(
        valid = stats.valid_cells,
        disturbed = stats.disturbed_cells,
        hectares = stats.disturbed_hectares(),
        "disturbance detected"
    );

    Ok(DisturbanceResult {
        reference,
        pre_year: windows.pre.year(),
        post_year: windows.post.year(),
        windows,
        pre_composite,
        post_composite,
        delta,
        disturbance,
        severity_threshold: params.severity_threshold,
        stats,
    })
}

//! Masked NBR composite of one time window

use serde::Serialize;
use tracing::{debug, info, warn};

use nbrwatch_core::raster::{Mask, Raster};
use nbrwatch_core::{Domain, Result};

use super::AnalysisParams;
use crate::imagery::{
    align_mask, clear_sky_mask, median_composite, nbr, resample_nearest, update_mask,
    ImageRecord, ImagerySource, QualityMasks, Resolution, UnmatchedPolicy,
};
use crate::temporal::TimeWindow;

/// What went into a composite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompositeReport {
    /// 10 m scenes providing quality masks
    pub high_res_records: usize,
    /// 20 m scenes found in the window
    pub low_res_records: usize,
    /// 20 m scenes masked with their 10 m counterpart
    pub masked: usize,
    /// Acquisition keys of 20 m scenes without a 10 m counterpart
    pub unmatched: Vec<String>,
    /// Unmatched scenes left out of the composite
    pub dropped: usize,
}

impl CompositeReport {
    /// Scenes that contributed to the median
    pub fn used(&self) -> usize {
        self.low_res_records - self.dropped
    }
}

/// Median NBR over one window, on the forest-mask grid
#[derive(Debug, Clone)]
pub struct Composite {
    pub raster: Raster<f64>,
    pub window: TimeWindow,
    pub report: CompositeReport,
}

impl Composite {
    /// Cells holding a composite value
    pub fn valid_count(&self) -> usize {
        self.raster.valid_count()
    }
}

/// Build the masked median NBR composite of `window`.
///
/// Each 20 m scene is screened with the clear-sky mask of the 10 m scene
/// of the same acquisition. Scenes without such a counterpart follow
/// `params.unmatched`. The median lies on the grid of `forest_mask`, is
/// clipped to `domain` and keeps forest cells only. A window without any
/// usable scene gives a composite without valid cells.
pub fn build_composite<S>(
    source: &S,
    window: &TimeWindow,
    domain: &Domain,
    forest_mask: &Mask,
    params: &AnalysisParams,
) -> Result<Composite>
where
    S: ImagerySource + ?Sized,
{
    let grid = forest_mask.grid();

    let high = source.query(window, domain, Resolution::High)?;
    let masks = quality_masks(&high, params)?;

    let low = source.query(window, domain, Resolution::Low)?;
    let mut report = CompositeReport {
        high_res_records: high.len(),
        low_res_records: low.len(),
        ..Default::default()
    };

    let mut stack = Vec::with_capacity(low.len());
    for record in &low {
        let nir = record.band(&params.bands.nir)?;
        let swir = record.band(&params.bands.swir)?;
        let index = nbr(nir, swir)?;

        let index = match masks.find_matching_mask(record.key()) {
            Some(mask) => {
                let aligned = align_mask(mask, &index.grid())?;
                report.masked += 1;
                debug!(id = record.id(), "masked with 10m quality bands");
                update_mask(&index, &aligned)?
            }
            None => {
                report.unmatched.push(record.key().to_string());
                match params.unmatched {
                    UnmatchedPolicy::PassThrough => {
                        warn!(id = record.id(), "no 10m counterpart, using scene unmasked");
                        index
                    }
                    UnmatchedPolicy::Drop => {
                        warn!(id = record.id(), "no 10m counterpart, scene dropped");
                        report.dropped += 1;
                        continue;
                    }
                }
            }
        };

        stack.push(resample_nearest(&index, &grid, f64::NAN)?);
    }

    if stack.is_empty() {
        warn!(window = %window, "no usable scenes, composite is empty");
    }

    let median = median_composite(&stack, &grid)?;
    let raster = update_mask(&domain.clip(&median, f64::NAN), forest_mask)?;

    info!(
        window = %window,
        scenes = report.used(),
        masked = report.masked,
        unmatched = report.unmatched.len(),
        valid_cells = raster.valid_count(),
        "NBR composite built"
    );

    Ok(Composite {
        raster,
        window: *window,
        report,
    })
}

fn quality_masks(records: &[ImageRecord], params: &AnalysisParams) -> Result<QualityMasks> {
    let mut masks = QualityMasks::new();
    for record in records {
        let cloud = record.band(&params.quality.cloud_band)?;
        let shadow = record.band(&params.quality.shadow_band)?;
        let mask = clear_sky_mask(cloud, shadow, &params.quality)?;
        debug!(
            id = record.id(),
            clear = mask.data().iter().filter(|&&m| m == 1).count(),
            "clear-sky mask"
        );
        masks.insert(record.key(), mask);
    }
    Ok(masks)
}

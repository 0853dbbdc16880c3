use serde::{Deserialize, Serialize};

use nbrwatch_core::{Error, Result};

use crate::imagery::{ChangeParams, QualityParams, UnmatchedPolicy, DEFAULT_SEVERITY_THRESHOLD};
use crate::temporal::DEFAULT_WINDOW_DAYS;

/// Band names of the NBR inputs in the low-resolution scenes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NbrBands {
    /// Narrow near-infrared
    pub nir: String,
    /// Short-wave infrared
    pub swir: String,
}

impl Default for NbrBands {
    fn default() -> Self {
        Self {
            nir: "B8A".to_string(),
            swir: "B11".to_string(),
        }
    }
}

/// Parameters of a disturbance analysis.
///
/// Deserializes from the `[analysis]` table of a catalog manifest; every
/// field is optional there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Length of each compositing window in days
    pub window_days: u32,
    /// Largest dNBR counted as disturbed
    pub severity_threshold: f64,
    pub quality: QualityParams,
    pub bands: NbrBands,
    /// Handling of 20 m scenes without a 10 m counterpart
    pub unmatched: UnmatchedPolicy,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            severity_threshold: DEFAULT_SEVERITY_THRESHOLD,
            quality: QualityParams::default(),
            bands: NbrBands::default(),
            unmatched: UnmatchedPolicy::default(),
        }
    }
}

impl AnalysisParams {
    /// Threshold settings for the change comparator
    pub fn change_params(&self) -> ChangeParams {
        ChangeParams {
            severity_threshold: self.severity_threshold,
        }
    }

    /// Reject non-finite thresholds
    pub fn validate(&self) -> Result<()> {
        if !self.severity_threshold.is_finite() {
            return Err(Error::InvalidParameter {
                name: "severity_threshold",
                value: self.severity_threshold.to_string(),
                reason: "must be a finite dNBR value".into(),
            });
        }
        if !self.quality.max_shadow.is_finite() {
            return Err(Error::InvalidParameter {
                name: "max_shadow",
                value: self.quality.max_shadow.to_string(),
                reason: "must be finite".into(),
            });
        }
        Ok(())
    }
}

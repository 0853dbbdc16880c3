//! Human-readable account of an analysis: periods, layer names, legend

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::composite::CompositeReport;
use super::disturbance::DisturbanceResult;
use crate::imagery::DisturbanceStats;
use crate::temporal::{format_date, AnalysisWindows};

/// One legend line of the change map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// `#RRGGBB`
    pub color: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub reference: NaiveDate,
    pub windows: AnalysisWindows,
    pub pre_year: i32,
    pub post_year: i32,
    pub severity_threshold: f64,
    pub pre_report: CompositeReport,
    pub post_report: CompositeReport,
    pub stats: DisturbanceStats,
}

impl AnalysisSummary {
    pub fn from_result(result: &DisturbanceResult) -> Self {
        Self {
            reference: result.reference,
            windows: result.windows,
            pre_year: result.pre_year,
            post_year: result.post_year,
            severity_threshold: result.severity_threshold,
            pre_report: result.pre_composite.report.clone(),
            post_report: result.post_composite.report.clone(),
            stats: result.stats,
        }
    }

    pub fn pre_layer_name(&self) -> String {
        format!("NBR: {}", self.pre_year)
    }

    pub fn post_layer_name(&self) -> String {
        format!("NBR: {}", self.post_year)
    }

    pub fn delta_layer_name(&self) -> String {
        format!("NBR: Delta {}/{}", self.pre_year, self.post_year)
    }

    pub fn disturbance_layer_name(&self) -> String {
        format!("Disturbed forest areas (dNBR ≤ {})", self.severity_threshold)
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        vec![
            LegendEntry {
                color: "#D32F2F".into(),
                label: "Decreased NBR (potential disturbance)".into(),
            },
            LegendEntry {
                color: "#1976D2".into(),
                label: "Increased NBR".into(),
            },
            LegendEntry {
                color: "#7B0323".into(),
                label: format!("Severe forest disturbance (dNBR ≤ {})", self.severity_threshold),
            },
        ]
    }
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analysis performed with:")?;
        writeln!(f, "Reference date: {}", format_date(self.reference))?;
        writeln!(f, "Post-disturbance period: {}", self.windows.post)?;
        writeln!(f, "Pre-disturbance period: {}", self.windows.pre)?;
        for (label, report) in [("post", &self.post_report), ("pre", &self.pre_report)] {
            writeln!(
                f,
                "Scenes ({}): {} used of {} (20m), {} masked by {} quality scenes (10m), {} unmatched",
                label,
                report.used(),
                report.low_res_records,
                report.masked,
                report.high_res_records,
                report.unmatched.len()
            )?;
        }
        writeln!(
            f,
            "Disturbed: {} of {} forest cells ({:.2}%), {:.2} ha",
            self.stats.disturbed_cells,
            self.stats.valid_cells,
            self.stats.disturbed_fraction * 100.0,
            self.stats.disturbed_hectares()
        )?;
        writeln!(f, "Layers:")?;
        for name in [
            self.pre_layer_name(),
            self.post_layer_name(),
            self.delta_layer_name(),
            self.disturbance_layer_name(),
        ] {
            writeln!(f, "  {}", name)?;
        }
        writeln!(f, "Legend:")?;
        for entry in self.legend() {
            writeln!(f, "  {} {}", entry.color, entry.label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::resolve_windows;

    fn summary() -> AnalysisSummary {
        let reference = NaiveDate::from_ymd_opt(2021, 6, 21).unwrap();
        let windows = resolve_windows(reference, 60).unwrap();
        AnalysisSummary {
            reference,
            windows,
            pre_year: windows.pre.year(),
            post_year: windows.post.year(),
            severity_threshold: -0.15,
            pre_report: CompositeReport::default(),
            post_report: CompositeReport::default(),
            stats: DisturbanceStats {
                valid_cells: 0,
                disturbed_cells: 0,
                disturbed_fraction: 0.0,
                disturbed_area: 0.0,
            },
        }
    }

    #[test]
    fn test_layer_names() {
        let s = summary();
        assert_eq!(s.pre_layer_name(), "NBR: 2020");
        assert_eq!(s.post_layer_name(), "NBR: 2021");
        assert_eq!(s.delta_layer_name(), "NBR: Delta 2020/2021");
        assert_eq!(s.disturbance_layer_name(), "Disturbed forest areas (dNBR ≤ -0.15)");
    }

    #[test]
    fn test_display_lists_periods() {
        let text = summary().to_string();
        assert!(text.contains("Post-disturbance period: 2021-06-22 to 2021-08-21"));
        assert!(text.contains("Pre-disturbance period: 2020-06-22 to 2020-08-21"));
        assert!(text.contains("#7B0323 Severe forest disturbance (dNBR ≤ -0.15)"));
    }
}

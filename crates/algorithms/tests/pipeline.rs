//! End-to-end disturbance analysis over synthetic in-memory scenes.
//!
//! All scenes cover the same 40 m x 40 m square: 20 m scenes on a 2x2
//! grid, 10 m quality scenes on a 4x4 grid.

use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use nbrwatch_algorithms::analysis::{build_composite, compute_disturbance, AnalysisParams};
use nbrwatch_algorithms::imagery::{
    delta, disturbance, ChangeParams, ImageCollection, ImageRecord, Resolution, UnmatchedPolicy,
};
use nbrwatch_algorithms::temporal::{resolve_windows, TimeWindow};
use nbrwatch_core::{Domain, GeoTransform, Mask, Raster};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn grid_raster(values: Vec<f64>, size: usize, cell: f64) -> Raster<f64> {
    let mut r = Raster::from_vec(values, size, size).unwrap();
    r.set_transform(GeoTransform::new(0.0, 40.0, cell, -cell));
    r.set_nodata(Some(f64::NAN));
    r
}

/// 20 m scene whose NBR is `nbr[i]` in cell `i` (NIR + SWIR = 1)
fn scene_20m(key: &str, acquired: NaiveDate, nbr: [f64; 4]) -> ImageRecord {
    let nir: Vec<f64> = nbr.iter().map(|v| (1.0 + v) / 2.0).collect();
    let swir: Vec<f64> = nbr.iter().map(|v| (1.0 - v) / 2.0).collect();
    ImageRecord::new(format!("{key}20m"), acquired, Resolution::Low)
        .with_band("B8A", grid_raster(nir, 2, 20.0))
        .with_band("B11", grid_raster(swir, 2, 20.0))
}

/// 10 m quality scene, cloudy where `cloudy(row, col)`
fn scene_10m(key: &str, acquired: NaiveDate, cloudy: impl Fn(usize, usize) -> bool) -> ImageRecord {
    let mut cloud = Vec::with_capacity(16);
    for row in 0..4 {
        for col in 0..4 {
            cloud.push(if cloudy(row, col) { 1.0 } else { 0.0 });
        }
    }
    ImageRecord::new(format!("{key}10m"), acquired, Resolution::High)
        .with_band("cloudAndCloudShadowMask", grid_raster(cloud, 4, 10.0))
        .with_band("terrainShadowMask", grid_raster(vec![0.0; 16], 4, 10.0))
}

fn forest(values: [u8; 4]) -> Mask {
    let mut m = Raster::from_vec(values.to_vec(), 2, 2).unwrap();
    m.set_transform(GeoTransform::new(0.0, 40.0, 20.0, -20.0));
    m
}

fn domain() -> Domain {
    Domain::from_bbox(0.0, 0.0, 40.0, 40.0)
}

fn collection(records: Vec<ImageRecord>) -> ImageCollection {
    records.into_iter().collect()
}

#[test]
fn forest_masked_cell_never_valid_downstream() {
    let source = collection(vec![
        scene_20m("20200701_T32TLT_", date(2020, 7, 1), [0.6; 4]),
        scene_10m("20200701_T32TLT_", date(2020, 7, 1), |_, _| false),
        scene_20m("20210701_T32TLT_", date(2021, 7, 1), [0.2, 0.2, 0.55, 0.2]),
        scene_10m("20210701_T32TLT_", date(2021, 7, 1), |_, _| false),
    ]);
    let mask = forest([1, 0, 1, 1]);

    let result = compute_disturbance(
        &source,
        &domain(),
        &mask,
        date(2021, 6, 21),
        &AnalysisParams::default(),
    )
    .unwrap();

    for raster in [
        &result.pre_composite.raster,
        &result.post_composite.raster,
        &result.delta,
        &result.disturbance,
    ] {
        assert!(raster.get(0, 1).unwrap().is_nan());
    }

    assert_abs_diff_eq!(result.delta.get(0, 0).unwrap(), -0.4, epsilon = 1e-9);
    assert_abs_diff_eq!(result.delta.get(1, 0).unwrap(), -0.05, epsilon = 1e-9);

    // -0.05 is above the severity threshold
    assert!(result.disturbance.get(1, 0).unwrap().is_nan());
    assert_eq!(result.stats.valid_cells, 3);
    assert_eq!(result.stats.disturbed_cells, 2);
    assert_eq!(result.pre_year, 2020);
    assert_eq!(result.post_year, 2021);
}

#[test]
fn empty_window_gives_empty_composite() {
    let source = collection(vec![scene_20m("20190701_T32TLT_", date(2019, 7, 1), [0.5; 4])]);
    let windows = resolve_windows(date(2021, 6, 21), 60).unwrap();

    let composite = build_composite(
        &source,
        &windows.post,
        &domain(),
        &forest([1; 4]),
        &AnalysisParams::default(),
    )
    .unwrap();

    assert_eq!(composite.raster.shape(), (2, 2));
    assert_eq!(composite.valid_count(), 0);
    assert_eq!(composite.report.low_res_records, 0);

    let result = compute_disturbance(
        &source,
        &domain(),
        &forest([1; 4]),
        date(2021, 6, 21),
        &AnalysisParams::default(),
    )
    .unwrap();
    assert_eq!(result.stats.valid_cells, 0);
    assert_eq!(result.stats.disturbed_fraction, 0.0);
}

#[test]
fn quality_mask_aligned_from_10m() {
    // Cloud over the 10 m block of 20 m cell (0, 0) in the second scene
    let source = collection(vec![
        scene_20m("20210701_T32TLT_", date(2021, 7, 1), [0.2, 0.2, 0.5, 0.5]),
        scene_10m("20210701_T32TLT_", date(2021, 7, 1), |_, _| false),
        scene_20m("20210711_T32TLT_", date(2021, 7, 11), [0.9; 4]),
        scene_10m("20210711_T32TLT_", date(2021, 7, 11), |r, c| r < 2 && c < 2),
    ]);
    let window = TimeWindow::new(date(2021, 6, 22), date(2021, 8, 21)).unwrap();

    let composite = build_composite(
        &source,
        &window,
        &domain(),
        &forest([1; 4]),
        &AnalysisParams::default(),
    )
    .unwrap();

    assert_abs_diff_eq!(composite.raster.get(0, 0).unwrap(), 0.2, epsilon = 1e-9);
    assert_abs_diff_eq!(composite.raster.get(0, 1).unwrap(), 0.55, epsilon = 1e-9);
    assert_abs_diff_eq!(composite.raster.get(1, 0).unwrap(), 0.7, epsilon = 1e-9);
    assert_eq!(composite.report.masked, 2);
}

#[test]
fn unmatched_scene_follows_policy() {
    let source = collection(vec![
        scene_20m("20210701_T32TLT_", date(2021, 7, 1), [0.4; 4]),
        scene_10m("20210701_T32TLT_", date(2021, 7, 1), |_, _| false),
        scene_20m("20210706_T32TLT_", date(2021, 7, 6), [0.8; 4]),
    ]);
    let window = TimeWindow::new(date(2021, 6, 22), date(2021, 8, 21)).unwrap();

    let passed = build_composite(
        &source,
        &window,
        &domain(),
        &forest([1; 4]),
        &AnalysisParams::default(),
    )
    .unwrap();
    assert_abs_diff_eq!(passed.raster.get(0, 0).unwrap(), 0.6, epsilon = 1e-9);
    assert_eq!(passed.report.unmatched, vec!["20210706_T32TLT_".to_string()]);
    assert_eq!(passed.report.dropped, 0);

    let params = AnalysisParams {
        unmatched: UnmatchedPolicy::Drop,
        ..Default::default()
    };
    let dropped = build_composite(&source, &window, &domain(), &forest([1; 4]), &params).unwrap();
    assert_abs_diff_eq!(dropped.raster.get(0, 0).unwrap(), 0.4, epsilon = 1e-9);
    assert_eq!(dropped.report.dropped, 1);
}

#[test]
fn composite_clipped_to_domain() {
    let source = collection(vec![scene_20m("20210701_T32TLT_", date(2021, 7, 1), [0.5; 4])]);
    let window = TimeWindow::new(date(2021, 6, 22), date(2021, 8, 21)).unwrap();
    let left_half = Domain::from_bbox(0.0, 0.0, 20.0, 40.0);

    let composite = build_composite(
        &source,
        &window,
        &left_half,
        &forest([1; 4]),
        &AnalysisParams::default(),
    )
    .unwrap();

    assert!(!composite.raster.get(0, 0).unwrap().is_nan());
    assert!(composite.raster.get(0, 1).unwrap().is_nan());
    assert_eq!(composite.valid_count(), 2);
}

#[test]
fn threshold_is_inclusive() {
    let post = grid_raster(vec![0.3, 0.55, 0.6, f64::NAN], 2, 20.0);
    let pre = grid_raster(vec![0.6, 0.6, 0.6, 0.6], 2, 20.0);

    let d = delta(&post, &pre).unwrap();
    let flagged = disturbance(&d, ChangeParams { severity_threshold: -0.1 }).unwrap();

    assert!(!flagged.get(0, 0).unwrap().is_nan());
    assert!(flagged.get(0, 1).unwrap().is_nan());
    assert!(flagged.get(1, 0).unwrap().is_nan());
    assert!(flagged.get(1, 1).unwrap().is_nan());

    let exact = grid_raster(vec![-0.15, -0.1500001, -0.1499999, 0.0], 2, 20.0);
    let flagged = disturbance(&exact, ChangeParams::default()).unwrap();
    assert_eq!(flagged.get(0, 0).unwrap(), -0.15);
    assert!(!flagged.get(0, 1).unwrap().is_nan());
    assert!(flagged.get(1, 0).unwrap().is_nan());
    assert!(flagged.get(1, 1).unwrap().is_nan());
}

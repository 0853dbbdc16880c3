//! Disturbance analysis over an on-disk catalog of GeoTIFF scenes.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use chrono::NaiveDate;
use nbrwatch_algorithms::analysis::compute_disturbance;
use nbrwatch_algorithms::imagery::{Catalog, ImagerySource, Resolution, UnmatchedPolicy};
use nbrwatch_algorithms::temporal::TimeWindow;
use nbrwatch_core::io::write_geotiff;
use nbrwatch_core::{Domain, Error, GeoTransform, Raster, CRS};
use tiff::encoder::colortype::{ColorType, Gray32Float, Gray64, Gray8};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write_band(dir: &Path, name: &str, size: usize, cell: f64, value: f64) {
    let mut r = Raster::filled(size, size, value);
    r.set_transform(GeoTransform::new(2_600_000.0, 1_200_040.0, cell, -cell));
    r.set_crs(Some(CRS::from_epsg(2056)));
    write_geotiff(&r, dir.join(name), None).unwrap();
}

/// Single-band GeoTIFF on the 2x2 20 m grid declaring `nodata` through GDAL_NODATA
fn write_tagged<C>(path: &Path, values: &[C::Inner], nodata: &str)
where
    C: ColorType,
    [C::Inner]: TiffValue,
{
    let file = BufWriter::new(File::create(path).unwrap());
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<C>(2, 2).unwrap();
    let scale = [20.0, 20.0, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, 2_600_000.0, 1_200_040.0, 0.0];
    let geokeys: [u16; 8] = [1, 1, 0, 1, 3072, 0, 1, 2056];
    image.encoder().write_tag(Tag::Unknown(33550), &scale[..]).unwrap();
    image.encoder().write_tag(Tag::Unknown(33922), &tiepoint[..]).unwrap();
    image.encoder().write_tag(Tag::Unknown(34735), &geokeys[..]).unwrap();
    image.encoder().write_tag(Tag::Unknown(42113), nodata).unwrap();
    image.write_data(values).unwrap();
}

fn drop_missing_scene(dir: &Path) {
    let manifest = fs::read_to_string(dir.join("catalog.toml")).unwrap();
    let trimmed = manifest
        .split("[[scenes]]")
        .filter(|block| !block.contains("missing.tif"))
        .collect::<Vec<_>>()
        .join("[[scenes]]");
    fs::write(dir.join("catalog.toml"), trimmed).unwrap();
}

/// Pre scene with NBR 0.6 (DN scaled by 1e-4), post scene with NBR 0.2,
/// a clear 10 m counterpart for the post scene and a forest mask.
fn write_archive(dir: &Path) {
    fs::create_dir_all(dir.join("s2")).unwrap();
    write_band(dir, "s2/pre_B8A.tif", 2, 20.0, 8000.0);
    write_band(dir, "s2/pre_B11.tif", 2, 20.0, 2000.0);
    write_band(dir, "s2/post_B8A.tif", 2, 20.0, 6000.0);
    write_band(dir, "s2/post_B11.tif", 2, 20.0, 4000.0);
    write_band(dir, "s2/post_cloud.tif", 4, 10.0, 0.0);
    write_band(dir, "s2/post_shadow.tif", 4, 10.0, 20.0);
    write_band(dir, "forest.tif", 2, 20.0, 1.0);

    let manifest = r#"
forest_mask = "forest.tif"

[domain]
bbox = [2600000.0, 1200000.0, 2600040.0, 1200040.0]

[analysis]
window_days = 60
unmatched = "pass-through"

[[scenes]]
id = "20200701_T32TLT_20m"
date = "2020-07-01"
scale = 0.0001
bands = { B8A = "s2/pre_B8A.tif", B11 = "s2/pre_B11.tif" }

[[scenes]]
id = "20210701_T32TLT_20m"
date = "2021-07-01"
scale = 0.0001
bands = { B8A = "s2/post_B8A.tif", B11 = "s2/post_B11.tif" }

[[scenes]]
id = "20210701_T32TLT_10m"
date = "2021-07-01"
bands = { cloudAndCloudShadowMask = "s2/post_cloud.tif", terrainShadowMask = "s2/post_shadow.tif" }

[[scenes]]
id = "20210705_T32TLT_20m"
date = "2021-07-05"
bands = { B8A = "s2/missing.tif", B11 = "s2/missing.tif" }
"#;
    fs::write(dir.join("catalog.toml"), manifest).unwrap();
}

#[test]
fn catalog_query_reads_matching_scenes() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());
    let catalog = Catalog::load(dir.path().join("catalog.toml")).unwrap();

    let window = TimeWindow::new(date(2020, 6, 22), date(2020, 8, 21)).unwrap();
    let records = catalog
        .query(&window, catalog.domain(), Resolution::Low)
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key(), "20200701_T32TLT_");
    let nir = records[0].band("B8A").unwrap();
    assert!((nir.get(0, 0).unwrap() - 0.8).abs() < 1e-6);
    assert_eq!(nir.crs().map(CRS::epsg), Some(2056));
}

#[test]
fn missing_band_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());
    let catalog = Catalog::load(dir.path().join("catalog.toml")).unwrap();

    let result = compute_disturbance(
        &catalog,
        catalog.domain(),
        &catalog.forest_mask().unwrap(),
        date(2021, 6, 21),
        &catalog.analysis_params(),
    );
    assert!(matches!(result, Err(Error::Catalog(_))));
}

#[test]
fn catalog_analysis_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());
    drop_missing_scene(dir.path());

    let catalog = Catalog::load(dir.path().join("catalog.toml")).unwrap();
    let params = catalog.analysis_params();
    assert_eq!(params.unmatched, UnmatchedPolicy::PassThrough);

    let forest = catalog.forest_mask().unwrap();
    let result =
        compute_disturbance(&catalog, catalog.domain(), &forest, date(2021, 6, 21), &params)
            .unwrap();

    assert_eq!(result.post_composite.report.masked, 1);
    assert_eq!(result.pre_composite.report.unmatched.len(), 1);
    assert!((result.delta.get(0, 0).unwrap() + 0.4).abs() < 1e-6);
    assert_eq!(result.stats.disturbed_cells, 4);
    assert!((result.stats.disturbed_area - 1600.0).abs() < 1e-6);
}

#[test]
fn domain_outside_archive_selects_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());
    let catalog = Catalog::load(dir.path().join("catalog.toml")).unwrap();

    let window = TimeWindow::new(date(2021, 6, 22), date(2021, 8, 21)).unwrap();
    let elsewhere = Domain::from_bbox(0.0, 0.0, 100.0, 100.0);
    let records = catalog.query(&window, &elsewhere, Resolution::High).unwrap();
    assert!(records.is_empty());
}

#[test]
fn forest_mask_nodata_cells_stay_invalid() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());
    drop_missing_scene(dir.path());
    write_tagged::<Gray8>(&dir.path().join("forest.tif"), &[1, 255, 1, 0], "255");

    let catalog = Catalog::load(dir.path().join("catalog.toml")).unwrap();
    let forest = catalog.forest_mask().unwrap();
    assert_eq!(forest.data().iter().filter(|&&v| v == 1).count(), 2);

    let result = compute_disturbance(
        &catalog,
        catalog.domain(),
        &forest,
        date(2021, 6, 21),
        &catalog.analysis_params(),
    )
    .unwrap();

    for layer in [
        &result.post_composite.raster,
        &result.pre_composite.raster,
        &result.delta,
        &result.disturbance,
    ] {
        assert!(layer.get(0, 1).unwrap().is_nan());
        assert!(layer.get(1, 1).unwrap().is_nan());
    }
    assert_eq!(result.stats.disturbed_cells, 2);
}

#[test]
fn declared_band_sentinel_is_not_reflectance() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());
    drop_missing_scene(dir.path());
    write_tagged::<Gray32Float>(
        &dir.path().join("s2/post_B8A.tif"),
        &[-9999.0, 6000.0, 6000.0, 6000.0],
        "-9999",
    );

    let catalog = Catalog::load(dir.path().join("catalog.toml")).unwrap();
    let window = TimeWindow::new(date(2021, 6, 22), date(2021, 8, 21)).unwrap();
    let records = catalog
        .query(&window, catalog.domain(), Resolution::Low)
        .unwrap();
    let nir = records[0].band("B8A").unwrap();
    assert!(nir.get(0, 0).unwrap().is_nan());
    assert!((nir.get(0, 1).unwrap() - 0.6).abs() < 1e-6);

    let result = compute_disturbance(
        &catalog,
        catalog.domain(),
        &catalog.forest_mask().unwrap(),
        date(2021, 6, 21),
        &catalog.analysis_params(),
    )
    .unwrap();
    assert!(result.post_composite.raster.get(0, 0).unwrap().is_nan());
    assert!(result.delta.get(0, 0).unwrap().is_nan());
    assert_eq!(result.stats.disturbed_cells, 3);
}

#[test]
fn scenes_outside_domain_are_screened_by_header() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());
    // 64-bit integer pixels: the header reads fine, decoding the band fails
    write_tagged::<Gray64>(&dir.path().join("s2/wide.tif"), &[0, 0, 0, 0], "0");
    let mut manifest = fs::read_to_string(dir.path().join("catalog.toml")).unwrap();
    manifest.push_str(
        r#"
[[scenes]]
id = "20210710_T32TLT_10m"
date = "2021-07-10"
bands = { cloudAndCloudShadowMask = "s2/wide.tif", terrainShadowMask = "s2/wide.tif" }
"#,
    );
    fs::write(dir.path().join("catalog.toml"), manifest).unwrap();

    let catalog = Catalog::load(dir.path().join("catalog.toml")).unwrap();
    let window = TimeWindow::new(date(2021, 6, 22), date(2021, 8, 21)).unwrap();

    let elsewhere = Domain::from_bbox(0.0, 0.0, 100.0, 100.0);
    assert!(catalog
        .query(&window, &elsewhere, Resolution::High)
        .unwrap()
        .is_empty());
    assert!(matches!(
        catalog.query(&window, catalog.domain(), Resolution::High),
        Err(Error::UnsupportedDataType(_))
    ));
}

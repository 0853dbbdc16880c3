//! Image records, in-memory collections and the imagery source seam

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use nbrwatch_core::raster::{GridSpec, Mask, Raster};
use nbrwatch_core::{Domain, Error, Result};

use crate::temporal::TimeWindow;

/// Resolution tier of a Sentinel-2 scene export.
///
/// Each acquisition is archived twice: the 10 m export carries the
/// quality bands, the 20 m export the red-edge/SWIR bands used for NBR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// 10 m tier (quality bands)
    High,
    /// 20 m tier (B8A, B11)
    Low,
}

impl Resolution {
    /// Suffix terminating the image id of this tier
    pub fn suffix(&self) -> &'static str {
        match self {
            Resolution::High => "10m",
            Resolution::Low => "20m",
        }
    }

    /// Tier encoded in an image id, if any
    pub fn from_id(id: &str) -> Option<Self> {
        [Resolution::High, Resolution::Low]
            .into_iter()
            .find(|r| id.ends_with(r.suffix()))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// One scene export: an acquisition at one resolution tier with its bands
#[derive(Debug, Clone)]
pub struct ImageRecord {
    id: String,
    acquired: NaiveDate,
    resolution: Resolution,
    bands: BTreeMap<String, Raster<f64>>,
}

impl ImageRecord {
    /// Create a record without bands
    pub fn new(id: impl Into<String>, acquired: NaiveDate, resolution: Resolution) -> Self {
        Self {
            id: id.into(),
            acquired,
            resolution,
            bands: BTreeMap::new(),
        }
    }

    /// Builder-style band insertion
    pub fn with_band(mut self, name: impl Into<String>, raster: Raster<f64>) -> Self {
        self.insert_band(name, raster);
        self
    }

    /// Add or replace a band
    pub fn insert_band(&mut self, name: impl Into<String>, raster: Raster<f64>) {
        self.bands.insert(name.into(), raster);
    }

    /// Full image id, including the resolution suffix
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acquisition date
    pub fn acquired(&self) -> NaiveDate {
        self.acquired
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Acquisition key shared by both tiers of the same acquisition: the
    /// id without its resolution suffix.
    pub fn key(&self) -> &str {
        self.id
            .strip_suffix(self.resolution.suffix())
            .unwrap_or(&self.id)
    }

    /// Band names in sorted order
    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    /// Look up a band by name
    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands.get(name).ok_or_else(|| Error::MissingBand {
            image: self.id.clone(),
            band: name.to_string(),
        })
    }

    /// Grid of the first band; `None` for a record without bands
    pub fn grid(&self) -> Option<GridSpec> {
        self.bands.values().next().map(Raster::grid)
    }

    /// Whether any band footprint overlaps the domain
    pub fn intersects(&self, domain: &Domain) -> bool {
        self.bands.values().any(|b| domain.intersects_grid(&b.grid()))
    }
}

/// Access to archived imagery.
///
/// Returns every record of `resolution` acquired inside `window` whose
/// footprint intersects `domain`.
pub trait ImagerySource {
    fn query(
        &self,
        window: &TimeWindow,
        domain: &Domain,
        resolution: Resolution,
    ) -> Result<Vec<ImageRecord>>;
}

/// Records held in memory
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    records: Vec<ImageRecord>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ImageRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter()
    }

    /// Records matching a query, borrowed
    pub fn filter<'a>(
        &'a self,
        window: &'a TimeWindow,
        domain: &'a Domain,
        resolution: Resolution,
    ) -> impl Iterator<Item = &'a ImageRecord> + 'a {
        self.records.iter().filter(move |r| {
            r.resolution() == resolution && window.contains(r.acquired()) && r.intersects(domain)
        })
    }
}

impl FromIterator<ImageRecord> for ImageCollection {
    fn from_iter<I: IntoIterator<Item = ImageRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl ImagerySource for ImageCollection {
    fn query(
        &self,
        window: &TimeWindow,
        domain: &Domain,
        resolution: Resolution,
    ) -> Result<Vec<ImageRecord>> {
        Ok(self.filter(window, domain, resolution).cloned().collect())
    }
}

/// Clear-sky masks of the high-resolution scenes, by acquisition key
#[derive(Debug, Clone, Default)]
pub struct QualityMasks {
    masks: HashMap<String, Mask>,
}

impl QualityMasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, mask: Mask) {
        self.masks.insert(key.into(), mask);
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Mask of the high-resolution scene sharing `key`, if one was acquired
    pub fn find_matching_mask(&self, key: &str) -> Option<&Mask> {
        self.masks.get(key)
    }
}

/// What to do with a low-resolution scene that has no high-resolution
/// counterpart, and therefore no quality mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmatchedPolicy {
    /// Use the scene unmasked
    #[default]
    PassThrough,
    /// Leave the scene out of the composite
    Drop,
}

impl std::str::FromStr for UnmatchedPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pass-through" | "passthrough" | "keep" => Ok(UnmatchedPolicy::PassThrough),
            "drop" | "exclude" => Ok(UnmatchedPolicy::Drop),
            other => Err(Error::InvalidParameter {
                name: "unmatched",
                value: other.to_string(),
                reason: "use pass-through or drop".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbrwatch_core::GeoTransform;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn band_at(origin_x: f64) -> Raster<f64> {
        let mut r = Raster::filled(5, 5, 0.3);
        r.set_transform(GeoTransform::new(origin_x, 100.0, 20.0, -20.0));
        r
    }

    #[test]
    fn test_keys_pair_across_tiers() {
        let high = ImageRecord::new("20210701_T32TLT_10m", date(2021, 7, 1), Resolution::High);
        let low = ImageRecord::new("20210701_T32TLT_20m", date(2021, 7, 1), Resolution::Low);
        assert_eq!(high.key(), low.key());
        assert_eq!(Resolution::from_id(high.id()), Some(Resolution::High));
        assert_eq!(Resolution::from_id("20210701"), None);
    }

    #[test]
    fn test_missing_band() {
        let r = ImageRecord::new("a_20m", date(2021, 7, 1), Resolution::Low);
        assert!(matches!(r.band("B11"), Err(Error::MissingBand { .. })));
    }

    #[test]
    fn test_collection_query() {
        let window = TimeWindow::new(date(2021, 6, 22), date(2021, 8, 21)).unwrap();
        let domain = Domain::from_bbox(0.0, 0.0, 100.0, 100.0);

        let collection: ImageCollection = vec![
            ImageRecord::new("in_20m", date(2021, 7, 1), Resolution::Low).with_band("B8A", band_at(0.0)),
            ImageRecord::new("late_20m", date(2021, 8, 21), Resolution::Low).with_band("B8A", band_at(0.0)),
            ImageRecord::new("far_20m", date(2021, 7, 1), Resolution::Low).with_band("B8A", band_at(5000.0)),
            ImageRecord::new("in_10m", date(2021, 7, 1), Resolution::High).with_band("B8A", band_at(0.0)),
        ]
        .into_iter()
        .collect();

        let hits = collection.query(&window, &domain, Resolution::Low).unwrap();
        let ids: Vec<&str> = hits.iter().map(ImageRecord::id).collect();
        assert_eq!(ids, vec!["in_20m"]);
    }

    #[test]
    fn test_find_matching_mask() {
        let mut masks = QualityMasks::new();
        masks.insert("20210701_T32TLT_", Raster::filled(2, 2, 1u8));

        assert!(masks.find_matching_mask("20210701_T32TLT_").is_some());
        assert!(masks.find_matching_mask("20210706_T32TLT_").is_none());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("drop".parse::<UnmatchedPolicy>().unwrap(), UnmatchedPolicy::Drop);
        assert_eq!(
            "pass-through".parse::<UnmatchedPolicy>().unwrap(),
            UnmatchedPolicy::PassThrough
        );
        assert!("strict".parse::<UnmatchedPolicy>().is_err());
    }
}

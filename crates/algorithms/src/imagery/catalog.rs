//! On-disk scene catalog described by a TOML manifest
//!
//! ```toml
//! forest_mask = "forest_2018.tif"
//! epsg = 2056
//!
//! [domain]
//! bbox = [2485000.0, 1075000.0, 2834000.0, 1296000.0]
//!
//! [analysis]
//! window_days = 60
//!
//! [[scenes]]
//! id = "20210701_T32TLT_20m"
//! date = "2021-07-01"
//! scale = 0.0001
//! bands = { B8A = "s2/20210701_B8A.tif", B11 = "s2/20210701_B11.tif" }
//! ```
//!
//! Relative paths resolve against the manifest's directory. A query screens
//! in-window scenes by the GeoTIFF headers of their bands; pixel data is
//! only read for scenes whose footprint overlaps the domain.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use nbrwatch_core::crs::CRS;
use nbrwatch_core::domain::DomainSpec;
use nbrwatch_core::io::{read_geotiff, read_geotiff_grid};
use nbrwatch_core::raster::{Mask, Raster};
use nbrwatch_core::{Domain, Error, Result};

use super::band_math::band_math;
use super::collection::{ImageRecord, ImagerySource, Resolution};
use super::mask::mask_from_raster;
use crate::analysis::AnalysisParams;
use crate::temporal::{parse_date, TimeWindow};

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    forest_mask: PathBuf,
    domain: DomainSpec,
    #[serde(default)]
    epsg: Option<u32>,
    #[serde(default)]
    analysis: Option<AnalysisParams>,
    #[serde(default)]
    scenes: Vec<SceneEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct SceneEntry {
    id: String,
    date: String,
    #[serde(default)]
    resolution: Option<Resolution>,
    #[serde(default)]
    scale: Option<f64>,
    bands: BTreeMap<String, PathBuf>,
}

/// A scene listed in the manifest, with its band paths resolved
#[derive(Debug, Clone)]
pub struct CatalogScene {
    pub id: String,
    pub acquired: chrono::NaiveDate,
    pub resolution: Resolution,
    pub scale: Option<f64>,
    pub bands: BTreeMap<String, PathBuf>,
}

/// Scenes, forest mask and domain of one archive
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    forest_mask: PathBuf,
    domain: Domain,
    crs: Option<CRS>,
    analysis: Option<AnalysisParams>,
    scenes: Vec<CatalogScene>,
}

impl Catalog {
    /// Load and validate a manifest
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_toml(&text, root)
    }

    /// Parse a manifest whose relative paths resolve against `root`
    pub fn from_toml(text: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let manifest: Manifest =
            toml::from_str(text).map_err(|e| Error::Catalog(e.to_string()))?;

        let domain = Domain::from_spec(&manifest.domain)?;
        let mut scenes = Vec::with_capacity(manifest.scenes.len());
        for entry in manifest.scenes {
            let acquired = parse_date(&entry.date).map_err(|e| {
                Error::Catalog(format!("scene {}: {}", entry.id, e))
            })?;
            let resolution = match entry.resolution.or_else(|| Resolution::from_id(&entry.id)) {
                Some(r) => r,
                None => {
                    return Err(Error::Catalog(format!(
                        "scene {}: resolution missing and id has no 10m/20m suffix",
                        entry.id
                    )))
                }
            };
            let bands = entry
                .bands
                .into_iter()
                .map(|(name, p)| (name, resolve(&root, &p)))
                .collect();
            scenes.push(CatalogScene {
                id: entry.id,
                acquired,
                resolution,
                scale: entry.scale,
                bands,
            });
        }

        Ok(Self {
            forest_mask: resolve(&root, &manifest.forest_mask),
            root,
            domain,
            crs: manifest.epsg.map(CRS::from_epsg),
            analysis: manifest.analysis,
            scenes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn scenes(&self) -> &[CatalogScene] {
        &self.scenes
    }

    /// Analysis parameters from the `[analysis]` table, defaults otherwise
    pub fn analysis_params(&self) -> AnalysisParams {
        self.analysis.clone().unwrap_or_default()
    }

    /// Read the forest-extent raster as a keep/exclude mask
    pub fn forest_mask(&self) -> Result<Mask> {
        let raster = self.read_band(&self.forest_mask)?;
        Ok(mask_from_raster(&raster))
    }

    fn read_band(&self, path: &Path) -> Result<Raster<f64>> {
        let mut raster: Raster<f64> = read_geotiff(path).map_err(|e| with_path(path, e))?;
        if raster.crs().is_none() {
            raster.set_crs(self.crs.clone());
        }
        Ok(raster)
    }

    fn load_scene(&self, scene: &CatalogScene) -> Result<ImageRecord> {
        let mut record = ImageRecord::new(scene.id.clone(), scene.acquired, scene.resolution);
        for (name, path) in &scene.bands {
            let mut band = self.read_band(path)?;
            if let Some(scale) = scene.scale {
                band = band_math(&band, |v| v * scale)?;
            }
            record.insert_band(name.clone(), band);
        }
        Ok(record)
    }

    /// Whether any band footprint overlaps `domain`, from headers only
    fn scene_overlaps(&self, scene: &CatalogScene, domain: &Domain) -> Result<bool> {
        for path in scene.bands.values() {
            let grid = read_geotiff_grid(path).map_err(|e| with_path(path, e))?;
            if domain.intersects_grid(&grid) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl ImagerySource for Catalog {
    fn query(
        &self,
        window: &TimeWindow,
        domain: &Domain,
        resolution: Resolution,
    ) -> Result<Vec<ImageRecord>> {
        let mut records = Vec::new();
        for scene in self
            .scenes
            .iter()
            .filter(|s| s.resolution == resolution && window.contains(s.acquired))
        {
            if !self.scene_overlaps(scene, domain)? {
                debug!(id = %scene.id, "scene outside domain");
                continue;
            }
            records.push(self.load_scene(scene)?);
            debug!(id = %scene.id, bands = scene.bands.len(), "loaded scene");
        }
        Ok(records)
    }
}

/// Missing or unreadable files become catalog errors naming the file
fn with_path(path: &Path, err: Error) -> Error {
    match err {
        Error::Io(io) => Error::Catalog(format!("{}: {}", path.display(), io)),
        other => other,
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

//! Analysis domain: the boundary inside which imagery is selected and
//! composites are kept.

use geo::{BoundingRect, Contains, Coord, Intersects, LineString, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::{GridSpec, Raster, RasterElement};

/// Geographic domain of an analysis (for the Swiss archive, the national
/// boundary buffered by 5 km), in the CRS of the imagery.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    boundary: Polygon<f64>,
}

/// Serializable domain description as found in catalog manifests.
///
/// Either a closed exterior ring or an axis-aligned bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainSpec {
    Ring { ring: Vec<[f64; 2]> },
    BBox { bbox: [f64; 4] },
}

impl Domain {
    /// Domain covering `[min_x, max_x] x [min_y, max_y]`
    pub fn from_bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let rect = Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        );
        Self {
            boundary: rect.to_polygon(),
        }
    }

    /// Domain bounded by an exterior ring; the ring is closed if needed.
    pub fn from_ring(ring: &[[f64; 2]]) -> Result<Self> {
        if ring.len() < 3 {
            return Err(Error::InvalidParameter {
                name: "ring",
                value: format!("{} vertices", ring.len()),
                reason: "a boundary needs at least 3 vertices".into(),
            });
        }
        let coords: Vec<Coord<f64>> = ring.iter().map(|&[x, y]| Coord { x, y }).collect();
        Ok(Self {
            boundary: Polygon::new(LineString::new(coords), vec![]),
        })
    }

    pub fn from_polygon(boundary: Polygon<f64>) -> Self {
        Self { boundary }
    }

    pub fn from_spec(spec: &DomainSpec) -> Result<Self> {
        match spec {
            DomainSpec::Ring { ring } => Self::from_ring(ring),
            DomainSpec::BBox { bbox: [min_x, min_y, max_x, max_y] } => {
                Ok(Self::from_bbox(*min_x, *min_y, *max_x, *max_y))
            }
        }
    }

    pub fn boundary(&self) -> &Polygon<f64> {
        &self.boundary
    }

    /// Envelope of the boundary, `None` for a degenerate polygon
    pub fn envelope(&self) -> Option<Rect<f64>> {
        self.boundary.bounding_rect()
    }

    /// Whether a map coordinate lies inside the domain
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.boundary.contains(&Point::new(x, y))
    }

    /// Whether any part of a grid's extent overlaps the domain
    pub fn intersects_grid(&self, grid: &GridSpec) -> bool {
        let (min_x, min_y, max_x, max_y) = grid.transform.bounds(grid.cols, grid.rows);
        let footprint = Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        );
        self.boundary.intersects(&footprint)
    }

    /// Per-cell membership mask for `grid`, tested at cell centers
    pub fn cell_mask(&self, grid: &GridSpec) -> Raster<u8> {
        let mut mask = Raster::from_grid(grid, 0u8);
        for ((row, col), cell) in mask.data_mut().indexed_iter_mut() {
            let (x, y) = grid.transform.pixel_to_geo(col, row);
            if self.contains_point(x, y) {
                *cell = 1;
            }
        }
        mask
    }

    /// Replace every cell whose center lies outside the domain with `fill`
    pub fn clip<T: RasterElement>(&self, raster: &Raster<T>, fill: T) -> Raster<T> {
        let transform = *raster.transform();
        let mut out = raster.clone();
        for ((row, col), cell) in out.data_mut().indexed_iter_mut() {
            let (x, y) = transform.pixel_to_geo(col, row);
            if !self.contains_point(x, y) {
                *cell = fill;
            }
        }
        out
    }
}

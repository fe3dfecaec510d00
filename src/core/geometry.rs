//! Vector inputs: the region of interest and the fault set.
//!
//! The buffered union of all faults is never materialized as a polygon. A point belongs to
//! the union exactly when its distance to the nearest fault is within the buffer distance,
//! which is what the rasterized near-fault layer needs.
use geo::{BoundingRect, Closest, ClosestPoint, Contains, Coord, Geometry, Intersects, MultiPolygon, Point, Rect};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::core::raster::{Band, GridSpec};
use crate::error::{Error, Result};

/// Area of interest; every regional statistic is restricted to pixels whose centre lies inside.
#[derive(Debug, Clone)]
pub struct Region {
    shape: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl Region {
    pub fn new(shape: MultiPolygon<f64>) -> Result<Self> {
        let bounds = shape.bounding_rect().ok_or_else(|| Error::MissingInput {
            what: "region geometry (no polygons)".to_string(),
        })?;
        Ok(Self { shape, bounds })
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        self.shape.contains(&Point::new(x, y))
    }

    /// Whether a scene footprint touches the region at all.
    pub fn intersects_rect(&self, footprint: &Rect<f64>) -> bool {
        self.bounds.intersects(footprint) && self.shape.intersects(&footprint.to_polygon())
    }

    /// Pixel-centre membership mask on `grid`. Fails when no pixel falls inside.
    pub fn mask(&self, grid: &GridSpec) -> Result<Array2<bool>> {
        let (rows, cols) = grid.shape();
        let cells: Vec<bool> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..cols).map(move |col| {
                    let (x, y) = grid.pixel_center(row, col);
                    rect_contains(&self.bounds, x, y) && self.contains_xy(x, y)
                })
            })
            .collect();
        let inside = cells.iter().filter(|&&c| c).count();
        if inside == 0 {
            return Err(Error::EmptyRegion);
        }
        debug!("Region covers {} of {} grid pixels", inside, rows * cols);
        Array2::from_shape_vec((rows, cols), cells).map_err(Error::backend)
    }
}

/// Structural faults as lines and/or polygons in the analysis CRS.
#[derive(Debug, Clone)]
pub struct FaultSet {
    geometries: Vec<Geometry<f64>>,
}

impl FaultSet {
    pub fn new(geometries: Vec<Geometry<f64>>) -> Result<Self> {
        if geometries.is_empty() {
            return Err(Error::MissingInput {
                what: "fault geometries (empty set)".to_string(),
            });
        }
        Ok(Self { geometries })
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn geometries(&self) -> &[Geometry<f64>] {
        &self.geometries
    }

    /// Union of every fault buffered by `distance`.
    pub fn buffer(&self, distance: f64) -> FaultBuffer<'_> {
        let envelopes = self
            .geometries
            .iter()
            .map(|g| g.bounding_rect().map(|r| expand(r, distance)))
            .collect();
        FaultBuffer {
            faults: self,
            distance,
            envelopes,
        }
    }
}

/// Buffered union of a fault set.
#[derive(Debug, Clone)]
pub struct FaultBuffer<'a> {
    faults: &'a FaultSet,
    distance: f64,
    envelopes: Vec<Option<Rect<f64>>>,
}

impl FaultBuffer<'_> {
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        let p = Point::new(x, y);
        self.faults
            .geometries
            .iter()
            .zip(&self.envelopes)
            .any(|(geometry, envelope)| match envelope {
                Some(env) if !rect_contains(env, x, y) => false,
                _ => distance_to(geometry, &p) <= self.distance,
            })
    }

    /// Binary near-fault layer on `grid`: 1 inside the union, 0 everywhere else, never masked.
    pub fn rasterize(&self, grid: &GridSpec) -> Result<Band> {
        let (rows, cols) = grid.shape();
        let cells: Vec<f64> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..cols).map(move |col| {
                    let (x, y) = grid.pixel_center(row, col);
                    if self.contains_xy(x, y) { 1.0 } else { 0.0 }
                })
            })
            .collect();
        let data = Array2::from_shape_vec((rows, cols), cells).map_err(Error::backend)?;
        Ok(Band {
            mask: Array2::from_elem((rows, cols), true),
            data,
        })
    }
}

fn rect_contains(rect: &Rect<f64>, x: f64, y: f64) -> bool {
    x >= rect.min().x && x <= rect.max().x && y >= rect.min().y && y <= rect.max().y
}

fn expand(rect: Rect<f64>, by: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - by,
            y: rect.min().y - by,
        },
        Coord {
            x: rect.max().x + by,
            y: rect.max().y + by,
        },
    )
}

/// Planar distance from `p` to the geometry; zero inside areal geometries.
fn distance_to(geometry: &Geometry<f64>, p: &Point<f64>) -> f64 {
    match geometry {
        Geometry::Polygon(poly) if poly.contains(p) => 0.0,
        Geometry::MultiPolygon(mp) if mp.contains(p) => 0.0,
        Geometry::GeometryCollection(gc) => gc
            .iter()
            .map(|g| distance_to(g, p))
            .fold(f64::INFINITY, f64::min),
        other => match other.closest_point(p) {
            Closest::Intersection(_) => 0.0,
            Closest::SinglePoint(q) => (p.x() - q.x()).hypot(p.y() - q.y()),
            Closest::Indeterminate => f64::INFINITY,
        },
    }
}

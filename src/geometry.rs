//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

//! Coordinate validation and boundary normalization for map-drawn shapes.
//!
//! All coordinates are WGS84 decimal degrees. Latitude is treated as the `y`
//! axis and longitude as the `x` axis wherever planar math is needed.

use earcutr::earcut;
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// A boundary needs at least this many distinct vertices
pub const MIN_POLYGON_VERTICES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        LatLon { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// True if both components are finite and within the WGS84 range
    pub fn is_valid(&self) -> bool {
        self.is_finite() && (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Check the coordinate, returning it unchanged when valid
    pub fn validate(self) -> Result<Self, GeometryError> {
        if !self.is_finite() {
            return Err(GeometryError::NotFinite);
        }
        if !self.is_valid() {
            return Err(GeometryError::OutOfRange {
                lat: self.lat,
                lon: self.lon,
            });
        }
        Ok(self)
    }
}

impl From<(f64, f64)> for LatLon {
    fn from((lat, lon): (f64, f64)) -> Self {
        LatLon::new(lat, lon)
    }
}

/// Turn the raw points of a finished drawing into stored boundary vertices.
///
/// Every point must be a valid coordinate. Consecutive duplicates are
/// collapsed, including a closing point that repeats the first vertex. The
/// drawn winding order is kept as is.
pub fn normalize_polygon(raw_points: &[LatLon]) -> Result<Vec<LatLon>, GeometryError> {
    let mut vertices: Vec<LatLon> = Vec::with_capacity(raw_points.len());
    for point in raw_points {
        let point = point.validate()?;
        if vertices.last() != Some(&point) {
            vertices.push(point);
        }
    }

    // Map surfaces often close the ring explicitly
    while vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    if vertices.len() < MIN_POLYGON_VERTICES {
        return Err(GeometryError::TooFewPoints(vertices.len()));
    }
    Ok(vertices)
}

/// Ray-casting containment test. Points exactly on an edge may land on
/// either side; callers only use this as an advisory check.
pub fn is_point_in_polygon(point: LatLon, vertices: &[LatLon]) -> bool {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let vi = vertices[i];
        let vj = vertices[j];
        if ((vi.lat > point.lat) != (vj.lat > point.lat))
            && (point.lon < (vj.lon - vi.lon) * (point.lat - vi.lat) / (vj.lat - vi.lat) + vi.lon)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Split a boundary into triangles (vertex index triples) for filled rendering.
/// Degenerate shapes yield no triangles.
pub fn triangulate(vertices: &[LatLon]) -> Vec<[usize; 3]> {
    let mut coords: Vec<f64> = Vec::with_capacity(vertices.len() * 2);
    for vertex in vertices {
        coords.push(vertex.lon);
        coords.push(vertex.lat);
    }
    match earcut(&coords, &[], 2) {
        Ok(indices) => indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect(),
        Err(e) => {
            log::debug!("Triangulation failed: {:?}", e);
            Vec::new()
        }
    }
}

/// Average of the vertices, used to anchor labels
pub fn centroid(vertices: &[LatLon]) -> Option<LatLon> {
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len() as f64;
    let (lat, lon) = vertices
        .iter()
        .fold((0.0, 0.0), |(lat, lon), v| (lat + v.lat, lon + v.lon));
    Some(LatLon::new(lat / n, lon / n))
}

/// South-west and north-east corners of the vertices
pub fn bounds(vertices: &[LatLon]) -> Option<(LatLon, LatLon)> {
    let first = *vertices.first()?;
    Some(vertices.iter().fold((first, first), |(min, max), v| {
        (
            LatLon::new(min.lat.min(v.lat), min.lon.min(v.lon)),
            LatLon::new(max.lat.max(v.lat), max.lon.max(v.lon)),
        )
    }))
}

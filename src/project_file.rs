//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use serde::{Deserialize, Serialize};

use crate::asset_store::AssetStore;
use crate::error::ProjectFileError;
use crate::ids::IdAllocator;
use crate::model::{Pin, Plot, Polygon, Sensor};

/// Project file format version
const PROJECT_FILE_VERSION: u32 = 1;

/// Farm layout file format (.farm.json)
/// Stores the entity collections and the id counters. The selection is never saved.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Version of the project file format
    version: u32,

    plots: Vec<Plot>,
    polygons: Vec<Polygon>,
    pins: Vec<Pin>,
    sensors: Vec<Sensor>,

    /// Keeps ids unique across save and load
    ids: IdAllocator,
}

impl ProjectFile {
    pub fn new(store: &AssetStore) -> Self {
        ProjectFile {
            version: PROJECT_FILE_VERSION,
            plots: store.plots().cloned().collect(),
            polygons: store.polygons().cloned().collect(),
            pins: store.pins().cloned().collect(),
            sensors: store.sensors().cloned().collect(),
            ids: store.id_allocator().clone(),
        }
    }

    /// Rebuild the store, validating every reference and geometry
    pub fn into_store(self) -> Result<AssetStore, ProjectFileError> {
        if self.version != PROJECT_FILE_VERSION {
            return Err(ProjectFileError::Version {
                found: self.version,
                expected: PROJECT_FILE_VERSION,
            });
        }
        let polygon_count = self.polygons.len();
        let store =
            AssetStore::from_parts(self.plots, self.polygons, self.pins, self.sensors, self.ids)?;
        if store.polygons().count() != polygon_count {
            return Err(ProjectFileError::Inconsistent(
                "more than one boundary stored for a plot".to_string(),
            ));
        }
        Ok(store)
    }

    /// Serialize project to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Deserialize project from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProjectFileError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

pub mod asset_store;
pub mod backend;
pub mod error;
mod farm_project;
pub mod flows;
pub mod geometry;
pub mod ids;
pub mod map_sync;
pub mod model;
mod project_file;
pub mod selection;
mod settings;

pub use asset_store::AssetStore;
pub use backend::{AssetBackend, LocalBackend, Mutation, MutationOp};
pub use error::{AssetError, FlowError, GeometryError, ProjectFileError};
pub use farm_project::{FarmProject, Flow};
pub use geometry::LatLon;
pub use ids::{PinId, PlotId, PolygonId, SensorId};
pub use map_sync::{MapEvent, MapSyncAdapter, RenderModel};
pub use model::{Color, Pin, Plot, PlotInput, PlotUpdate, Polygon, Sensor, SensorType};
pub use project_file::ProjectFile;
pub use selection::{SelectionState, SensorFilter};
pub use settings::{DashboardSettings, SETTINGS_FILE};

//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use thiserror::Error as ThisError;

use crate::ids::{EntityKind, PlotId};

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum GeometryError {
    #[error("a boundary needs at least 3 distinct points, got {0}")]
    TooFewPoints(usize),

    #[error("coordinate ({lat}, {lon}) is outside the WGS84 range")]
    OutOfRange { lat: f64, lon: f64 },

    #[error("coordinate is not a finite number")]
    NotFinite,
}

/// Rejection reported by the remote store for a single change
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{operation} rejected by backend: {reason}")]
pub struct BackendError {
    pub operation: &'static str,
    pub reason: String,
}

/// Errors raised by the asset store. All of them leave the store untouched.
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum AssetError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("({lat}, {lon}) is not a valid pin location")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("{kind} {id} appears more than once")]
    DuplicateId { kind: EntityKind, id: u64 },

    #[error(transparent)]
    Rejected(#[from] BackendError),
}

impl AssetError {
    pub fn not_found(kind: EntityKind, id: impl Into<u64>) -> Self {
        AssetError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn duplicate(kind: EntityKind, id: impl Into<u64>) -> Self {
        AssetError::DuplicateId {
            kind,
            id: id.into(),
        }
    }
}

/// Workflow rules enforced by the add/edit flows on top of the store rules
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum FlowError {
    #[error("a plot needs a name before its boundary can be drawn")]
    NameRequired,

    #[error("no plot is selected")]
    PlotRequired,

    #[error("plot {0} has no boundary yet")]
    PolygonRequired(PlotId),

    #[error("deleting every pin requires explicit confirmation")]
    ConfirmationRequired,

    #[error("the pins changed since deletion was requested, confirm again")]
    StaleConfirmation,

    #[error(transparent)]
    Asset(#[from] AssetError),
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("`{0}` is not a #rrggbb color")]
pub struct ColorParseError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("unknown sensor type `{0}`")]
pub struct SensorTypeParseError(pub String);

#[derive(Debug, ThisError)]
pub enum ProjectFileError {
    #[error("failed to parse project file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported project file version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("project file is inconsistent: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Asset(#[from] AssetError),
}

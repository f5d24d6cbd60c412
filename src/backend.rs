//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

//! Seam to the remote CRUD store the local asset store mirrors.
//!
//! Changes are applied locally first and then forwarded. When the backend
//! rejects a change, the local entities are rolled back to what they were
//! before it.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::asset_store::AssetStore;
use crate::error::{AssetError, BackendError};
use crate::ids::{PinId, PlotId, PolygonId, SensorId};
use crate::model::{Pin, Plot, Polygon, Sensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(Uuid);

impl MutationId {
    pub fn new() -> Self {
        MutationId(Uuid::new_v4())
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A change already applied to the local store, as the backend sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "payload", rename_all = "camelCase")]
pub enum MutationOp {
    CreatePlot(Plot),
    UpdatePlot(Plot),
    AttachPolygon(Polygon),
    CreatePin(Pin),
    DeletePin(PinId),
    DeleteAllPins(PolygonId),
    DeletePolygon(PolygonId),
    DeletePlot(PlotId),
    AttachSensor(Sensor),
    UpdateSensor(Sensor),
    DetachSensor(SensorId),
}

impl MutationOp {
    pub fn name(&self) -> &'static str {
        match self {
            MutationOp::CreatePlot(_) => "createPlot",
            MutationOp::UpdatePlot(_) => "updatePlot",
            MutationOp::AttachPolygon(_) => "attachPolygon",
            MutationOp::CreatePin(_) => "createPin",
            MutationOp::DeletePin(_) => "deletePin",
            MutationOp::DeleteAllPins(_) => "deleteAllPins",
            MutationOp::DeletePolygon(_) => "deletePolygon",
            MutationOp::DeletePlot(_) => "deletePlot",
            MutationOp::AttachSensor(_) => "attachSensor",
            MutationOp::UpdateSensor(_) => "updateSensor",
            MutationOp::DetachSensor(_) => "detachSensor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub id: MutationId,
    #[serde(flatten)]
    pub op: MutationOp,
}

impl Mutation {
    pub fn new(op: MutationOp) -> Self {
        Mutation {
            id: MutationId::new(),
            op,
        }
    }
}

pub trait AssetBackend {
    /// Forward a change. An error means the remote store did not take it.
    fn apply(&mut self, mutation: &Mutation) -> Result<(), BackendError>;
}

/// Backend for working offline: accepts everything and keeps a journal of
/// what it was sent.
#[derive(Debug, Default, Clone)]
pub struct LocalBackend {
    journal: Vec<Mutation>,
}

impl LocalBackend {
    pub fn journal(&self) -> &[Mutation] {
        &self.journal
    }
}

impl AssetBackend for LocalBackend {
    fn apply(&mut self, mutation: &Mutation) -> Result<(), BackendError> {
        log::debug!("Journaled {} ({})", mutation.op.name(), mutation.id);
        self.journal.push(mutation.clone());
        Ok(())
    }
}

/// Apply a change to the store, then forward it to the backend.
///
/// `change` must leave the store untouched when it fails. If the backend
/// rejects the change, the store is restored to its state before `change`
/// ran and the rejection is returned.
pub fn apply_optimistic<T>(
    store: &mut AssetStore,
    backend: &mut dyn AssetBackend,
    change: impl FnOnce(&mut AssetStore) -> Result<(T, MutationOp), AssetError>,
) -> Result<T, AssetError> {
    let snapshot = store.snapshot();
    let (value, op) = change(store)?;
    let mutation = Mutation::new(op);
    if let Err(e) = backend.apply(&mutation) {
        log::warn!(
            "Rolling back {} ({}): {}",
            mutation.op.name(),
            mutation.id,
            e
        );
        store.restore(snapshot);
        return Err(AssetError::Rejected(e));
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::PlotInput;

    /// Rejects every change whose operation name is in `reject`
    #[derive(Default)]
    pub(crate) struct RejectingBackend {
        pub(crate) reject: Vec<&'static str>,
        pub(crate) accepted: Vec<Mutation>,
    }

    impl AssetBackend for RejectingBackend {
        fn apply(&mut self, mutation: &Mutation) -> Result<(), BackendError> {
            let operation = mutation.op.name();
            if self.reject.contains(&operation) {
                return Err(BackendError {
                    operation,
                    reason: "offline".into(),
                });
            }
            self.accepted.push(mutation.clone());
            Ok(())
        }
    }

    #[test]
    fn accepted_change_is_kept_and_journaled() {
        let mut store = AssetStore::new();
        let mut backend = LocalBackend::default();
        let plot = apply_optimistic(&mut store, &mut backend, |store| {
            let plot = store.create_plot(PlotInput::named("Plot A"));
            Ok((plot.clone(), MutationOp::CreatePlot(plot)))
        })
        .unwrap();

        assert!(store.plot(plot.id).is_some());
        assert_eq!(backend.journal().len(), 1);
        assert_eq!(backend.journal()[0].op.name(), "createPlot");
    }

    #[test]
    fn rejected_change_rolls_back() {
        let mut store = AssetStore::new();
        let mut backend = RejectingBackend {
            reject: vec!["createPlot"],
            ..Default::default()
        };
        let result = apply_optimistic(&mut store, &mut backend, |store| {
            let plot = store.create_plot(PlotInput::named("Plot A"));
            Ok((plot.id, MutationOp::CreatePlot(plot)))
        });

        assert!(matches!(result, Err(AssetError::Rejected(_))));
        assert!(store.is_empty());
        assert!(backend.accepted.is_empty());
    }

    #[test]
    fn failed_local_change_is_not_forwarded() {
        let mut store = AssetStore::new();
        let mut backend = LocalBackend::default();
        let result = apply_optimistic(&mut store, &mut backend, |store| {
            store.delete_plot(PlotId::new(3))?;
            Ok(((), MutationOp::DeletePlot(PlotId::new(3))))
        });
        assert!(matches!(result, Err(AssetError::NotFound { .. })));
        assert!(backend.journal().is_empty());
    }

    #[test]
    fn mutation_serializes_with_operation_tag() {
        let mutation = Mutation::new(MutationOp::DeletePin(PinId::new(4)));
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["op"], "deletePin");
        assert_eq!(json["payload"], 4);
        assert!(json["id"].is_string());
    }
}

//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use crate::error::{AssetError, FlowError};
use crate::farm_project::{FarmProject, Flow};
use crate::ids::{EntityKind, PinId, PlotId, PolygonId, SensorId};
use crate::model::{Plot, PlotUpdate, Sensor};

/// Pending "delete all pins" action, waiting for the operator to confirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAllRequest {
    pub polygon_id: PolygonId,
    /// Pins that were on screen when the deletion was requested
    pub pins: Vec<PinId>,
}

/// Edit plot details and remove pins, boundaries or whole plots
#[derive(Debug, Clone)]
pub struct EditFlow {
    plot_id: PlotId,
    pending_delete_all: Option<DeleteAllRequest>,
}

impl EditFlow {
    pub fn start(project: &mut FarmProject, plot_id: PlotId) -> Result<Self, FlowError> {
        if project.store().plot(plot_id).is_none() {
            return Err(AssetError::not_found(EntityKind::Plot, plot_id).into());
        }
        project.navigate(Flow::Edit);
        project.set_active_plot(plot_id)?;
        Ok(EditFlow {
            plot_id,
            pending_delete_all: None,
        })
    }

    pub fn plot_id(&self) -> PlotId {
        self.plot_id
    }

    pub fn update_plot(&self, project: &mut FarmProject, update: PlotUpdate) -> Result<Plot, FlowError> {
        if update.clears_name() {
            return Err(FlowError::NameRequired);
        }
        Ok(project.update_plot(self.plot_id, update)?)
    }

    /// Pins of other plots are reported as not found
    fn own_pin(&self, project: &FarmProject, pin_id: PinId) -> Result<(), FlowError> {
        let polygon_id = self.polygon_id(project)?;
        match project.store().pin(pin_id) {
            Some(pin) if pin.polygon_id == polygon_id => Ok(()),
            _ => Err(AssetError::not_found(EntityKind::Pin, pin_id).into()),
        }
    }

    pub fn delete_pin(&mut self, project: &mut FarmProject, pin_id: PinId) -> Result<(), FlowError> {
        self.own_pin(project, pin_id)?;
        Ok(project.delete_pin(pin_id)?)
    }

    pub fn detach_sensor(&self, project: &mut FarmProject, sensor_id: SensorId) -> Result<Sensor, FlowError> {
        let pin_id = project
            .store()
            .sensor(sensor_id)
            .map(|sensor| sensor.pin_id)
            .ok_or_else(|| AssetError::not_found(EntityKind::Sensor, sensor_id))?;
        if self.own_pin(project, pin_id).is_err() {
            return Err(AssetError::not_found(EntityKind::Sensor, sensor_id).into());
        }
        Ok(project.detach_sensor(sensor_id)?)
    }

    fn polygon_id(&self, project: &FarmProject) -> Result<PolygonId, FlowError> {
        project
            .store()
            .polygon_of_plot(self.plot_id)
            .map(|polygon| polygon.id)
            .ok_or(FlowError::PolygonRequired(self.plot_id))
    }

    fn current_request(&self, project: &FarmProject) -> Result<DeleteAllRequest, FlowError> {
        let polygon_id = self.polygon_id(project)?;
        Ok(DeleteAllRequest {
            polygon_id,
            pins: project
                .store()
                .list_pins(polygon_id)
                .iter()
                .map(|pin| pin.id)
                .collect(),
        })
    }

    /// First step of "delete all": remember what would be removed
    pub fn request_delete_all(&mut self, project: &FarmProject) -> Result<&DeleteAllRequest, FlowError> {
        let request = self.current_request(project)?;
        Ok(self.pending_delete_all.insert(request))
    }

    pub fn pending_delete_all(&self) -> Option<&DeleteAllRequest> {
        self.pending_delete_all.as_ref()
    }

    pub fn cancel_delete_all(&mut self) {
        self.pending_delete_all = None;
    }

    /// Second step of "delete all". Refused when nothing was requested or
    /// the pins changed in between; either way the request is consumed.
    pub fn confirm_delete_all(&mut self, project: &mut FarmProject) -> Result<usize, FlowError> {
        let request = self
            .pending_delete_all
            .take()
            .ok_or(FlowError::ConfirmationRequired)?;
        if self.current_request(project)? != request {
            return Err(FlowError::StaleConfirmation);
        }
        Ok(project.delete_all_pins(request.polygon_id)?)
    }

    pub fn delete_polygon(&mut self, project: &mut FarmProject) -> Result<(), FlowError> {
        let polygon_id = self.polygon_id(project)?;
        self.pending_delete_all = None;
        Ok(project.delete_polygon(polygon_id)?)
    }

    /// Delete the plot and everything under it. On success the project is
    /// back on the dashboard and the flow has nothing left to edit.
    pub fn delete_plot(&self, project: &mut FarmProject) -> Result<(), FlowError> {
        project.delete_plot(self.plot_id)?;
        project.navigate(Flow::Dashboard);
        Ok(())
    }
}

//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use crate::error::{AssetError, FlowError};
use crate::farm_project::{FarmProject, Flow};
use crate::ids::{EntityKind, PinId, PlotId, PolygonId};
use crate::model::{Pin, Sensor, SensorType};

/// Place pins inside an existing boundary and fit them with sensors
#[derive(Debug, Clone)]
pub struct AddPinFlow {
    plot_id: PlotId,
}

impl AddPinFlow {
    /// Fails unless the plot exists and already has a boundary
    pub fn start(project: &mut FarmProject, plot_id: PlotId) -> Result<Self, FlowError> {
        if project.store().plot(plot_id).is_none() {
            return Err(AssetError::not_found(EntityKind::Plot, plot_id).into());
        }
        if project.store().polygon_of_plot(plot_id).is_none() {
            return Err(FlowError::PolygonRequired(plot_id));
        }
        project.navigate(Flow::AddPin);
        project.set_active_plot(plot_id)?;
        Ok(AddPinFlow { plot_id })
    }

    pub fn plot_id(&self) -> PlotId {
        self.plot_id
    }

    /// Current boundary of the plot; it may have been redrawn since the flow started
    fn polygon_id(&self, project: &FarmProject) -> Result<PolygonId, FlowError> {
        project
            .store()
            .polygon_of_plot(self.plot_id)
            .map(|polygon| polygon.id)
            .ok_or(FlowError::PolygonRequired(self.plot_id))
    }

    pub fn place_pin(&self, project: &mut FarmProject, lat: f64, lon: f64) -> Result<Pin, FlowError> {
        let polygon_id = self.polygon_id(project)?;
        Ok(project.place_pin(polygon_id, lat, lon)?)
    }

    /// Attach a sensor to one of this plot's pins
    pub fn attach_sensor(
        &self,
        project: &mut FarmProject,
        pin_id: PinId,
        sensor_type: SensorType,
        reading: f64,
    ) -> Result<Sensor, FlowError> {
        let polygon_id = self.polygon_id(project)?;
        match project.store().pin(pin_id) {
            Some(pin) if pin.polygon_id == polygon_id => {}
            _ => return Err(AssetError::not_found(EntityKind::Pin, pin_id).into()),
        }
        Ok(project.attach_sensor(pin_id, sensor_type, reading)?)
    }

    pub fn pins<'a>(&self, project: &'a FarmProject) -> Vec<&'a Pin> {
        match self.polygon_id(project) {
            Ok(polygon_id) => project.store().list_pins(polygon_id),
            Err(_) => Vec::new(),
        }
    }
}

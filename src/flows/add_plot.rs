//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use crate::error::FlowError;
use crate::farm_project::{FarmProject, Flow};
use crate::geometry::LatLon;
use crate::ids::PlotId;
use crate::model::{Plot, PlotInput, PlotUpdate, Polygon};

/// Register a plot, then draw its boundary.
///
/// Drawing stays blocked until the plot exists with a name.
#[derive(Debug, Clone, Default)]
pub struct AddPlotFlow {
    plot: Option<PlotId>,
}

impl AddPlotFlow {
    pub fn start(project: &mut FarmProject) -> Self {
        project.navigate(Flow::AddPlot);
        Self::default()
    }

    pub fn plot_id(&self) -> Option<PlotId> {
        self.plot
    }

    /// Save the details form. The first call creates the plot, later calls
    /// overwrite its details.
    pub fn submit_details(&mut self, project: &mut FarmProject, input: PlotInput) -> Result<Plot, FlowError> {
        if input.name.trim().is_empty() {
            return Err(FlowError::NameRequired);
        }
        let existing = self.plot.filter(|id| project.store().plot(*id).is_some());
        let plot = match existing {
            Some(plot_id) => project.update_plot(plot_id, PlotUpdate::from(input))?,
            None => project.create_plot(input)?,
        };
        self.plot = Some(plot.id);
        Ok(plot)
    }

    pub fn can_draw(&self, project: &FarmProject) -> bool {
        self.require_plot(project).is_ok()
    }

    fn require_plot(&self, project: &FarmProject) -> Result<PlotId, FlowError> {
        let plot = self
            .plot
            .and_then(|id| project.store().plot(id))
            .ok_or(FlowError::PlotRequired)?;
        if plot.name.trim().is_empty() {
            return Err(FlowError::NameRequired);
        }
        Ok(plot.id)
    }

    pub fn begin_boundary(&self, project: &mut FarmProject) -> Result<(), FlowError> {
        self.require_plot(project)?;
        project.map_mut().begin_drawing();
        Ok(())
    }

    pub fn add_boundary_point(&self, project: &mut FarmProject, point: LatLon) {
        project.map_mut().add_draw_point(point);
    }

    /// Store the drawn shape as the plot's boundary. The drawing layer is
    /// cleared even when the shape is rejected.
    pub fn finish_boundary(&self, project: &mut FarmProject) -> Result<Polygon, FlowError> {
        let raw_points = project.map_mut().take_drawing();
        let plot_id = self.require_plot(project)?;
        Ok(project.complete_drawing(plot_id, &raw_points)?)
    }
}

//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use crate::asset_store::AssetStore;
use crate::backend::{apply_optimistic, AssetBackend, LocalBackend, MutationOp};
use crate::error::{AssetError, FlowError, ProjectFileError};
use crate::geometry::LatLon;
use crate::ids::{PinId, PlotId, PolygonId, SensorId};
use crate::map_sync::{MapEvent, MapSyncAdapter, RenderModel};
use crate::model::{Color, Pin, Plot, PlotInput, PlotUpdate, Polygon, Sensor, SensorType};
use crate::project_file::ProjectFile;
use crate::selection::{DateRange, SelectionState, SensorFilter};
use crate::settings::DashboardSettings;

/// Screen the operator is working in. Switching resets the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Dashboard,
    AddPlot,
    AddPin,
    Edit,
}

/// One working session over a farm layout: the store, the current selection,
/// the map bridge and the remote store changes are forwarded to.
pub struct FarmProject {
    store: AssetStore,
    selection: SelectionState,
    map: MapSyncAdapter,
    backend: Box<dyn AssetBackend>,
    settings: DashboardSettings,
    flow: Flow,

    /// Set on every accepted change, cleared by `take_dirty`
    dirty: bool,
}

impl Default for FarmProject {
    fn default() -> Self {
        Self::new(DashboardSettings::default())
    }
}

impl From<AssetStore> for FarmProject {
    fn from(store: AssetStore) -> Self {
        Self::with_backend(store, DashboardSettings::default(), Box::new(LocalBackend::default()))
    }
}

impl FarmProject {
    pub fn new(settings: DashboardSettings) -> Self {
        Self::with_backend(AssetStore::new(), settings, Box::new(LocalBackend::default()))
    }

    pub fn with_backend(
        store: AssetStore,
        settings: DashboardSettings,
        backend: Box<dyn AssetBackend>,
    ) -> Self {
        let selection = SelectionState::initial(&store, settings.default_draw_color);
        FarmProject {
            store,
            selection,
            map: MapSyncAdapter::new(),
            backend,
            settings,
            flow: Flow::default(),
            dirty: false,
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn map(&self) -> &MapSyncAdapter {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapSyncAdapter {
        &mut self.map
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    /// Switch screens. The selection goes back to its defaults and any
    /// half-drawn shape is dropped.
    pub fn navigate(&mut self, flow: Flow) {
        self.flow = flow;
        self.selection = SelectionState::initial(&self.store, self.settings.default_draw_color);
        self.map.cancel_drawing();
    }

    /// Returns true once after every accepted change
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn set_active_plot(&mut self, plot_id: PlotId) -> Result<(), AssetError> {
        self.selection = self.selection.clone().set_active_plot(&self.store, plot_id)?;
        Ok(())
    }

    pub fn set_sensor_type_filter(&mut self, filter: SensorFilter) {
        self.selection = self.selection.clone().set_sensor_type_filter(filter);
    }

    pub fn set_active_node(&mut self, node: Option<String>) {
        self.selection = self.selection.clone().set_active_node(node);
    }

    pub fn set_date_range(&mut self, date_range: Option<DateRange>) {
        self.selection = self.selection.clone().set_date_range(date_range);
    }

    pub fn set_draw_color(&mut self, color: Color) {
        self.selection = self.selection.clone().set_draw_color(color);
    }

    pub fn visible_pins(&self) -> Vec<&Pin> {
        self.selection.visible_pins(&self.store)
    }

    pub fn render_model(&self) -> RenderModel {
        self.map.render_model(&self.store, &self.selection)
    }

    /// Run a store change through the backend, rolling it back if rejected
    fn transact<T>(
        &mut self,
        change: impl FnOnce(&mut AssetStore) -> Result<(T, MutationOp), AssetError>,
    ) -> Result<T, AssetError> {
        let value = apply_optimistic(&mut self.store, self.backend.as_mut(), change)?;
        self.selection = self.selection.clone().refresh(&self.store);
        self.dirty = true;
        Ok(value)
    }

    /// Create a plot and make it the active one
    pub fn create_plot(&mut self, input: PlotInput) -> Result<Plot, AssetError> {
        let plot = self.transact(|store| {
            let plot = store.create_plot(input);
            Ok((plot.clone(), MutationOp::CreatePlot(plot)))
        })?;
        self.set_active_plot(plot.id)?;
        Ok(plot)
    }

    pub fn update_plot(&mut self, plot_id: PlotId, update: PlotUpdate) -> Result<Plot, AssetError> {
        self.transact(|store| {
            let plot = store.update_plot(plot_id, update)?;
            Ok((plot.clone(), MutationOp::UpdatePlot(plot)))
        })
    }

    /// Store a boundary for `plot_id`, bypassing the drawing layer
    pub fn attach_polygon(
        &mut self,
        plot_id: PlotId,
        vertices: &[LatLon],
        color: Color,
    ) -> Result<Polygon, AssetError> {
        self.transact(|store| {
            let polygon = store.attach_polygon(plot_id, vertices, color)?;
            Ok((polygon.clone(), MutationOp::AttachPolygon(polygon)))
        })
    }

    /// Finish the shape on the drawing layer as the boundary of `plot_id`
    pub fn complete_drawing(&mut self, plot_id: PlotId, raw_points: &[LatLon]) -> Result<Polygon, AssetError> {
        let FarmProject {
            store,
            selection,
            map,
            backend,
            ..
        } = self;
        let polygon = apply_optimistic(store, backend.as_mut(), |store| {
            let polygon = map.on_draw_complete(store, selection, plot_id, raw_points)?;
            Ok((polygon.clone(), MutationOp::AttachPolygon(polygon)))
        });
        // The drawing layer is gone either way
        self.map.cancel_drawing();
        let polygon = polygon?;
        self.dirty = true;
        Ok(polygon)
    }

    pub fn place_pin(&mut self, polygon_id: PolygonId, lat: f64, lon: f64) -> Result<Pin, AssetError> {
        let FarmProject {
            store,
            map,
            backend,
            dirty,
            ..
        } = self;
        let pin = apply_optimistic(store, backend.as_mut(), |store| {
            let pin = map.on_marker_place(store, polygon_id, lat, lon)?;
            Ok((pin.clone(), MutationOp::CreatePin(pin)))
        })?;
        *dirty = true;
        Ok(pin)
    }

    pub fn attach_sensor(
        &mut self,
        pin_id: PinId,
        sensor_type: SensorType,
        reading: f64,
    ) -> Result<Sensor, AssetError> {
        self.transact(|store| {
            let sensor = store.attach_sensor(pin_id, sensor_type, reading)?;
            Ok((sensor.clone(), MutationOp::AttachSensor(sensor)))
        })
    }

    pub fn update_reading(&mut self, sensor_id: SensorId, reading: f64) -> Result<Sensor, AssetError> {
        self.transact(|store| {
            let sensor = store.update_reading(sensor_id, reading)?;
            Ok((sensor.clone(), MutationOp::UpdateSensor(sensor)))
        })
    }

    pub fn set_sensor_node(&mut self, sensor_id: SensorId, node: Option<String>) -> Result<Sensor, AssetError> {
        self.transact(|store| {
            let sensor = store.set_sensor_node(sensor_id, node)?;
            Ok((sensor.clone(), MutationOp::UpdateSensor(sensor)))
        })
    }

    pub fn detach_sensor(&mut self, sensor_id: SensorId) -> Result<Sensor, AssetError> {
        self.transact(|store| {
            let sensor = store.detach_sensor(sensor_id)?;
            Ok((sensor, MutationOp::DetachSensor(sensor_id)))
        })
    }

    pub fn delete_pin(&mut self, pin_id: PinId) -> Result<(), AssetError> {
        self.transact(|store| {
            store.delete_pin(pin_id)?;
            Ok(((), MutationOp::DeletePin(pin_id)))
        })
    }

    pub fn delete_all_pins(&mut self, polygon_id: PolygonId) -> Result<usize, AssetError> {
        self.transact(|store| {
            let count = store.delete_all_pins(polygon_id)?;
            Ok((count, MutationOp::DeleteAllPins(polygon_id)))
        })
    }

    pub fn delete_polygon(&mut self, polygon_id: PolygonId) -> Result<(), AssetError> {
        self.transact(|store| {
            store.delete_polygon(polygon_id)?;
            Ok(((), MutationOp::DeletePolygon(polygon_id)))
        })
    }

    pub fn delete_plot(&mut self, plot_id: PlotId) -> Result<(), AssetError> {
        self.transact(|store| {
            store.delete_plot(plot_id)?;
            Ok(((), MutationOp::DeletePlot(plot_id)))
        })
    }

    /// Route an event from the map surface. Markers land on the active
    /// plot's boundary; drawings become the active plot's boundary.
    pub fn handle_map_event(&mut self, event: MapEvent) -> Result<(), FlowError> {
        let plot_id = self.selection.active_plot.ok_or(FlowError::PlotRequired)?;
        match event {
            MapEvent::DrawComplete { raw_points } => {
                self.complete_drawing(plot_id, &raw_points)?;
            }
            MapEvent::MarkerPlaced { lat, lon } => {
                let polygon_id = self
                    .selection
                    .active_polygon(&self.store)
                    .map(|polygon| polygon.id)
                    .ok_or(FlowError::PolygonRequired(plot_id))?;
                self.place_pin(polygon_id, lat, lon)?;
            }
        }
        Ok(())
    }

    /// Save the project to bytes
    pub fn save_project(&self) -> Result<Vec<u8>, serde_json::Error> {
        ProjectFile::new(&self.store).to_bytes()
    }

    /// Load a project from file data, keeping the current settings and backend
    pub fn load_project(&mut self, data: &[u8]) -> Result<(), ProjectFileError> {
        let store = ProjectFile::from_bytes(data)?.into_store()?;
        log::info!(
            "Loaded project with {} plots and {} pins",
            store.plots().count(),
            store.pins().count()
        );
        self.store = store;
        self.navigate(Flow::Dashboard);
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::RejectingBackend;

    fn boundary() -> Vec<LatLon> {
        vec![
            LatLon::new(13.25, 101.05),
            LatLon::new(13.25, 101.25),
            LatLon::new(13.35, 101.25),
            LatLon::new(13.35, 101.05),
        ]
    }

    #[test]
    fn create_plot_selects_it() {
        let mut project = FarmProject::default();
        project.create_plot(PlotInput::named("Plot A")).unwrap();
        let b = project.create_plot(PlotInput::named("Plot B")).unwrap();
        assert_eq!(project.selection().active_plot, Some(b.id));
        assert!(project.take_dirty());
        assert!(!project.take_dirty());
    }

    #[test]
    fn navigate_resets_selection() {
        let mut project = FarmProject::default();
        let a = project.create_plot(PlotInput::named("Plot A")).unwrap();
        project.create_plot(PlotInput::named("Plot B")).unwrap();
        project.set_sensor_type_filter(SensorFilter::Only(SensorType::Light));
        project.set_draw_color(Color::from_rgb(1, 2, 3));
        project.map_mut().begin_drawing();

        project.navigate(Flow::Edit);
        assert_eq!(project.flow(), Flow::Edit);
        assert_eq!(project.selection().active_plot, Some(a.id));
        assert_eq!(project.selection().sensor_filter, SensorFilter::All);
        assert_eq!(project.selection().draw_color, Color::default());
        assert!(!project.map().is_drawing());
    }

    #[test]
    fn map_events_need_a_plot_and_boundary() {
        let mut project = FarmProject::default();
        assert_eq!(
            project.handle_map_event(MapEvent::MarkerPlaced {
                lat: 13.3,
                lon: 101.1
            }),
            Err(FlowError::PlotRequired)
        );

        let plot = project.create_plot(PlotInput::named("Plot A")).unwrap();
        assert_eq!(
            project.handle_map_event(MapEvent::MarkerPlaced {
                lat: 13.3,
                lon: 101.1
            }),
            Err(FlowError::PolygonRequired(plot.id))
        );

        project
            .handle_map_event(MapEvent::DrawComplete {
                raw_points: boundary(),
            })
            .unwrap();
        project
            .handle_map_event(MapEvent::MarkerPlaced {
                lat: 13.3,
                lon: 101.1,
            })
            .unwrap();
        assert_eq!(project.visible_pins().len(), 1);
    }

    #[test]
    fn rejected_change_is_rolled_back() {
        let backend = RejectingBackend {
            reject: vec!["deletePlot", "attachPolygon"],
            ..Default::default()
        };
        let mut project = FarmProject::with_backend(
            AssetStore::new(),
            DashboardSettings::default(),
            Box::new(backend),
        );
        let plot = project.create_plot(PlotInput::named("Plot A")).unwrap();
        project.map_mut().begin_drawing();

        let result = project.complete_drawing(plot.id, &boundary());
        assert!(matches!(result, Err(AssetError::Rejected(_))));
        assert!(project.store().polygon_of_plot(plot.id).is_none());
        assert!(!project.map().is_drawing());

        assert!(matches!(
            project.delete_plot(plot.id),
            Err(AssetError::Rejected(_))
        ));
        assert!(project.store().plot(plot.id).is_some());
    }

    #[test]
    fn deleting_active_plot_moves_selection() {
        let mut project = FarmProject::default();
        let a = project.create_plot(PlotInput::named("Plot A")).unwrap();
        let b = project.create_plot(PlotInput::named("Plot B")).unwrap();
        project.delete_plot(b.id).unwrap();
        assert_eq!(project.selection().active_plot, Some(a.id));
        project.delete_plot(a.id).unwrap();
        assert_eq!(project.selection().active_plot, None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut project = FarmProject::default();
        let plot = project.create_plot(PlotInput::named("Plot A")).unwrap();
        let polygon = project
            .attach_polygon(plot.id, &boundary(), Color::default())
            .unwrap();
        project.place_pin(polygon.id, 13.3, 101.1).unwrap();
        let bytes = project.save_project().unwrap();

        let mut restored = FarmProject::default();
        restored.load_project(&bytes).unwrap();
        assert_eq!(restored.selection().active_plot, Some(plot.id));
        assert_eq!(restored.visible_pins().len(), 1);
        assert!(!restored.take_dirty());
        assert!(restored.load_project(b"{}").is_err());
    }
}

//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use std::collections::{BTreeMap, BTreeSet};

use crate::error::AssetError;
use crate::geometry::{self, LatLon};
use crate::ids::{EntityKind, IdAllocator, PinId, PlotId, PolygonId, SensorId};
use crate::model::{Color, Pin, Plot, PlotInput, PlotUpdate, Polygon, Sensor, SensorType};

#[derive(Debug, Clone, PartialEq)]
struct PlotEntry {
    plot: Plot,
    polygon: Option<PolygonId>,
}

#[derive(Debug, Clone, PartialEq)]
struct PolygonEntry {
    polygon: Polygon,
    /// Pins in display order; position `i` holds sequence number `i + 1`
    pins: Vec<PinId>,
}

#[derive(Debug, Clone, PartialEq)]
struct PinEntry {
    pin: Pin,
    sensors: BTreeSet<SensorId>,
}

/// Entities keyed by id. Parents hold the ids of their children so cascades
/// walk the hierarchy downwards instead of re-filtering every collection.
#[derive(Debug, Clone, Default, PartialEq)]
struct Arena {
    plots: BTreeMap<PlotId, PlotEntry>,
    polygons: BTreeMap<PolygonId, PolygonEntry>,
    pins: BTreeMap<PinId, PinEntry>,
    sensors: BTreeMap<SensorId, Sensor>,
}

/// Frozen copy of the entity collections, used to undo a rejected change
#[derive(Debug, Clone)]
pub struct StoreSnapshot(Arena);

/// Authoritative in-memory collection of plots, polygons, pins and sensors.
///
/// Every operation either applies completely or returns an error and leaves
/// the store as it was.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    arena: Arena,
    ids: IdAllocator,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_plot(&mut self, input: PlotInput) -> Plot {
        let id = self.ids.next_plot_id();
        let plot = input.into_plot(id);
        self.arena.plots.insert(
            id,
            PlotEntry {
                plot: plot.clone(),
                polygon: None,
            },
        );
        log::info!("Created plot {} ({:?})", id, plot.name);
        plot
    }

    pub fn update_plot(&mut self, plot_id: PlotId, update: PlotUpdate) -> Result<Plot, AssetError> {
        let entry = self
            .arena
            .plots
            .get_mut(&plot_id)
            .ok_or_else(|| AssetError::not_found(EntityKind::Plot, plot_id))?;
        update.apply_to(&mut entry.plot);
        Ok(entry.plot.clone())
    }

    /// Store the boundary of a plot, replacing (and cascading away) any
    /// boundary it had before.
    pub fn attach_polygon(
        &mut self,
        plot_id: PlotId,
        vertices: &[LatLon],
        color: Color,
    ) -> Result<Polygon, AssetError> {
        if !self.arena.plots.contains_key(&plot_id) {
            return Err(AssetError::not_found(EntityKind::Plot, plot_id));
        }
        let vertices = geometry::normalize_polygon(vertices)?;

        let previous = self.arena.plots.get(&plot_id).and_then(|entry| entry.polygon);
        if let Some(previous) = previous {
            self.remove_polygon_subtree(previous);
            log::info!("Replaced boundary {} of plot {}", previous, plot_id);
        }

        let polygon = Polygon {
            id: self.ids.next_polygon_id(),
            plot_id,
            vertices,
            color,
        };
        self.arena.polygons.insert(
            polygon.id,
            PolygonEntry {
                polygon: polygon.clone(),
                pins: Vec::new(),
            },
        );
        if let Some(entry) = self.arena.plots.get_mut(&plot_id) {
            entry.polygon = Some(polygon.id);
        }
        log::info!(
            "Attached boundary {} with {} vertices to plot {}",
            polygon.id,
            polygon.vertices.len(),
            plot_id
        );
        Ok(polygon)
    }

    /// Place a pin at the end of the polygon's pin list.
    ///
    /// A pin outside the boundary is accepted; it is only logged.
    pub fn create_pin(&mut self, polygon_id: PolygonId, lat: f64, lon: f64) -> Result<Pin, AssetError> {
        let Some(polygon_entry) = self.arena.polygons.get(&polygon_id) else {
            return Err(AssetError::not_found(EntityKind::Polygon, polygon_id));
        };
        let position = LatLon::new(lat, lon);
        if !position.is_valid() {
            return Err(AssetError::InvalidCoordinate { lat, lon });
        }
        if !geometry::is_point_in_polygon(position, &polygon_entry.polygon.vertices) {
            log::warn!(
                "Pin at ({}, {}) lies outside boundary {}",
                lat,
                lon,
                polygon_id
            );
        }

        let sequence_number = polygon_entry.pins.len() as u32 + 1;
        let pin = Pin {
            id: self.ids.next_pin_id(),
            polygon_id,
            sequence_number,
            position,
        };
        self.arena.pins.insert(
            pin.id,
            PinEntry {
                pin: pin.clone(),
                sensors: BTreeSet::new(),
            },
        );
        if let Some(entry) = self.arena.polygons.get_mut(&polygon_id) {
            entry.pins.push(pin.id);
        }
        Ok(pin)
    }

    /// Remove a pin and its sensors, then close the gap in the numbering
    pub fn delete_pin(&mut self, pin_id: PinId) -> Result<(), AssetError> {
        let entry = self
            .arena
            .pins
            .remove(&pin_id)
            .ok_or_else(|| AssetError::not_found(EntityKind::Pin, pin_id))?;
        for sensor_id in &entry.sensors {
            self.arena.sensors.remove(sensor_id);
        }

        let polygon_id = entry.pin.polygon_id;
        if let Some(polygon_entry) = self.arena.polygons.get_mut(&polygon_id) {
            polygon_entry.pins.retain(|id| *id != pin_id);
        }
        self.renumber_pins(polygon_id);
        log::info!(
            "Deleted pin {} (was #{}) from boundary {}",
            pin_id,
            entry.pin.sequence_number,
            polygon_id
        );
        Ok(())
    }

    /// Remove every pin of a polygon in one step. Returns how many were removed.
    pub fn delete_all_pins(&mut self, polygon_id: PolygonId) -> Result<usize, AssetError> {
        let entry = self
            .arena
            .polygons
            .get_mut(&polygon_id)
            .ok_or_else(|| AssetError::not_found(EntityKind::Polygon, polygon_id))?;
        let pins = std::mem::take(&mut entry.pins);
        for pin_id in &pins {
            self.remove_pin_subtree(*pin_id);
        }
        log::info!("Deleted all {} pins of boundary {}", pins.len(), polygon_id);
        Ok(pins.len())
    }

    pub fn delete_polygon(&mut self, polygon_id: PolygonId) -> Result<(), AssetError> {
        let plot_id = self
            .arena
            .polygons
            .get(&polygon_id)
            .map(|entry| entry.polygon.plot_id)
            .ok_or_else(|| AssetError::not_found(EntityKind::Polygon, polygon_id))?;
        self.remove_polygon_subtree(polygon_id);
        if let Some(entry) = self.arena.plots.get_mut(&plot_id) {
            if entry.polygon == Some(polygon_id) {
                entry.polygon = None;
            }
        }
        log::info!("Deleted boundary {} of plot {}", polygon_id, plot_id);
        Ok(())
    }

    pub fn delete_plot(&mut self, plot_id: PlotId) -> Result<(), AssetError> {
        let entry = self
            .arena
            .plots
            .remove(&plot_id)
            .ok_or_else(|| AssetError::not_found(EntityKind::Plot, plot_id))?;
        if let Some(polygon_id) = entry.polygon {
            self.remove_polygon_subtree(polygon_id);
        }
        log::info!("Deleted plot {} ({:?})", plot_id, entry.plot.name);
        Ok(())
    }

    pub fn attach_sensor(
        &mut self,
        pin_id: PinId,
        sensor_type: SensorType,
        reading: f64,
    ) -> Result<Sensor, AssetError> {
        if !self.arena.pins.contains_key(&pin_id) {
            return Err(AssetError::not_found(EntityKind::Pin, pin_id));
        }
        let sensor = Sensor {
            id: self.ids.next_sensor_id(),
            pin_id,
            sensor_type,
            last_reading: reading,
            node: None,
        };
        if let Some(entry) = self.arena.pins.get_mut(&pin_id) {
            entry.sensors.insert(sensor.id);
        }
        self.arena.sensors.insert(sensor.id, sensor.clone());
        Ok(sensor)
    }

    pub fn detach_sensor(&mut self, sensor_id: SensorId) -> Result<Sensor, AssetError> {
        let sensor = self
            .arena
            .sensors
            .remove(&sensor_id)
            .ok_or_else(|| AssetError::not_found(EntityKind::Sensor, sensor_id))?;
        if let Some(entry) = self.arena.pins.get_mut(&sensor.pin_id) {
            entry.sensors.remove(&sensor_id);
        }
        Ok(sensor)
    }

    pub fn update_reading(&mut self, sensor_id: SensorId, reading: f64) -> Result<Sensor, AssetError> {
        let sensor = self.sensor_mut(sensor_id)?;
        sensor.last_reading = reading;
        Ok(sensor.clone())
    }

    /// Assign the sensor to a hardware node, or clear it with `None`
    pub fn set_sensor_node(
        &mut self,
        sensor_id: SensorId,
        node: Option<String>,
    ) -> Result<Sensor, AssetError> {
        let sensor = self.sensor_mut(sensor_id)?;
        sensor.node = node.filter(|n| !n.trim().is_empty());
        Ok(sensor.clone())
    }

    /// Pins of a polygon ordered by sequence number. Unknown polygons have no pins.
    pub fn list_pins(&self, polygon_id: PolygonId) -> Vec<&Pin> {
        self.arena
            .polygons
            .get(&polygon_id)
            .map(|entry| {
                entry
                    .pins
                    .iter()
                    .filter_map(|id| self.arena.pins.get(id))
                    .map(|entry| &entry.pin)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn list_sensors(&self, pin_id: PinId) -> Vec<&Sensor> {
        self.arena
            .pins
            .get(&pin_id)
            .map(|entry| {
                entry
                    .sensors
                    .iter()
                    .filter_map(|id| self.arena.sensors.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All plots, oldest first
    pub fn plots(&self) -> impl Iterator<Item = &Plot> {
        self.arena.plots.values().map(|entry| &entry.plot)
    }

    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.arena.polygons.values().map(|entry| &entry.polygon)
    }

    pub fn pins(&self) -> impl Iterator<Item = &Pin> {
        self.arena.pins.values().map(|entry| &entry.pin)
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.arena.sensors.values()
    }

    pub fn plot(&self, plot_id: PlotId) -> Option<&Plot> {
        self.arena.plots.get(&plot_id).map(|entry| &entry.plot)
    }

    pub fn polygon(&self, polygon_id: PolygonId) -> Option<&Polygon> {
        self.arena.polygons.get(&polygon_id).map(|entry| &entry.polygon)
    }

    pub fn pin(&self, pin_id: PinId) -> Option<&Pin> {
        self.arena.pins.get(&pin_id).map(|entry| &entry.pin)
    }

    pub fn sensor(&self, sensor_id: SensorId) -> Option<&Sensor> {
        self.arena.sensors.get(&sensor_id)
    }

    /// The active boundary of a plot, if one was drawn
    pub fn polygon_of_plot(&self, plot_id: PlotId) -> Option<&Polygon> {
        self.arena
            .plots
            .get(&plot_id)
            .and_then(|entry| entry.polygon)
            .and_then(|id| self.polygon(id))
    }

    pub fn is_empty(&self) -> bool {
        self.arena.plots.is_empty()
            && self.arena.polygons.is_empty()
            && self.arena.pins.is_empty()
            && self.arena.sensors.is_empty()
    }

    pub fn id_allocator(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot(self.arena.clone())
    }

    /// Put back the entities of a snapshot. Id counters are left alone, so
    /// ids issued since the snapshot stay retired.
    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        self.arena = snapshot.0;
    }

    /// Rebuild a store from flat entity lists, e.g. from a saved project.
    ///
    /// Every id must be unique within its kind, every reference must resolve
    /// and every geometry must be valid. Pins
    /// are renumbered by their stored sequence number.
    pub fn from_parts(
        plots: Vec<Plot>,
        polygons: Vec<Polygon>,
        pins: Vec<Pin>,
        sensors: Vec<Sensor>,
        mut ids: IdAllocator,
    ) -> Result<Self, AssetError> {
        let mut arena = Arena::default();

        for plot in plots {
            ids.reserve_through(EntityKind::Plot, plot.id.value());
            if arena.plots.contains_key(&plot.id) {
                return Err(AssetError::duplicate(EntityKind::Plot, plot.id));
            }
            arena.plots.insert(plot.id, PlotEntry { plot, polygon: None });
        }

        for mut polygon in polygons {
            ids.reserve_through(EntityKind::Polygon, polygon.id.value());
            if arena.polygons.contains_key(&polygon.id) {
                return Err(AssetError::duplicate(EntityKind::Polygon, polygon.id));
            }
            let plot_entry = arena
                .plots
                .get_mut(&polygon.plot_id)
                .ok_or_else(|| AssetError::not_found(EntityKind::Plot, polygon.plot_id))?;
            polygon.vertices = geometry::normalize_polygon(&polygon.vertices)?;
            // One active boundary per plot; a later polygon wins
            if let Some(previous) = plot_entry.polygon.replace(polygon.id) {
                arena.polygons.remove(&previous);
            }
            arena.polygons.insert(
                polygon.id,
                PolygonEntry {
                    polygon,
                    pins: Vec::new(),
                },
            );
        }

        let mut pins = pins;
        pins.sort_by_key(|pin| (pin.polygon_id, pin.sequence_number, pin.id));
        for pin in pins {
            ids.reserve_through(EntityKind::Pin, pin.id.value());
            if arena.pins.contains_key(&pin.id) {
                return Err(AssetError::duplicate(EntityKind::Pin, pin.id));
            }
            if !pin.position.is_valid() {
                return Err(AssetError::InvalidCoordinate {
                    lat: pin.position.lat,
                    lon: pin.position.lon,
                });
            }
            let polygon_entry = arena
                .polygons
                .get_mut(&pin.polygon_id)
                .ok_or_else(|| AssetError::not_found(EntityKind::Polygon, pin.polygon_id))?;
            polygon_entry.pins.push(pin.id);
            arena.pins.insert(
                pin.id,
                PinEntry {
                    pin,
                    sensors: BTreeSet::new(),
                },
            );
        }

        for sensor in sensors {
            ids.reserve_through(EntityKind::Sensor, sensor.id.value());
            if arena.sensors.contains_key(&sensor.id) {
                return Err(AssetError::duplicate(EntityKind::Sensor, sensor.id));
            }
            let pin_entry = arena
                .pins
                .get_mut(&sensor.pin_id)
                .ok_or_else(|| AssetError::not_found(EntityKind::Pin, sensor.pin_id))?;
            pin_entry.sensors.insert(sensor.id);
            arena.sensors.insert(sensor.id, sensor);
        }

        let mut store = AssetStore { arena, ids };
        let polygon_ids: Vec<PolygonId> = store.arena.polygons.keys().copied().collect();
        for polygon_id in polygon_ids {
            store.renumber_pins(polygon_id);
        }
        Ok(store)
    }

    fn sensor_mut(&mut self, sensor_id: SensorId) -> Result<&mut Sensor, AssetError> {
        self.arena
            .sensors
            .get_mut(&sensor_id)
            .ok_or_else(|| AssetError::not_found(EntityKind::Sensor, sensor_id))
    }

    /// Make sequence numbers dense again, keeping the current relative order
    fn renumber_pins(&mut self, polygon_id: PolygonId) {
        let Some(polygon_entry) = self.arena.polygons.get(&polygon_id) else {
            return;
        };
        for (index, pin_id) in polygon_entry.pins.iter().enumerate() {
            if let Some(pin_entry) = self.arena.pins.get_mut(pin_id) {
                pin_entry.pin.sequence_number = index as u32 + 1;
            }
        }
    }

    fn remove_pin_subtree(&mut self, pin_id: PinId) {
        if let Some(entry) = self.arena.pins.remove(&pin_id) {
            for sensor_id in entry.sensors {
                self.arena.sensors.remove(&sensor_id);
            }
        }
    }

    fn remove_polygon_subtree(&mut self, polygon_id: PolygonId) {
        if let Some(entry) = self.arena.polygons.remove(&polygon_id) {
            for pin_id in entry.pins {
                self.remove_pin_subtree(pin_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_boundary() -> Vec<LatLon> {
        vec![
            LatLon::new(13.25, 101.05),
            LatLon::new(13.25, 101.25),
            LatLon::new(13.35, 101.25),
            LatLon::new(13.35, 101.05),
        ]
    }

    fn store_with_polygon() -> (AssetStore, PlotId, PolygonId) {
        let mut store = AssetStore::new();
        let plot = store.create_plot(PlotInput::named("Plot A"));
        let polygon = store
            .attach_polygon(plot.id, &field_boundary(), Color::default())
            .unwrap();
        (store, plot.id, polygon.id)
    }

    fn sequence(store: &AssetStore, polygon_id: PolygonId) -> Vec<(PinId, u32)> {
        store
            .list_pins(polygon_id)
            .iter()
            .map(|pin| (pin.id, pin.sequence_number))
            .collect()
    }

    #[test]
    fn create_plot_has_no_polygon() {
        let mut store = AssetStore::new();
        let plot = store.create_plot(PlotInput::named("Plot A"));
        assert_eq!(plot.id, PlotId::new(1));
        assert!(store.polygon_of_plot(plot.id).is_none());
    }

    #[test]
    fn attach_polygon_requires_known_plot_and_valid_geometry() {
        let mut store = AssetStore::new();
        assert_eq!(
            store.attach_polygon(PlotId::new(1), &field_boundary(), Color::default()),
            Err(AssetError::not_found(EntityKind::Plot, 1u64))
        );

        let plot = store.create_plot(PlotInput::named("Plot A"));
        let result = store.attach_polygon(plot.id, &field_boundary()[..2], Color::default());
        assert!(matches!(result, Err(AssetError::InvalidGeometry(_))));
        assert_eq!(store.polygons().count(), 0);
    }

    #[test]
    fn attach_polygon_twice_replaces_the_first() {
        let (mut store, plot_id, first) = store_with_polygon();
        store.create_pin(first, 13.3, 101.1).unwrap();

        let second = store
            .attach_polygon(plot_id, &field_boundary(), Color::from_rgb(1, 2, 3))
            .unwrap();
        assert_ne!(first, second.id);
        assert!(store.polygon(first).is_none());
        assert_eq!(store.polygons().count(), 1);
        assert_eq!(store.polygon_of_plot(plot_id).map(|p| p.id), Some(second.id));
        assert_eq!(store.pins().count(), 0);
    }

    #[test]
    fn create_pin_numbers_sequentially() {
        let (mut store, _, polygon_id) = store_with_polygon();
        for n in 1..=3 {
            let pin = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
            assert_eq!(pin.sequence_number, n);
        }
    }

    #[test]
    fn create_pin_validates_polygon_and_coordinates() {
        let (mut store, _, polygon_id) = store_with_polygon();
        assert_eq!(
            store.create_pin(PolygonId::new(99), 13.3, 101.1),
            Err(AssetError::not_found(EntityKind::Polygon, 99u64))
        );
        assert_eq!(
            store.create_pin(polygon_id, 13.3, 181.0),
            Err(AssetError::InvalidCoordinate {
                lat: 13.3,
                lon: 181.0
            })
        );
        assert!(matches!(
            store.create_pin(polygon_id, f64::NAN, 101.0),
            Err(AssetError::InvalidCoordinate { .. })
        ));
        assert_eq!(store.pins().count(), 0);
    }

    #[test]
    fn pin_outside_boundary_is_accepted() {
        let (mut store, _, polygon_id) = store_with_polygon();
        let pin = store.create_pin(polygon_id, 14.0, 100.0).unwrap();
        assert_eq!(pin.sequence_number, 1);
    }

    #[test]
    fn delete_middle_pin_renumbers_remaining() {
        let (mut store, _, polygon_id) = store_with_polygon();
        let first = store.create_pin(polygon_id, 13.30, 101.10).unwrap();
        let second = store.create_pin(polygon_id, 13.31, 101.11).unwrap();
        let third = store.create_pin(polygon_id, 13.32, 101.12).unwrap();

        store.delete_pin(second.id).unwrap();
        assert_eq!(sequence(&store, polygon_id), vec![(first.id, 1), (third.id, 2)]);

        let fourth = store.create_pin(polygon_id, 13.33, 101.13).unwrap();
        assert_eq!(fourth.sequence_number, 3);
    }

    #[test]
    fn delete_pin_cascades_sensors() {
        let (mut store, _, polygon_id) = store_with_polygon();
        let pin = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        let sensor = store
            .attach_sensor(pin.id, SensorType::Temperature, 31.5)
            .unwrap();
        store.delete_pin(pin.id).unwrap();
        assert!(store.sensor(sensor.id).is_none());
        assert!(store.list_sensors(pin.id).is_empty());
    }

    #[test]
    fn delete_pin_twice_is_not_found_and_changes_nothing() {
        let (mut store, _, polygon_id) = store_with_polygon();
        let first = store.create_pin(polygon_id, 13.30, 101.10).unwrap();
        store.create_pin(polygon_id, 13.31, 101.11).unwrap();

        store.delete_pin(first.id).unwrap();
        let after_first = store.snapshot();
        assert_eq!(
            store.delete_pin(first.id),
            Err(AssetError::not_found(EntityKind::Pin, first.id))
        );
        assert_eq!(store.snapshot().0, after_first.0);
    }

    #[test]
    fn delete_all_pins_then_numbering_restarts() {
        let (mut store, _, polygon_id) = store_with_polygon();
        let pin = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        store.attach_sensor(pin.id, SensorType::Light, 800.0).unwrap();
        store.create_pin(polygon_id, 13.31, 101.1).unwrap();

        assert_eq!(store.delete_all_pins(polygon_id), Ok(2));
        assert!(store.list_pins(polygon_id).is_empty());
        assert_eq!(store.sensors().count(), 0);

        let pin = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        assert_eq!(pin.sequence_number, 1);
        assert_eq!(
            store.delete_all_pins(PolygonId::new(42)),
            Err(AssetError::not_found(EntityKind::Polygon, 42u64))
        );
    }

    #[test]
    fn delete_plot_cascades_everything() {
        let (mut store, plot_id, polygon_id) = store_with_polygon();
        let pin = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        store
            .attach_sensor(pin.id, SensorType::SoilMoisture, 41.0)
            .unwrap();
        store.attach_sensor(pin.id, SensorType::Npk, 120.0).unwrap();

        store.delete_plot(plot_id).unwrap();
        assert_eq!(store.plots().count(), 0);
        assert_eq!(store.polygons().count(), 0);
        assert_eq!(store.pins().count(), 0);
        assert_eq!(store.sensors().count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn delete_unknown_plot_leaves_store_unchanged() {
        let (mut store, _, polygon_id) = store_with_polygon();
        store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        let before = store.snapshot();
        assert_eq!(
            store.delete_plot(PlotId::new(77)),
            Err(AssetError::not_found(EntityKind::Plot, 77u64))
        );
        assert_eq!(store.snapshot().0, before.0);
    }

    #[test]
    fn delete_polygon_keeps_plot() {
        let (mut store, plot_id, polygon_id) = store_with_polygon();
        store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        store.delete_polygon(polygon_id).unwrap();
        assert!(store.plot(plot_id).is_some());
        assert!(store.polygon_of_plot(plot_id).is_none());
        assert_eq!(store.pins().count(), 0);
        assert!(store.delete_polygon(polygon_id).is_err());
    }

    #[test]
    fn ids_are_not_reused_after_deletion() {
        let (mut store, _, polygon_id) = store_with_polygon();
        let pin = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        store.delete_pin(pin.id).unwrap();
        let next = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        assert!(next.id > pin.id);
    }

    #[test]
    fn sensor_updates() {
        let (mut store, _, polygon_id) = store_with_polygon();
        let pin = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        assert_eq!(
            store.attach_sensor(PinId::new(50), SensorType::Light, 1.0),
            Err(AssetError::not_found(EntityKind::Pin, 50u64))
        );
        let sensor = store.attach_sensor(pin.id, SensorType::Rainfall, 0.0).unwrap();

        assert_eq!(store.update_reading(sensor.id, 12.5).unwrap().last_reading, 12.5);
        let sensor = store
            .set_sensor_node(sensor.id, Some("node-7".into()))
            .unwrap();
        assert_eq!(sensor.node.as_deref(), Some("node-7"));
        assert_eq!(store.set_sensor_node(sensor.id, Some(" ".into())).unwrap().node, None);

        store.detach_sensor(sensor.id).unwrap();
        assert!(store.list_sensors(pin.id).is_empty());
        assert!(store.detach_sensor(sensor.id).is_err());
    }

    #[test]
    fn update_plot_edits_fields() {
        let mut store = AssetStore::new();
        let plot = store.create_plot(PlotInput::named("Plot A"));
        let updated = store
            .update_plot(
                plot.id,
                PlotUpdate {
                    name: Some("North field".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "North field");
        assert_eq!(store.plot(plot.id), Some(&updated));
        assert!(store.update_plot(PlotId::new(9), PlotUpdate::default()).is_err());
    }

    #[test]
    fn restore_keeps_id_counters() {
        let (mut store, _, polygon_id) = store_with_polygon();
        let snapshot = store.snapshot();
        let pin = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        store.restore(snapshot);
        assert!(store.pin(pin.id).is_none());
        let next = store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        assert!(next.id > pin.id);
        assert_eq!(next.sequence_number, 1);
    }

    #[test]
    fn from_parts_rebuilds_indexes() {
        let (mut store, _, polygon_id) = store_with_polygon();
        let a = store.create_pin(polygon_id, 13.30, 101.10).unwrap();
        let b = store.create_pin(polygon_id, 13.31, 101.11).unwrap();
        store.attach_sensor(b.id, SensorType::WindSpeed, 3.2).unwrap();

        // reversed on purpose, order comes from sequence numbers
        let mut pins: Vec<Pin> = store.pins().cloned().collect();
        pins.reverse();
        let rebuilt = AssetStore::from_parts(
            store.plots().cloned().collect(),
            store.polygons().cloned().collect(),
            pins,
            store.sensors().cloned().collect(),
            IdAllocator::default(),
        )
        .unwrap();

        assert_eq!(sequence(&rebuilt, polygon_id), vec![(a.id, 1), (b.id, 2)]);
        assert_eq!(rebuilt.list_sensors(b.id).len(), 1);
        assert_eq!(
            rebuilt.id_allocator().last_id(EntityKind::Pin),
            store.id_allocator().last_id(EntityKind::Pin)
        );
    }

    #[test]
    fn from_parts_rejects_dangling_references() {
        let (mut store, _, polygon_id) = store_with_polygon();
        store.create_pin(polygon_id, 13.3, 101.1).unwrap();
        let result = AssetStore::from_parts(
            Vec::new(),
            Vec::new(),
            store.pins().cloned().collect(),
            Vec::new(),
            IdAllocator::default(),
        );
        assert_eq!(
            result.err(),
            Some(AssetError::not_found(EntityKind::Polygon, polygon_id))
        );
    }
}

//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

//! What the operator is currently looking at, and the view derived from it.
//!
//! `SelectionState` is a plain value: setters consume it and return the
//! updated state, so callers always hold the selection explicitly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::asset_store::AssetStore;
use crate::error::{AssetError, SensorTypeParseError};
use crate::ids::{EntityKind, PlotId};
use crate::model::{Color, Pin, Polygon, Sensor, SensorType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorFilter {
    #[default]
    All,
    Only(SensorType),
}

impl SensorFilter {
    pub fn matches(&self, sensor_type: SensorType) -> bool {
        match self {
            SensorFilter::All => true,
            SensorFilter::Only(only) => *only == sensor_type,
        }
    }
}

impl fmt::Display for SensorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorFilter::All => f.write_str("all"),
            SensorFilter::Only(sensor_type) => write!(f, "{}", sensor_type),
        }
    }
}

impl FromStr for SensorFilter {
    type Err = SensorTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(SensorFilter::All),
            other => other.parse().map(SensorFilter::Only),
        }
    }
}

/// Inclusive day range. Owned by the analytics view; carried here so every
/// filter axis lives in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Builds a range, swapping the ends if they are given backwards
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        DateRange {
            from: a.min(b),
            to: a.max(b),
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from <= day && day <= self.to
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    pub active_plot: Option<PlotId>,
    /// Hardware node the sensor lists are narrowed to
    pub active_node: Option<String>,
    pub sensor_filter: SensorFilter,
    pub date_range: Option<DateRange>,
    /// Color given to the next boundary drawn
    pub draw_color: Color,
}

impl SelectionState {
    /// Default selection: first plot (if any), no filters
    pub fn initial(store: &AssetStore, draw_color: Color) -> Self {
        SelectionState {
            active_plot: store.plots().next().map(|plot| plot.id),
            active_node: None,
            sensor_filter: SensorFilter::All,
            date_range: None,
            draw_color,
        }
    }

    pub fn set_active_plot(self, store: &AssetStore, plot_id: PlotId) -> Result<Self, AssetError> {
        if store.plot(plot_id).is_none() {
            return Err(AssetError::not_found(EntityKind::Plot, plot_id));
        }
        Ok(SelectionState {
            active_plot: Some(plot_id),
            ..self
        })
    }

    pub fn set_sensor_type_filter(self, sensor_filter: SensorFilter) -> Self {
        SelectionState {
            sensor_filter,
            ..self
        }
    }

    pub fn set_active_node(self, node: Option<String>) -> Self {
        SelectionState {
            active_node: node.filter(|n| !n.trim().is_empty()),
            ..self
        }
    }

    pub fn set_date_range(self, date_range: Option<DateRange>) -> Self {
        SelectionState { date_range, ..self }
    }

    pub fn set_draw_color(self, draw_color: Color) -> Self {
        SelectionState { draw_color, ..self }
    }

    /// Drop references to plots that no longer exist, falling back to the
    /// first remaining plot
    pub fn refresh(self, store: &AssetStore) -> Self {
        match self.active_plot {
            Some(plot_id) if store.plot(plot_id).is_some() => self,
            _ => SelectionState {
                active_plot: store.plots().next().map(|plot| plot.id),
                ..self
            },
        }
    }

    pub fn active_polygon<'a>(&self, store: &'a AssetStore) -> Option<&'a Polygon> {
        self.active_plot
            .and_then(|plot_id| store.polygon_of_plot(plot_id))
    }

    fn has_sensor_axis(&self) -> bool {
        self.sensor_filter != SensorFilter::All || self.active_node.is_some()
    }

    /// True if the sensor passes every active axis
    pub fn sensor_matches(&self, sensor: &Sensor) -> bool {
        self.sensor_filter.matches(sensor.sensor_type)
            && self
                .active_node
                .as_ref()
                .is_none_or(|node| sensor.node.as_ref() == Some(node))
    }

    /// Pins of the active plot's boundary, in sequence order. With a sensor
    /// axis active, only pins carrying at least one matching sensor remain.
    pub fn visible_pins<'a>(&self, store: &'a AssetStore) -> Vec<&'a Pin> {
        let Some(polygon) = self.active_polygon(store) else {
            return Vec::new();
        };
        let pins = store.list_pins(polygon.id);
        if !self.has_sensor_axis() {
            return pins;
        }
        pins.into_iter()
            .filter(|pin| {
                store
                    .list_sensors(pin.id)
                    .iter()
                    .any(|sensor| self.sensor_matches(sensor))
            })
            .collect()
    }

    /// Sensors of a pin that pass the active axes
    pub fn visible_sensors<'a>(&self, store: &'a AssetStore, pin: &Pin) -> Vec<&'a Sensor> {
        let mut sensors: Vec<&Sensor> = store
            .list_sensors(pin.id)
            .into_iter()
            .filter(|sensor| self.sensor_matches(sensor))
            .collect();
        sensors.sort_by_key(|sensor| (sensor.sensor_type, sensor.id));
        sensors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LatLon;
    use crate::model::{PlotInput, DEFAULT_DRAW_COLOR};

    fn boundary() -> Vec<LatLon> {
        vec![
            LatLon::new(13.25, 101.05),
            LatLon::new(13.25, 101.25),
            LatLon::new(13.35, 101.25),
            LatLon::new(13.35, 101.05),
        ]
    }

    #[test]
    fn initial_selects_first_plot() {
        let mut store = AssetStore::new();
        assert_eq!(SelectionState::initial(&store, DEFAULT_DRAW_COLOR).active_plot, None);

        let first = store.create_plot(PlotInput::named("Plot A"));
        store.create_plot(PlotInput::named("Plot B"));
        let selection = SelectionState::initial(&store, DEFAULT_DRAW_COLOR);
        assert_eq!(selection.active_plot, Some(first.id));
        assert_eq!(selection.sensor_filter, SensorFilter::All);
        assert_eq!(selection.draw_color, DEFAULT_DRAW_COLOR);
    }

    #[test]
    fn set_active_plot_rejects_unknown_plot() {
        let store = AssetStore::new();
        let selection = SelectionState::initial(&store, DEFAULT_DRAW_COLOR);
        assert!(selection.set_active_plot(&store, PlotId::new(5)).is_err());
    }

    #[test]
    fn filters_narrow_visible_pins() {
        let mut store = AssetStore::new();
        let plot = store.create_plot(PlotInput::named("Plot A"));
        let polygon = store
            .attach_polygon(plot.id, &boundary(), DEFAULT_DRAW_COLOR)
            .unwrap();
        let a = store.create_pin(polygon.id, 13.30, 101.12).unwrap();
        let b = store.create_pin(polygon.id, 13.29, 101.18).unwrap();
        let c = store.create_pin(polygon.id, 13.28, 101.10).unwrap();
        let moisture = store
            .attach_sensor(a.id, SensorType::SoilMoisture, 40.0)
            .unwrap();
        store
            .attach_sensor(b.id, SensorType::Temperature, 30.0)
            .unwrap();
        store.set_sensor_node(moisture.id, Some("node-1".into())).unwrap();

        let selection = SelectionState::initial(&store, DEFAULT_DRAW_COLOR);
        let ids = |pins: Vec<&Pin>| pins.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(selection.visible_pins(&store)), vec![a.id, b.id, c.id]);

        let selection = selection.set_sensor_type_filter(SensorFilter::Only(SensorType::SoilMoisture));
        assert_eq!(ids(selection.visible_pins(&store)), vec![a.id]);

        let selection = selection
            .set_sensor_type_filter(SensorFilter::All)
            .set_active_node(Some("node-1".into()));
        assert_eq!(ids(selection.visible_pins(&store)), vec![a.id]);

        let selection = selection.set_active_node(Some("node-2".into()));
        assert!(selection.visible_pins(&store).is_empty());
    }

    #[test]
    fn no_polygon_means_no_visible_pins() {
        let mut store = AssetStore::new();
        store.create_plot(PlotInput::named("Plot A"));
        let selection = SelectionState::initial(&store, DEFAULT_DRAW_COLOR);
        assert!(selection.visible_pins(&store).is_empty());
    }

    #[test]
    fn refresh_falls_back_after_plot_deletion() {
        let mut store = AssetStore::new();
        let a = store.create_plot(PlotInput::named("Plot A"));
        let b = store.create_plot(PlotInput::named("Plot B"));
        let selection = SelectionState::initial(&store, DEFAULT_DRAW_COLOR)
            .set_active_plot(&store, a.id)
            .unwrap();
        store.delete_plot(a.id).unwrap();
        assert_eq!(selection.refresh(&store).active_plot, Some(b.id));
    }

    #[test]
    fn sensor_filter_parses_all_and_types() {
        assert_eq!("all".parse::<SensorFilter>(), Ok(SensorFilter::All));
        assert_eq!(
            "wind-speed".parse::<SensorFilter>(),
            Ok(SensorFilter::Only(SensorType::WindSpeed))
        );
        assert!("wind".parse::<SensorFilter>().is_err());
        assert_eq!(SensorFilter::Only(SensorType::Npk).to_string(), "npk");
    }

    #[test]
    fn date_range_orders_its_ends() {
        let early = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let late = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let range = DateRange::new(late, early);
        assert_eq!(range.from, early);
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()));
    }
}

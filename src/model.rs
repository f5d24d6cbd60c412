//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

//! Entities of the asset hierarchy: Plot -> Polygon -> Pin -> Sensor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ColorParseError, SensorTypeParseError};
use crate::geometry::LatLon;
use crate::ids::{PinId, PlotId, PolygonId, SensorId};

/// Boundary color used when nothing else was chosen
pub const DEFAULT_DRAW_COLOR: Color = Color::from_rgb(0x16, 0xa3, 0x4a);

/// An RGB color that round-trips through its `#rrggbb` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        DEFAULT_DRAW_COLOR
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Color::from_rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> String {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    pub id: PlotId,
    pub name: String,
    pub crop_type: String,
    pub caretaker: String,
    pub planted_date: Option<NaiveDate>,
    pub description: String,
}

/// Fields for a new plot.
///
/// Only `name` is expected to be filled in; every optional field that is left
/// out is stored as an empty string (or no date), matching a blank form field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotInput {
    pub name: String,
    pub crop_type: Option<String>,
    pub caretaker: Option<String>,
    pub planted_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl PlotInput {
    pub fn named(name: impl Into<String>) -> Self {
        PlotInput {
            name: name.into(),
            ..Default::default()
        }
    }

    pub(crate) fn into_plot(self, id: PlotId) -> Plot {
        Plot {
            id,
            name: self.name.trim().to_string(),
            crop_type: self.crop_type.unwrap_or_default(),
            caretaker: self.caretaker.unwrap_or_default(),
            planted_date: self.planted_date,
            description: self.description.unwrap_or_default(),
        }
    }
}

/// Partial edit of a plot; `None` keeps the stored value.
/// `planted_date: Some(None)` clears the date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotUpdate {
    pub name: Option<String>,
    pub crop_type: Option<String>,
    pub caretaker: Option<String>,
    pub planted_date: Option<Option<NaiveDate>>,
    pub description: Option<String>,
}

impl From<PlotInput> for PlotUpdate {
    /// Overwrite every field with the form contents
    fn from(input: PlotInput) -> Self {
        PlotUpdate {
            name: Some(input.name),
            crop_type: Some(input.crop_type.unwrap_or_default()),
            caretaker: Some(input.caretaker.unwrap_or_default()),
            planted_date: Some(input.planted_date),
            description: Some(input.description.unwrap_or_default()),
        }
    }
}

impl PlotUpdate {
    /// True if applying this update would leave the plot without a name
    pub fn clears_name(&self) -> bool {
        self.name.as_ref().is_some_and(|name| name.trim().is_empty())
    }

    pub(crate) fn apply_to(self, plot: &mut Plot) {
        if let Some(name) = self.name {
            plot.name = name.trim().to_string();
        }
        if let Some(crop_type) = self.crop_type {
            plot.crop_type = crop_type;
        }
        if let Some(caretaker) = self.caretaker {
            plot.caretaker = caretaker;
        }
        if let Some(planted_date) = self.planted_date {
            plot.planted_date = planted_date;
        }
        if let Some(description) = self.description {
            plot.description = description;
        }
    }
}

/// Boundary of a plot. Vertex order is exactly as drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub id: PolygonId,
    pub plot_id: PlotId,
    pub vertices: Vec<LatLon>,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: PinId,
    pub polygon_id: PolygonId,
    /// 1-based display index within the polygon, kept dense on deletion
    pub sequence_number: u32,
    pub position: LatLon,
}

impl Pin {
    pub fn label(&self) -> String {
        format!("Pin number #{}", self.sequence_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorType {
    SoilMoisture,
    Temperature,
    RelativeHumidity,
    Npk,
    IrrigationRate,
    Light,
    Rainfall,
    WindSpeed,
}

impl SensorType {
    pub const ALL: [SensorType; 8] = [
        SensorType::SoilMoisture,
        SensorType::Temperature,
        SensorType::RelativeHumidity,
        SensorType::Npk,
        SensorType::IrrigationRate,
        SensorType::Light,
        SensorType::Rainfall,
        SensorType::WindSpeed,
    ];

    /// Wire name, as used by the backend and the filter axis
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::SoilMoisture => "soil-moisture",
            SensorType::Temperature => "temperature",
            SensorType::RelativeHumidity => "relative-humidity",
            SensorType::Npk => "npk",
            SensorType::IrrigationRate => "irrigation-rate",
            SensorType::Light => "light",
            SensorType::Rainfall => "rainfall",
            SensorType::WindSpeed => "wind-speed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SensorType::SoilMoisture => "Soil moisture",
            SensorType::Temperature => "Temperature",
            SensorType::RelativeHumidity => "Relative humidity",
            SensorType::Npk => "NPK",
            SensorType::IrrigationRate => "Irrigation rate",
            SensorType::Light => "Light",
            SensorType::Rainfall => "Rainfall",
            SensorType::WindSpeed => "Wind speed",
        }
    }

    /// Unit of `Sensor::last_reading` for this type
    pub fn unit(&self) -> &'static str {
        match self {
            SensorType::SoilMoisture => "%",
            SensorType::Temperature => "°C",
            SensorType::RelativeHumidity => "%RH",
            SensorType::Npk => "mg/kg",
            SensorType::IrrigationRate => "L/h",
            SensorType::Light => "lux",
            SensorType::Rainfall => "mm",
            SensorType::WindSpeed => "m/s",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = SensorTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SensorTypeParseError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub pin_id: PinId,
    pub sensor_type: SensorType,
    pub last_reading: f64,
    /// Hardware concentrator the sensor reports through, if known
    #[serde(default)]
    pub node: Option<String>,
}

impl Sensor {
    pub fn reading_text(&self) -> String {
        format!("{:.1} {}", self.last_reading, self.sensor_type.unit())
    }
}

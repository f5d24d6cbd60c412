//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::geometry::LatLon;
use crate::model::{Color, DEFAULT_DRAW_COLOR};

pub const SETTINGS_FILE: &str = "dashboard_settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub default_draw_color: Color,
    pub draw_palette: Vec<Color>,
    /// Where the map is centered when no boundary is selected
    pub map_center: LatLon,
    /// Latitude span shown on screen, in degrees
    pub map_span_degrees: f64,
    pub autosave_interval_secs: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        DashboardSettings {
            default_draw_color: DEFAULT_DRAW_COLOR,
            draw_palette: vec![
                DEFAULT_DRAW_COLOR,
                Color::from_rgb(0x25, 0x63, 0xeb),
                Color::from_rgb(0xf5, 0x9e, 0x0b),
                Color::from_rgb(0xdc, 0x26, 0x26),
                Color::from_rgb(0x93, 0x33, 0xea),
            ],
            map_center: LatLon::new(13.30, 101.15),
            map_span_degrees: 0.2,
            autosave_interval_secs: 30,
        }
    }
}

impl DashboardSettings {
    /// Read settings from `path`. A missing or unreadable file gives the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) => {
                log::info!("No settings at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_json(&data) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to parse settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let mut settings: DashboardSettings = serde_json::from_str(data)?;
        if !settings.map_center.is_valid() {
            log::warn!("Ignoring invalid map center {:?}", settings.map_center);
            settings.map_center = Self::default().map_center;
        }
        if !(settings.map_span_degrees.is_finite() && settings.map_span_degrees > 0.0) {
            settings.map_span_degrees = Self::default().map_span_degrees;
        }
        if settings.draw_palette.is_empty() {
            settings.draw_palette = Self::default().draw_palette;
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
    }
}

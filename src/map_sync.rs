//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use serde::{Deserialize, Serialize};

use crate::asset_store::AssetStore;
use crate::error::AssetError;
use crate::geometry::{self, LatLon};
use crate::ids::{PinId, PlotId, PolygonId};
use crate::model::{Color, Pin, Polygon};
use crate::selection::SelectionState;

/// Intent emitted by the map surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MapEvent {
    #[serde(rename_all = "camelCase")]
    DrawComplete { raw_points: Vec<LatLon> },
    MarkerPlaced { lat: f64, lon: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPolygon {
    pub polygon_id: PolygonId,
    pub vertices: Vec<LatLon>,
    pub color: Color,
    /// Fill triangles as indices into `vertices`
    pub triangles: Vec<[usize; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPin {
    pub pin_id: PinId,
    pub sequence_number: u32,
    pub position: LatLon,
    /// Result of the advisory containment check
    pub inside_boundary: bool,
}

/// Everything the map surface draws for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderModel {
    pub polygon: Option<RenderPolygon>,
    pub pins: Vec<RenderPin>,
    /// Points of a boundary still being drawn
    pub drawing: Vec<LatLon>,
}

/// Bridges the store and the map surface.
///
/// Holds only the transient drawing layer; every entity it shows is read from
/// the store on demand.
#[derive(Debug, Clone, Default)]
pub struct MapSyncAdapter {
    drawing_layer: Option<Vec<LatLon>>,
}

impl MapSyncAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_drawing(&mut self) {
        self.drawing_layer = Some(Vec::new());
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing_layer.is_some()
    }

    /// Add a vertex to the shape being drawn. Ignored when not drawing.
    pub fn add_draw_point(&mut self, point: LatLon) {
        if let Some(layer) = self.drawing_layer.as_mut() {
            layer.push(point);
        }
    }

    /// Remove the last vertex of the shape being drawn
    pub fn undo_draw_point(&mut self) -> Option<LatLon> {
        self.drawing_layer.as_mut().and_then(|layer| layer.pop())
    }

    pub fn drawing_layer(&self) -> &[LatLon] {
        self.drawing_layer.as_deref().unwrap_or_default()
    }

    /// Drop the transient shape and hand back its points
    pub fn take_drawing(&mut self) -> Vec<LatLon> {
        self.drawing_layer.take().unwrap_or_default()
    }

    pub fn cancel_drawing(&mut self) {
        self.drawing_layer = None;
    }

    /// Persist a finished drawing as the boundary of `plot_id`, in the
    /// selection's draw color. The transient layer is cleared whether or not
    /// the shape is accepted.
    pub fn on_draw_complete(
        &mut self,
        store: &mut AssetStore,
        selection: &SelectionState,
        plot_id: PlotId,
        raw_points: &[LatLon],
    ) -> Result<Polygon, AssetError> {
        self.cancel_drawing();
        let vertices = geometry::normalize_polygon(raw_points).inspect_err(|e| {
            log::warn!("Discarded drawn boundary for plot {}: {}", plot_id, e);
        })?;
        store.attach_polygon(plot_id, &vertices, selection.draw_color)
    }

    pub fn on_marker_place(
        &self,
        store: &mut AssetStore,
        polygon_id: PolygonId,
        lat: f64,
        lon: f64,
    ) -> Result<Pin, AssetError> {
        store.create_pin(polygon_id, lat, lon)
    }

    /// Project the store and selection into drawable primitives
    pub fn render_model(&self, store: &AssetStore, selection: &SelectionState) -> RenderModel {
        let polygon = selection.active_polygon(store);
        let pins = selection
            .visible_pins(store)
            .into_iter()
            .map(|pin| RenderPin {
                pin_id: pin.id,
                sequence_number: pin.sequence_number,
                position: pin.position,
                inside_boundary: polygon
                    .is_some_and(|p| geometry::is_point_in_polygon(pin.position, &p.vertices)),
            })
            .collect();

        RenderModel {
            polygon: polygon.map(|p| RenderPolygon {
                polygon_id: p.id,
                vertices: p.vertices.clone(),
                color: p.color,
                triangles: geometry::triangulate(&p.vertices),
            }),
            pins,
            drawing: self.drawing_layer().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlotInput, DEFAULT_DRAW_COLOR};

    fn setup() -> (AssetStore, SelectionState, PlotId) {
        let mut store = AssetStore::new();
        let plot = store.create_plot(PlotInput::named("Plot A"));
        let selection = SelectionState::initial(&store, DEFAULT_DRAW_COLOR)
            .set_draw_color(Color::from_rgb(0xdc, 0x26, 0x26));
        (store, selection, plot.id)
    }

    fn drawn() -> Vec<LatLon> {
        vec![
            LatLon::new(13.25, 101.05),
            LatLon::new(13.25, 101.25),
            LatLon::new(13.35, 101.25),
            LatLon::new(13.35, 101.05),
        ]
    }

    #[test]
    fn draw_complete_uses_selection_color_and_clears_layer() {
        let (mut store, selection, plot_id) = setup();
        let mut map = MapSyncAdapter::new();
        map.begin_drawing();
        for point in drawn() {
            map.add_draw_point(point);
        }
        let raw = map.drawing_layer().to_vec();

        let polygon = map
            .on_draw_complete(&mut store, &selection, plot_id, &raw)
            .unwrap();
        assert_eq!(polygon.color, Color::from_rgb(0xdc, 0x26, 0x26));
        assert_eq!(polygon.vertices, drawn());
        assert!(!map.is_drawing());
    }

    #[test]
    fn invalid_drawing_is_discarded_and_layer_cleared() {
        let (mut store, selection, plot_id) = setup();
        let mut map = MapSyncAdapter::new();
        map.begin_drawing();
        map.add_draw_point(LatLon::new(13.0, 101.0));
        map.add_draw_point(LatLon::new(13.1, 101.0));

        let raw = map.drawing_layer().to_vec();
        let result = map.on_draw_complete(&mut store, &selection, plot_id, &raw);
        assert!(matches!(result, Err(AssetError::InvalidGeometry(_))));
        assert!(!map.is_drawing());
        assert!(store.polygon_of_plot(plot_id).is_none());
    }

    #[test]
    fn render_model_follows_store() {
        let (mut store, selection, plot_id) = setup();
        let mut map = MapSyncAdapter::new();
        assert_eq!(map.render_model(&store, &selection), RenderModel::default());

        let polygon = map
            .on_draw_complete(&mut store, &selection, plot_id, &drawn())
            .unwrap();
        map.on_marker_place(&mut store, polygon.id, 13.30, 101.12).unwrap();
        map.on_marker_place(&mut store, polygon.id, 14.00, 101.12).unwrap();

        let model = map.render_model(&store, &selection);
        let rendered = model.polygon.unwrap();
        assert_eq!(rendered.vertices, drawn());
        assert_eq!(rendered.triangles.len(), 2);
        assert_eq!(
            model
                .pins
                .iter()
                .map(|p| (p.sequence_number, p.inside_boundary))
                .collect::<Vec<_>>(),
            vec![(1, true), (2, false)]
        );
    }

    #[test]
    fn drawing_layer_is_rendered_while_drawing() {
        let (store, selection, _) = setup();
        let mut map = MapSyncAdapter::new();
        map.add_draw_point(LatLon::new(1.0, 1.0));
        assert!(map.drawing_layer().is_empty());

        map.begin_drawing();
        map.add_draw_point(LatLon::new(1.0, 1.0));
        map.add_draw_point(LatLon::new(2.0, 1.0));
        assert_eq!(map.undo_draw_point(), Some(LatLon::new(2.0, 1.0)));
        assert_eq!(
            map.render_model(&store, &selection).drawing,
            vec![LatLon::new(1.0, 1.0)]
        );
    }

    #[test]
    fn map_events_use_camel_case_tags() {
        let event: MapEvent =
            serde_json::from_str(r#"{"type":"markerPlaced","lat":13.3,"lon":101.1}"#).unwrap();
        assert_eq!(
            event,
            MapEvent::MarkerPlaced {
                lat: 13.3,
                lon: 101.1
            }
        );
    }

    #[test]
    fn draw_complete_carries_raw_points_in_camel_case() {
        let event: MapEvent = serde_json::from_str(
            r#"{"type":"drawComplete","rawPoints":[{"lat":13.25,"lon":101.05}]}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            MapEvent::DrawComplete {
                raw_points: vec![LatLon::new(13.25, 101.05)]
            }
        );
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("rawPoints").is_some());
        assert!(json.get("raw_points").is_none());
    }
}

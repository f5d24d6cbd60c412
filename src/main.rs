// Copyright 2024 - The Open-Agriculture Developers
// SPDX-License-Identifier: GPL-3.0-or-later
// Authors: Daan Steenbergen

use chrono::NaiveDate;
use eframe::egui;
use farm_plot_mapper::flows::{AddPinFlow, AddPlotFlow, EditFlow};
use farm_plot_mapper::geometry;
use farm_plot_mapper::map_sync::RenderPin;
use farm_plot_mapper::selection::DateRange;
use farm_plot_mapper::{
    Color, DashboardSettings, FarmProject, LatLon, MapEvent, PinId, PlotId, PlotInput, PlotUpdate,
    SensorFilter, SensorType, SETTINGS_FILE,
};
use std::future::Future;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;

const PIN_RADIUS: f32 = 8.0;
const DATE_FORMAT: &str = "%Y-%m-%d";

enum FileDialogReason {
    LoadProject,
}

/// Side panel the operator is working in, with the flow driving it
enum Screen {
    Dashboard,
    AddPlot(AddPlotFlow),
    AddPin(AddPinFlow),
    Edit(EditFlow),
}

/// Where a panel asks to go next
enum Transition {
    Dashboard,
    AddPlot,
    AddPin(PlotId),
    Edit(PlotId),
}

/// Text fields of the plot details form
#[derive(Default)]
struct PlotForm {
    name: String,
    crop_type: String,
    caretaker: String,
    planted_date: String,
    description: String,
}

impl PlotForm {
    fn from_plot(plot: &farm_plot_mapper::Plot) -> Self {
        PlotForm {
            name: plot.name.clone(),
            crop_type: plot.crop_type.clone(),
            caretaker: plot.caretaker.clone(),
            planted_date: plot
                .planted_date
                .map(|date| date.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            description: plot.description.clone(),
        }
    }

    fn to_input(&self) -> Result<PlotInput, String> {
        let optional = |s: &String| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(PlotInput {
            name: self.name.clone(),
            crop_type: optional(&self.crop_type),
            caretaker: optional(&self.caretaker),
            planted_date: parse_date(&self.planted_date)?,
            description: optional(&self.description),
        })
    }

    fn show(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("plot_form_grid")
            .num_columns(2)
            .show(ui, |ui| {
                ui.label("Name:");
                ui.text_edit_singleline(&mut self.name);
                ui.end_row();
                ui.label("Crop:");
                ui.text_edit_singleline(&mut self.crop_type);
                ui.end_row();
                ui.label("Caretaker:");
                ui.text_edit_singleline(&mut self.caretaker);
                ui.end_row();
                ui.label("Planted:");
                ui.add(egui::TextEdit::singleline(&mut self.planted_date).hint_text("YYYY-MM-DD"));
                ui.end_row();
            });
        ui.label("Description:");
        ui.text_edit_multiline(&mut self.description);
    }
}

/// Blank means no date
fn parse_date(text: &str) -> Result<Option<NaiveDate>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(Some)
        .map_err(|_| format!("'{}' is not a date (YYYY-MM-DD)", text))
}

struct SensorForm {
    sensor_type: SensorType,
    reading: f64,
    node: String,
}

impl Default for SensorForm {
    fn default() -> Self {
        SensorForm {
            sensor_type: SensorType::SoilMoisture,
            reading: 0.0,
            node: String::new(),
        }
    }
}

/// Panel state that is not part of the project
#[derive(Default)]
struct PanelState {
    plot_form: PlotForm,
    sensor_form: SensorForm,
    selected_pin: Option<PinId>,
    date_from: String,
    date_to: String,
    status: Option<String>,
}

impl PanelState {
    fn report(&mut self, error: impl std::fmt::Display) {
        log::error!("{}", error);
        self.status = Some(error.to_string());
    }
}

/// Equirectangular view onto the map canvas
struct MapView {
    center: LatLon,
    /// Latitude degrees from the top to the bottom of the canvas
    span: f64,
}

impl MapView {
    fn scale(&self, rect: egui::Rect) -> f64 {
        rect.height() as f64 / self.span
    }

    fn to_screen(&self, rect: egui::Rect, point: LatLon) -> egui::Pos2 {
        let scale = self.scale(rect);
        egui::pos2(
            rect.center().x + ((point.lon - self.center.lon) * scale) as f32,
            rect.center().y - ((point.lat - self.center.lat) * scale) as f32,
        )
    }

    fn to_lat_lon(&self, rect: egui::Rect, pos: egui::Pos2) -> LatLon {
        let scale = self.scale(rect);
        LatLon::new(
            self.center.lat - (pos.y - rect.center().y) as f64 / scale,
            self.center.lon + (pos.x - rect.center().x) as f64 / scale,
        )
    }

    fn pan(&mut self, rect: egui::Rect, delta: egui::Vec2) {
        let scale = self.scale(rect);
        self.center.lon -= delta.x as f64 / scale;
        self.center.lat += delta.y as f64 / scale;
    }

    fn zoom(&mut self, scroll: f32) {
        self.span = (self.span * (-scroll as f64 * 0.002).exp()).clamp(1e-5, 180.0);
    }

    /// Fit the view around a boundary
    fn fit(&mut self, vertices: &[LatLon]) {
        if let (Some(center), Some((min, max))) =
            (geometry::centroid(vertices), geometry::bounds(vertices))
        {
            self.center = center;
            self.span = ((max.lat - min.lat).max(max.lon - min.lon) * 1.4).max(0.001);
        }
    }
}

fn to_color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgb(color.r, color.g, color.b)
}

fn to_fill(color: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, 70)
}

pub struct FarmMapApp {
    project: FarmProject,
    screen: Screen,
    panel: PanelState,
    view: MapView,
    file_dialog_reason: Option<FileDialogReason>,
    file_channel: (Sender<Vec<u8>>, Receiver<Vec<u8>>),

    #[cfg(not(target_arch = "wasm32"))]
    last_autosave: std::time::Instant,
}

impl FarmMapApp {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings = DashboardSettings::load_or_default(Path::new(SETTINGS_FILE));
        let view = MapView {
            center: settings.map_center,
            span: settings.map_span_degrees,
        };
        FarmMapApp {
            project: FarmProject::new(settings),
            screen: Screen::Dashboard,
            panel: PanelState::default(),
            view,
            file_dialog_reason: None,
            file_channel: std::sync::mpsc::channel(),
            #[cfg(not(target_arch = "wasm32"))]
            last_autosave: std::time::Instant::now(),
        }
    }

    /// Open a file dialog
    fn open_file_dialog(&mut self, reason: FileDialogReason, ctx: &egui::Context) {
        self.file_dialog_reason = Some(reason);

        let sender = self.file_channel.0.clone();
        let task = rfd::AsyncFileDialog::new()
            .add_filter("Farm Project", &["json"])
            .pick_file();
        let ctx = ctx.clone();
        execute(async move {
            let file = task.await;
            if let Some(file) = file {
                let content = file.read().await;
                let _ = sender.send(content);
            }
            ctx.request_repaint();
        });
    }

    /// Handle a file loaded in the file dialog
    fn handle_file_loaded(&mut self) {
        if let Ok(content) = self.file_channel.1.try_recv() {
            match self.file_dialog_reason.take() {
                Some(FileDialogReason::LoadProject) => match self.project.load_project(&content) {
                    Ok(()) => {
                        self.screen = Screen::Dashboard;
                        self.panel = PanelState::default();
                        self.fit_active_boundary();
                    }
                    Err(e) => self.panel.report(format!("Failed to load project: {}", e)),
                },
                None => log::warn!("Received a file nobody asked for"),
            }
        }
    }

    /// Open a file dialog to save a project file
    fn save_project(&mut self) {
        match self.project.save_project() {
            Ok(contents) => {
                let task = rfd::AsyncFileDialog::new()
                    .set_file_name("farm.farm.json")
                    .add_filter("Farm Project", &["json"])
                    .save_file();
                execute(async move {
                    let file = task.await;
                    if let Some(file) = file {
                        _ = file.write(&contents).await;
                    }
                });
            }
            Err(e) => self.panel.report(format!("Failed to save project: {}", e)),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn autosave(&mut self) {
        let now = std::time::Instant::now();
        let interval = self.project.settings().autosave_interval_secs;
        if interval == 0 || now.duration_since(self.last_autosave).as_secs() < interval {
            return;
        }
        self.last_autosave = now;
        if !self.project.take_dirty() {
            return;
        }
        match self.project.save_project() {
            Ok(contents) => {
                if let Err(e) = std::fs::write("autosave.farm.json", &contents) {
                    log::error!("Autosave failed: {}", e);
                }
            }
            Err(e) => log::error!("Autosave failed: {}", e),
        }
    }

    fn fit_active_boundary(&mut self) {
        if let Some(polygon) = self.project.render_model().polygon {
            self.view.fit(&polygon.vertices);
        }
    }

    fn go_to(&mut self, transition: Transition) {
        self.panel.selected_pin = None;
        self.panel.status = None;
        let screen = match transition {
            Transition::Dashboard => {
                let active = self.project.selection().active_plot;
                self.project.navigate(farm_plot_mapper::Flow::Dashboard);
                if let Some(plot_id) = active {
                    // The plot may just have been deleted
                    let _ = self.project.set_active_plot(plot_id);
                }
                Ok(Screen::Dashboard)
            }
            Transition::AddPlot => {
                self.panel.plot_form = PlotForm::default();
                Ok(Screen::AddPlot(AddPlotFlow::start(&mut self.project)))
            }
            Transition::AddPin(plot_id) => {
                AddPinFlow::start(&mut self.project, plot_id).map(Screen::AddPin)
            }
            Transition::Edit(plot_id) => {
                let flow = EditFlow::start(&mut self.project, plot_id);
                if let Some(plot) = self.project.store().plot(plot_id) {
                    self.panel.plot_form = PlotForm::from_plot(plot);
                }
                flow.map(Screen::Edit)
            }
        };
        match screen {
            Ok(screen) => {
                self.screen = screen;
                self.panel.date_from.clear();
                self.panel.date_to.clear();
            }
            Err(e) => self.panel.report(e),
        }
    }

    /// Draw the map and return the clicked location, with the pin under it if any
    fn show_map(&mut self, ui: &mut egui::Ui) -> Option<(LatLon, Option<PinId>)> {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(0xe8, 0xef, 0xe0));

        if response.dragged() {
            self.view.pan(rect, response.drag_delta());
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                self.view.zoom(scroll);
            }
        }

        let model = self.project.render_model();

        if let Some(polygon) = &model.polygon {
            let points: Vec<egui::Pos2> = polygon
                .vertices
                .iter()
                .map(|v| self.view.to_screen(rect, *v))
                .collect();
            for [a, b, c] in &polygon.triangles {
                painter.add(egui::Shape::convex_polygon(
                    vec![points[*a], points[*b], points[*c]],
                    to_fill(polygon.color),
                    egui::Stroke::NONE,
                ));
            }
            painter.add(egui::Shape::closed_line(
                points,
                egui::Stroke::new(2.0, to_color32(polygon.color)),
            ));
        }

        if !model.drawing.is_empty() {
            let color = to_color32(self.project.selection().draw_color);
            let points: Vec<egui::Pos2> = model
                .drawing
                .iter()
                .map(|v| self.view.to_screen(rect, *v))
                .collect();
            painter.add(egui::Shape::line(points.clone(), egui::Stroke::new(2.0, color)));
            for point in points {
                painter.circle_filled(point, 4.0, color);
            }
        }

        for pin in &model.pins {
            self.paint_pin(&painter, rect, pin);
        }

        if !response.clicked() {
            return None;
        }
        let pos = response.interact_pointer_pos()?;
        let hit = model
            .pins
            .iter()
            .find(|pin| self.view.to_screen(rect, pin.position).distance(pos) <= PIN_RADIUS)
            .map(|pin| pin.pin_id);
        Some((self.view.to_lat_lon(rect, pos), hit))
    }

    fn paint_pin(&self, painter: &egui::Painter, rect: egui::Rect, pin: &RenderPin) {
        let pos = self.view.to_screen(rect, pin.position);
        let fill = if pin.inside_boundary {
            egui::Color32::from_rgb(0x25, 0x63, 0xeb)
        } else {
            egui::Color32::from_rgb(0xdc, 0x26, 0x26)
        };
        painter.circle_filled(pos, PIN_RADIUS, fill);
        if self.panel.selected_pin == Some(pin.pin_id) {
            painter.circle_stroke(pos, PIN_RADIUS + 3.0, egui::Stroke::new(2.0, egui::Color32::BLACK));
        }
        painter.text(
            pos,
            egui::Align2::CENTER_CENTER,
            pin.sequence_number.to_string(),
            egui::FontId::proportional(10.0),
            egui::Color32::WHITE,
        );
    }

    fn on_map_click(&mut self, point: LatLon, hit: Option<PinId>) {
        let project = &mut self.project;
        match &mut self.screen {
            Screen::Dashboard => self.panel.selected_pin = hit,
            Screen::AddPlot(flow) => {
                if project.map().is_drawing() {
                    flow.add_boundary_point(project, point);
                }
            }
            Screen::AddPin(flow) => {
                if hit.is_some() {
                    self.panel.selected_pin = hit;
                    return;
                }
                match flow.place_pin(project, point.lat, point.lon) {
                    Ok(pin) => self.panel.selected_pin = Some(pin.id),
                    Err(e) => self.panel.report(e),
                }
            }
            Screen::Edit(_) => {
                if project.map().is_drawing() {
                    project.map_mut().add_draw_point(point);
                } else {
                    self.panel.selected_pin = hit;
                }
            }
        }
    }
}

/// Plot list, filters and the sensors of the selected pin
fn dashboard_panel(
    ui: &mut egui::Ui,
    project: &mut FarmProject,
    panel: &mut PanelState,
) -> Option<Transition> {
    let mut transition = None;

    ui.heading("Plots");
    let active = project.selection().active_plot;
    let plots: Vec<(PlotId, String)> = project
        .store()
        .plots()
        .map(|plot| (plot.id, plot.name.clone()))
        .collect();
    if plots.is_empty() {
        ui.label("No plots yet");
    }
    for (plot_id, name) in plots {
        if ui.selectable_label(active == Some(plot_id), name).clicked() {
            if let Err(e) = project.set_active_plot(plot_id) {
                panel.report(e);
            }
            panel.selected_pin = None;
        }
    }

    ui.separator();
    ui.horizontal_wrapped(|ui| {
        if ui.button("Add plot").clicked() {
            transition = Some(Transition::AddPlot);
        }
        if let Some(plot_id) = active {
            if ui.button("Add pins").clicked() {
                transition = Some(Transition::AddPin(plot_id));
            }
            if ui.button("Edit plot").clicked() {
                transition = Some(Transition::Edit(plot_id));
            }
        }
    });

    ui.separator();
    ui.heading("Filters");
    let current = project.selection().sensor_filter;
    let mut filter = current;
    egui::ComboBox::from_id_salt("sensor_filter_combobox")
        .selected_text(match filter {
            SensorFilter::All => "All sensors".to_string(),
            SensorFilter::Only(sensor_type) => sensor_type.label().to_string(),
        })
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut filter, SensorFilter::All, "All sensors");
            for sensor_type in SensorType::ALL {
                ui.selectable_value(&mut filter, SensorFilter::Only(sensor_type), sensor_type.label());
            }
        });
    if filter != current {
        project.set_sensor_type_filter(filter);
    }

    ui.horizontal(|ui| {
        ui.label("Node:");
        let mut node = project.selection().active_node.clone().unwrap_or_default();
        if ui.text_edit_singleline(&mut node).changed() {
            project.set_active_node(Some(node));
        }
    });

    ui.horizontal(|ui| {
        ui.label("From:");
        ui.add(
            egui::TextEdit::singleline(&mut panel.date_from)
                .hint_text("YYYY-MM-DD")
                .desired_width(80.0),
        );
        ui.label("To:");
        ui.add(
            egui::TextEdit::singleline(&mut panel.date_to)
                .hint_text("YYYY-MM-DD")
                .desired_width(80.0),
        );
    });
    ui.horizontal(|ui| {
        if ui.button("Apply dates").clicked() {
            match (parse_date(&panel.date_from), parse_date(&panel.date_to)) {
                (Ok(Some(from)), Ok(Some(to))) => {
                    project.set_date_range(Some(DateRange::new(from, to)))
                }
                (Err(e), _) | (_, Err(e)) => panel.report(e),
                _ => panel.report("Both ends of the date range are needed"),
            }
        }
        if ui.button("Clear dates").clicked() {
            panel.date_from.clear();
            panel.date_to.clear();
            project.set_date_range(None);
        }
    });

    ui.separator();
    ui.heading("Pins");
    let visible: Vec<_> = project.visible_pins().into_iter().cloned().collect();
    if visible.is_empty() {
        ui.label("No pins match");
    }
    for pin in visible {
        let selected = panel.selected_pin == Some(pin.id);
        if ui.selectable_label(selected, pin.label()).clicked() {
            panel.selected_pin = Some(pin.id);
        }
        if selected {
            ui.indent(("pin_sensors", pin.id.value()), |ui| {
                for sensor in project.selection().visible_sensors(project.store(), &pin) {
                    let node = sensor.node.as_deref().unwrap_or("-");
                    ui.label(format!(
                        "{}: {} (node {})",
                        sensor.sensor_type.label(),
                        sensor.reading_text(),
                        node
                    ));
                }
            });
        }
    }

    transition
}

fn draw_color_picker(ui: &mut egui::Ui, project: &mut FarmProject) {
    ui.horizontal(|ui| {
        ui.label("Color:");
        let current = project.selection().draw_color;
        for color in project.settings().draw_palette.clone() {
            let mut button = egui::Button::new("")
                .fill(to_color32(color))
                .min_size(egui::vec2(18.0, 18.0));
            if color == current {
                button = button.stroke(egui::Stroke::new(2.0, egui::Color32::BLACK));
            }
            if ui.add(button).on_hover_text(color.to_string()).clicked() {
                project.set_draw_color(color);
            }
        }
        let mut rgb = [current.r, current.g, current.b];
        if ui.color_edit_button_srgb(&mut rgb).changed() {
            project.set_draw_color(Color::from_rgb(rgb[0], rgb[1], rgb[2]));
        }
    });
}

/// Controls shared by every screen that draws a boundary. Returns true once
/// the operator finishes.
fn drawing_controls(ui: &mut egui::Ui, project: &mut FarmProject) -> bool {
    let mut finished = false;
    let count = project.map().drawing_layer().len();
    ui.label(format!("Click the map to add corners ({} so far)", count));
    ui.horizontal(|ui| {
        if ui.button("Undo point").clicked() {
            project.map_mut().undo_draw_point();
        }
        if ui.button("Finish").clicked() {
            finished = true;
        }
        if ui.button("Cancel").clicked() {
            project.map_mut().cancel_drawing();
        }
    });
    finished
}

fn add_plot_panel(
    ui: &mut egui::Ui,
    project: &mut FarmProject,
    flow: &mut AddPlotFlow,
    panel: &mut PanelState,
) -> Option<Transition> {
    let mut transition = None;

    ui.heading("New plot");
    panel.plot_form.show(ui);
    let label = if flow.plot_id().is_some() {
        "Update details"
    } else {
        "Save details"
    };
    if ui.button(label).clicked() {
        match panel.plot_form.to_input() {
            Ok(input) => match flow.submit_details(project, input) {
                Ok(plot) => {
                    log::info!("Saved details of plot {}", plot.id);
                    panel.status = None;
                }
                Err(e) => panel.report(e),
            },
            Err(e) => panel.report(e),
        }
    }

    ui.separator();
    ui.heading("Boundary");
    if !flow.can_draw(project) {
        ui.label("Save the plot details before drawing its boundary");
    } else if project.map().is_drawing() {
        if drawing_controls(ui, project) {
            if let Err(e) = flow.finish_boundary(project) {
                panel.report(e);
            }
        }
    } else {
        draw_color_picker(ui, project);
        if ui.button("Draw boundary").clicked() {
            if let Err(e) = flow.begin_boundary(project) {
                panel.report(e);
            }
        }
    }

    ui.separator();
    if ui.button("Done").clicked() {
        transition = Some(Transition::Dashboard);
    }
    transition
}

fn add_pin_panel(
    ui: &mut egui::Ui,
    project: &mut FarmProject,
    flow: &mut AddPinFlow,
    panel: &mut PanelState,
) -> Option<Transition> {
    let mut transition = None;

    ui.heading("Add pins");
    ui.label("Click inside the boundary to place a pin");
    ui.separator();

    let pins: Vec<_> = flow.pins(project).into_iter().cloned().collect();
    for pin in &pins {
        if ui
            .selectable_label(panel.selected_pin == Some(pin.id), pin.label())
            .clicked()
        {
            panel.selected_pin = Some(pin.id);
        }
    }

    if let Some(pin) = panel.selected_pin.and_then(|id| pins.iter().find(|pin| pin.id == id)) {
        ui.separator();
        ui.heading(pin.label());
        for sensor in project.store().list_sensors(pin.id) {
            ui.label(format!("{}: {}", sensor.sensor_type.label(), sensor.reading_text()));
        }

        let form = &mut panel.sensor_form;
        egui::ComboBox::from_id_salt("sensor_type_combobox")
            .selected_text(form.sensor_type.label())
            .show_ui(ui, |ui| {
                for sensor_type in SensorType::ALL {
                    ui.selectable_value(&mut form.sensor_type, sensor_type, sensor_type.label());
                }
            });
        ui.horizontal(|ui| {
            ui.label("Reading:");
            ui.add(egui::DragValue::new(&mut form.reading).speed(0.1));
            ui.label(form.sensor_type.unit());
        });
        ui.horizontal(|ui| {
            ui.label("Node:");
            ui.text_edit_singleline(&mut form.node);
        });
        if ui.button("Attach sensor").clicked() {
            let result = flow
                .attach_sensor(project, pin.id, form.sensor_type, form.reading)
                .map_err(|e| e.to_string())
                .and_then(|sensor| {
                    let node = Some(form.node.clone()).filter(|node| !node.trim().is_empty());
                    match node {
                        Some(node) => project
                            .set_sensor_node(sensor.id, Some(node))
                            .map(|_| ())
                            .map_err(|e| e.to_string()),
                        None => Ok(()),
                    }
                });
            if let Err(e) = result {
                panel.report(e);
            }
        }
    }

    ui.separator();
    if ui.button("Done").clicked() {
        transition = Some(Transition::Dashboard);
    }
    transition
}

enum EditAction {
    DeletePin(PinId),
    Detach(farm_plot_mapper::SensorId),
    Reading(farm_plot_mapper::SensorId, f64),
}

fn edit_panel(
    ui: &mut egui::Ui,
    project: &mut FarmProject,
    flow: &mut EditFlow,
    panel: &mut PanelState,
) -> Option<Transition> {
    let mut transition = None;

    ui.heading("Edit plot");
    panel.plot_form.show(ui);
    if ui.button("Save changes").clicked() {
        let result = panel
            .plot_form
            .to_input()
            .and_then(|input| {
                flow.update_plot(project, PlotUpdate::from(input))
                    .map_err(|e| e.to_string())
            });
        match result {
            Ok(plot) => panel.plot_form = PlotForm::from_plot(&plot),
            Err(e) => panel.report(e),
        }
    }

    ui.separator();
    ui.heading("Boundary");
    if project.map().is_drawing() {
        if drawing_controls(ui, project) {
            let raw_points = project.map_mut().take_drawing();
            if let Err(e) = project.handle_map_event(MapEvent::DrawComplete { raw_points }) {
                panel.report(e);
            }
        }
    } else {
        draw_color_picker(ui, project);
        ui.horizontal(|ui| {
            if ui.button("Redraw boundary").clicked() {
                project.map_mut().begin_drawing();
            }
            if ui.button("Delete boundary").clicked() {
                if let Err(e) = flow.delete_polygon(project) {
                    panel.report(e);
                }
            }
        });
    }

    ui.separator();
    ui.heading("Pins");
    let polygon_id = project
        .store()
        .polygon_of_plot(flow.plot_id())
        .map(|polygon| polygon.id);
    let pins: Vec<_> = polygon_id
        .map(|id| project.store().list_pins(id).into_iter().cloned().collect())
        .unwrap_or_default();
    let mut actions = Vec::new();
    for pin in &pins {
        ui.horizontal(|ui| {
            if ui
                .selectable_label(panel.selected_pin == Some(pin.id), pin.label())
                .clicked()
            {
                panel.selected_pin = Some(pin.id);
            }
            if ui.small_button("Delete").clicked() {
                actions.push(EditAction::DeletePin(pin.id));
            }
        });
        if panel.selected_pin == Some(pin.id) {
            ui.indent(("edit_pin_sensors", pin.id.value()), |ui| {
                for sensor in project.store().list_sensors(pin.id) {
                    ui.horizontal(|ui| {
                        ui.label(sensor.sensor_type.label());
                        let mut reading = sensor.last_reading;
                        if ui
                            .add(egui::DragValue::new(&mut reading).speed(0.1))
                            .changed()
                        {
                            actions.push(EditAction::Reading(sensor.id, reading));
                        }
                        ui.label(sensor.sensor_type.unit());
                        if ui.small_button("Detach").clicked() {
                            actions.push(EditAction::Detach(sensor.id));
                        }
                    });
                }
            });
        }
    }
    for action in actions {
        let result = match action {
            EditAction::DeletePin(pin_id) => flow.delete_pin(project, pin_id),
            EditAction::Detach(sensor_id) => flow.detach_sensor(project, sensor_id).map(|_| ()),
            EditAction::Reading(sensor_id, reading) => project
                .update_reading(sensor_id, reading)
                .map(|_| ())
                .map_err(Into::into),
        };
        if let Err(e) = result {
            panel.report(e);
        }
    }

    if !pins.is_empty() && ui.button("Delete all pins").clicked() {
        if let Err(e) = flow.request_delete_all(project) {
            panel.report(e);
        }
    }

    if let Some(request) = flow.pending_delete_all() {
        let count = request.pins.len();
        let mut confirm = false;
        let mut cancel = false;
        egui::Window::new("Delete all pins")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ui.ctx(), |ui| {
                ui.label(format!(
                    "Remove {} pins and their sensors from this boundary?",
                    count
                ));
                ui.horizontal(|ui| {
                    confirm = ui.button("Delete").clicked();
                    cancel = ui.button("Cancel").clicked();
                });
            });
        if confirm {
            match flow.confirm_delete_all(project) {
                Ok(removed) => log::info!("Removed {} pins", removed),
                Err(e) => panel.report(e),
            }
        } else if cancel {
            flow.cancel_delete_all();
        }
    }

    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("Done").clicked() {
            transition = Some(Transition::Dashboard);
        }
        if ui.button("Delete plot").clicked() {
            match flow.delete_plot(project) {
                Ok(()) => transition = Some(Transition::Dashboard),
                Err(e) => panel.report(e),
            }
        }
    });
    transition
}

impl eframe::App for FarmMapApp {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        #[cfg(not(target_arch = "wasm32"))]
        self.autosave();

        self.handle_file_loaded();

        egui::TopBottomPanel::top("topbar").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("New Project").clicked() {
                        self.project = FarmProject::new(self.project.settings().clone());
                        self.screen = Screen::Dashboard;
                        self.panel = PanelState::default();
                        ui.close();
                    }
                    if ui.button("Open Project (.json)").clicked() {
                        self.open_file_dialog(FileDialogReason::LoadProject, ctx);
                        ui.close();
                    }
                    if ui.button("Save Project (.json)").clicked() {
                        self.save_project();
                        ui.close();
                    }
                });
                if ui
                    .button("Zoom to plot")
                    .on_hover_text("Fit the map around the active boundary")
                    .clicked()
                {
                    self.fit_active_boundary();
                }
                if let Some(status) = &self.panel.status {
                    ui.colored_label(egui::Color32::from_rgb(0xdc, 0x26, 0x26), status.as_str());
                }
            });
        });

        let mut transition = None;
        egui::SidePanel::left("left_panel")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let project = &mut self.project;
                    let panel = &mut self.panel;
                    transition = match &mut self.screen {
                        Screen::Dashboard => dashboard_panel(ui, project, panel),
                        Screen::AddPlot(flow) => add_plot_panel(ui, project, flow, panel),
                        Screen::AddPin(flow) => add_pin_panel(ui, project, flow, panel),
                        Screen::Edit(flow) => edit_panel(ui, project, flow, panel),
                    };
                });
            });
        if let Some(transition) = transition {
            self.go_to(transition);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some((point, hit)) = self.show_map(ui) {
                self.on_map_click(point, hit);
            }
        });
    }
}

// When compiling natively:
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    // Initialize logging for native builds
    env_logger::init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 700.0])
            .with_min_inner_size([640.0, 440.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Farm Plot Mapper",
        native_options,
        Box::new(|cc| Ok(Box::new(FarmMapApp::new(cc)))),
    )
    .ok();
}

// When compiling to web using trunk:
#[cfg(target_arch = "wasm32")]
fn main() {
    use eframe::wasm_bindgen::JsCast as _;

    let web_options = eframe::WebOptions::default();

    // Redirect `log` message to `console.log` and friends:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    wasm_bindgen_futures::spawn_local(async {
        let document = web_sys::window()
            .expect("No window")
            .document()
            .expect("No document");

        let canvas = document
            .get_element_by_id("farm_map_canvas_id")
            .expect("Failed to find farm_map_canvas_id")
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .expect("farm_map_canvas_id was not a HtmlCanvasElement");

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(FarmMapApp::new(cc)))),
            )
            .await;

        // Remove the loading text and spinner:
        if let Some(loading_text) = document.get_element_by_id("loading_text") {
            match start_result {
                Ok(_) => {
                    loading_text.remove();
                }
                Err(e) => {
                    loading_text.set_inner_html(
                        "<p> The app has crashed. See the developer console for details. </p>",
                    );
                    panic!("Failed to start eframe: {e:?}");
                }
            }
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn execute<F: Future<Output = ()> + Send + 'static>(f: F) {
    std::thread::spawn(move || futures::executor::block_on(f));
}

#[cfg(target_arch = "wasm32")]
fn execute<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}

// src/gui.rs
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, MarkerShape, Plot, PlotPoints, Points};
use tokio::sync::watch;

use crate::render::{ChartSpec, SeriesMode, Snapshot};

const PALETTE: [Color32; 4] = [
    Color32::from_rgb(0, 255, 255),
    Color32::from_rgb(255, 80, 80),
    Color32::from_rgb(120, 220, 90),
    Color32::YELLOW,
];

/// Desktop view of the same snapshots the web dashboard shows.
pub struct DashboardApp {
    snapshots: watch::Receiver<Arc<Snapshot>>,
    refresh: Duration,
    ingest_url: String,
}

impl DashboardApp {
    pub fn new(snapshots: watch::Receiver<Arc<Snapshot>>, refresh: Duration, ingest_url: String) -> Self {
        Self {
            snapshots,
            refresh,
            ingest_url,
        }
    }

    fn draw_chart(ui: &mut egui::Ui, chart: &ChartSpec) {
        ui.label(egui::RichText::new(&chart.title).strong());
        // Newest sample sits at x = 0, older ones to the left.
        let newest = chart.x_range[1];
        Plot::new(chart.id.as_str())
            .height(220.0)
            .legend(Legend::default())
            .include_x(chart.x_range[0] - newest)
            .include_x(0.0)
            .include_y(chart.y_range[0])
            .include_y(chart.y_range[1])
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .y_axis_label(chart.y_label.as_str())
            .show(ui, |plot_ui| {
                for (idx, series) in chart.series.iter().enumerate() {
                    let color = PALETTE[idx % PALETTE.len()];
                    let points: Vec<[f64; 2]> = series.points().map(|(x, y)| [x - newest, y]).collect();
                    match series.mode {
                        SeriesMode::Lines => {
                            plot_ui.line(Line::new(PlotPoints::new(points)).name(&series.name).color(color));
                        }
                        SeriesMode::Markers => {
                            plot_ui.points(
                                Points::new(PlotPoints::new(points))
                                    .name(&series.name)
                                    .shape(MarkerShape::Circle)
                                    .radius(4.0)
                                    .color(Color32::WHITE),
                            );
                        }
                    }
                }
            });
        ui.add_space(8.0);
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snapshot = self.snapshots.borrow().clone();

        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.heading("Live Sensor Readings");
            ui.label(format!("Streaming into {}", self.ingest_url));
            ui.separator();
            ui.label(snapshot.sensor_summary.as_str());
            ui.label(egui::RichText::new(&snapshot.steps.text).strong().color(Color32::YELLOW));
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if snapshot.charts.is_empty() {
                ui.label("Waiting for sensor data...");
            }
            egui::ScrollArea::vertical().show(ui, |ui| {
                for chart in &snapshot.charts {
                    Self::draw_chart(ui, chart);
                }
            });
        });

        ctx.request_repaint_after(self.refresh);
    }
}

pub fn run(app: DashboardApp) -> eframe::Result<()> {
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1100.0, 860.0])
        .with_min_inner_size([640.0, 480.0])
        .with_title("Live Sensor Readings");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native("sensor-dashboard", options, Box::new(|_cc| Box::new(app)))
}

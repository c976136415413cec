use serde::Serialize;

use crate::config::{ChannelGroupConfig, DashboardConfig};
use crate::ingest::{GroupFrame, KnownSensors, StoreView};
use crate::render::cadence::cadence_spm;
use crate::render::chart::{ChartSpec, SeriesSpec};
use crate::steps::{detector_from_config, estimate_sample_rate, StepDetector};

/// Cadence needs a couple of seconds of data before it means anything.
const MIN_CADENCE_SECS: f64 = 2.0;

#[derive(Clone, Debug, Default, Serialize)]
pub struct StepSummary {
    pub count: usize,
    pub cadence_spm: Option<f64>,
    pub text: String,
}

/// Output of one render tick.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub charts: Vec<ChartSpec>,
    pub sensors: Vec<String>,
    pub sensor_summary: String,
    pub steps: StepSummary,
}

impl Snapshot {
    pub fn chart(&self, id: &str) -> Option<&ChartSpec> {
        self.charts.iter().find(|c| c.id == id)
    }
}

pub struct Renderer {
    groups: Vec<ChannelGroupConfig>,
    step_source: String,
    cadence_band_hz: [f64; 2],
    detector: Box<dyn StepDetector>,
}

impl Renderer {
    pub fn new(config: &DashboardConfig, detector: Box<dyn StepDetector>) -> Self {
        Self {
            groups: config.groups.clone(),
            step_source: config.steps.source_group.clone(),
            cadence_band_hz: config.steps.cadence_band_hz,
            detector,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config, detector_from_config(&config.steps))
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Builds a snapshot from a detached view. Never fails; empty groups are
    /// simply left out.
    pub fn render(&self, view: &StoreView, tick: u64) -> Snapshot {
        let mut charts: Vec<ChartSpec> = view
            .groups
            .iter()
            .filter_map(|frame| self.group_chart(frame))
            .collect();

        let mut steps = StepSummary::default();
        if let Some(frame) = view.group(&self.step_source).filter(|f| !f.is_empty()) {
            let seconds = frame.seconds();
            let magnitude = frame.magnitude();
            let report = self.detector.detect(&magnitude, &seconds);
            steps.count = report.count;
            steps.cadence_spm = self.cadence(&magnitude, &seconds);

            let x = seconds[..report.filtered.len()].to_vec();
            if let Some((start, end)) = frame.time_span() {
                let group = self.group_config(&frame.name);
                charts.push(ChartSpec {
                    id: "filtered_graph".to_owned(),
                    title: "Filtered signal".to_owned(),
                    x_range: [start, end],
                    y_range: group.map_or([-25.0, 25.0], |g| g.y_range),
                    y_label: group.map_or_else(String::new, |g| g.y_label.clone()),
                    series: vec![
                        SeriesSpec::line("magnitude", x.clone(), &report.filtered),
                        SeriesSpec::markers("steps", x, report.markers),
                    ],
                });
            }
        }
        steps.text = match steps.cadence_spm {
            Some(spm) => format!("Number of Steps: {} ({spm:.0} steps/min)", steps.count),
            None => format!("Number of Steps: {}", steps.count),
        };

        Snapshot {
            tick,
            charts,
            sensors: view.sensors.clone(),
            sensor_summary: KnownSensors::summary(&view.sensors),
            steps,
        }
    }

    fn group_config(&self, name: &str) -> Option<&ChannelGroupConfig> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn group_chart(&self, frame: &GroupFrame) -> Option<ChartSpec> {
        let (start, end) = frame.time_span()?;
        let group = self.group_config(&frame.name);
        let seconds = frame.seconds();
        let series = frame
            .axis_labels
            .iter()
            .zip(&frame.axes)
            .map(|(label, values)| SeriesSpec::line(label.to_uppercase(), seconds.clone(), values))
            .collect();
        Some(ChartSpec {
            id: format!("{}_graph", frame.name),
            title: group.map_or_else(|| frame.name.clone(), |g| g.title.clone()),
            x_range: [start, end],
            y_range: group.map_or([-25.0, 25.0], |g| g.y_range),
            y_label: group.map_or_else(String::new, |g| g.y_label.clone()),
            series,
        })
    }

    fn cadence(&self, signal: &[f64], seconds: &[f64]) -> Option<f64> {
        let span = seconds.last()? - seconds.first()?;
        if span < MIN_CADENCE_SECS {
            return None;
        }
        let sample_rate_hz = estimate_sample_rate(seconds)?;
        cadence_spm(signal, sample_rate_hz, self.cadence_band_hz)
    }
}

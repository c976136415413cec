use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ingest::DashboardError;

/// A sensor stream with co-indexed axes, e.g. the x/y/z of the accelerometer.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChannelGroupConfig {
    pub name: String,
    /// Other sensor names that feed the same buffer.
    #[serde(default)]
    pub aliases: Vec<String>,
    pub title: String,
    pub axes: Vec<String>,
    #[serde(default = "default_y_range")]
    pub y_range: [f64; 2],
    #[serde(default = "default_y_label")]
    pub y_label: String,
}

impl ChannelGroupConfig {
    pub fn new(name: &str, title: &str, axes: &[&str]) -> Self {
        Self {
            name: name.to_owned(),
            aliases: Vec::new(),
            title: title.to_owned(),
            axes: axes.iter().map(|a| (*a).to_owned()).collect(),
            y_range: default_y_range(),
            y_label: default_y_label(),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_owned());
        self
    }

    pub fn matches(&self, sensor_name: &str) -> bool {
        self.name == sensor_name || self.aliases.iter().any(|a| a == sensor_name)
    }
}

fn default_y_range() -> [f64; 2] {
    [-25.0, 25.0]
}

fn default_y_label() -> String {
    "Acceleration (m/s²)".to_owned()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Filtered peak picking.
    Peak,
    /// Always reports zero steps.
    None,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PeakDetectorConfig {
    pub lowpass_hz: f64,
    pub highpass_hz: Option<f64>,
    pub q: f64,
    /// Threshold is `mean + threshold_k * std` of the filtered signal.
    pub threshold_k: f64,
    pub min_step_interval_secs: f64,
    /// Below this spread the signal counts as "standing still".
    pub min_std: f64,
    pub min_samples: usize,
}

impl Default for PeakDetectorConfig {
    fn default() -> Self {
        Self {
            lowpass_hz: 3.0,
            highpass_hz: None,
            q: std::f64::consts::FRAC_1_SQRT_2,
            threshold_k: 0.5,
            min_step_interval_secs: 0.3,
            min_std: 0.05,
            min_samples: 8,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StepConfig {
    pub detector: DetectorKind,
    pub source_group: String,
    pub peak: PeakDetectorConfig,
    pub cadence_band_hz: [f64; 2],
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::Peak,
            source_group: "accelerometer".to_owned(),
            peak: PeakDetectorConfig::default(),
            cadence_band_hz: [0.5, 3.5],
        }
    }
}

/// Largest PNG edge the chart route will render.
pub const MAX_PLOT_EDGE: u32 = 8192;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 360,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: SocketAddr,
    /// Samples kept per channel group.
    pub capacity: usize,
    pub refresh_ms: u64,
    pub sensor_idle_window_secs: f64,
    pub max_body_bytes: usize,
    pub groups: Vec<ChannelGroupConfig>,
    pub steps: StepConfig,
    pub plot: PlotConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            capacity: 1000,
            refresh_ms: 1000,
            sensor_idle_window_secs: 10.0,
            max_body_bytes: 8 * 1024 * 1024,
            groups: vec![
                ChannelGroupConfig::new("accelerometer", "Accelerometer", &["x", "y", "z"]),
                ChannelGroupConfig::new(
                    "accelerometer_uncalibrated",
                    "Uncalibrated Accelerometer",
                    &["x", "y", "z"],
                )
                .with_alias("accelerometeruncalibrated"),
            ],
            steps: StepConfig::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Reads a JSON config file, or falls back to defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, DashboardError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| DashboardError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| DashboardError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn idle_window(&self) -> Duration {
        Duration::from_secs_f64(self.sensor_idle_window_secs)
    }

    pub fn group(&self, name: &str) -> Option<&ChannelGroupConfig> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.capacity == 0 {
            return Err(DashboardError::InvalidCapacity);
        }
        if self.refresh_ms == 0 {
            return Err(invalid("refresh_ms must be greater than zero"));
        }
        if !self.sensor_idle_window_secs.is_finite() || self.sensor_idle_window_secs < 0.0 {
            return Err(invalid("sensor_idle_window_secs must be a finite, non-negative number"));
        }
        if self.groups.is_empty() {
            return Err(invalid("at least one channel group is required"));
        }
        let mut seen = HashSet::new();
        for group in &self.groups {
            for name in std::iter::once(&group.name).chain(&group.aliases) {
                if !seen.insert(name.as_str()) {
                    return Err(invalid(&format!("sensor name `{name}` is mapped twice")));
                }
            }
            if group.axes.is_empty() {
                return Err(invalid(&format!("group `{}` has no axes", group.name)));
            }
            if !(group.y_range[0] < group.y_range[1]) {
                return Err(invalid(&format!("group `{}` has an empty y range", group.name)));
            }
        }
        if self.group(&self.steps.source_group).is_none() {
            return Err(invalid(&format!(
                "step source `{}` is not a configured group",
                self.steps.source_group
            )));
        }
        let peak = &self.steps.peak;
        if !(peak.lowpass_hz > 0.0) || peak.highpass_hz.is_some_and(|hz| !(hz > 0.0)) {
            return Err(invalid("filter cutoffs must be positive"));
        }
        if !(peak.q > 0.0) || peak.min_step_interval_secs < 0.0 {
            return Err(invalid("peak detector q must be positive and the step interval non-negative"));
        }
        let plot = &self.plot;
        if !(1..=MAX_PLOT_EDGE).contains(&plot.width) || !(1..=MAX_PLOT_EDGE).contains(&plot.height) {
            return Err(invalid(&format!(
                "plot size {}x{} must be within 1..={MAX_PLOT_EDGE} on each edge",
                plot.width, plot.height
            )));
        }
        let [low, high] = self.steps.cadence_band_hz;
        if !(low >= 0.0 && low < high) {
            return Err(invalid("cadence band must satisfy 0 <= low < high"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> DashboardError {
    DashboardError::Config(reason.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DashboardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.refresh_period(), Duration::from_secs(1));
        assert_eq!(config.idle_window(), Duration::from_secs(10));
        assert!(config.groups[1].matches("accelerometeruncalibrated"));
        assert!(config.groups[1].matches("accelerometer_uncalibrated"));
        assert!(!config.groups[0].matches("gyroscope"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: DashboardConfig = serde_json::from_str(
            r#"{
                "capacity": 200,
                "groups": [{"name": "gyroscope", "title": "Gyroscope", "axes": ["x", "y", "z"], "y_range": [-10, 10]}],
                "steps": {"detector": "none", "source_group": "gyroscope"}
            }"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.capacity, 200);
        assert_eq!(config.refresh_ms, 1000);
        assert_eq!(config.steps.detector, DetectorKind::None);
        assert_eq!(config.groups[0].y_label, "Acceleration (m/s²)");
        assert_eq!(config.steps.peak.lowpass_hz, 3.0);
    }

    #[test]
    fn rejects_bad_configs() {
        let mut config = DashboardConfig::default();
        config.capacity = 0;
        assert!(matches!(config.validate(), Err(DashboardError::InvalidCapacity)));

        let mut config = DashboardConfig::default();
        config.steps.source_group = "magnetometer".into();
        assert!(matches!(config.validate(), Err(DashboardError::Config(_))));

        let mut config = DashboardConfig::default();
        config.groups[1].aliases.push("accelerometer".into());
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.groups[0].y_range = [5.0, 5.0];
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.plot.width = 0;
        assert!(matches!(config.validate(), Err(DashboardError::Config(_))));

        let mut config = DashboardConfig::default();
        config.plot = PlotConfig {
            width: 70_000,
            height: 70_000,
        };
        assert!(matches!(config.validate(), Err(DashboardError::Config(_))));

        let mut config = DashboardConfig::default();
        config.plot = PlotConfig {
            width: MAX_PLOT_EDGE,
            height: MAX_PLOT_EDGE,
        };
        config.validate().unwrap();
    }

    #[test]
    fn missing_file_reports_path() {
        let err = DashboardConfig::load(Some(Path::new("/nonexistent/dashboard.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dashboard.json"));
    }
}

//! Step detection strategies.
//!
//! A detector receives one scalar signal (the renderer passes the
//! acceleration magnitude) plus its timestamps in seconds, and reports:
//! - `filtered`: the signal it actually picked peaks on, same length as the input
//! - `markers`: `Some(filtered[i])` at every detected step, `None` elsewhere
//! - `count`: number of `Some` entries in `markers`
//!
//! Timestamps are expected to be strictly increasing. When the two slices
//! differ in length only the common prefix is used. Empty or very short
//! input yields zero steps.
pub mod filter;
pub mod peak;

use crate::config::{DetectorKind, StepConfig};

pub use peak::PeakStepDetector;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepReport {
    pub count: usize,
    pub filtered: Vec<f64>,
    pub markers: Vec<Option<f64>>,
}

impl StepReport {
    pub fn from_markers(filtered: Vec<f64>, markers: Vec<Option<f64>>) -> Self {
        let count = markers.iter().flatten().count();
        Self {
            count,
            filtered,
            markers,
        }
    }

    /// Signal passed through with no steps marked.
    pub fn passthrough(signal: &[f64]) -> Self {
        Self::from_markers(signal.to_vec(), vec![None; signal.len()])
    }
}

pub trait StepDetector: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, signal: &[f64], timestamps: &[f64]) -> StepReport;
}

/// Placeholder strategy: never detects a step.
pub struct NullStepDetector;

impl StepDetector for NullStepDetector {
    fn name(&self) -> &'static str {
        "none"
    }

    fn detect(&self, signal: &[f64], timestamps: &[f64]) -> StepReport {
        let len = signal.len().min(timestamps.len());
        StepReport::passthrough(&signal[..len])
    }
}

pub fn detector_from_config(config: &StepConfig) -> Box<dyn StepDetector> {
    match config.detector {
        DetectorKind::Peak => Box::new(PeakStepDetector::new(config.peak.clone())),
        DetectorKind::None => Box::new(NullStepDetector),
    }
}

/// Median sample rate of a timestamp series in seconds, if it has one.
pub fn estimate_sample_rate(timestamps: &[f64]) -> Option<f64> {
    let mut deltas: Vec<f64> = timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|dt| dt.is_finite() && *dt > 0.0)
        .collect();
    if deltas.is_empty() {
        return None;
    }
    deltas.sort_by(f64::total_cmp);
    let median = deltas[deltas.len() / 2];
    Some(1.0 / median)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_detector_reports_zero() {
        let report = NullStepDetector.detect(&[1.0, 5.0, 1.0], &[0.0, 0.1, 0.2]);
        assert_eq!(report.count, 0);
        assert_eq!(report.filtered, vec![1.0, 5.0, 1.0]);
        assert_eq!(report.markers, vec![None, None, None]);
        assert_eq!(NullStepDetector.detect(&[], &[]), StepReport::default());
    }

    #[test]
    fn sample_rate_uses_median_delta() {
        let ts = [0.0, 0.02, 0.04, 0.06, 0.5, 0.52];
        let rate = estimate_sample_rate(&ts).unwrap();
        assert!((rate - 50.0).abs() < 1e-6);
        assert_eq!(estimate_sample_rate(&[1.0]), None);
        assert_eq!(estimate_sample_rate(&[1.0, 1.0]), None);
    }

    #[test]
    fn config_selects_strategy() {
        let mut config = StepConfig::default();
        assert_eq!(detector_from_config(&config).name(), "peak");
        config.detector = DetectorKind::None;
        assert_eq!(detector_from_config(&config).name(), "none");
    }
}

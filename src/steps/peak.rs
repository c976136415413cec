use crate::config::PeakDetectorConfig;
use crate::steps::filter::{FilterChain, FilterKind};
use crate::steps::{estimate_sample_rate, StepDetector, StepReport};

/// Band-limited peak picking on the acceleration magnitude.
///
/// 1. remove the mean, then low-pass (and optionally high-pass) with a
///    zero-phase biquad chain
/// 2. threshold at `mean + k * std` of the filtered signal
/// 3. keep strict local maxima above the threshold, at most one per
///    `min_step_interval_secs` (the taller one wins)
pub struct PeakStepDetector {
    config: PeakDetectorConfig,
}

impl PeakStepDetector {
    pub fn new(config: PeakDetectorConfig) -> Self {
        Self { config }
    }

    fn filter_chain(&self, sample_rate_hz: f64) -> FilterChain {
        let q = self.config.q;
        let mut kinds = Vec::with_capacity(2);
        if let Some(cutoff_hz) = self.config.highpass_hz {
            kinds.push(FilterKind::Highpass { cutoff_hz, q });
        }
        kinds.push(FilterKind::Lowpass {
            cutoff_hz: self.config.lowpass_hz,
            q,
        });
        FilterChain::from_kinds(sample_rate_hz, &kinds)
    }
}

impl Default for PeakStepDetector {
    fn default() -> Self {
        Self::new(PeakDetectorConfig::default())
    }
}

impl StepDetector for PeakStepDetector {
    fn name(&self) -> &'static str {
        "peak"
    }

    fn detect(&self, signal: &[f64], timestamps: &[f64]) -> StepReport {
        let len = signal.len().min(timestamps.len());
        let (signal, timestamps) = (&signal[..len], &timestamps[..len]);
        if len < self.config.min_samples.max(3) {
            return StepReport::passthrough(signal);
        }
        let Some(sample_rate_hz) = estimate_sample_rate(timestamps) else {
            return StepReport::passthrough(signal);
        };

        let mean = signal.iter().sum::<f64>() / len as f64;
        let centered: Vec<f64> = signal.iter().map(|v| v - mean).collect();
        let filtered = self.filter_chain(sample_rate_hz).zero_phase(&centered);

        let (f_mean, f_std) = mean_std(&filtered);
        let mut markers = vec![None; len];
        if f_std < self.config.min_std {
            return StepReport::from_markers(filtered, markers);
        }
        let threshold = f_mean + self.config.threshold_k * f_std;

        let mut last: Option<usize> = None;
        for i in 1..len - 1 {
            let v = filtered[i];
            if v <= threshold || v <= filtered[i - 1] || v < filtered[i + 1] {
                continue;
            }
            match last {
                Some(prev) if timestamps[i] - timestamps[prev] < self.config.min_step_interval_secs => {
                    if v > filtered[prev] {
                        markers[prev] = None;
                        markers[i] = Some(v);
                        last = Some(i);
                    }
                }
                _ => {
                    markers[i] = Some(v);
                    last = Some(i);
                }
            }
        }
        StepReport::from_markers(filtered, markers)
    }
}

fn mean_std(data: &[f64]) -> (f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0);
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    let variance = data
        .iter()
        .map(|v| {
            let delta = v - mean;
            delta * delta
        })
        .sum::<f64>()
        / data.len() as f64;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const FS: f64 = 50.0;

    fn walk(cadence_hz: f64, seconds: f64, noise: f64) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(7);
        let n = (seconds * FS) as usize;
        let ts: Vec<f64> = (0..n).map(|i| 1_700_000_000.0 + i as f64 / FS).collect();
        let signal = (0..n)
            .map(|i| {
                let t = i as f64 / FS;
                9.81 + 2.0 * (2.0 * PI * cadence_hz * t).sin() + rng.gen_range(-noise..=noise)
            })
            .collect();
        (signal, ts)
    }

    #[test]
    fn counts_steps_of_a_steady_walk() {
        let (signal, ts) = walk(2.0, 10.0, 0.3);
        let report = PeakStepDetector::default().detect(&signal, &ts);
        assert!((19..=21).contains(&report.count), "counted {}", report.count);
        assert_eq!(report.markers.len(), signal.len());
        assert_eq!(report.filtered.len(), signal.len());
        assert_eq!(report.markers.iter().flatten().count(), report.count);
    }

    #[test]
    fn markers_respect_refractory_distance() {
        let (signal, ts) = walk(1.8, 8.0, 0.5);
        let detector = PeakStepDetector::default();
        let report = detector.detect(&signal, &ts);
        let positions: Vec<f64> = report
            .markers
            .iter()
            .zip(&ts)
            .filter_map(|(m, t)| m.map(|_| *t))
            .collect();
        assert!(positions
            .windows(2)
            .all(|w| w[1] - w[0] >= detector.config.min_step_interval_secs));
    }

    #[test]
    fn flat_signal_has_no_steps() {
        let ts: Vec<f64> = (0..200).map(|i| i as f64 / FS).collect();
        let report = PeakStepDetector::default().detect(&vec![9.81; 200], &ts);
        assert_eq!(report.count, 0);
        assert!(report.markers.iter().all(Option::is_none));
    }

    #[test]
    fn short_or_empty_input_is_safe() {
        let detector = PeakStepDetector::default();
        assert_eq!(detector.detect(&[], &[]).count, 0);
        let report = detector.detect(&[1.0, 9.0, 1.0], &[0.0, 0.02, 0.04]);
        assert_eq!(report.count, 0);
        assert_eq!(report.filtered.len(), 3);
        // Mismatched lengths fall back to the common prefix.
        let report = detector.detect(&[1.0, 2.0, 3.0], &[0.0]);
        assert_eq!(report.markers.len(), 1);
    }
}

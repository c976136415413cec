use rustfft::{num_complex::Complex64, FftPlanner};

/// Dominant frequency of `signal` inside `band_hz`, in Hz.
///
/// The mean is removed and the signal zero-padded to the next power of two.
/// Returns `None` when there is nothing to analyse or the band holds no bin.
pub fn dominant_frequency(signal: &[f64], sample_rate_hz: f64, band_hz: [f64; 2]) -> Option<f64> {
    if signal.len() < 4 || !(sample_rate_hz > 0.0) {
        return None;
    }
    let fft_size = signal.len().next_power_of_two();
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    let mut buffer: Vec<Complex64> = signal
        .iter()
        .map(|v| Complex64::new(v - mean, 0.0))
        .collect();
    buffer.resize(fft_size, Complex64::new(0.0, 0.0));

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(fft_size).process(&mut buffer);

    let bin_hz = sample_rate_hz / fft_size as f64;
    let (bin, magnitude) = buffer
        .iter()
        .take(fft_size / 2)
        .enumerate()
        .filter(|(k, _)| {
            let freq = *k as f64 * bin_hz;
            freq >= band_hz[0] && freq <= band_hz[1]
        })
        .map(|(k, c)| (k, c.norm()))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    if magnitude <= 1e-9 * fft_size as f64 {
        return None;
    }
    Some(bin as f64 * bin_hz)
}

/// Steps per minute, from the dominant frequency of the step signal.
pub fn cadence_spm(signal: &[f64], sample_rate_hz: f64, band_hz: [f64; 2]) -> Option<f64> {
    dominant_frequency(signal, sample_rate_hz, band_hz).map(|hz| hz * 60.0)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    #[test]
    fn finds_walking_frequency() {
        let fs = 50.0;
        let signal: Vec<f64> = (0..512)
            .map(|i| 9.81 + 2.0 * (2.0 * PI * 2.0 * i as f64 / fs).sin())
            .collect();
        let hz = dominant_frequency(&signal, fs, [0.5, 3.5]).unwrap();
        assert!((hz - 2.0).abs() <= fs / 512.0, "got {hz}");
        let spm = cadence_spm(&signal, fs, [0.5, 3.5]).unwrap();
        assert!((spm - 120.0).abs() < 6.0);
    }

    #[test]
    fn flat_or_tiny_input_has_no_cadence() {
        assert_eq!(dominant_frequency(&[9.81; 256], 50.0, [0.5, 3.5]), None);
        assert_eq!(dominant_frequency(&[1.0, 2.0], 50.0, [0.5, 3.5]), None);
        assert_eq!(dominant_frequency(&[1.0, 2.0, 3.0, 4.0], 0.0, [0.5, 3.5]), None);
    }
}

use std::f64::consts::PI;

#[derive(Clone, Copy, Debug)]
pub enum FilterKind {
    Highpass { cutoff_hz: f64, q: f64 },
    Lowpass { cutoff_hz: f64, q: f64 },
}

#[derive(Clone, Copy, Debug)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}

#[derive(Clone, Default, Debug)]
pub struct FilterChain {
    sections: Vec<BiquadFilter>,
}

impl FilterChain {
    pub fn from_kinds(sample_rate_hz: f64, kinds: &[FilterKind]) -> Self {
        let sections = kinds
            .iter()
            .map(|kind| BiquadFilter::new(design(sample_rate_hz, *kind)))
            .collect();
        Self { sections }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn process_sample(&mut self, mut value: f64) -> f64 {
        for section in &mut self.sections {
            value = section.process(value);
        }
        value
    }

    fn reset(&mut self) {
        for section in &mut self.sections {
            section.state = BiquadState::default();
        }
    }

    /// Forward then backward pass: no phase lag, squared magnitude response.
    pub fn zero_phase(&mut self, signal: &[f64]) -> Vec<f64> {
        if self.is_empty() {
            return signal.to_vec();
        }
        self.reset();
        let mut out: Vec<f64> = signal.iter().map(|&v| self.process_sample(v)).collect();
        self.reset();
        for v in out.iter_mut().rev() {
            *v = self.process_sample(*v);
        }
        self.reset();
        out
    }
}

fn design(sample_rate_hz: f64, kind: FilterKind) -> BiquadCoeffs {
    let nyquist = sample_rate_hz * 0.5;
    match kind {
        FilterKind::Highpass { cutoff_hz, q } => {
            highpass(nyquist_clamp(cutoff_hz, nyquist), sample_rate_hz, q)
        }
        FilterKind::Lowpass { cutoff_hz, q } => {
            lowpass(nyquist_clamp(cutoff_hz, nyquist), sample_rate_hz, q)
        }
    }
}

fn nyquist_clamp(freq_hz: f64, nyquist: f64) -> f64 {
    freq_hz.clamp(0.01, (nyquist - 0.01).max(0.01))
}

fn lowpass(freq_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = (1.0 - cos_w0) * 0.5;
    let b1 = 1.0 - cos_w0;
    let b2 = b0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    normalize(b0, b1, b2, a0, a1, a2)
}

fn highpass(freq_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let b0 = (1.0 + cos_w0) * 0.5;
    let b1 = -(1.0 + cos_w0);
    let b2 = b0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_w0;
    let a2 = 1.0 - alpha;
    normalize(b0, b1, b2, a0, a1, a2)
}

fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> BiquadCoeffs {
    let a0_inv = 1.0 / a0;
    BiquadCoeffs {
        b0: b0 * a0_inv,
        b1: b1 * a0_inv,
        b2: b2 * a0_inv,
        a1: a1 * a0_inv,
        a2: a2 * a0_inv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 50.0;

    fn sine(freq_hz: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / FS).sin())
            .collect()
    }

    fn rms(signal: &[f64]) -> f64 {
        (signal.iter().map(|v| v * v).sum::<f64>() / signal.len() as f64).sqrt()
    }

    #[test]
    fn lowpass_keeps_walking_band_and_drops_jitter() {
        let q = std::f64::consts::FRAC_1_SQRT_2;
        let mut chain = FilterChain::from_kinds(FS, &[FilterKind::Lowpass { cutoff_hz: 3.0, q }]);
        let slow = chain.zero_phase(&sine(1.0, 500));
        let fast = chain.zero_phase(&sine(15.0, 500));
        // Ignore the edges where the filter settles.
        assert!(rms(&slow[100..400]) > 0.6);
        assert!(rms(&fast[100..400]) < 0.05);
    }

    #[test]
    fn highpass_removes_offset() {
        let q = std::f64::consts::FRAC_1_SQRT_2;
        let mut chain = FilterChain::from_kinds(FS, &[FilterKind::Highpass { cutoff_hz: 0.3, q }]);
        let out = chain.zero_phase(&vec![9.81; 1000]);
        assert!(out[400..600].iter().all(|v| v.abs() < 0.1));
    }

    #[test]
    fn empty_chain_passes_through() {
        let mut chain = FilterChain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.zero_phase(&[1.0, 2.0]), vec![1.0, 2.0]);
    }
}

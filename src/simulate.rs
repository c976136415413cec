use std::f64::consts::PI;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::types::{IngestRequest, SensorRecord};

const GRAVITY: f64 = 9.81;

/// Synthetic phone-in-pocket walk, shaped like Sensor Logger batches.
pub struct WalkSimulator {
    rng: StdRng,
    sample_rate_hz: f64,
    cadence_hz: f64,
    noise: f64,
    next_ns: i64,
    elapsed_secs: f64,
}

impl WalkSimulator {
    pub fn new(sample_rate_hz: f64, cadence_hz: f64, seed: u64) -> Self {
        let now_ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or_default();
        Self::starting_at(now_ns, sample_rate_hz, cadence_hz, seed)
    }

    pub fn starting_at(start_ns: i64, sample_rate_hz: f64, cadence_hz: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sample_rate_hz,
            cadence_hz,
            noise: 0.3,
            next_ns: start_ns,
            elapsed_secs: 0.0,
        }
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sample_rate_hz)
    }

    /// Generates `duration` worth of samples for both accelerometer groups
    /// plus a gyroscope record that only shows up in the sensor list.
    pub fn batch(&mut self, duration: Duration) -> IngestRequest {
        let samples = (duration.as_secs_f64() * self.sample_rate_hz).round() as usize;
        let step_ns = (1e9 / self.sample_rate_hz) as i64;
        let mut payload = Vec::with_capacity(samples * 2 + 1);
        for _ in 0..samples {
            let t = self.elapsed_secs;
            let phase = 2.0 * PI * self.cadence_hz * t;
            let bounce = 2.2 * phase.sin() + 0.6 * (2.0 * phase).sin();
            let sway = 0.8 * (phase / 2.0).sin();
            let x = sway + self.jitter();
            let y = GRAVITY + bounce + self.jitter();
            let z = 0.4 * phase.cos() + self.jitter();
            payload.push(record("accelerometer", self.next_ns, x, y, z));
            // Raw sensor: same motion plus a fixed bias.
            payload.push(record("accelerometeruncalibrated", self.next_ns, x + 0.15, y - 0.08, z + 0.05));
            self.next_ns += step_ns;
            self.elapsed_secs += 1.0 / self.sample_rate_hz;
        }
        payload.push(record("gyroscope", self.next_ns, 0.0, 0.0, 0.0));
        IngestRequest { payload }
    }

    fn jitter(&mut self) -> f64 {
        self.rng.gen_range(-self.noise..=self.noise)
    }
}

fn record(name: &str, time: i64, x: f64, y: f64, z: f64) -> SensorRecord {
    let mut values = Map::new();
    values.insert("x".into(), Value::from(x));
    values.insert("y".into(), Value::from(y));
    values.insert("z".into(), Value::from(z));
    SensorRecord {
        name: name.to_owned(),
        time,
        values: Value::Object(values),
    }
}

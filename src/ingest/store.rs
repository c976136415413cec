use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use serde::Serialize;

use crate::config::{ChannelGroupConfig, DashboardConfig};
use crate::ingest::buffer::{GroupBuffer, GroupFrame};
use crate::ingest::known::KnownSensors;
use crate::ingest::DashboardError;
use crate::types::{IngestRequest, Timestamp};

pub type SharedStore = Arc<RwLock<SensorStore>>;

pub fn read_store(store: &SharedStore) -> RwLockReadGuard<'_, SensorStore> {
    store.read().unwrap_or_else(|poisoned| {
        log::warn!("sensor store lock was poisoned; continuing with last state");
        PoisonError::into_inner(poisoned)
    })
}

pub fn write_store(store: &SharedStore) -> RwLockWriteGuard<'_, SensorStore> {
    store.write().unwrap_or_else(|poisoned| {
        log::warn!("sensor store lock was poisoned; continuing with last state");
        PoisonError::into_inner(poisoned)
    })
}

/// Outcome of one accepted payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub records: usize,
    pub admitted: usize,
    pub stale: usize,
    pub sensors_reset: bool,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct IngestStats {
    pub payloads: u64,
    pub rejected: u64,
    pub admitted: u64,
    pub stale: u64,
}

/// Everything the renderer needs, copied out from under the lock.
#[derive(Clone, Debug, Default)]
pub struct StoreView {
    pub groups: Vec<GroupFrame>,
    pub sensors: Vec<String>,
}

impl StoreView {
    pub fn group(&self, name: &str) -> Option<&GroupFrame> {
        self.groups.iter().find(|g| g.name == name)
    }
}

struct Reading {
    group: usize,
    timestamp: Timestamp,
    values: Vec<f64>,
}

pub struct SensorStore {
    groups: Vec<(ChannelGroupConfig, GroupBuffer)>,
    known: KnownSensors,
    stats: IngestStats,
}

impl SensorStore {
    pub fn from_config(config: &DashboardConfig, now: Instant) -> Result<Self, DashboardError> {
        let groups = config
            .groups
            .iter()
            .map(|group| {
                let buffer = GroupBuffer::new(group.name.clone(), group.axes.clone(), config.capacity)?;
                Ok((group.clone(), buffer))
            })
            .collect::<Result<Vec<_>, DashboardError>>()?;
        Ok(Self {
            groups,
            known: KnownSensors::new(config.idle_window(), now),
            stats: IngestStats::default(),
        })
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Validates the whole payload first, so a schema violation anywhere
    /// leaves buffers and the sensor list untouched.
    pub fn ingest(&mut self, request: &IngestRequest, now: Instant) -> Result<IngestReport, DashboardError> {
        let readings = match self.validate(request) {
            Ok(readings) => readings,
            Err(err) => {
                self.stats.rejected += 1;
                return Err(err);
            }
        };

        let mut report = IngestReport {
            records: request.payload.len(),
            sensors_reset: self.known.expire(now),
            ..IngestReport::default()
        };
        let mut readings = readings.into_iter().peekable();
        for (index, record) in request.payload.iter().enumerate() {
            self.known.observe(&record.name);
            let Some(reading) = readings.next_if(|(i, _)| *i == index).map(|(_, r)| r) else {
                continue;
            };
            let (_, buffer) = &mut self.groups[reading.group];
            if buffer.admit(reading.timestamp, &reading.values)?.admitted() {
                report.admitted += 1;
            } else {
                report.stale += 1;
            }
        }

        self.stats.payloads += 1;
        self.stats.admitted += report.admitted as u64;
        self.stats.stale += report.stale as u64;
        Ok(report)
    }

    fn validate(&self, request: &IngestRequest) -> Result<Vec<(usize, Reading)>, DashboardError> {
        let mut readings = Vec::new();
        for (index, record) in request.payload.iter().enumerate() {
            let Some(group) = self.groups.iter().position(|(cfg, _)| cfg.matches(&record.name)) else {
                continue;
            };
            let (config, _) = &self.groups[group];
            let values = config
                .axes
                .iter()
                .map(|axis| {
                    record.axis(axis).ok_or_else(|| DashboardError::MissingAxis {
                        index,
                        sensor: record.name.clone(),
                        axis: axis.clone(),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            readings.push((
                index,
                Reading {
                    group,
                    timestamp: record.timestamp(),
                    values,
                },
            ));
        }
        Ok(readings)
    }

    #[cfg(test)]
    pub fn group(&self, name: &str) -> Option<&GroupBuffer> {
        self.groups
            .iter()
            .find(|(cfg, _)| cfg.name == name)
            .map(|(_, buffer)| buffer)
    }

    pub fn buffers(&self) -> impl Iterator<Item = &GroupBuffer> {
        self.groups.iter().map(|(_, buffer)| buffer)
    }

    pub fn known_sensors(&self) -> &[String] {
        self.known.names()
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Counts a payload that never got past JSON parsing.
    pub fn note_rejected(&mut self) {
        self.stats.rejected += 1;
    }

    pub fn view(&self) -> StoreView {
        StoreView {
            groups: self.buffers().map(GroupBuffer::frame).collect(),
            sensors: self.known.names().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::SensorRecord;

    fn record(name: &str, time: i64, xyz: [f64; 3]) -> SensorRecord {
        SensorRecord {
            name: name.to_owned(),
            time,
            values: serde_json::json!({"x": xyz[0], "y": xyz[1], "z": xyz[2]}),
        }
    }

    fn request(records: Vec<SensorRecord>) -> IngestRequest {
        IngestRequest { payload: records }
    }

    fn store_with_capacity(capacity: usize, now: Instant) -> SensorStore {
        let config = DashboardConfig {
            capacity,
            ..DashboardConfig::default()
        };
        SensorStore::from_config(&config, now).unwrap()
    }

    #[test]
    fn end_to_end_admission_example() {
        let now = Instant::now();
        let mut store = SensorStore::from_config(&DashboardConfig::default(), now).unwrap();
        store
            .ingest(
                &request(vec![
                    record("accelerometer", 1_000_000_000, [1.0, 2.0, 3.0]),
                    record("accelerometer", 2_000_000_000, [4.0, 5.0, 6.0]),
                ]),
                now,
            )
            .unwrap();
        let report = store
            .ingest(&request(vec![record("accelerometer", 1_500_000_000, [7.0, 8.0, 9.0])]), now)
            .unwrap();
        assert_eq!(report.stale, 1);
        assert_eq!(report.admitted, 0);

        let frame = store.group("accelerometer").unwrap().frame();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.seconds(), vec![1.0, 2.0]);
        assert_eq!(frame.axes[0], vec![1.0, 4.0]);
        assert_eq!(frame.axes[1], vec![2.0, 5.0]);
        assert_eq!(frame.axes[2], vec![3.0, 6.0]);
    }

    #[test]
    fn capacity_keeps_the_latest_samples() {
        let now = Instant::now();
        let n = 50;
        let mut store = store_with_capacity(n, now);
        let records = (0..(n as i64 + 5))
            .map(|i| record("accelerometer", (i + 1) * 20_000_000, [i as f64, 0.0, 0.0]))
            .collect();
        let report = store.ingest(&request(records), now).unwrap();
        assert_eq!(report.admitted, n + 5);
        let frame = store.group("accelerometer").unwrap().frame();
        assert_eq!(frame.len(), n);
        assert_eq!(frame.axes[0][0], 5.0);
        assert_eq!(frame.axes[0][n - 1], (n + 4) as f64);
    }

    #[test]
    fn alias_feeds_the_uncalibrated_group() {
        let now = Instant::now();
        let mut store = store_with_capacity(10, now);
        store
            .ingest(&request(vec![record("accelerometeruncalibrated", 5, [0.1, 0.2, 9.8])]), now)
            .unwrap();
        assert_eq!(store.group("accelerometer_uncalibrated").unwrap().len(), 1);
        assert!(store.group("accelerometer").unwrap().is_empty());
        assert_eq!(store.known_sensors(), ["accelerometeruncalibrated"]);
    }

    #[test]
    fn unrecognized_sensors_only_reach_the_sensor_list() {
        let now = Instant::now();
        let mut store = store_with_capacity(10, now);
        let mut gravity = record("gravity", 5, [0.0, 0.0, 9.8]);
        gravity.values = serde_json::Value::Null;
        let report = store
            .ingest(&request(vec![gravity, record("gyroscope", 6, [1.0, 1.0, 1.0])]), now)
            .unwrap();
        assert_eq!(report.admitted, 0);
        assert_eq!(store.known_sensors(), ["gravity", "gyroscope"]);
        assert!(store.buffers().all(GroupBuffer::is_empty));
    }

    #[test]
    fn malformed_record_rejects_the_whole_payload() {
        let now = Instant::now();
        let mut store = store_with_capacity(10, now);
        let mut broken = record("accelerometer", 2, [1.0, 2.0, 3.0]);
        broken.values.as_object_mut().unwrap().remove("z");
        let err = store
            .ingest(
                &request(vec![record("accelerometer", 1, [1.0, 2.0, 3.0]), broken]),
                now,
            )
            .unwrap_err();
        assert!(matches!(err, DashboardError::MissingAxis { index: 1, .. }));
        assert!(store.group("accelerometer").unwrap().is_empty());
        assert!(store.known_sensors().is_empty());
        assert_eq!(store.stats().rejected, 1);
        assert_eq!(store.stats().payloads, 0);
    }

    #[test]
    fn odd_values_from_other_sensors_do_not_block_the_batch() {
        let now = Instant::now();
        let mut store = store_with_capacity(10, now);
        let request = IngestRequest::from_slice(
            br#"{"payload": [
                {"name": "annotation", "time": 1, "values": null},
                {"name": "wrist", "time": 1, "values": [0.1, 0.2]},
                {"name": "accelerometer", "time": 2, "values": {"x": 1, "y": 2, "z": 3}}
            ]}"#,
        )
        .unwrap();
        let report = store.ingest(&request, now).unwrap();
        assert_eq!(report.admitted, 1);
        assert_eq!(store.group("accelerometer").unwrap().frame().axes[2], vec![3.0]);
        assert_eq!(store.known_sensors(), ["annotation", "wrist", "accelerometer"]);
    }

    #[test]
    fn non_object_values_on_a_known_group_reject_the_payload() {
        let now = Instant::now();
        let mut store = store_with_capacity(10, now);
        let mut broken = record("accelerometer", 2, [0.0; 3]);
        broken.values = serde_json::Value::Null;
        let err = store.ingest(&request(vec![broken]), now).unwrap_err();
        assert!(matches!(err, DashboardError::MissingAxis { index: 0, .. }));
        assert!(store.group("accelerometer").unwrap().is_empty());
    }

    #[test]
    fn idle_window_clears_before_new_names() {
        let start = Instant::now();
        let mut store = store_with_capacity(10, start);
        store.ingest(&request(vec![record("gyroscope", 1, [0.0; 3])]), start).unwrap();
        let report = store
            .ingest(&request(vec![record("magnetometer", 2, [0.0; 3])]), start + Duration::from_secs(5))
            .unwrap();
        assert!(!report.sensors_reset);
        assert_eq!(store.known_sensors(), ["gyroscope", "magnetometer"]);

        let report = store
            .ingest(
                &request(vec![record("accelerometer", 3, [0.0; 3])]),
                start + Duration::from_secs(11),
            )
            .unwrap();
        assert!(report.sensors_reset);
        assert_eq!(store.known_sensors(), ["accelerometer"]);
    }

    #[test]
    fn view_copies_every_group() {
        let now = Instant::now();
        let mut store = store_with_capacity(10, now);
        store
            .ingest(&request(vec![record("accelerometer", 1, [1.0, 2.0, 3.0])]), now)
            .unwrap();
        let view = store.view();
        assert_eq!(view.groups.len(), 2);
        assert_eq!(view.group("accelerometer").map(GroupFrame::len), Some(1));
        assert_eq!(view.group("accelerometer_uncalibrated").map(GroupFrame::len), Some(0));
        assert_eq!(view.sensors, vec!["accelerometer".to_owned()]);
    }
}

// src/types.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Device timestamp in nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }
}

/// Body of `POST /data`. Extra top-level fields sent by the phone app
/// (`messageId`, `sessionId`, `deviceId`) are ignored.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IngestRequest {
    pub payload: Vec<SensorRecord>,
}

impl IngestRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// One reading of one sensor as it arrives on the wire.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SensorRecord {
    pub name: String,
    pub time: i64,
    // Left untyped: sensors like `annotation` send no values, `null`, or
    // arrays, and only recognized groups care about the shape.
    #[serde(default)]
    pub values: Value,
}

impl SensorRecord {
    pub fn timestamp(&self) -> Timestamp {
        Timestamp::from_nanos(self.time)
    }

    /// Numeric axis value, `None` when `values` is not an object or the
    /// axis is missing or non-numeric.
    pub fn axis(&self, axis: &str) -> Option<f64> {
        self.values.as_object()?.get(axis).and_then(Value::as_f64)
    }
}

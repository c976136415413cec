use std::collections::VecDeque;

use crate::ingest::DashboardError;
use crate::types::Timestamp;

/// Owned copy of one group buffer, detached from the lock.
#[derive(Clone, Debug)]
pub struct GroupFrame {
    pub name: String,
    pub axis_labels: Vec<String>,
    pub timestamps: Vec<Timestamp>,
    pub axes: Vec<Vec<f64>>, // axis x samples
}

impl GroupFrame {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn seconds(&self) -> Vec<f64> {
        self.timestamps.iter().map(Timestamp::as_secs_f64).collect()
    }

    /// Euclidean norm across all axes, per sample.
    pub fn magnitude(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| {
                self.axes
                    .iter()
                    .map(|axis| axis[i] * axis[i])
                    .sum::<f64>()
                    .sqrt()
            })
            .collect()
    }

    pub fn time_span(&self) -> Option<(f64, f64)> {
        let first = self.timestamps.first()?;
        let last = self.timestamps.last()?;
        Some((first.as_secs_f64(), last.as_secs_f64()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Appended,
    /// Appended after dropping the oldest sample.
    Evicted,
    /// Timestamp not newer than the last admitted one; nothing changed.
    Stale,
}

impl Admission {
    pub fn admitted(&self) -> bool {
        !matches!(self, Admission::Stale)
    }
}

/// Fixed-capacity ring of samples sharing one time axis.
pub struct GroupBuffer {
    name: String,
    axis_labels: Vec<String>,
    timestamps: VecDeque<Timestamp>,
    per_axis: Vec<VecDeque<f64>>,
    capacity: usize,
}

impl GroupBuffer {
    pub fn new(
        name: impl Into<String>,
        axis_labels: Vec<String>,
        capacity: usize,
    ) -> Result<Self, DashboardError> {
        if capacity == 0 {
            return Err(DashboardError::InvalidCapacity);
        }
        let per_axis = axis_labels
            .iter()
            .map(|_| VecDeque::with_capacity(capacity))
            .collect();
        Ok(Self {
            name: name.into(),
            axis_labels,
            timestamps: VecDeque::with_capacity(capacity),
            per_axis,
            capacity,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.back().copied()
    }

    pub fn would_admit(&self, timestamp: Timestamp) -> bool {
        self.last_timestamp().map_or(true, |last| timestamp > last)
    }

    pub fn admit(&mut self, timestamp: Timestamp, values: &[f64]) -> Result<Admission, DashboardError> {
        if values.len() != self.per_axis.len() {
            return Err(DashboardError::ChannelMismatch {
                group: self.name.clone(),
                expected: self.per_axis.len(),
                actual: values.len(),
            });
        }
        if !self.would_admit(timestamp) {
            return Ok(Admission::Stale);
        }
        let evicted = self.timestamps.len() == self.capacity;
        if evicted {
            self.timestamps.pop_front();
            for column in &mut self.per_axis {
                column.pop_front();
            }
        }
        self.timestamps.push_back(timestamp);
        for (column, &value) in self.per_axis.iter_mut().zip(values) {
            column.push_back(value);
        }
        Ok(if evicted {
            Admission::Evicted
        } else {
            Admission::Appended
        })
    }

    pub fn frame(&self) -> GroupFrame {
        GroupFrame {
            name: self.name.clone(),
            axis_labels: self.axis_labels.clone(),
            timestamps: self.timestamps.iter().copied().collect(),
            axes: self
                .per_axis
                .iter()
                .map(|column| column.iter().copied().collect())
                .collect(),
        }
    }
}

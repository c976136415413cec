use std::time::{Duration, Instant};

/// Sensor names seen since the last idle-window reset, in first-seen order.
pub struct KnownSensors {
    names: Vec<String>,
    idle_window: Duration,
    last_reset: Instant,
}

impl KnownSensors {
    pub fn new(idle_window: Duration, now: Instant) -> Self {
        Self {
            names: Vec::new(),
            idle_window,
            last_reset: now,
        }
    }

    /// Clears the set when more than the idle window has passed since the
    /// previous reset. Returns whether it cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_reset) > self.idle_window {
            self.last_reset = now;
            self.names.clear();
            return true;
        }
        false
    }

    pub fn observe(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_owned());
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn summary(names: &[String]) -> String {
        if names.is_empty() {
            "Available Sensors: none".to_owned()
        } else {
            format!("Available Sensors: {}", names.join(", "))
        }
    }
}

// src/ingest/mod.rs
pub mod buffer;
pub mod error;
pub mod known;
pub mod store;

pub use buffer::GroupFrame;
pub use error::DashboardError;
pub use known::KnownSensors;
pub use store::{read_store, write_store, SensorStore, SharedStore, StoreView};

// src/engine.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::{read_store, write_store, SharedStore};
use crate::render::{Renderer, Snapshot};
use crate::simulate::WalkSimulator;

/// Copies the store under a short read lock, then renders without it.
pub fn render_once(store: &SharedStore, renderer: &Renderer, tick: u64) -> Snapshot {
    let view = read_store(store).view();
    renderer.render(&view, tick)
}

/// Re-renders on a fixed period and publishes the latest snapshot.
pub fn spawn_render_loop(
    store: SharedStore,
    renderer: Renderer,
    period: Duration,
    tx: watch::Sender<Arc<Snapshot>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick: u64 = 0;
        loop {
            interval.tick().await;
            tick += 1;
            let started = Instant::now();
            let snapshot = render_once(&store, &renderer, tick);
            log::debug!(
                "tick {tick}: {} charts, {} steps in {:?}",
                snapshot.charts.len(),
                snapshot.steps.count,
                started.elapsed()
            );
            tx.send_replace(Arc::new(snapshot));
        }
    })
}

/// Feeds a synthetic walk into the store through the normal ingest path.
pub fn spawn_simulator(store: SharedStore, cadence_hz: f64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let batch_period = Duration::from_millis(100);
        let mut sim = WalkSimulator::new(50.0, cadence_hz, 0x5eed);
        let mut interval = tokio::time::interval(batch_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!(
            "simulated walk active ({cadence_hz:.1} steps/s, one sample every {:?})",
            sim.sample_period()
        );
        loop {
            interval.tick().await;
            let request = sim.batch(batch_period);
            match write_store(&store).ingest(&request, Instant::now()) {
                Ok(report) => log::trace!("simulated batch: {report:?}"),
                Err(err) => log::warn!("simulated batch rejected: {err}"),
            }
        }
    })
}

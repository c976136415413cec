// src/main.rs
mod config;
mod engine;
mod gui;
mod ingest;
mod render;
mod server;
mod simulate;
mod steps;
mod types;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::Parser;
use tokio::sync::watch;

use crate::config::{DashboardConfig, DetectorKind};
use crate::ingest::SensorStore;
use crate::render::{PlotStyle, Renderer, Snapshot};
use crate::server::AppState;

#[derive(Parser, Debug)]
#[command(name = "sensor-dashboard", about = "Live dashboard for phone sensor streams")]
struct Args {
    /// JSON config file; built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Samples kept per channel group
    #[arg(long)]
    capacity: Option<usize>,

    /// Dashboard refresh period in milliseconds
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// Step detector to run on the accelerometer magnitude
    #[arg(long, value_enum)]
    detector: Option<DetectorKind>,

    /// Feed a synthetic walk into the store (no phone needed)
    #[arg(long)]
    simulate: bool,

    /// Step frequency of the synthetic walk, in steps per second
    #[arg(long, default_value_t = 1.8)]
    simulate_cadence: f64,

    /// Also open the desktop viewer
    #[arg(long)]
    desktop: bool,
}

impl Args {
    fn apply(&self, config: &mut DashboardConfig) {
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(refresh_ms) = self.refresh_ms {
            config.refresh_ms = refresh_ms;
        }
        if let Some(detector) = self.detector {
            config.steps.detector = detector;
        }
    }
}

async fn run(
    config: DashboardConfig,
    state: AppState,
    renderer: Renderer,
    tx: watch::Sender<Arc<Snapshot>>,
    simulate: Option<f64>,
) -> anyhow::Result<()> {
    let render_task = engine::spawn_render_loop(state.store.clone(), renderer, config.refresh_period(), tx);
    let sim_task = simulate.map(|cadence| engine::spawn_simulator(state.store.clone(), cadence));

    let result = server::serve(state, config.bind, config.max_body_bytes).await;

    render_task.abort();
    if let Some(task) = sim_task {
        task.abort();
    }
    result
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = DashboardConfig::load(args.config.as_deref()).context("loading config")?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let store = SensorStore::from_config(&config, Instant::now())
        .context("building sensor store")?
        .shared();
    let renderer = Renderer::from_config(&config);
    log::info!(
        "{} group(s), capacity {}, refresh {} ms, step detector '{}'",
        config.groups.len(),
        config.capacity,
        config.refresh_ms,
        renderer.detector_name()
    );

    let (tx, rx) = watch::channel(Arc::new(Snapshot::default()));
    let state = AppState {
        store,
        snapshots: rx.clone(),
        style: Arc::new(PlotStyle::from_config(&config.plot)),
        refresh_ms: config.refresh_ms,
        started_at: Instant::now(),
    };
    let simulate = args.simulate.then_some(args.simulate_cadence);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?;

    if !args.desktop {
        return runtime.block_on(run(config, state, renderer, tx, simulate));
    }

    // The window owns the main thread; the server runs beside it and the
    // process exits when the window closes.
    let refresh = config.refresh_period();
    let ingest_url = format!("http://{}/data", config.bind);
    std::thread::Builder::new()
        .name("dashboard-server".into())
        .spawn(move || {
            if let Err(err) = runtime.block_on(run(config, state, renderer, tx, simulate)) {
                log::error!("server stopped: {err:#}");
            }
        })
        .context("spawning server thread")?;

    gui::run(gui::DashboardApp::new(rx, refresh, ingest_url)).map_err(|err| anyhow!("desktop viewer failed: {err}"))
}

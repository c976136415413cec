//! HTTP side of the dashboard.
//!
//! - `POST /data`            sensor batches from the phone
//! - `GET  /`                web dashboard shell
//! - `GET  /api/snapshot`    latest rendered snapshot as JSON
//! - `GET  /charts/{id}.png` one chart of the latest snapshot
//! - `GET  /health`          uptime, ingest counters, buffer fill

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::watch;

use crate::ingest::{read_store, write_store, DashboardError, SharedStore};
use crate::render::{render_chart_png, PlotStyle, Snapshot};
use crate::types::IngestRequest;

const DASHBOARD_HTML: &str = include_str!("dashboard.html");

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub snapshots: watch::Receiver<Arc<Snapshot>>,
    pub style: Arc<PlotStyle>,
    pub refresh_ms: u64,
    pub started_at: Instant,
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/data", post(ingest))
        .route("/api/snapshot", get(snapshot))
        .route("/charts/:file", get(chart_png))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

pub async fn serve(state: AppState, bind: SocketAddr, max_body_bytes: usize) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("listening on http://{bind} (POST /data, dashboard at /)");
    axum::serve(listener, router(state, max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("server shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    log::info!("shutdown signal received");
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(DASHBOARD_HTML.replace("{{REFRESH_MS}}", &state.refresh_ms.to_string()))
}

// The phone app does not always send a JSON content type, so the body is
// parsed by hand instead of through the `Json` extractor.
async fn ingest(State(state): State<AppState>, body: Bytes) -> Result<&'static str, DashboardError> {
    let request = IngestRequest::from_slice(&body).map_err(|err| {
        log::warn!("rejected payload: {err}");
        write_store(&state.store).note_rejected();
        DashboardError::from(err)
    })?;
    let report = write_store(&state.store)
        .ingest(&request, Instant::now())
        .map_err(|err| {
            log::warn!("rejected payload: {err}");
            err
        })?;
    log::debug!(
        "ingested {} records: {} admitted, {} stale{}",
        report.records,
        report.admitted,
        report.stale,
        if report.sensors_reset { ", sensor list reset" } else { "" }
    );
    Ok("success")
}

async fn snapshot(State(state): State<AppState>) -> Json<Arc<Snapshot>> {
    Json(state.snapshots.borrow().clone())
}

async fn chart_png(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, DashboardError> {
    let id = file.strip_suffix(".png").unwrap_or(&file).to_owned();
    let chart = state
        .snapshots
        .borrow()
        .chart(&id)
        .cloned()
        .ok_or_else(|| {
            log::warn!("chart `{id}` requested but not in the latest snapshot");
            DashboardError::UnknownChart(id.clone())
        })?;
    let style = state.style.clone();
    let png = tokio::task::spawn_blocking(move || render_chart_png(&chart, &style))
        .await
        .map_err(|err| DashboardError::Plot(err.to_string()))??;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        ],
        png,
    )
        .into_response())
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let store = read_store(&state.store);
    let buffers: serde_json::Map<String, serde_json::Value> = store
        .buffers()
        .map(|b| {
            (
                b.name().to_owned(),
                serde_json::json!({ "len": b.len(), "capacity": b.capacity() }),
            )
        })
        .collect();
    let active_groups = store.buffers().filter(|b| !b.is_empty()).count();
    Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "tick": state.snapshots.borrow().tick,
        "ingest": store.stats(),
        "active_groups": active_groups,
        "buffers": buffers,
        "sensors": store.known_sensors(),
    }))
}

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("record {index} (`{sensor}`): missing numeric axis `{axis}`")]
    MissingAxis {
        index: usize,
        sensor: String,
        axis: String,
    },
    #[error("axis count mismatch for `{group}`: expected {expected}, got {actual}")]
    ChannelMismatch {
        group: String,
        expected: usize,
        actual: usize,
    },
    #[error("buffer capacity must be greater than zero")]
    InvalidCapacity,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("no chart named `{0}` in the latest snapshot")]
    UnknownChart(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

impl DashboardError {
    pub fn status(&self) -> StatusCode {
        match self {
            DashboardError::Payload(_)
            | DashboardError::MissingAxis { .. }
            | DashboardError::ChannelMismatch { .. } => StatusCode::BAD_REQUEST,
            DashboardError::UnknownChart(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for DashboardError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        DashboardError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for DashboardError {
    fn from(value: image::ImageError) -> Self {
        DashboardError::Plot(value.to_string())
    }
}

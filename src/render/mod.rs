pub mod cadence;
pub mod chart;
pub mod plot;
pub mod snapshot;

pub use chart::{ChartSpec, SeriesMode};
pub use plot::{render_chart_png, PlotStyle};
pub use snapshot::{Renderer, Snapshot};

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesMode {
    Lines,
    Markers,
}

/// One named series. `y[i]` is `None` where nothing should be drawn.
#[derive(Clone, Debug, Serialize)]
pub struct SeriesSpec {
    pub name: String,
    pub mode: SeriesMode,
    pub x: Vec<f64>,
    pub y: Vec<Option<f64>>,
}

impl SeriesSpec {
    pub fn line(name: impl Into<String>, x: Vec<f64>, y: &[f64]) -> Self {
        Self {
            name: name.into(),
            mode: SeriesMode::Lines,
            x,
            y: y.iter().copied().map(Some).collect(),
        }
    }

    pub fn markers(name: impl Into<String>, x: Vec<f64>, y: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            mode: SeriesMode::Markers,
            x,
            y,
        }
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .filter_map(|(x, y)| y.map(|y| (*x, y)))
    }
}

/// Everything a display surface needs to draw one time-series chart.
/// X values are seconds since the Unix epoch.
#[derive(Clone, Debug, Serialize)]
pub struct ChartSpec {
    pub id: String,
    pub title: String,
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
    pub y_label: String,
    pub series: Vec<SeriesSpec>,
}

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::config::PlotConfig;
use crate::ingest::DashboardError;
use crate::render::chart::{ChartSpec, SeriesMode};

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self::from_config(&PlotConfig::default())
    }
}

impl PlotStyle {
    pub fn from_config(config: &PlotConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            background: RGBColor(10, 10, 10),
            palette: vec![BLUE, RED, GREEN, CYAN, MAGENTA, YELLOW, WHITE],
        }
    }
}

/// Renders one chart to PNG. The x axis is labelled in seconds relative to
/// the newest sample.
pub fn render_chart_png(chart: &ChartSpec, style: &PlotStyle) -> Result<Vec<u8>, DashboardError> {
    if chart.series.iter().all(|s| s.points().next().is_none()) {
        return Err(DashboardError::Plot(format!("chart `{}` has no samples", chart.id)));
    }
    let [x_start, x_end] = widen(chart.x_range);
    let [y_min, y_max] = widen(chart.y_range);
    let newest = chart.x_range[1];
    let x_labels = |x: &f64| format!("{:.1}s", x - newest);

    let mut buffer = vec![0u8; pixel_bytes(style.width, style.height)?];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut plot = ChartBuilder::on(&root)
            .margin(10)
            .caption(&chart.title, ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x_start..x_end, y_min..y_max)?;
        plot.configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .axis_style(&WHITE.mix(0.6))
            .label_style(("sans-serif", 13).into_font().color(&WHITE))
            .x_label_formatter(&x_labels)
            .y_desc(chart.y_label.as_str())
            .draw()?;

        for (idx, series) in chart.series.iter().enumerate() {
            let color = style.palette[idx % style.palette.len()];
            let drawn = match series.mode {
                SeriesMode::Lines => plot.draw_series(LineSeries::new(series.points(), &color))?,
                SeriesMode::Markers => plot.draw_series(
                    series
                        .points()
                        .map(|point| Circle::new(point, 4, color.filled())),
                )?,
            };
            drawn
                .label(series.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        plot.configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .label_font(("sans-serif", 13).into_font().color(&WHITE))
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

// A zero-width range (a single sample) cannot be mapped to pixels.
fn widen([low, high]: [f64; 2]) -> [f64; 2] {
    if (high - low).abs() < f64::EPSILON {
        [low - 0.5, high + 0.5]
    } else {
        [low, high]
    }
}

fn pixel_bytes(width: u32, height: u32) -> Result<usize, DashboardError> {
    if width == 0 || height == 0 {
        return Err(DashboardError::Plot(format!("empty plot size {width}x{height}")));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| DashboardError::Plot(format!("plot size {width}x{height} is too large")))
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, DashboardError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| DashboardError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

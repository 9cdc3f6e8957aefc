//! # Chart Rendering
//!
//! Turns a [`DailySeries`] into a line chart. The renderer only consumes the
//! series; nothing flows back into the aggregation.

use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use shared::{DailySeries, RecordKind, SeriesOrder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Line colour used for every series
const SERIES_COLOR: RGBColor = RGBColor(75, 192, 192);

/// A rendered chart ready to be written out
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub label: String,
    pub svg: String,
}

impl RenderedChart {
    /// Write the chart as `<dir>/<file_stem>.svg`, returning the path
    pub fn write_to(&self, dir: &Path, file_stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating chart directory {}", dir.display()))?;
        let path = dir.join(format!("{}.svg", file_stem));
        fs::write(&path, &self.svg).with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {} chart to {}", self.label, path.display());
        Ok(path)
    }
}

/// Anything that can draw a daily series
pub trait ChartRenderer: Send + Sync {
    fn render(&self, series: &DailySeries, label: &str) -> Result<RenderedChart>;
}

/// Renders series as SVG line charts, oldest day on the left
#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    width: u32,
    height: u32,
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self {
            width: 800,
            height: 350,
        }
    }
}

impl SvgChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Render the chart for one panel kind, labelled the way the dashboard labels it
    pub fn render_panel(&self, kind: RecordKind, series: &DailySeries) -> Result<RenderedChart> {
        self.render(series, kind.chart_label())
    }
}

/// Vertical bounds with 10% headroom and zero always visible
fn y_bounds(values: &[f64]) -> (f64, f64) {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let min = values.iter().copied().fold(0.0_f64, f64::min);
    let padding = (max - min).max(1.0) * 0.1;
    let y_min = if min < 0.0 { min - padding } else { 0.0 };
    (y_min, max + padding)
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, series: &DailySeries, label: &str) -> Result<RenderedChart> {
        if series.is_empty() {
            return Err(anyhow!("cannot chart an empty series"));
        }

        let days = series.days(SeriesOrder::OldestFirst);
        let values: Vec<f64> = days
            .iter()
            .map(|day| day.amount.to_f64().unwrap_or(0.0))
            .collect();
        let points: Vec<(i32, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, value)| (i as i32, *value))
            .collect();
        let (y_min, y_max) = y_bounds(&values);
        let x_max = (days.len() as i32 - 1).max(1);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(|e| anyhow!("chart fill failed: {}", e))?;

            let mut chart = ChartBuilder::on(&root)
                .caption(label, ("sans-serif", 22))
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(70)
                .build_cartesian_2d(0..x_max, y_min..y_max)
                .map_err(|e| anyhow!("chart layout failed: {}", e))?;

            let date_label = |index: &i32| {
                days.get(*index as usize)
                    .map(|day| day.date.format("%m/%d").to_string())
                    .unwrap_or_default()
            };
            chart
                .configure_mesh()
                .x_desc("Date")
                .y_desc(label)
                .x_labels(6)
                .y_labels(8)
                .x_label_formatter(&date_label)
                .y_label_formatter(&|v| format!("${:.2}", v))
                .axis_style(RGBColor(230, 230, 230))
                .bold_line_style(RGBColor(245, 245, 245))
                .light_line_style(RGBColor(250, 250, 250))
                .draw()
                .map_err(|e| anyhow!("chart mesh failed: {}", e))?;

            chart
                .draw_series(LineSeries::new(points.clone(), SERIES_COLOR.stroke_width(2)))
                .map_err(|e| anyhow!("chart series failed: {}", e))?;
            chart
                .draw_series(
                    points
                        .iter()
                        .map(|point| Circle::new(*point, 3, SERIES_COLOR.filled())),
                )
                .map_err(|e| anyhow!("chart points failed: {}", e))?;

            root.present().map_err(|e| anyhow!("chart output failed: {}", e))?;
        }

        Ok(RenderedChart {
            label: label.to_string(),
            svg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn series(values: &[i64]) -> DailySeries {
        DailySeries::new(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            values.iter().map(|v| Decimal::from(*v)).collect(),
        )
    }

    #[test]
    fn test_y_bounds() {
        assert_eq!(y_bounds(&[0.0, 0.0]), (0.0, 0.1));
        assert_eq!(y_bounds(&[0.0, 50.0]), (0.0, 55.0));
        let (low, high) = y_bounds(&[-10.0, 10.0]);
        assert_eq!((low, high), (-12.0, 12.0));
    }

    #[test]
    fn test_renders_svg_with_caption() {
        let chart = SvgChartRenderer::default()
            .render_panel(RecordKind::Income, &series(&[20, 5, 0]))
            .unwrap();
        assert_eq!(chart.label, "Earnings");
        assert!(chart.svg.starts_with("<svg"));
        assert!(chart.svg.contains("Earnings"));
    }

    #[test]
    fn test_renders_all_zero_and_single_day_series() {
        let renderer = SvgChartRenderer::new(400, 200);
        assert!(renderer.render(&series(&[0; 30]), "Spending").is_ok());
        assert!(renderer.render(&series(&[7]), "Spending").is_ok());
        assert!(renderer.render(&series(&[]), "Spending").is_err());
    }

    #[test]
    fn test_write_to_directory() {
        let temp_dir = TempDir::new().unwrap();
        let chart = SvgChartRenderer::default().render(&series(&[1, 2]), "Spending").unwrap();
        let path = chart.write_to(&temp_dir.path().join("charts"), "spending").unwrap();
        assert!(path.ends_with("charts/spending.svg"));
        assert_eq!(fs::read_to_string(path).unwrap(), chart.svg);
    }
}

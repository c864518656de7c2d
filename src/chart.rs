//! Time-series chart rendering for the history query.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use plotters::prelude::*;

use crate::storage::MetricRecord;

const CHART_SIZE: (u32, u32) = (1000, 500);

/// Render the GPU temperature history as a PNG at `path`.
///
/// Records arrive newest first (the query order) and are reversed to
/// chronological before plotting. Empty input is an error; the caller
/// replies with an explicit "no data" message instead of an empty chart.
pub fn render_gpu_history(records: &[MetricRecord], path: &Path) -> anyhow::Result<()> {
    let mut points: Vec<(DateTime<Utc>, i32)> = records
        .iter()
        .map(|record| (record.timestamp, record.gpu_temp))
        .collect();
    points.reverse();

    let first = points.first().context("no records to plot")?;
    let last = points.last().context("no records to plot")?;

    // Pad degenerate ranges (a single record) so the axes stay valid.
    let mut x_range = first.0..last.0;
    if x_range.start == x_range.end {
        x_range = x_range.start..x_range.end + Duration::minutes(1);
    }

    let temp_lo = points.iter().map(|point| point.1).min().unwrap_or(0);
    let temp_hi = points.iter().map(|point| point.1).max().unwrap_or(0);
    let y_range = (temp_lo as f64 - 5.0)..(temp_hi as f64 + 5.0);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("GPU Thermal History (Last 24h)", ("sans-serif", 28))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(48)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|timestamp| timestamp.format("%H:%M").to_string())
        .y_desc("Temperature (°C)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            points
                .iter()
                .map(|(timestamp, temp)| (*timestamp, *temp as f64)),
            &RED,
        ))?
        .label("GPU Temp")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

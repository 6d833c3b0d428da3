//! SVG chart of an emitted series, one panel per tracked parameter.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use plotters::prelude::*;
use tracing::info;

use super::loader::load_csv;
use super::SourceLayout;

// ---

const PANEL_HEIGHT: u32 = 260;
const WIDTH: u32 = 1500;
const PALETTE: [RGBColor; 6] = [CYAN, GREEN, RED, RGBColor(255, 165, 0), MAGENTA, YELLOW];

/// Re-read the cleaned CSV at `csv_path` and render it to `svg_path`.
pub fn render_svg(csv_path: &Path, svg_path: &Path, layout: &SourceLayout) -> Result<()> {
    // ---
    let records = load_csv(csv_path, layout)?;
    if records.is_empty() || layout.params.is_empty() {
        info!("Nothing to plot from {}", csv_path.display());
        return Ok(());
    }

    let first = records[0].timestamp.timestamp();
    let last = records[records.len() - 1].timestamp.timestamp();
    let x_range = first..last.max(first + 1);

    let height = PANEL_HEIGHT * layout.params.len() as u32 + 60;
    let root = SVGBackend::new(svg_path, (WIDTH, height)).into_drawing_area();
    root.fill(&BLACK).map_err(|e| anyhow!("{e}"))?;
    let root = root
        .titled("Sensor Readings Over Time", ("sans-serif", 28).into_font().color(&WHITE))
        .map_err(|e| anyhow!("{e}"))?;

    let panels = root.split_evenly((layout.params.len(), 1));
    for (i, (param, area)) in layout.params.iter().zip(panels.iter()).enumerate() {
        let points: Vec<(i64, f64)> = records
            .iter()
            .filter_map(|r| {
                let v = r.values.get(param).copied().flatten()?;
                Some((r.timestamp.timestamp(), v))
            })
            .collect();
        let (lo, hi) = value_bounds(&points);

        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range.clone(), lo..hi)
            .map_err(|e| anyhow!("{e}"))?;

        chart
            .configure_mesh()
            .bold_line_style(WHITE.mix(0.2))
            .light_line_style(TRANSPARENT)
            .axis_style(WHITE)
            .label_style(("sans-serif", 12).into_font().color(&WHITE))
            .y_desc(param.as_str())
            .x_labels(8)
            .x_label_formatter(&|secs: &i64| axis_label(*secs))
            .draw()
            .map_err(|e| anyhow!("{e}"))?;

        chart
            .draw_series(LineSeries::new(points, &PALETTE[i % PALETTE.len()]))
            .map_err(|e| anyhow!("{e}"))?;
    }

    root.present()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("Failed to write chart '{}'", svg_path.display()))?;

    info!("Chart written to {}", svg_path.display());
    Ok(())
}

fn value_bounds(points: &[(i64, f64)]) -> (f64, f64) {
    // ---
    if points.is_empty() {
        return (0.0, 1.0);
    }
    let lo = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let hi = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((hi - lo) * 0.05).max(0.5);
    (lo - pad, hi + pad)
}

fn axis_label(secs: i64) -> String {
    // ---
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|ts| ts.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

use std::collections::BTreeMap;
use std::path::Path;

use plotters::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistogramError {
    #[error("failed to render histogram: {0}")]
    Render(String),
}

/// Chart labels plus an optional vertical limit line (deadline or budget).
pub struct HistogramSpec<'a> {
    pub caption: &'a str,
    pub x_desc: &'a str,
    pub limit: Option<f64>,
}

pub fn write_histogram_png<P: AsRef<Path>>(
    output_path: P,
    results: &[f64],
    spec: &HistogramSpec<'_>,
) -> Result<(), HistogramError> {
    if results.is_empty() {
        return Ok(());
    }

    let min_value = results.iter().copied().fold(f64::INFINITY, f64::min);
    let max_value = results.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max_value - min_value;
    let square_root_of_n = (results.len() as f64).sqrt().ceil().max(1.0);
    let bin_width = if range < f64::EPSILON {
        1.0
    } else {
        range / square_root_of_n
    };

    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for value in results {
        let bucket = ((*value - min_value) / bin_width).floor() as i64;
        *counts.entry(bucket).or_insert(0usize) += 1;
    }
    let max_count = counts.values().copied().max().unwrap_or(1);
    let last_bucket = counts.keys().next_back().copied().unwrap_or(0);
    let x_start = min_value;
    let x_end = min_value + (last_bucket + 1) as f64 * bin_width;
    let x_end = spec.limit.map_or(x_end, |limit| x_end.max(limit));
    let x_start = spec.limit.map_or(x_start, |limit| x_start.min(limit));

    let root = BitMapBackend::new(output_path.as_ref(), (800, 600)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(spec.caption, ("sans-serif", 30))
        .x_label_area_size(55)
        .y_label_area_size(65)
        .build_cartesian_2d(x_start..x_end, 0..(max_count + 1))
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(spec.x_desc)
        .y_desc("Frequency")
        .label_style(("sans-serif", 18))
        .axis_desc_style(("sans-serif", 22))
        .x_label_formatter(&|value| format!("{value:.0}"))
        .draw()
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    let bar_color = RGBColor(30, 122, 204);
    let bar_style = ShapeStyle::from(&bar_color).filled();
    chart
        .draw_series(counts.iter().map(|(bucket, count)| {
            let left = min_value + *bucket as f64 * bin_width;
            Rectangle::new([(left, 0), (left + bin_width, *count)], bar_style)
        }))
        .map_err(|e| HistogramError::Render(e.to_string()))?;

    if let Some(limit) = spec.limit {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(limit, 0), (limit, max_count + 1)],
                RED.stroke_width(2),
            )))
            .map_err(|e| HistogramError::Render(e.to_string()))?;
    }

    root.present()
        .map_err(|e| HistogramError::Render(e.to_string()))?;
    Ok(())
}

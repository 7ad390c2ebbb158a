//! SVG line charts of training metrics against epoch.

use crate::error::TrainingResult;
use crate::results::{ResultsTable, Series, TRAINING_SERIES};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Chart geometry.
#[derive(Debug, Clone, Copy)]
pub struct ChartParams {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub stroke: &'static str,
}

impl Default for ChartParams {
    fn default() -> Self {
        Self { width: 640.0, height: 400.0, margin: 48.0, stroke: "#1f77b4" }
    }
}

/// Render one `<label>_vs_epoch.svg` per series present in `results_table`.
///
/// A missing or empty table is not an error: a warning is logged and no
/// charts are written.
pub fn render_training_curves(results_table: &Path, out_dir: &Path) -> TrainingResult<Vec<PathBuf>> {
    if !results_table.is_file() {
        warn!(table = %results_table.display(), "results table not found; skipping training curves");
        return Ok(Vec::new());
    }

    let table = ResultsTable::read(results_table)?;
    if table.is_empty() {
        warn!(table = %results_table.display(), "results table has no rows; skipping training curves");
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(out_dir)?;
    let params = ChartParams::default();
    let mut written = Vec::new();

    for series in TRAINING_SERIES {
        let points = table.series(series.column);
        if points.is_empty() {
            debug!(column = series.column, "no data for series");
            continue;
        }

        let path = out_dir.join(format!("{}_vs_epoch.svg", series.label));
        std::fs::write(&path, line_chart_svg(&series, &points, &params))?;
        written.push(path);
    }

    info!(out_dir = %out_dir.display(), charts = written.len(), "rendered training curves");
    Ok(written)
}

/// A single-series line chart with axes and min/max tick labels.
#[must_use]
pub fn line_chart_svg(series: &Series, points: &[(f64, f64)], params: &ChartParams) -> String {
    let ChartParams { width, height, margin, stroke } = *params;
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">
  <rect width="100%" height="100%" fill="white"/>
  <text x="{:.1}" y="24" font-family="sans-serif" font-size="16" text-anchor="middle">{} vs epoch</text>
"#,
        width / 2.0,
        series.label
    );

    let (x_min, x_max) = bounds(points.iter().map(|p| p.0));
    let (y_min, y_max) = bounds(points.iter().map(|p| p.1));
    let plot_w = 2.0f64.mul_add(-margin, width);
    let plot_h = 2.0f64.mul_add(-margin, height);
    let to_x = |x: f64| margin + (x - x_min) / (x_max - x_min) * plot_w;
    let to_y = |y: f64| height - margin - (y - y_min) / (y_max - y_min) * plot_h;

    let _ = writeln!(
        svg,
        r#"  <g stroke="black" stroke-width="1">
    <line x1="{margin}" y1="{bottom}" x2="{right}" y2="{bottom}"/>
    <line x1="{margin}" y1="{margin}" x2="{margin}" y2="{bottom}"/>
  </g>"#,
        bottom = height - margin,
        right = width - margin,
    );

    let mut path = String::new();
    for (i, (x, y)) in points.iter().enumerate() {
        let cmd = if i == 0 { "M" } else { " L" };
        let _ = write!(path, "{cmd} {:.2} {:.2}", to_x(*x), to_y(*y));
    }
    let _ = writeln!(svg, r#"  <path d="{path}" fill="none" stroke="{stroke}" stroke-width="2"/>"#);

    for (x, y) in points {
        let _ = writeln!(svg, r#"  <circle cx="{:.2}" cy="{:.2}" r="2.5" fill="{stroke}"/>"#, to_x(*x), to_y(*y));
    }

    let _ = write!(
        svg,
        r#"  <g font-family="sans-serif" font-size="11">
    <text x="{margin}" y="{:.1}" text-anchor="middle">{x_min}</text>
    <text x="{:.1}" y="{:.1}" text-anchor="middle">{x_max}</text>
    <text x="{:.1}" y="{:.1}" text-anchor="end">{y_min:.4}</text>
    <text x="{:.1}" y="{:.1}" text-anchor="end">{y_max:.4}</text>
    <text x="{:.1}" y="{:.1}" text-anchor="middle">epoch</text>
  </g>
</svg>"#,
        height - margin + 16.0,
        width - margin,
        height - margin + 16.0,
        margin - 6.0,
        height - margin,
        margin - 6.0,
        margin + 4.0,
        width / 2.0,
        height - 8.0,
    );

    svg
}

/// Min and max of `values`, widened when they coincide.
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 0.5, max + 0.5);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_renders_available_series() {
        let temp = TempDir::new().unwrap();
        let table = temp.path().join("results.csv");
        std::fs::write(
            &table,
            "epoch, metrics/mAP50(B), metrics/recall(B), train/box_loss\n1, 0.2, 0.3, 1.4\n2, 0.4, 0.5, 1.1\n",
        )
        .unwrap();

        let out = temp.path().join("plots");
        let written = render_training_curves(&table, &out).unwrap();

        assert_eq!(written.len(), 3);
        assert!(out.join("mAP50_vs_epoch.svg").is_file());
        assert!(out.join("recall_vs_epoch.svg").is_file());
        assert!(out.join("train_box_loss_vs_epoch.svg").is_file());
        assert!(!out.join("precision_vs_epoch.svg").exists());

        let svg = std::fs::read_to_string(out.join("mAP50_vs_epoch.svg")).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<path d=\"M"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_missing_table_is_skipped() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("plots");
        let written = render_training_curves(&temp.path().join("results.csv"), &out).unwrap();

        assert!(written.is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn test_single_point_chart() {
        let series = TRAINING_SERIES[0];
        let svg = line_chart_svg(&series, &[(1.0, 0.5)], &ChartParams::default());
        assert!(svg.contains("mAP50 vs epoch"));
        assert!(!svg.contains("NaN"));
    }
}

// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analytics::ColumnStats;
use crate::dashboard::DashboardData;
use crate::models::{ColumnKind, PriceTable};

// Professional color palette
const COLOR_EMERALD: RGBColor = RGBColor(16, 185, 129);
const COLOR_ROSE: RGBColor = RGBColor(244, 63, 94);
const COLOR_BLUE: RGBColor = RGBColor(59, 130, 246);
const COLOR_AMBER: RGBColor = RGBColor(245, 158, 11);
const COLOR_TEAL: RGBColor = RGBColor(20, 184, 166);
const COLOR_PURPLE: RGBColor = RGBColor(139, 92, 246);
const COLOR_PINK: RGBColor = RGBColor(236, 72, 153);
const COLOR_LIME: RGBColor = RGBColor(132, 204, 22);
const COLOR_ORANGE: RGBColor = RGBColor(249, 115, 22);
const COLOR_SLATE: RGBColor = RGBColor(100, 116, 139);
const COLOR_GRAY: RGBColor = RGBColor(156, 163, 175);

const CHART_COLORS: [RGBColor; 10] = [
    COLOR_BLUE,
    COLOR_EMERALD,
    COLOR_AMBER,
    COLOR_ROSE,
    COLOR_PURPLE,
    COLOR_PINK,
    COLOR_TEAL,
    COLOR_ORANGE,
    COLOR_LIME,
    COLOR_SLATE,
];

// Ends of the Sharpe scale: low is red, high is blue
const SHARPE_LOW: RGBColor = RGBColor(220, 38, 38);
const SHARPE_HIGH: RGBColor = RGBColor(37, 99, 235);

/// Color for a column by its position, cycling through the palette
pub fn series_color(index: usize) -> RGBColor {
    CHART_COLORS[index % CHART_COLORS.len()]
}

/// Interpolates between red and blue over `[min, max]`; gray when Sharpe is N/A
pub fn sharpe_color(sharpe: Option<f64>, min: f64, max: f64) -> RGBColor {
    let Some(value) = sharpe.filter(|s| s.is_finite()) else {
        return COLOR_GRAY;
    };

    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;

    RGBColor(
        mix(SHARPE_LOW.0, SHARPE_HIGH.0),
        mix(SHARPE_LOW.1, SHARPE_HIGH.1),
        mix(SHARPE_LOW.2, SHARPE_HIGH.2),
    )
}

/// Range covering `min..max` with 5% padding on both sides; never empty
pub fn padded_range(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        min.abs().max(1.0) * 0.05
    };
    (min - pad, max + pad)
}

/// Line chart of every normalized column over the trading dates
pub fn relative_performance_chart(normalized: &PriceTable, path: &Path) -> Result<()> {
    if normalized.is_empty() || normalized.columns.is_empty() {
        anyhow::bail!("Nothing to plot: normalized table is empty");
    }

    let values = normalized
        .columns
        .iter()
        .flat_map(|c| c.values.iter().flatten().copied());
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (y_min, y_max) = padded_range(min, max);
    let last_index = normalized.len().saturating_sub(1).max(1);

    let root = SVGBackend::new(path, (1200, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Relative Performance (base 100)",
            ("sans-serif", 28).into_font().color(&BLACK),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0usize..last_index, y_min..y_max)?;

    let dates = &normalized.dates;
    let date_label = |i: &usize| {
        dates
            .get(*i)
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&date_label)
        .y_desc("Index")
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    for (idx, column) in normalized.columns.iter().enumerate() {
        let color = series_color(idx);
        let width = if column.kind == ColumnKind::Portfolio { 3 } else { 2 };
        let points: Vec<(usize, f64)> = column
            .values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
            .collect();

        chart
            .draw_series(LineSeries::new(points, color.stroke_width(width)))?
            .label(column.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Scatter of total return against annualized volatility, colored by Sharpe
pub fn risk_return_chart(stats: &[ColumnStats], path: &Path) -> Result<()> {
    let points: Vec<(&ColumnStats, f64)> = stats
        .iter()
        .filter_map(|s| s.volatility.map(|vol| (s, vol)))
        .collect();
    if points.is_empty() {
        anyhow::bail!("Nothing to plot: no column has a volatility");
    }

    let max_vol = points.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let (ret_min, ret_max) = points.iter().fold((0.0f64, 0.0f64), |(lo, hi), (s, _)| {
        (lo.min(s.cumulative_return), hi.max(s.cumulative_return))
    });
    let (y_min, y_max) = padded_range(ret_min, ret_max);
    let x_max = if max_vol > 0.0 { max_vol * 1.2 } else { 0.1 };

    let sharpes: Vec<f64> = points.iter().filter_map(|(s, _)| s.sharpe).collect();
    let sharpe_min = sharpes.iter().copied().fold(f64::INFINITY, f64::min);
    let sharpe_max = sharpes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let root = SVGBackend::new(path, (900, 700)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Risk / Return (color: Sharpe, blue = higher)",
            ("sans-serif", 24).into_font().color(&BLACK),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Volatility (annualized)")
        .y_desc("Total Return")
        .x_label_formatter(&|v| format!("{:.0}%", v * 100.0))
        .y_label_formatter(&|v| format!("{:.0}%", v * 100.0))
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, 0.0), (x_max, 0.0)],
        COLOR_SLATE.stroke_width(1),
    )))?;

    chart.draw_series(points.iter().map(|(s, vol)| {
        let color = sharpe_color(s.sharpe, sharpe_min, sharpe_max);
        EmptyElement::at((*vol, s.cumulative_return))
            + Circle::new((0, 0), 14, color.filled())
            + Text::new(
                s.name.clone(),
                (16, -7),
                ("sans-serif", 14).into_font().color(&BLACK),
            )
    }))?;

    root.present()?;
    Ok(())
}

/// Writes both charts for a dashboard into `output_dir`
pub fn generate_charts(data: &DashboardData, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let stem = format!(
        "dashboard_{}_to_{}",
        data.request.start.format("%Y-%m-%d"),
        data.request.end.format("%Y-%m-%d")
    );

    let performance = output_dir.join(format!("{}_performance.svg", stem));
    relative_performance_chart(&data.normalized, &performance)?;
    println!("✅ Relative performance chart saved to {}", performance.display());

    let risk_return = output_dir.join(format!("{}_risk_return.svg", stem));
    risk_return_chart(&data.stats, &risk_return)?;
    println!("✅ Risk/return chart saved to {}", risk_return.display());

    Ok(vec![performance, risk_return])
}

// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Metric cards for the dashboard
//!
//! One card per table column (assets, benchmark, portfolio) with return and
//! volatility, plus fundamentals and their classification for assets. Cards are
//! printed to the terminal and exported as CSV and a Markdown summary.

use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use std::fs::{self, File};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use crate::dashboard::DashboardData;
use crate::models::{Classification, ColumnKind, Metric};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    pub metric: Metric,
    pub value: String,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricCard {
    pub title: String,
    pub kind: ColumnKind,
    pub total_return: String,
    pub volatility: String,
    pub sharpe: String,
    pub current_price: String,
    pub target_price: String,
    pub price_target: Option<String>,
    pub fundamentals: Vec<MetricLine>,
}

impl MetricCard {
    pub fn line(&self, metric: Metric) -> Option<&MetricLine> {
        self.fundamentals.iter().find(|l| l.metric == metric)
    }
}

/// Formats a fraction as a percentage, e.g. `0.1234` as `12.34%`
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Formats a fundamental; percent-type metrics are already in percent units
pub fn format_metric(metric: Metric, value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && metric.is_percentage() => format!("{:.2}%", v),
        other => format_ratio(other),
    }
}

pub fn metric_cards(data: &DashboardData) -> Vec<MetricCard> {
    data.stats
        .iter()
        .map(|stats| {
            let asset = data.fundamentals.get(&stats.name);
            let value = |metric: Metric| asset.and_then(|a| a.snapshot.get(metric));

            let fundamentals = match asset {
                Some(asset) => Metric::RATIOS
                    .into_iter()
                    .map(|metric| MetricLine {
                        metric,
                        value: format_metric(metric, asset.snapshot.get(metric)),
                        classification: asset.classification(metric),
                    })
                    .collect(),
                None => Vec::new(),
            };

            MetricCard {
                title: stats.name.clone(),
                kind: stats.kind,
                total_return: format_percent(Some(stats.cumulative_return)),
                volatility: format_percent(stats.volatility),
                sharpe: format_ratio(stats.sharpe),
                current_price: format_ratio(value(Metric::CurrentPrice)),
                target_price: format_ratio(value(Metric::TargetMeanPrice)),
                price_target: asset.map(|a| a.price_target.label().to_string()),
                fundamentals,
            }
        })
        .collect()
}

pub fn print_cards(cards: &[MetricCard]) {
    println!(
        "{:<12} {:<10} {:>12} {:>12} {:>8}",
        "Ticker", "Kind", "Return", "Volatility", "Sharpe"
    );
    println!("{}", "-".repeat(58));
    for card in cards {
        println!(
            "{:<12} {:<10} {:>12} {:>12} {:>8}",
            card.title,
            card.kind.label(),
            card.total_return,
            card.volatility,
            card.sharpe
        );
    }

    for card in cards.iter().filter(|c| !c.fundamentals.is_empty()) {
        println!();
        println!(
            "{} | price {} | target {} | {}",
            card.title,
            card.current_price,
            card.target_price,
            card.price_target.as_deref().unwrap_or(NOT_AVAILABLE)
        );
        for line in &card.fundamentals {
            println!(
                "  {:<11} {:>10}  {}",
                line.metric.code(),
                line.value,
                line.classification.label()
            );
        }
    }
}

pub fn export_cards_csv(cards: &[MetricCard], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = Writer::from_writer(file);

    let mut headers = vec![
        "Ticker".to_string(),
        "Kind".to_string(),
        "Total Return".to_string(),
        "Volatility".to_string(),
        "Sharpe".to_string(),
        "Current Price".to_string(),
        "Target Price".to_string(),
        "Price Target".to_string(),
    ];
    for metric in Metric::RATIOS {
        headers.push(metric.code().to_string());
        headers.push(format!("{} Class", metric.code()));
    }
    writer.write_record(&headers)?;

    for card in cards {
        let mut row = vec![
            card.title.clone(),
            card.kind.label().to_string(),
            card.total_return.clone(),
            card.volatility.clone(),
            card.sharpe.clone(),
            card.current_price.clone(),
            card.target_price.clone(),
            card.price_target
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ];
        for metric in Metric::RATIOS {
            match card.line(metric) {
                Some(line) => {
                    row.push(line.value.clone());
                    row.push(line.classification.label().to_string());
                }
                None => {
                    row.push(NOT_AVAILABLE.to_string());
                    row.push(NOT_AVAILABLE.to_string());
                }
            }
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_summary_markdown(data: &DashboardData, cards: &[MetricCard], path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    writeln!(
        file,
        "# Dashboard: {} to {}",
        data.request.start, data.request.end
    )?;
    writeln!(file)?;
    writeln!(file, "## Overview")?;
    writeln!(file, "- **Assets**: {}", data.request.symbols.join(", "))?;
    writeln!(file, "- **Trading Days**: {}", data.prices.len())?;
    if let (Some(first), Some(last)) = (data.prices.dates.first(), data.prices.dates.last()) {
        writeln!(file, "- **Data Range**: {} to {}", first, last)?;
    }
    writeln!(file)?;

    writeln!(file, "## Performance")?;
    writeln!(file, "| Ticker | Kind | Total Return | Volatility | Sharpe |")?;
    writeln!(file, "|--------|------|--------------|------------|--------|")?;
    for card in cards {
        writeln!(
            file,
            "| {} | {} | {} | {} | {} |",
            card.title,
            card.kind.label(),
            card.total_return,
            card.volatility,
            card.sharpe
        )?;
    }
    writeln!(file)?;

    let asset_cards: Vec<_> = cards.iter().filter(|c| !c.fundamentals.is_empty()).collect();
    if !asset_cards.is_empty() {
        writeln!(file, "## Fundamentals")?;
        let mut header = String::from("| Ticker |");
        let mut divider = String::from("|--------|");
        for metric in Metric::RATIOS {
            header.push_str(&format!(" {} |", metric.code()));
            divider.push_str("------|");
        }
        header.push_str(" Price Target |");
        divider.push_str("------|");
        writeln!(file, "{}", header)?;
        writeln!(file, "{}", divider)?;

        for card in asset_cards {
            let mut row = format!("| {} |", card.title);
            for line in &card.fundamentals {
                row.push_str(&format!(" {} ({}) |", line.value, line.classification.label()));
            }
            row.push_str(&format!(
                " {} |",
                card.price_target.as_deref().unwrap_or(NOT_AVAILABLE)
            ));
            writeln!(file, "{}", row)?;
        }
        writeln!(file)?;
    }

    if !data.warnings.is_empty() {
        writeln!(file, "## Warnings")?;
        for warning in &data.warnings {
            writeln!(file, "- {}", warning)?;
        }
        writeln!(file)?;
    }

    writeln!(file, "---")?;
    writeln!(
        file,
        "*Generated on {}*",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;

    Ok(())
}

/// Writes the cards CSV and the Markdown summary into `output_dir`
pub fn export_reports(data: &DashboardData, cards: &[MetricCard], output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let stem = format!(
        "dashboard_{}_to_{}",
        data.request.start.format("%Y-%m-%d"),
        data.request.end.format("%Y-%m-%d")
    );

    let csv_path = output_dir.join(format!("{}_cards_{}.csv", stem, timestamp));
    export_cards_csv(cards, &csv_path)?;
    println!("Metric cards exported to {}", csv_path.display());

    let md_path = output_dir.join(format!("{}_summary_{}.md", stem, timestamp));
    export_summary_markdown(data, cards, &md_path)?;
    println!("Summary report exported to {}", md_path.display());

    Ok((csv_path, md_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(0.1234)), "12.34%");
        assert_eq!(format_percent(Some(-0.05)), "-5.00%");
        assert_eq!(format_percent(None), "N/A");
        assert_eq!(format_percent(Some(f64::NAN)), "N/A");
    }

    #[test]
    fn test_format_metric_units() {
        assert_eq!(format_metric(Metric::DivYield, Some(6.1)), "6.10%");
        assert_eq!(format_metric(Metric::Pe, Some(8.456)), "8.46");
        assert_eq!(format_metric(Metric::DivYield, None), "N/A");
    }
}

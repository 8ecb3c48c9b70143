// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use equity_dashboard::api::YahooClient;
use equity_dashboard::catalog::TickerCatalog;
use equity_dashboard::classification;
use equity_dashboard::config::Config;
use equity_dashboard::dashboard::{DashboardRequest, compute_dashboard_data};
use equity_dashboard::models::Metric;
use equity_dashboard::{report, visualizations};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config.toml file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the tickers available in the catalog
    ListTickers,
    /// Fetch prices and fundamentals, then write charts and metric cards
    Dashboard {
        /// Tickers to compare (comma-separated catalog symbols)
        #[arg(long, value_delimiter = ',', required = true)]
        tickers: Vec<String>,
        /// Start date (YYYY-MM-DD format), defaults to the configured start
        #[arg(long)]
        from: Option<String>,
        /// End date, exclusive (YYYY-MM-DD format), defaults to today
        #[arg(long)]
        to: Option<String>,
        /// Skip the benchmark index
        #[arg(long)]
        no_benchmark: bool,
        /// Output directory, defaults to the configured one
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Classify a single fundamental value
    Classify {
        /// Metric code: PE, PEG, EV_EBITDA, PB, DIV_YIELD, ROE, NET_MARGIN
        #[arg(long)]
        metric: String,
        /// Value in the metric's units (percent for DIV_YIELD, ROE, NET_MARGIN)
        #[arg(long)]
        value: Option<f64>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").context("Invalid date format. Use YYYY-MM-DD")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Commands::ListTickers => {
            let catalog = TickerCatalog::load(&config.catalog_path)?;
            println!("Available tickers ({}):", catalog.len());
            for entry in catalog.entries() {
                match &entry.label {
                    Some(label) => println!("  {:<10} {}", entry.symbol, label),
                    None => println!("  {}", entry.symbol),
                }
            }
        }
        Commands::Dashboard {
            tickers,
            from,
            to,
            no_benchmark,
            output,
        } => {
            let start = match from {
                Some(s) => parse_date(&s)?,
                None => config.default_start,
            };
            let end = match to {
                Some(s) => parse_date(&s)?,
                None => Local::now().date_naive(),
            };

            let catalog = TickerCatalog::load(&config.catalog_path)?;
            let (symbols, unknown) = catalog.partition(&tickers);
            if !unknown.is_empty() {
                anyhow::bail!(
                    "Unknown tickers (not in {}): {}",
                    config.catalog_path.display(),
                    unknown.join(", ")
                );
            }

            let client = YahooClient::new(&config)?;
            let request = DashboardRequest::new(symbols, start, end);
            let benchmark = (!no_benchmark).then_some(config.benchmark_label.as_str());

            println!(
                "Building dashboard for {} from {} to {}",
                request.symbols.join(", "),
                start,
                end
            );
            let data = compute_dashboard_data(&client, &request, benchmark)
                .await
                .context("Failed to compute dashboard data")?;

            let cards = report::metric_cards(&data);
            report::print_cards(&cards);
            if !data.warnings.is_empty() {
                println!();
                for warning in &data.warnings {
                    println!("⚠️  {}", warning);
                }
            }
            println!();

            let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
            visualizations::generate_charts(&data, &output_dir)?;
            report::export_reports(&data, &cards, &output_dir)?;
        }
        Commands::Classify { metric, value } => {
            let Some(parsed) = Metric::from_code(&metric) else {
                anyhow::bail!("Unknown metric '{}'", metric);
            };
            let class = classification::classify(parsed, value);
            println!(
                "{} = {} -> {}",
                parsed.code(),
                report::format_metric(parsed, value),
                class.label()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2023-01-02").unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
        );
        assert!(parse_date("02/01/2023").is_err());
    }

    #[test]
    fn test_cli_parses_dashboard_command() {
        let cli = Cli::parse_from([
            "equity-dashboard",
            "dashboard",
            "--tickers",
            "PETR4,VALE3",
            "--from",
            "2024-01-02",
            "--no-benchmark",
        ]);
        match cli.command {
            Commands::Dashboard {
                tickers,
                from,
                no_benchmark,
                ..
            } => {
                assert_eq!(tickers, vec!["PETR4".to_string(), "VALE3".to_string()]);
                assert_eq!(from.as_deref(), Some("2024-01-02"));
                assert!(no_benchmark);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }
}

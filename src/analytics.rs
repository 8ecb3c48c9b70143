// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Descriptive statistics over a [`PriceTable`]
//!
//! This module provides:
//! - Equal-weight synthetic portfolio column
//! - Normalized (base 100) series
//! - Daily returns
//! - Annualized volatility (sample standard deviation, 252 trading days)
//! - Cumulative return and a Sharpe-like ratio for chart coloring

use serde::Serialize;

use crate::error::{DashboardError, DataError};
use crate::models::{Column, ColumnKind, PriceTable};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const PORTFOLIO_COLUMN: &str = "portfolio";

/// Summary statistics for one column of the table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub kind: ColumnKind,
    pub cumulative_return: f64,
    pub volatility: Option<f64>,
    pub sharpe: Option<f64>,
}

/// Result of one analytics pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub normalized: PriceTable,
    pub returns: PriceTable,
    pub stats: Vec<ColumnStats>,
}

/// Row-wise dot product of the asset prices with a `1/N` weight vector.
///
/// Benchmark and portfolio columns are not weighted. A row where any asset
/// has no price yields no portfolio value.
pub fn equal_weight_portfolio(table: &PriceTable) -> Result<Column, DataError> {
    let assets: Vec<&Column> = table.asset_columns().collect();
    if assets.is_empty() {
        return Err(DataError::NoAssetColumns);
    }

    let weight = 1.0 / assets.len() as f64;
    let values = (0..table.len())
        .map(|row| {
            assets
                .iter()
                .try_fold(0.0, |acc, column| column.values[row].map(|p| acc + p * weight))
        })
        .collect();

    Ok(Column::new(PORTFOLIO_COLUMN, ColumnKind::Portfolio, values))
}

/// Returns the table with a fresh `portfolio` column appended.
pub fn with_portfolio(mut table: PriceTable) -> Result<PriceTable, DataError> {
    table.remove_column(PORTFOLIO_COLUMN);
    let portfolio = equal_weight_portfolio(&table)?;
    table.push_column(portfolio);
    Ok(table)
}

/// Rebases every column to 100 at the first row.
pub fn normalize(table: &PriceTable) -> Result<PriceTable, DataError> {
    let mut columns = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        let base = match column.first() {
            Some(b) if b != 0.0 => b,
            _ => return Err(DataError::UndefinedBaseline(column.name.clone())),
        };
        // p / base first so the first row is exactly 100
        let values = column
            .values
            .iter()
            .map(|v| v.map(|p| 100.0 * (p / base)))
            .collect();
        columns.push(Column::new(column.name.clone(), column.kind, values));
    }

    Ok(PriceTable {
        dates: table.dates.clone(),
        columns,
    })
}

/// Simple daily returns; the first row has no return and is dropped.
pub fn daily_returns(table: &PriceTable) -> PriceTable {
    let dates = table.dates.iter().skip(1).copied().collect();
    let columns = table
        .columns
        .iter()
        .map(|column| {
            let values = column
                .values
                .windows(2)
                .map(|w| match (w[0], w[1]) {
                    (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
                    _ => None,
                })
                .collect();
            Column::new(column.name.clone(), column.kind, values)
        })
        .collect();

    PriceTable { dates, columns }
}

/// Sample standard deviation of the defined returns, scaled by sqrt(252).
pub fn annualized_volatility(returns: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = returns.iter().filter_map(|r| *r).collect();
    if defined.len() < 2 {
        return None;
    }

    let n = defined.len() as f64;
    let mean = defined.iter().sum::<f64>() / n;
    let variance = defined.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Total return over the window, from a normalized column.
pub fn cumulative_return(normalized: &Column) -> Option<f64> {
    normalized.last_defined().map(|last| (last - 100.0) / 100.0)
}

/// `cumulative / volatility`, or `None` when volatility is zero or unknown.
pub fn sharpe_ratio(cumulative: f64, volatility: Option<f64>) -> Option<f64> {
    match volatility {
        Some(vol) if vol.is_finite() && vol != 0.0 => Some(cumulative / vol),
        _ => None,
    }
}

fn ensure_sufficient(table: &PriceTable) -> Result<(), DashboardError> {
    for column in &table.columns {
        let observations = column.defined_count();
        if observations < 2 {
            return Err(DashboardError::InsufficientData {
                column: column.name.clone(),
                observations,
            });
        }
    }
    if table.len() < 2 {
        return Err(DashboardError::InsufficientData {
            column: "table".to_string(),
            observations: table.len(),
        });
    }
    Ok(())
}

/// Runs the full pass over a table that already carries its portfolio column.
pub fn compute_statistics(table: &PriceTable) -> Result<Analytics, DashboardError> {
    ensure_sufficient(table)?;

    let normalized = normalize(table)?;
    let returns = daily_returns(table);

    let stats = normalized
        .columns
        .iter()
        .zip(returns.columns.iter())
        .map(|(norm, ret)| {
            let cumulative = cumulative_return(norm).unwrap_or(0.0);
            let volatility = annualized_volatility(&ret.values);
            ColumnStats {
                name: norm.name.clone(),
                kind: norm.kind,
                cumulative_return: cumulative,
                volatility,
                sharpe: sharpe_ratio(cumulative, volatility),
            }
        })
        .collect();

    Ok(Analytics {
        normalized,
        returns,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceSeries;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn table(columns: &[(&str, &[f64])]) -> PriceTable {
        PriceTable::outer_join(
            columns
                .iter()
                .map(|(name, prices)| {
                    let series = PriceSeries::from_points(
                        prices.iter().enumerate().map(|(i, p)| (day(i as u32 + 1), *p)),
                    );
                    (name.to_string(), series)
                })
                .collect(),
        )
    }

    #[test]
    fn test_portfolio_is_row_mean() {
        let t = with_portfolio(table(&[("AAA", &[10.0, 11.0, 12.0]), ("BBB", &[20.0, 18.0, 22.0])]))
            .unwrap();
        let portfolio = t.column(PORTFOLIO_COLUMN).unwrap();
        assert_eq!(portfolio.kind, ColumnKind::Portfolio);
        assert_relative_eq!(portfolio.values[0].unwrap(), 15.0, epsilon = 1e-12);
        assert_relative_eq!(portfolio.values[1].unwrap(), 14.5, epsilon = 1e-12);
        assert_relative_eq!(portfolio.values[2].unwrap(), 17.0, epsilon = 1e-12);
    }

    #[test]
    fn test_portfolio_excludes_benchmark() {
        let mut t = table(&[("AAA", &[10.0, 20.0])]);
        let bench = PriceSeries::from_points(vec![(day(1), 1000.0), (day(2), 1000.0)]);
        t.left_join("IBOV", ColumnKind::Benchmark, &bench);

        let portfolio = equal_weight_portfolio(&t).unwrap();
        assert_eq!(portfolio.values, vec![Some(10.0), Some(20.0)]);
    }

    #[test]
    fn test_portfolio_requires_an_asset() {
        let mut t = PriceTable {
            dates: vec![day(1)],
            columns: vec![],
        };
        t.left_join(
            "IBOV",
            ColumnKind::Benchmark,
            &PriceSeries::from_points(vec![(day(1), 1.0)]),
        );
        assert!(matches!(
            equal_weight_portfolio(&t),
            Err(DataError::NoAssetColumns)
        ));
    }

    #[test]
    fn test_portfolio_row_with_gap_is_empty() {
        let a = PriceSeries::from_points(vec![(day(1), 10.0), (day(2), 11.0)]);
        let b = PriceSeries::from_points(vec![(day(2), 20.0)]);
        let t = PriceTable::outer_join(vec![("A".to_string(), a), ("B".to_string(), b)]);
        let portfolio = equal_weight_portfolio(&t).unwrap();
        assert_eq!(portfolio.values[0], None);
        assert_relative_eq!(portfolio.values[1].unwrap(), 15.5);
    }

    #[test]
    fn test_with_portfolio_replaces_existing_column() {
        let t = with_portfolio(table(&[("AAA", &[10.0, 12.0])])).unwrap();
        let t = with_portfolio(t).unwrap();
        assert_eq!(t.columns.len(), 2);
    }

    #[test]
    fn test_normalize_scenario() {
        let t = table(&[("AAA", &[10.0, 11.0, 12.0])]);
        let n = normalize(&t).unwrap();
        let values: Vec<f64> = n.columns[0].values.iter().map(|v| v.unwrap()).collect();
        assert_eq!(values[0], 100.0);
        assert_relative_eq!(values[1], 110.0, epsilon = 1e-9);
        assert_relative_eq!(values[2], 120.0, epsilon = 1e-9);
    }

    #[test]
    fn test_normalize_rejects_zero_baseline() {
        let t = table(&[("AAA", &[0.0, 11.0])]);
        match normalize(&t) {
            Err(DataError::UndefinedBaseline(name)) => assert_eq!(name, "AAA"),
            other => panic!("expected UndefinedBaseline, got {:?}", other),
        }
    }

    #[test]
    fn test_daily_returns_drop_first_row() {
        let t = table(&[("AAA", &[10.0, 11.0, 12.0])]);
        let r = daily_returns(&t);
        assert_eq!(r.dates, vec![day(2), day(3)]);
        assert_relative_eq!(r.columns[0].values[0].unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(r.columns[0].values[1].unwrap(), 1.0 / 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_annualized_volatility_uses_sample_std() {
        let r1: f64 = 0.10;
        let r2: f64 = 12.0 / 11.0 - 1.0;
        let mean = (r1 + r2) / 2.0;
        let expected = ((r1 - mean).powi(2) + (r2 - mean).powi(2)).sqrt() * 252f64.sqrt();

        let vol = annualized_volatility(&[Some(r1), Some(r2)]).unwrap();
        assert_relative_eq!(vol, expected, epsilon = 1e-12);
        assert_relative_eq!(vol, 0.10204, epsilon = 1e-4);
    }

    #[test]
    fn test_annualized_volatility_needs_two_returns() {
        assert_eq!(annualized_volatility(&[Some(0.1)]), None);
        assert_eq!(annualized_volatility(&[None, Some(0.1), None]), None);
    }

    #[test]
    fn test_sharpe_is_none_for_zero_volatility() {
        assert_eq!(sharpe_ratio(0.2, Some(0.0)), None);
        assert_eq!(sharpe_ratio(0.2, None), None);
        assert_relative_eq!(sharpe_ratio(0.2, Some(0.4)).unwrap(), 0.5);
    }

    #[test]
    fn test_flat_series_has_na_sharpe() {
        let t = with_portfolio(table(&[("AAA", &[10.0, 10.0, 10.0])])).unwrap();
        let analytics = compute_statistics(&t).unwrap();
        let stats = &analytics.stats[0];
        assert_eq!(stats.volatility, Some(0.0));
        assert_eq!(stats.sharpe, None);
        assert_eq!(stats.cumulative_return, 0.0);
    }

    #[test]
    fn test_compute_statistics_single_asset() {
        let t = with_portfolio(table(&[("AAA", &[10.0, 11.0, 12.0])])).unwrap();
        let analytics = compute_statistics(&t).unwrap();

        assert_eq!(analytics.stats.len(), 2);
        assert_eq!(analytics.stats[0].name, "AAA");
        assert_eq!(analytics.stats[1].name, PORTFOLIO_COLUMN);
        assert_relative_eq!(analytics.stats[0].cumulative_return, 0.2, epsilon = 1e-12);
        assert_relative_eq!(
            analytics.stats[0].cumulative_return,
            analytics.stats[1].cumulative_return,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_single_observation_is_insufficient() {
        let t = with_portfolio(table(&[("AAA", &[10.0])])).unwrap();
        match compute_statistics(&t) {
            Err(DashboardError::InsufficientData {
                column,
                observations,
            }) => {
                assert_eq!(column, "AAA");
                assert_eq!(observations, 1);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn test_sparse_column_is_insufficient() {
        let a = PriceSeries::from_points(vec![(day(1), 10.0), (day(2), 11.0), (day(3), 12.0)]);
        let b = PriceSeries::from_points(vec![(day(3), 20.0)]);
        let t = PriceTable::outer_join(vec![("A".to_string(), a), ("B".to_string(), b)]);
        let err = compute_statistics(&t).unwrap_err();
        assert!(matches!(err, DashboardError::InsufficientData { ref column, .. } if column == "B"));
    }
}

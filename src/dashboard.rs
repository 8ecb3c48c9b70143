// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! One dashboard query: fetch, compute, classify.
//!
//! [`compute_dashboard_data`] is the only entry point the presentation layer
//! needs. It holds no state between calls; everything it produces lives in the
//! returned [`DashboardData`].

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::analytics::{self, ColumnStats};
use crate::api::MarketDataProvider;
use crate::classification::{classify_snapshot, snapshot_price_target};
use crate::error::{DashboardError, DataError, LookupWarning};
use crate::models::{
    Classification, ColumnKind, FundamentalSnapshot, Metric, PriceTable, PriceTargetSignal,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardRequest {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    /// Exclusive
    pub end: NaiveDate,
}

impl DashboardRequest {
    /// Repeated symbols are dropped, keeping the first occurrence.
    pub fn new(symbols: Vec<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbols: unique_symbols(&symbols),
            start,
            end,
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.symbols.is_empty() {
            return Err(DataError::NoAssetColumns);
        }
        if self.start >= self.end {
            return Err(DataError::EmptyDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Symbols in first-seen order, each at most once.
pub fn unique_symbols(symbols: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    symbols
        .iter()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetFundamentals {
    pub snapshot: FundamentalSnapshot,
    pub classifications: BTreeMap<Metric, Classification>,
    pub price_target: PriceTargetSignal,
}

impl AssetFundamentals {
    pub fn from_snapshot(snapshot: FundamentalSnapshot) -> Self {
        Self {
            classifications: classify_snapshot(&snapshot),
            price_target: snapshot_price_target(&snapshot),
            snapshot,
        }
    }

    pub fn classification(&self, metric: Metric) -> Classification {
        self.classifications
            .get(&metric)
            .copied()
            .unwrap_or(Classification::Unknown)
    }
}

/// Everything the presentation layer renders for one query
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardData {
    pub request: DashboardRequest,
    /// Raw prices including benchmark (when available) and portfolio columns
    pub prices: PriceTable,
    pub normalized: PriceTable,
    pub returns: PriceTable,
    pub stats: Vec<ColumnStats>,
    pub fundamentals: BTreeMap<String, AssetFundamentals>,
    pub warnings: Vec<LookupWarning>,
}

impl DashboardData {
    pub fn stats_for(&self, column: &str) -> Option<&ColumnStats> {
        self.stats.iter().find(|s| s.name == column)
    }
}

/// Runs one query against `provider`.
///
/// `benchmark_label` names the benchmark column; `None` skips the benchmark.
pub async fn compute_dashboard_data<P>(
    provider: &P,
    request: &DashboardRequest,
    benchmark_label: Option<&str>,
) -> Result<DashboardData, DashboardError>
where
    P: MarketDataProvider + ?Sized,
{
    request.validate()?;
    // literal requests skip the dedup in `new`
    let symbols = unique_symbols(&request.symbols);

    let mut prices = provider
        .fetch_prices(&symbols, request.start, request.end)
        .await?;
    if prices.asset_columns().next().is_none() {
        return Err(DataError::NoAssetColumns.into());
    }

    let mut warnings = Vec::new();

    if let Some(label) = benchmark_label {
        match provider.fetch_benchmark(request.start, request.end).await {
            Some(series) => {
                prices.left_join(label, ColumnKind::Benchmark, &series);
                let usable = prices.column(label).is_some_and(|c| {
                    c.first().is_some_and(|v| v != 0.0) && c.defined_count() >= 2
                });
                if !usable {
                    prices.remove_column(label);
                    warnings.push(LookupWarning::BenchmarkMisaligned {
                        symbol: label.to_string(),
                    });
                }
            }
            None => warnings.push(LookupWarning::BenchmarkUnavailable {
                symbol: label.to_string(),
            }),
        }
    }

    let prices = analytics::with_portfolio(prices)?;
    let computed = analytics::compute_statistics(&prices)?;

    let mut fundamentals = BTreeMap::new();
    for symbol in &symbols {
        let snapshot = provider.fetch_fundamentals(symbol).await;
        for metric in snapshot.missing() {
            warnings.push(LookupWarning::FundamentalUnavailable {
                symbol: snapshot.symbol.clone(),
                metric,
            });
        }
        fundamentals.insert(
            snapshot.symbol.clone(),
            AssetFundamentals::from_snapshot(snapshot),
        );
    }

    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        columns = prices.columns.len(),
        rows = prices.len(),
        warnings = warnings.len(),
        "dashboard computed"
    );

    Ok(DashboardData {
        request: DashboardRequest {
            symbols,
            ..request.clone()
        },
        prices,
        normalized: computed.normalized,
        returns: computed.returns,
        stats: computed.stats,
        fundamentals,
        warnings,
    })
}

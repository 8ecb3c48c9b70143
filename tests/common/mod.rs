// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Common test utilities and helpers
//!
//! An in-memory [`MarketDataProvider`] plus builders for series and snapshots,
//! so dashboard flows can be exercised without network access.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use equity_dashboard::api::MarketDataProvider;
use equity_dashboard::error::{DashboardError, DataError};
use equity_dashboard::models::{FundamentalSnapshot, Metric, PriceSeries, PriceTable};

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// Consecutive January 2024 dates starting on the 2nd
pub fn series(prices: &[f64]) -> PriceSeries {
    PriceSeries::from_points(
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| (date(2 + i as u32), *p)),
    )
}

/// Snapshot with every ratio populated with a neutral value
pub fn full_snapshot(symbol: &str) -> FundamentalSnapshot {
    let mut snapshot = FundamentalSnapshot::empty(symbol);
    snapshot.set(Metric::Pe, Some(15.0));
    snapshot.set(Metric::Peg, Some(1.5));
    snapshot.set(Metric::EvEbitda, Some(8.0));
    snapshot.set(Metric::Pb, Some(2.0));
    snapshot.set(Metric::NetMargin, Some(10.0));
    snapshot.set(Metric::DivYield, Some(3.0));
    snapshot.set(Metric::Roe, Some(15.0));
    snapshot.set(Metric::CurrentPrice, Some(10.0));
    snapshot.set(Metric::TargetMeanPrice, Some(12.0));
    snapshot
}

#[derive(Debug, Default)]
pub struct MockProvider {
    pub prices: HashMap<String, PriceSeries>,
    pub fundamentals: HashMap<String, FundamentalSnapshot>,
    pub benchmark: Option<PriceSeries>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices(mut self, symbol: &str, prices: &[f64]) -> Self {
        self.prices.insert(symbol.to_string(), series(prices));
        self
    }

    pub fn with_fundamentals(mut self, snapshot: FundamentalSnapshot) -> Self {
        self.fundamentals.insert(snapshot.symbol.clone(), snapshot);
        self
    }

    pub fn with_benchmark(mut self, benchmark: PriceSeries) -> Self {
        self.benchmark = Some(benchmark);
        self
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn fetch_prices(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, DashboardError> {
        let mut selected = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let window = self
                .prices
                .get(symbol)
                .map(|series| {
                    PriceSeries::from_points(
                        series
                            .iter()
                            .filter(|(d, _)| **d >= start && **d < end)
                            .map(|(d, p)| (*d, *p)),
                    )
                })
                .unwrap_or_default();
            // same contract as the http client: no observations is a data error
            if window.is_empty() {
                return Err(DataError::EmptySeries(symbol.clone()).into());
            }
            selected.push((symbol.clone(), window));
        }
        Ok(PriceTable::outer_join(selected))
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> FundamentalSnapshot {
        self.fundamentals
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| FundamentalSnapshot::empty(symbol))
    }

    async fn fetch_benchmark(&self, _start: NaiveDate, _end: NaiveDate) -> Option<PriceSeries> {
        self.benchmark.clone()
    }
}

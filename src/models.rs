// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Daily prices for one symbol, ordered by trading date.
///
/// Backed by an ordered map, so dates are strictly increasing and a repeated
/// date keeps the last price seen. Days without a price are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series, skipping non-finite prices.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut series = Self::new();
        for (date, price) in points {
            series.insert(date, price);
        }
        series
    }

    pub fn insert(&mut self, date: NaiveDate, price: f64) {
        if price.is_finite() {
            self.points.insert(date, price);
        }
    }

    /// Drops every entry dated after `last`.
    pub fn truncate_after(&mut self, last: NaiveDate) {
        self.points.retain(|date, _| *date <= last);
    }

    pub fn get(&self, date: &NaiveDate) -> Option<f64> {
        self.points.get(date).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.points.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &f64)> {
        self.points.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Asset,
    Benchmark,
    Portfolio,
}

impl ColumnKind {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Asset => "asset",
            ColumnKind::Benchmark => "benchmark",
            ColumnKind::Portfolio => "portfolio",
        }
    }
}

/// One column of a [`PriceTable`]; `values[i]` belongs to `dates[i]` of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied().flatten()
    }

    pub fn last_defined(&self) -> Option<f64> {
        self.values.iter().rev().find_map(|v| *v)
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Price columns aligned on a shared, ascending list of dates.
///
/// Every column holds exactly `dates.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<Column>,
}

impl PriceTable {
    /// Outer-joins the given series on their dates. All columns are assets.
    pub fn outer_join(series: Vec<(String, PriceSeries)>) -> Self {
        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, s)| s.dates().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let columns = series
            .into_iter()
            .map(|(name, s)| {
                let values = dates.iter().map(|d| s.get(d)).collect();
                Column::new(name, ColumnKind::Asset, values)
            })
            .collect();

        Self { dates, columns }
    }

    /// Aligns `series` onto the existing dates and appends it as a column.
    /// Dates the table does not have are ignored.
    pub fn left_join(&mut self, name: impl Into<String>, kind: ColumnKind, series: &PriceSeries) {
        let values = self.dates.iter().map(|d| series.get(d)).collect();
        self.columns.push(Column::new(name, kind, values));
    }

    pub fn push_column(&mut self, column: Column) {
        debug_assert_eq!(column.values.len(), self.dates.len());
        self.columns.push(column);
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn asset_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.kind == ColumnKind::Asset)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Fundamental metrics read from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Metric {
    Pe,
    Peg,
    EvEbitda,
    Pb,
    NetMargin,
    DivYield,
    Roe,
    CurrentPrice,
    TargetMeanPrice,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Pe,
        Metric::Peg,
        Metric::EvEbitda,
        Metric::Pb,
        Metric::NetMargin,
        Metric::DivYield,
        Metric::Roe,
        Metric::CurrentPrice,
        Metric::TargetMeanPrice,
    ];

    /// Metrics that have a classification rule.
    pub const RATIOS: [Metric; 7] = [
        Metric::Pe,
        Metric::Peg,
        Metric::EvEbitda,
        Metric::Pb,
        Metric::DivYield,
        Metric::Roe,
        Metric::NetMargin,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Metric::Pe => "PE",
            Metric::Peg => "PEG",
            Metric::EvEbitda => "EV_EBITDA",
            Metric::Pb => "PB",
            Metric::NetMargin => "NET_MARGIN",
            Metric::DivYield => "DIV_YIELD",
            Metric::Roe => "ROE",
            Metric::CurrentPrice => "CURRENT_PRICE",
            Metric::TargetMeanPrice => "TARGET_MEAN_PRICE",
        }
    }

    /// Case-insensitive lookup by code; `-` is accepted in place of `_`.
    pub fn from_code(code: &str) -> Option<Metric> {
        let normalized = code.trim().to_uppercase().replace('-', "_");
        Metric::ALL.into_iter().find(|m| m.code() == normalized)
    }

    /// Percent-type metrics; stored in percent units, not fractions.
    pub fn is_percentage(&self) -> bool {
        matches!(self, Metric::NetMargin | Metric::DivYield | Metric::Roe)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Per-symbol fundamentals. Every metric is present as a key; unavailable
/// values are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalSnapshot {
    pub symbol: String,
    pub values: BTreeMap<Metric, Option<f64>>,
}

impl FundamentalSnapshot {
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            values: Metric::ALL.into_iter().map(|m| (m, None)).collect(),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied().flatten()
    }

    /// Stores a value; non-finite values are recorded as unavailable.
    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        self.values.insert(metric, value.filter(|v| v.is_finite()));
    }

    pub fn missing(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|m| self.get(*m).is_none())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    Good,
    Stable,
    Review,
    Unknown,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Good => "good",
            Classification::Stable => "stable",
            Classification::Review => "review",
            Classification::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceTargetSignal {
    PotentialUpside,
    AboveTarget,
    NoData,
}

impl PriceTargetSignal {
    pub fn label(&self) -> &'static str {
        match self {
            PriceTargetSignal::PotentialUpside => "potential-upside",
            PriceTargetSignal::AboveTarget => "above-target",
            PriceTargetSignal::NoData => "no-data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_series_keeps_dates_ordered_and_drops_nan() {
        let series =
            PriceSeries::from_points(vec![(day(3), 12.0), (day(1), 10.0), (day(2), f64::NAN)]);
        let dates: Vec<_> = series.dates().copied().collect();
        assert_eq!(dates, vec![day(1), day(3)]);
    }

    #[test]
    fn test_series_truncate_after() {
        let mut series = PriceSeries::from_points(vec![(day(1), 1.0), (day(5), 2.0)]);
        series.truncate_after(day(4));
        assert_eq!(series.len(), 1);
        assert_eq!(series.get(&day(5)), None);
    }

    #[test]
    fn test_outer_join_leaves_unmatched_cells_empty() {
        let a = PriceSeries::from_points(vec![(day(1), 10.0), (day(2), 11.0)]);
        let b = PriceSeries::from_points(vec![(day(2), 20.0), (day(3), 21.0)]);
        let table = PriceTable::outer_join(vec![("A".to_string(), a), ("B".to_string(), b)]);

        assert_eq!(table.dates, vec![day(1), day(2), day(3)]);
        assert_eq!(table.column("A").unwrap().values, vec![Some(10.0), Some(11.0), None]);
        assert_eq!(table.column("B").unwrap().values, vec![None, Some(20.0), Some(21.0)]);
    }

    #[test]
    fn test_left_join_ignores_extra_dates() {
        let a = PriceSeries::from_points(vec![(day(1), 10.0), (day(2), 11.0)]);
        let mut table = PriceTable::outer_join(vec![("A".to_string(), a)]);
        let bench = PriceSeries::from_points(vec![(day(2), 100.0), (day(9), 101.0)]);
        table.left_join("IBOV", ColumnKind::Benchmark, &bench);

        let column = table.column("IBOV").unwrap();
        assert_eq!(column.kind, ColumnKind::Benchmark);
        assert_eq!(column.values, vec![None, Some(100.0)]);
        assert_eq!(table.asset_columns().count(), 1);
    }

    #[test]
    fn test_metric_codes_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_code(metric.code()), Some(metric));
        }
        assert_eq!(Metric::from_code("ev-ebitda"), Some(Metric::EvEbitda));
        assert_eq!(Metric::from_code("BETA"), None);
    }

    #[test]
    fn test_snapshot_defaults_to_none_not_zero() {
        let mut snapshot = FundamentalSnapshot::empty("AAA");
        assert_eq!(snapshot.missing().len(), Metric::ALL.len());

        snapshot.set(Metric::Pe, Some(12.0));
        snapshot.set(Metric::Pb, Some(f64::INFINITY));
        assert_eq!(snapshot.get(Metric::Pe), Some(12.0));
        assert_eq!(snapshot.get(Metric::Pb), None);
        assert_eq!(snapshot.get(Metric::DivYield), None);
    }
}

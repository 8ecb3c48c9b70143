// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Error taxonomy for the dashboard core.
//!
//! Structural problems with price data abort a query and come back as
//! [`DashboardError`]. Missing optional data (benchmark, single fundamental
//! fields) never aborts anything; it is recorded as a [`LookupWarning`].

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::Metric;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("no valid price field for {symbol} (tried {tried:?})")]
    NoValidPriceField {
        symbol: String,
        tried: &'static [&'static str],
    },

    #[error("no price observations for {0}")]
    EmptySeries(String),

    #[error("no asset columns to build a portfolio from")]
    NoAssetColumns,

    #[error("undefined baseline for {0}: first price is missing or zero")]
    UndefinedBaseline(String),

    #[error("empty date range: {start} to {end}")]
    EmptyDateRange { start: NaiveDate, end: NaiveDate },

    #[error("malformed response for {symbol}: {detail}")]
    MalformedResponse { symbol: String, detail: String },
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("insufficient data for {column}: {observations} observation(s), need at least 2")]
    InsufficientData { column: String, observations: usize },

    #[error("request for {symbol} failed")]
    Request {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider returned HTTP {status} for {symbol}")]
    Status { symbol: String, status: u16 },
}

impl DashboardError {
    /// True for failures caused by the shape of the data rather than the transport.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            DashboardError::Data(_) | DashboardError::InsufficientData { .. }
        )
    }
}

/// Non-fatal lookup problems, surfaced to the presentation layer as "N/A".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupWarning {
    #[error("benchmark {symbol} unavailable for the requested range")]
    BenchmarkUnavailable { symbol: String },

    #[error("benchmark {symbol} has no usable price on the first trading day; column omitted")]
    BenchmarkMisaligned { symbol: String },

    #[error("{} unavailable for {symbol}", .metric.code())]
    FundamentalUnavailable { symbol: String, metric: Metric },
}

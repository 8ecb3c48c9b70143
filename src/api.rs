// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use reqwest::{Client, RequestBuilder, header};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::error::{DashboardError, DataError};
use crate::models::{FundamentalSnapshot, Metric, PriceSeries, PriceTable};

/// Accepted price fields, most preferred first.
pub const PRICE_FIELDS: &[&str] = &["adjclose", "close"];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const SUMMARY_MODULES: &str = "summaryDetail,defaultKeyStatistics,financialData";

/// Where each fundamental lives in a quoteSummary response: (metric, module, field)
const FUNDAMENTAL_FIELDS: [(Metric, &str, &str); 9] = [
    (Metric::Pe, "summaryDetail", "trailingPE"),
    (Metric::Peg, "defaultKeyStatistics", "pegRatio"),
    (Metric::EvEbitda, "defaultKeyStatistics", "enterpriseToEbitda"),
    (Metric::Pb, "defaultKeyStatistics", "priceToBook"),
    (Metric::NetMargin, "financialData", "profitMargins"),
    (Metric::DivYield, "summaryDetail", "dividendYield"),
    (Metric::Roe, "financialData", "returnOnEquity"),
    (Metric::CurrentPrice, "financialData", "currentPrice"),
    (Metric::TargetMeanPrice, "financialData", "targetMeanPrice"),
];

/// Source of prices and fundamentals for one dashboard query.
///
/// Symbols are catalog symbols; implementations add any market suffix
/// themselves. Every call is a single attempt.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_prices(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, DashboardError>;

    /// Best effort: unavailable fields are `None`, failures never propagate.
    async fn fetch_fundamentals(&self, symbol: &str) -> FundamentalSnapshot;

    /// `None` when the benchmark could not be retrieved.
    async fn fetch_benchmark(&self, start: NaiveDate, end: NaiveDate) -> Option<PriceSeries>;
}

/// Cookie and crumb pair the quoteSummary endpoint requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YahooSession {
    pub cookie: String,
    pub crumb: String,
}

pub struct YahooClient {
    client: Client,
    base_url: String,
    session_url: String,
    market_suffix: String,
    benchmark_symbol: String,
    /// Opened on the first fundamentals lookup; `None` when the handshake failed
    session: OnceCell<Option<YahooSession>>,
}

impl YahooClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build market data http client")?;

        Ok(Self {
            client,
            base_url: config.provider_base_url.trim_end_matches('/').to_string(),
            session_url: config.session_url.clone(),
            market_suffix: config.market_suffix.clone(),
            benchmark_symbol: config.benchmark_symbol.clone(),
            session: OnceCell::new(),
        })
    }

    fn provider_symbol(&self, symbol: &str) -> String {
        provider_symbol(symbol, &self.market_suffix)
    }

    async fn get_text(&self, symbol: &str, url: &str) -> Result<String, DashboardError> {
        tracing::debug!(symbol, url, "requesting");
        self.send_text(symbol, self.client.get(url)).await
    }

    async fn send_text(
        &self,
        symbol: &str,
        request: RequestBuilder,
    ) -> Result<String, DashboardError> {
        let response = request
            .send()
            .await
            .map_err(|source| DashboardError::Request {
                symbol: symbol.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| DashboardError::Request {
                symbol: symbol.to_string(),
                source,
            })
    }

    /// Cookie from the session URL, then a crumb from `/v1/test/getcrumb`.
    async fn open_session(&self) -> Result<YahooSession, DashboardError> {
        // The session URL answers 404 but still sets the cookie
        let response = self
            .client
            .get(&self.session_url)
            .send()
            .await
            .map_err(|source| DashboardError::Request {
                symbol: self.session_url.clone(),
                source,
            })?;

        let cookie = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_cookie)
            .ok_or_else(|| DataError::MalformedResponse {
                symbol: self.session_url.clone(),
                detail: "no session cookie".to_string(),
            })?
            .to_string();

        let crumb_url = format!("{}/v1/test/getcrumb", self.base_url);
        let body = self
            .send_text(&crumb_url, self.client.get(&crumb_url).header(header::COOKIE, &cookie))
            .await?;
        let crumb = parse_crumb(&body).ok_or_else(|| DataError::MalformedResponse {
            symbol: crumb_url.clone(),
            detail: "invalid crumb".to_string(),
        })?;

        Ok(YahooSession { cookie, crumb })
    }

    async fn session(&self) -> Option<&YahooSession> {
        self.session
            .get_or_init(|| async {
                match self.open_session().await {
                    Ok(session) => {
                        tracing::debug!("yahoo session opened");
                        Some(session)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "yahoo session handshake failed");
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    /// quoteSummary request for one symbol, authenticated when a session is available.
    pub fn quote_summary_request(
        &self,
        provider_symbol: &str,
        session: Option<&YahooSession>,
    ) -> RequestBuilder {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, provider_symbol);
        let request = self.client.get(url).query(&[("modules", SUMMARY_MODULES)]);
        match session {
            Some(session) => request
                .query(&[("crumb", session.crumb.as_str())])
                .header(header::COOKIE, &session.cookie),
            None => request,
        }
    }

    async fn fetch_series(
        &self,
        provider_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, DashboardError> {
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=div%2Csplit",
            self.base_url,
            provider_symbol,
            midnight_timestamp(start),
            midnight_timestamp(end),
        );
        let body = self.get_text(provider_symbol, &url).await?;
        parse_chart_response(provider_symbol, &body, start, end, Local::now().date_naive())
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_prices(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, DashboardError> {
        let mut series = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let prices = self
                .fetch_series(&self.provider_symbol(symbol), start, end)
                .await?;
            tracing::info!(symbol = %symbol, observations = prices.len(), "fetched prices");
            series.push((display_symbol(symbol, &self.market_suffix), prices));
        }
        Ok(PriceTable::outer_join(series))
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> FundamentalSnapshot {
        let provider_symbol = self.provider_symbol(symbol);
        let display_name = display_symbol(symbol, &self.market_suffix);
        let session = self.session().await;
        let request = self.quote_summary_request(&provider_symbol, session);

        match self.send_text(&provider_symbol, request).await {
            Ok(body) => parse_fundamentals(&display_name, &body),
            Err(e) => {
                tracing::warn!(symbol = %display_name, error = %e, "fundamentals unavailable");
                FundamentalSnapshot::empty(display_name)
            }
        }
    }

    async fn fetch_benchmark(&self, start: NaiveDate, end: NaiveDate) -> Option<PriceSeries> {
        match self.fetch_series(&self.benchmark_symbol, start, end).await {
            Ok(series) => Some(series),
            Err(e) => {
                tracing::warn!(symbol = %self.benchmark_symbol, error = %e, "benchmark unavailable");
                None
            }
        }
    }
}

/// Catalog symbol plus market suffix, unless it already carries one.
pub fn provider_symbol(symbol: &str, suffix: &str) -> String {
    if suffix.is_empty() || symbol.ends_with(suffix) {
        symbol.to_string()
    } else {
        format!("{}{}", symbol, suffix)
    }
}

/// Removes exactly one trailing market suffix.
pub fn display_symbol(symbol: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return symbol.to_string();
    }
    symbol.strip_suffix(suffix).unwrap_or(symbol).to_string()
}

/// The `name=value` pair of a Set-Cookie header, without its attributes.
pub fn session_cookie(set_cookie: &str) -> Option<&str> {
    let pair = set_cookie.split(';').next()?.trim();
    match pair.split_once('=') {
        Some((name, value)) if !name.is_empty() && !value.is_empty() => Some(pair),
        _ => None,
    }
}

/// A crumb is a short opaque token; error pages and empty bodies are rejected.
pub fn parse_crumb(body: &str) -> Option<String> {
    let crumb = body.trim();
    let valid = !crumb.is_empty()
        && crumb.len() <= 64
        && !crumb.chars().any(|c| c.is_whitespace() || matches!(c, '<' | '{'));
    valid.then(|| crumb.to_string())
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

pub type FieldColumns = HashMap<String, Vec<Option<f64>>>;

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<FieldColumns>,
    #[serde(default)]
    adjclose: Vec<FieldColumns>,
}

/// Picks the first field of [`PRICE_FIELDS`] that has at least one value.
pub fn select_price_field<'a>(
    symbol: &str,
    fields: &'a FieldColumns,
) -> Result<(&'static str, &'a [Option<f64>]), DataError> {
    PRICE_FIELDS
        .iter()
        .find_map(|name| {
            fields
                .get(*name)
                .filter(|values| values.iter().any(|v| v.is_some()))
                .map(|values| (*name, values.as_slice()))
        })
        .ok_or_else(|| DataError::NoValidPriceField {
            symbol: symbol.to_string(),
            tried: PRICE_FIELDS,
        })
}

/// Parses a chart response into a daily series restricted to
/// `start <= date < end` and `date <= today`.
pub fn parse_chart_response(
    symbol: &str,
    body: &str,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Result<PriceSeries, DashboardError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| DataError::MalformedResponse {
            symbol: symbol.to_string(),
            detail: e.to_string(),
        })?;

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(DataError::EmptySeries(symbol.to_string()).into());
    };

    let mut fields = FieldColumns::new();
    for columns in result
        .indicators
        .quote
        .into_iter()
        .take(1)
        .chain(result.indicators.adjclose.into_iter().take(1))
    {
        fields.extend(columns);
    }

    let (field, values) = select_price_field(symbol, &fields)?;
    tracing::debug!(symbol, field, "selected price field");

    let mut series = PriceSeries::new();
    for (ts, value) in result.timestamp.iter().zip(values.iter()) {
        let (Some(price), Some(moment)) = (value, DateTime::from_timestamp(*ts, 0)) else {
            continue;
        };
        let date = moment.date_naive();
        if date >= start && date < end {
            series.insert(date, *price);
        }
    }
    series.truncate_after(today);

    if series.is_empty() {
        return Err(DataError::EmptySeries(symbol.to_string()).into());
    }
    Ok(series)
}

/// Reads a number stored either plainly or as `{"raw": x, "fmt": "..."}`.
fn raw_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.get("raw").and_then(Value::as_f64))
}

/// Parses a quoteSummary response. Anything missing or malformed is `None`.
pub fn parse_fundamentals(symbol: &str, body: &str) -> FundamentalSnapshot {
    let mut snapshot = FundamentalSnapshot::empty(symbol);

    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(symbol, error = %e, "unparseable fundamentals response");
            return snapshot;
        }
    };

    let Some(result) = json
        .get("quoteSummary")
        .and_then(|v| v.get("result"))
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return snapshot;
    };

    for (metric, module, field) in FUNDAMENTAL_FIELDS {
        let value = result
            .get(module)
            .and_then(|m| m.get(field))
            .and_then(raw_number)
            .map(|v| if metric.is_percentage() { v * 100.0 } else { v });
        snapshot.set(metric, value);
    }

    snapshot
}

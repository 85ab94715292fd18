use chrono::{DateTime, NaiveDate};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

use super::http::{build_client, send_json, with_single_retry};
use super::Outcome;
use crate::error::{CollectError, CollectResult, RemoteFailure};
use crate::settings::FinancialSettings;

const SERVICE: &str = "quotes";

/// History window requested from the quote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Lookback {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[default]
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Lookback {
    pub fn as_str(self) -> &'static str {
        match self {
            Lookback::OneDay => "1d",
            Lookback::FiveDays => "5d",
            Lookback::OneMonth => "1mo",
            Lookback::ThreeMonths => "3mo",
            Lookback::SixMonths => "6mo",
            Lookback::OneYear => "1y",
            Lookback::TwoYears => "2y",
            Lookback::FiveYears => "5y",
        }
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lookback {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(Lookback::OneDay),
            "5d" => Ok(Lookback::FiveDays),
            "1mo" => Ok(Lookback::OneMonth),
            "3mo" => Ok(Lookback::ThreeMonths),
            "6mo" => Ok(Lookback::SixMonths),
            "1y" => Ok(Lookback::OneYear),
            "2y" => Ok(Lookback::TwoYears),
            "5y" => Ok(Lookback::FiveYears),
            other => Err(CollectError::config(format!(
                "unknown lookback '{}', expected one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closing prices of one ticker, oldest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub currency: Option<String>,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn latest(&self) -> Option<PricePoint> {
        self.points.last().copied()
    }

    /// Relative change between the first and last close, in percent
    pub fn change_pct(&self) -> Option<f64> {
        let first = self.points.first()?.close;
        let last = self.points.last()?.close;
        if first == 0.0 {
            return None;
        }
        Some((last - first) / first * 100.0)
    }
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Default, Deserialize)]
struct ChartMeta {
    currency: Option<String>,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Closing prices from a chart-style quote API
pub struct FinancialCollector {
    client: Client,
    base_url: Url,
    retry_delay: Duration,
}

impl FinancialCollector {
    pub fn new(base_url: &str, timeout: Duration, retry_delay: Duration) -> CollectResult<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            CollectError::config(format!("invalid quote base URL '{}': {}", base_url, e))
        })?;
        Ok(FinancialCollector {
            client: build_client(timeout)?,
            base_url,
            retry_delay,
        })
    }

    pub fn from_settings(settings: &FinancialSettings) -> CollectResult<Self> {
        FinancialCollector::new(
            &settings.base_url,
            settings.timeout(),
            settings.retry_delay(),
        )
    }

    fn chart_url(&self, ticker: &str, lookback: Lookback) -> CollectResult<Url> {
        let path = format!("v8/finance/chart/{}", urlencoding::encode(ticker));
        let mut url = self.base_url.join(&path).map_err(|e| {
            CollectError::config(format!("invalid ticker '{}': {}", ticker, e))
        })?;
        url.query_pairs_mut()
            .append_pair("range", lookback.as_str())
            .append_pair("interval", "1d");
        Ok(url)
    }

    #[instrument(skip(self))]
    pub fn closing_prices(
        &self,
        ticker: &str,
        lookback: Lookback,
    ) -> CollectResult<Outcome<PriceSeries>> {
        if ticker.trim().is_empty() {
            return Err(CollectError::config("ticker is empty"));
        }
        let url = self.chart_url(ticker, lookback)?;
        let response: ChartResponse = with_single_retry(SERVICE, self.retry_delay, || {
            send_json(SERVICE, self.client.get(url.clone()))
        })?;
        let outcome = parse_chart(ticker, response)?;
        match &outcome {
            Outcome::Observed(series) => {
                info!(points = series.points.len(), "Closing prices collected")
            }
            Outcome::NoData => info!("No prices for the requested window"),
        }
        Ok(outcome)
    }
}

fn parse_chart(ticker: &str, response: ChartResponse) -> CollectResult<Outcome<PriceSeries>> {
    if let Some(err) = response.chart.error {
        return Err(CollectError::remote(
            SERVICE,
            RemoteFailure::Rejected,
            format!("{}: {}", err.code, err.description),
        ));
    }
    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Outcome::NoData);
    };

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut points = Vec::new();
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let Some(close) = close.filter(|c| c.is_finite()) else {
            continue;
        };
        let Some(date) = DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive()) else {
            return Err(CollectError::remote(
                SERVICE,
                RemoteFailure::InvalidResponse,
                format!("timestamp {} out of range", ts),
            ));
        };
        points.push(PricePoint { date, close });
    }

    if points.is_empty() {
        return Ok(Outcome::NoData);
    }
    Ok(Outcome::Observed(PriceSeries {
        ticker: ticker.to_string(),
        currency: result.meta.currency,
        points,
    }))
}

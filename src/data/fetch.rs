//! Remote indicator collection
//!
//! Market prices come from the Yahoo Finance chart API, rates from FRED's
//! graph CSV export. Both sit behind [`SeriesProvider`] so the collector can
//! be driven by any source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::hygiene::{align, RawSeries};
use super::{Indicator, ObservationSeries};
use crate::config::CollectorConfig;
use crate::error::{CrisisError, Result};

/// Source of raw daily observations for some set of indicators
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    fn supports(&self, indicator: Indicator) -> bool;

    /// Fetch observations in `[start, end]`
    async fn fetch(
        &self,
        indicator: Indicator,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries>;
}

/// Yahoo Finance chart API
#[derive(Clone)]
pub struct YahooProvider {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Vec<ChartAdjClose>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

impl YahooProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; crisis-warning)")
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn symbol(indicator: Indicator) -> Option<&'static str> {
        match indicator {
            Indicator::Sp500 => Some("^GSPC"),
            Indicator::Vix => Some("^VIX"),
            Indicator::Oil => Some("CL=F"),
            Indicator::Gold => Some("GC=F"),
            _ => None,
        }
    }
}

#[async_trait]
impl SeriesProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn supports(&self, indicator: Indicator) -> bool {
        Self::symbol(indicator).is_some()
    }

    async fn fetch(
        &self,
        indicator: Indicator,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries> {
        let symbol = Self::symbol(indicator).ok_or(CrisisError::MissingIndicator(indicator))?;
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            symbol.replace('^', "%5E")
        );
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp() + 86_400;
        debug!("GET {} ({} -> {})", url, start, end);

        let resp: ChartResponse = self
            .http
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "div,splits".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_chart(resp, symbol)
    }
}

fn parse_chart(resp: ChartResponse, symbol: &str) -> Result<RawSeries> {
    if let Some(err) = resp.chart.error {
        return Err(CrisisError::Data(format!(
            "Yahoo error for {}: {} ({})",
            symbol, err.description, err.code
        )));
    }
    let result = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| CrisisError::Data(format!("Yahoo returned no result for {}", symbol)))?;

    // Adjusted close when available, raw close otherwise
    let closes = match result.indicators.adjclose.into_iter().next() {
        Some(adj) if !adj.adjclose.is_empty() => adj.adjclose,
        _ => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    let offset = result.meta.gmtoffset;
    let series = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            DateTime::<Utc>::from_timestamp(ts + offset, 0).map(|dt| (dt.date_naive(), close))
        })
        .collect();
    Ok(series)
}

/// FRED graph CSV export (no API key required)
#[derive(Clone)]
pub struct FredProvider {
    http: Client,
    base_url: String,
}

impl FredProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn series_id(indicator: Indicator) -> Option<&'static str> {
        match indicator {
            Indicator::YieldSpread => Some("T10Y2Y"),
            Indicator::UsdKrw => Some("DEXKOUS"),
            _ => None,
        }
    }
}

#[async_trait]
impl SeriesProvider for FredProvider {
    fn name(&self) -> &str {
        "fred"
    }

    fn supports(&self, indicator: Indicator) -> bool {
        Self::series_id(indicator).is_some()
    }

    async fn fetch(
        &self,
        indicator: Indicator,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries> {
        let id = Self::series_id(indicator).ok_or(CrisisError::MissingIndicator(indicator))?;
        let url = format!("{}/graph/fredgraph.csv", self.base_url);
        debug!("GET {} id={} ({} -> {})", url, id, start, end);

        let body = self
            .http
            .get(&url)
            .query(&[
                ("id", id.to_string()),
                ("cosd", start.to_string()),
                ("coed", end.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_fred_csv(&body)
    }
}

/// Two columns: date, value. FRED writes "." for missing observations.
fn parse_fred_csv(body: &str) -> Result<RawSeries> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut series = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let (Some(date), Some(value)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| CrisisError::Data(format!("FRED date {:?}: {}", date, e)))?;
        series.push((date, value.parse::<f64>().ok()));
    }
    Ok(series)
}

/// Fetches every configured indicator and aligns them into one table
pub struct Collector {
    providers: Vec<Box<dyn SeriesProvider>>,
    optional: Vec<Indicator>,
}

impl Collector {
    pub fn new(providers: Vec<Box<dyn SeriesProvider>>, optional: Vec<Indicator>) -> Self {
        Self { providers, optional }
    }

    /// Yahoo + FRED, as configured
    pub fn from_config(config: &CollectorConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let providers: Vec<Box<dyn SeriesProvider>> = vec![
            Box::new(YahooProvider::new(&config.yahoo_base_url, timeout)?),
            Box::new(FredProvider::new(&config.fred_base_url, timeout)?),
        ];
        Ok(Self::new(providers, config.optional.clone()))
    }

    fn provider_for(&self, indicator: Indicator) -> Option<&dyn SeriesProvider> {
        self.providers
            .iter()
            .find(|p| p.supports(indicator))
            .map(|p| p.as_ref())
    }

    /// Collect from `start` to `end`.
    ///
    /// A required indicator that fails or comes back empty aborts the
    /// collection; an optional one is skipped with a warning.
    pub async fn collect(&self, start: NaiveDate, end: NaiveDate) -> Result<ObservationSeries> {
        info!("Collecting indicators from {} to {}", start, end);
        let mut raw: BTreeMap<Indicator, RawSeries> = BTreeMap::new();

        let wanted = Indicator::REQUIRED
            .iter()
            .map(|i| (*i, true))
            .chain(
                self.optional
                    .iter()
                    .filter(|i| !Indicator::REQUIRED.contains(i))
                    .map(|i| (*i, false)),
            );

        for (indicator, required) in wanted {
            let outcome = match self.provider_for(indicator) {
                Some(provider) => provider
                    .fetch(indicator, start, end)
                    .await
                    .and_then(|series| {
                        if series.iter().any(|(_, v)| v.is_some()) {
                            info!(
                                ">> {} from {}: {} observations",
                                indicator,
                                provider.name(),
                                series.len()
                            );
                            Ok(series)
                        } else {
                            Err(CrisisError::Data(format!(
                                "{} returned no values for {}",
                                provider.name(),
                                indicator
                            )))
                        }
                    }),
                None => Err(CrisisError::MissingIndicator(indicator)),
            };

            match outcome {
                Ok(series) => {
                    raw.insert(indicator, series);
                }
                Err(e) if required => return Err(e),
                Err(e) => warn!("Skipping optional indicator {}: {}", indicator, e),
            }
        }

        let series = align(raw)?;
        info!("Collected {} aligned rows", series.len());
        Ok(series)
    }
}

//! Travelpayouts prices-for-dates client
//!
//! One call covers a single (origin, destination, month) triple. Records that
//! break a constraint are dropped here, before any `Fare` is built.

use chrono::DateTime;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

use super::error::FareError;
use super::types::{Fare, FareConstraints, FareRecord, FareResponse, YearMonth};

pub const DEFAULT_PRICE_URL: &str = "https://api.travelpayouts.com/aviasales/v3/prices_for_dates";
pub const DEFAULT_LINK_BASE: &str = "https://aviasales.ru";
pub const DEFAULT_CURRENCY: &str = "rub";
const REQUEST_TIMEOUT_SECONDS: u64 = 30;
const RESULT_LIMIT: u32 = 15;
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Connection settings for the fare API
#[derive(Debug, Clone)]
pub struct FareApiSettings {
    pub price_url: String,
    pub token: String,
    pub currency: String,
    /// Prefix for the relative purchase links the API returns
    pub link_base: String,
}

impl FareApiSettings {
    pub fn new(price_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            price_url: price_url.into(),
            token: token.into(),
            currency: DEFAULT_CURRENCY.to_string(),
            link_base: DEFAULT_LINK_BASE.to_string(),
        }
    }
}

/// HTTP client for the fare API
#[derive(Debug, Clone)]
pub struct FareApiClient {
    client: Client,
    settings: FareApiSettings,
}

impl FareApiClient {
    pub fn new(settings: FareApiSettings) -> Result<Self, FareError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .default_headers(headers)
            .build()
            .map_err(|e| FareError::RequestBuild(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    /// Fetch and filter fares for one month
    pub async fn fetch(
        &self,
        origin: &str,
        destination: &str,
        month: YearMonth,
        constraints: &FareConstraints,
    ) -> Result<Vec<Fare>, FareError> {
        let month_param = month.to_string();
        let limit = RESULT_LIMIT.to_string();

        let request = self
            .client
            .get(&self.settings.price_url)
            .query(&[
                ("origin", origin),
                ("destination", destination),
                ("currency", self.settings.currency.as_str()),
                ("departure_at", month_param.as_str()),
                ("sorting", "price"),
                ("direct", "false"),
                ("limit", limit.as_str()),
                ("one_way", "true"),
                ("token", self.settings.token.as_str()),
            ])
            .build()
            .map_err(|e| FareError::RequestBuild(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(FareError::Network)?;

        if !response.status().is_success() {
            return Err(FareError::UpstreamStatus {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await.map_err(FareError::Network)?;
        let payload: FareResponse = serde_json::from_str(&body)?;

        if !payload.success {
            return Err(FareError::UpstreamLogic {
                message: payload.error.unwrap_or_default(),
            });
        }

        let records = payload.into_records();
        let received = records.len();
        let fares = accept_records(
            origin,
            destination,
            records,
            constraints,
            &self.settings.link_base,
        );

        tracing::debug!(
            "{} -> {} {}: {} records, {} accepted",
            origin,
            destination,
            month,
            received,
            fares.len()
        );

        Ok(fares)
    }
}

/// Turn raw records into fares, dropping any that break a constraint
pub fn accept_records(
    origin: &str,
    destination: &str,
    records: Vec<FareRecord>,
    constraints: &FareConstraints,
    link_base: &str,
) -> Vec<Fare> {
    records
        .into_iter()
        .filter_map(|record| convert_record(origin, destination, record, constraints, link_base))
        .collect()
}

fn convert_record(
    origin: &str,
    destination: &str,
    record: FareRecord,
    constraints: &FareConstraints,
    link_base: &str,
) -> Option<Fare> {
    if record.price > constraints.max_price {
        return None;
    }
    if record.duration > constraints.max_duration_minutes {
        return None;
    }

    let departure_at = match DateTime::parse_from_rfc3339(&record.departure_at) {
        Ok(departure_at) => departure_at,
        Err(source) => {
            let err = FareError::DateParse {
                value: record.departure_at.clone(),
                source,
            };
            tracing::warn!("Skipping {} -> {} record: {}", origin, destination, err);
            return None;
        }
    };

    if !constraints.date_filter.accepts(departure_at.date_naive()) {
        return None;
    }

    let destination = if record.destination.is_empty() {
        destination.to_string()
    } else {
        record.destination
    };

    Some(Fare {
        origin: origin.to_string(),
        destination,
        departure_at,
        price: record.price,
        airline: record.airline,
        link: format!("{}{}", link_base, record.link),
        duration_minutes: record.duration,
        transfers: record.transfers,
    })
}

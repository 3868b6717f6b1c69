//! Fare search data types

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::{ConfigProblem, SearchError};

/// Default flight duration ceiling in minutes
pub const DEFAULT_MAX_DURATION_MINUTES: u32 = 1440;

/// Upper bound for the search horizon
pub const MAX_MONTHS_AHEAD: u32 = 12;

/// One priced itinerary that passed every constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fare {
    pub origin: String,
    pub destination: String,
    /// Departure time in the offset the API returned
    pub departure_at: DateTime<FixedOffset>,
    /// Price in roubles
    pub price: u32,
    pub airline: String,
    /// Absolute purchase link
    pub link: String,
    pub duration_minutes: u32,
    pub transfers: u32,
}

/// Raw record from the prices-for-dates endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FareRecord {
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub departure_at: String,
    #[serde(default)]
    pub price: u32,
    #[serde(default)]
    pub airline: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub transfers: u32,
}

/// Response envelope: `{data: [...], error, success}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FareResponse {
    #[serde(default)]
    pub data: Option<Vec<FareRecord>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub success: bool,
}

impl FareResponse {
    pub fn into_records(self) -> Vec<FareRecord> {
        self.data.unwrap_or_default()
    }
}

/// Calendar month used for the `departure_at` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Month `offset` months after the month containing `date`
    pub fn offset_from(date: NaiveDate, offset: u32) -> Self {
        // Day 1 always exists, so adding months never clamps
        let first = date.with_day(1).unwrap_or(date);
        first
            .checked_add_months(Months::new(offset))
            .map(Self::of)
            .unwrap_or_else(|| Self::of(first))
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Optional departure-date constraint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFilter {
    #[default]
    Disabled,
    /// Inclusive range; a missing bound is open
    Range {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    /// Only these departure dates
    List(Vec<NaiveDate>),
}

impl DateFilter {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DateFilter::Disabled)
    }

    pub fn accepts(&self, date: NaiveDate) -> bool {
        match self {
            DateFilter::Disabled => true,
            DateFilter::Range { start, end } => {
                start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
            }
            DateFilter::List(dates) => dates.contains(&date),
        }
    }
}

/// Per-record rejection rules applied while parsing a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FareConstraints {
    pub max_price: u32,
    pub max_duration_minutes: u32,
    pub date_filter: DateFilter,
}

/// What to search: origins, destination, horizon and ceilings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    origins: Vec<String>,
    destination: String,
    months_ahead: u32,
    max_price: u32,
    max_duration_minutes: u32,
    date_filter: DateFilter,
}

impl SearchConfig {
    pub fn new(
        origins: impl IntoIterator<Item = impl AsRef<str>>,
        destination: &str,
        months_ahead: u32,
        max_price: u32,
    ) -> Result<Self, SearchError> {
        let mut config = Self {
            origins: Vec::new(),
            destination: normalize_code(destination)?,
            months_ahead,
            max_price,
            max_duration_minutes: DEFAULT_MAX_DURATION_MINUTES,
            date_filter: DateFilter::Disabled,
        };
        for origin in origins {
            let code = normalize_code(origin.as_ref())?;
            if !config.origins.contains(&code) {
                config.origins.push(code);
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_duration(mut self, minutes: u32) -> Result<Self, SearchError> {
        self.max_duration_minutes = minutes;
        self.validate()?;
        Ok(self)
    }

    pub fn with_date_filter(mut self, filter: DateFilter) -> Self {
        self.date_filter = filter;
        self
    }

    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn months_ahead(&self) -> u32 {
        self.months_ahead
    }

    pub fn max_price(&self) -> u32 {
        self.max_price
    }

    pub fn max_duration_minutes(&self) -> u32 {
        self.max_duration_minutes
    }

    pub fn date_filter(&self) -> &DateFilter {
        &self.date_filter
    }

    pub fn constraints(&self) -> FareConstraints {
        FareConstraints {
            max_price: self.max_price,
            max_duration_minutes: self.max_duration_minutes,
            date_filter: self.date_filter.clone(),
        }
    }

    pub fn set_destination(&mut self, code: &str) -> Result<(), SearchError> {
        self.destination = normalize_code(code)?;
        Ok(())
    }

    pub fn set_months_ahead(&mut self, months: u32) -> Result<(), SearchError> {
        check_months(months)?;
        self.months_ahead = months;
        Ok(())
    }

    /// Replace the origin set with a single airport
    pub fn set_origin(&mut self, code: &str) -> Result<(), SearchError> {
        self.origins = vec![normalize_code(code)?];
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.origins.is_empty() {
            return Err(ConfigProblem::NoOrigins.into());
        }
        check_months(self.months_ahead)?;
        if self.max_price == 0 {
            return Err(ConfigProblem::ZeroPrice.into());
        }
        if self.max_duration_minutes == 0 {
            return Err(ConfigProblem::ZeroDuration.into());
        }
        Ok(())
    }
}

fn check_months(months: u32) -> Result<(), SearchError> {
    if months == 0 || months > MAX_MONTHS_AHEAD {
        return Err(ConfigProblem::Horizon {
            months,
            max: MAX_MONTHS_AHEAD,
        }
        .into());
    }
    Ok(())
}

/// Upper-case and check a 3-letter IATA code
pub fn normalize_code(code: &str) -> Result<String, SearchError> {
    let code = code.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(ConfigProblem::NotAnAirportCode(code).into())
    }
}

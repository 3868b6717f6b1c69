//! Fare search pipeline
//!
//! - `FareApiClient`: one upstream request per (origin, destination, month)
//! - `FareSearchService`: fan-out over origins and months, owns `SearchConfig`
//! - Errors are per fetch (`FareError`) or per pass (`SearchError`)

mod types;
pub use types::{
    DEFAULT_MAX_DURATION_MINUTES, DateFilter, Fare, FareConstraints, FareRecord, FareResponse,
    MAX_MONTHS_AHEAD, SearchConfig, YearMonth, normalize_code,
};

mod error;
pub use error::{ConfigProblem, FareError, SearchError};

mod api_client;
pub use api_client::{
    DEFAULT_CURRENCY, DEFAULT_LINK_BASE, DEFAULT_PRICE_URL, FareApiClient, FareApiSettings,
    accept_records,
};

mod search;
pub use search::{
    DEFAULT_REQUEST_DELAY, FareSearchService, FetchFailure, Pacing, SearchOutcome,
};

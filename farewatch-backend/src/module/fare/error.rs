use thiserror::Error;

/// Failure of a single (origin, month) fetch.
///
/// None of these abort a search pass; the aggregator records them and moves
/// on to the next month or origin.
#[derive(Debug, Error)]
pub enum FareError {
    #[error("failed to build request: {0}")]
    RequestBuild(String),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("upstream returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream reported failure: {message}")]
    UpstreamLogic { message: String },

    #[error("unparseable departure time '{value}': {source}")]
    DateParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl FareError {
    /// Short stable label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            FareError::RequestBuild(_) => "request_build",
            FareError::Network(_) => "network",
            FareError::UpstreamStatus { .. } => "upstream_status",
            FareError::Decode(_) => "decode",
            FareError::UpstreamLogic { .. } => "upstream_logic",
            FareError::DateParse { .. } => "date_parse",
        }
    }
}

/// A search pass that could not start at all
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("invalid search configuration: {0}")]
    InvalidConfig(#[from] ConfigProblem),
}

/// What is wrong with a search configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigProblem {
    #[error("origin set is empty")]
    NoOrigins,

    #[error("max price must be positive")]
    ZeroPrice,

    #[error("max flight duration must be positive")]
    ZeroDuration,

    #[error("search horizon must be between 1 and {max} months, got {months}")]
    Horizon { months: u32, max: u32 },

    #[error("'{0}' is not an IATA airport code")]
    NotAnAirportCode(String),
}

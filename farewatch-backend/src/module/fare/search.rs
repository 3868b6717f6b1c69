//! Search aggregation - fans the fare query out over origins and months
//!
//! `FareSearchService` owns the mutable `SearchConfig`. A pass holds the run
//! gate from start to finish and works on a snapshot of the config, so
//! concurrent edits only ever show up in the next pass.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::Instrument;
use uuid::Uuid;

use super::api_client::FareApiClient;
use super::error::{FareError, SearchError};
use super::types::{Fare, SearchConfig, YearMonth};
use crate::module::renderer::{NO_FARES_MESSAGE, ReportRenderer};

/// Default pause between two upstream requests
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Delay inserted between consecutive upstream requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self::fixed(DEFAULT_REQUEST_DELAY)
    }
}

impl Pacing {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// One fetch that produced no fares because it failed
#[derive(Debug)]
pub struct FetchFailure {
    pub origin: String,
    pub month: YearMonth,
    pub error: FareError,
}

/// Raw result of one search pass
#[derive(Debug)]
pub struct SearchOutcome {
    /// Config snapshot the pass ran with
    pub config: SearchConfig,
    pub fares: Vec<Fare>,
    pub failures: Vec<FetchFailure>,
    pub requests: usize,
}

/// Fare search service shared by the command handler and the daily task
pub struct FareSearchService {
    client: FareApiClient,
    renderer: ReportRenderer,
    config: RwLock<SearchConfig>,
    run_gate: Mutex<()>,
    pacing: Pacing,
}

impl FareSearchService {
    pub fn new(client: FareApiClient, renderer: ReportRenderer, config: SearchConfig) -> Self {
        Self {
            client,
            renderer,
            config: RwLock::new(config),
            run_gate: Mutex::new(()),
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Copy of the current configuration
    pub async fn config(&self) -> SearchConfig {
        self.config.read().await.clone()
    }

    /// Apply an edit atomically. The edit runs on a copy which only replaces
    /// the live config if it succeeds and the result still validates.
    pub async fn update_config<F, R>(&self, edit: F) -> Result<R, SearchError>
    where
        F: FnOnce(&mut SearchConfig) -> Result<R, SearchError>,
    {
        let mut config = self.config.write().await;
        let mut draft = config.clone();
        let result = edit(&mut draft)?;
        draft.validate()?;

        tracing::info!(
            "Search config updated: {} -> {}, {} months",
            draft.origins().join("/"),
            draft.destination(),
            draft.months_ahead()
        );
        *config = draft;

        Ok(result)
    }

    /// Run a full pass for the current month and render the report
    pub async fn run(&self) -> Result<String, SearchError> {
        self.run_on(Local::now().date_naive()).await
    }

    /// Run a full pass with `today` as the first month of the horizon
    pub async fn run_on(&self, today: NaiveDate) -> Result<String, SearchError> {
        let outcome = self.collect(today).await?;

        if outcome.fares.is_empty() {
            return Ok(NO_FARES_MESSAGE.to_string());
        }

        Ok(self.renderer.render(&outcome.fares, &outcome.config))
    }

    /// Query every (origin, month) pair and gather the accepted fares.
    ///
    /// Failed fetches are recorded and skipped; only an unusable config
    /// makes the whole pass fail.
    pub async fn collect(&self, today: NaiveDate) -> Result<SearchOutcome, SearchError> {
        let _gate = self.run_gate.lock().await;
        let config = self.config().await;
        config.validate()?;

        let run_id = Uuid::now_v7();
        let span = tracing::info_span!("fare_search", %run_id);

        self.collect_with(config, today).instrument(span).await
    }

    async fn collect_with(
        &self,
        config: SearchConfig,
        today: NaiveDate,
    ) -> Result<SearchOutcome, SearchError> {
        tracing::info!(
            "Starting fare search: {} -> {}, {} months from {}",
            config.origins().join("/"),
            config.destination(),
            config.months_ahead(),
            YearMonth::of(today)
        );

        let constraints = config.constraints();
        let mut fares = Vec::new();
        let mut failures = Vec::new();
        let mut requests = 0;

        for origin in config.origins() {
            for offset in 0..config.months_ahead() {
                let month = YearMonth::offset_from(today, offset);
                tracing::info!("Checking {} -> {} for {}", origin, config.destination(), month);

                match self
                    .client
                    .fetch(origin, config.destination(), month, &constraints)
                    .await
                {
                    Ok(found) => fares.extend(found),
                    Err(error) => {
                        tracing::warn!(
                            kind = error.kind(),
                            "Fetch {} -> {} for {} failed: {}",
                            origin,
                            config.destination(),
                            month,
                            error
                        );
                        failures.push(FetchFailure {
                            origin: origin.clone(),
                            month,
                            error,
                        });
                    }
                }

                requests += 1;
                self.pacing.wait().await;
            }
        }

        tracing::info!(
            "Fare search finished: {} requests, {} fares, {} failed",
            requests,
            fares.len(),
            failures.len()
        );

        Ok(SearchOutcome {
            config,
            fares,
            failures,
            requests,
        })
    }
}

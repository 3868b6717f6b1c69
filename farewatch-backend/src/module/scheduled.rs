//! Scheduled task manager - Periodic fare searches
//!
//! Runs the daily search at a fixed local time of day and pushes the report to
//! every delivery target.

use super::fare::FareSearchService;
use super::transport::ChatTransport;
use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration for scheduled tasks
#[derive(Debug, Clone)]
pub struct ScheduledTaskConfig {
    /// Local time of day for the daily search
    pub daily_at: NaiveTime,

    /// Chats that receive the report
    pub targets: Vec<i64>,

    /// Also run once right after start
    pub run_on_start: bool,
}

impl Default for ScheduledTaskConfig {
    fn default() -> Self {
        Self {
            daily_at: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            targets: Vec::new(),
            run_on_start: false,
        }
    }
}

/// Scheduled task manager
pub struct ScheduledTaskManager {
    config: ScheduledTaskConfig,
    service: Arc<FareSearchService>,
    transport: Arc<dyn ChatTransport>,
    task_handles: Vec<JoinHandle<()>>,
}

impl ScheduledTaskManager {
    pub fn new(
        config: ScheduledTaskConfig,
        service: Arc<FareSearchService>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            config,
            service,
            transport,
            task_handles: Vec::new(),
        }
    }

    /// Start all scheduled tasks
    pub fn start_all(&mut self) {
        tracing::info!("Starting scheduled task manager...");

        if self.config.targets.is_empty() {
            tracing::warn!("No chat id or admin users configured, daily search disabled");
            return;
        }

        let handle = self.start_daily_search_task();
        self.task_handles.push(handle);

        tracing::info!(
            "Daily fare search scheduled at {} for {} chats",
            self.config.daily_at.format("%H:%M"),
            self.config.targets.len()
        );
    }

    fn start_daily_search_task(&self) -> JoinHandle<()> {
        let service = self.service.clone();
        let transport = self.transport.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            if config.run_on_start {
                tracing::info!("Performing initial fare search...");
                if let Err(e) = Self::run_daily_search(&service, transport.as_ref(), &config.targets).await {
                    tracing::error!("Initial fare search failed: {}", e);
                }
            }

            Self::daily_search_loop(service, transport, config).await;
        })
    }

    async fn daily_search_loop(
        service: Arc<FareSearchService>,
        transport: Arc<dyn ChatTransport>,
        config: ScheduledTaskConfig,
    ) {
        loop {
            let now = Local::now().naive_local();
            let next_trigger = Self::calculate_next_search_time(now, config.daily_at);
            let sleep_duration = (next_trigger - now)
                .to_std()
                .unwrap_or(Duration::from_secs(60));

            tracing::info!(
                "Next fare search at: {} (in {:.1} hours)",
                next_trigger.format("%Y-%m-%d %H:%M:%S"),
                sleep_duration.as_secs_f64() / 3600.0
            );

            tokio::time::sleep(sleep_duration).await;

            match Self::run_daily_search(&service, transport.as_ref(), &config.targets).await {
                Ok(delivered) => tracing::info!("Daily fare search delivered to {} chats", delivered),
                Err(e) => tracing::error!("Daily fare search failed: {}", e),
            }
        }
    }

    /// Next occurrence of `at` strictly after `now`
    pub fn calculate_next_search_time(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
        let today = now.date().and_time(at);
        if today > now {
            today
        } else {
            today + TimeDelta::days(1)
        }
    }

    /// Run one pass and send the report to each target. Returns how many chats got it.
    pub async fn run_daily_search(
        service: &FareSearchService,
        transport: &dyn ChatTransport,
        targets: &[i64],
    ) -> anyhow::Result<usize> {
        let report = service.run().await?;

        let mut delivered = 0;
        for &target in targets {
            match transport.send_silent(target, &report).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::error!("Failed to send report to {}: {}", target, e),
            }
        }

        Ok(delivered)
    }

    /// Gracefully shutdown all tasks
    pub async fn shutdown(self) {
        tracing::info!("Shutting down scheduled task manager...");

        for handle in self.task_handles {
            handle.abort();
        }

        tracing::info!("All scheduled tasks stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_calculate_next_search_time() {
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();

        // Before 10:00 - today
        let next = ScheduledTaskManager::calculate_next_search_time(at(2024, 3, 10, 8, 15), ten);
        assert_eq!(next, at(2024, 3, 10, 10, 0));

        // Exactly 10:00 - tomorrow
        let next = ScheduledTaskManager::calculate_next_search_time(at(2024, 3, 10, 10, 0), ten);
        assert_eq!(next, at(2024, 3, 11, 10, 0));

        // Last day of the month rolls over
        let next = ScheduledTaskManager::calculate_next_search_time(at(2024, 2, 29, 23, 59), ten);
        assert_eq!(next, at(2024, 3, 1, 10, 0));
    }

    #[test]
    fn test_default_config() {
        let config = ScheduledTaskConfig::default();
        assert_eq!(config.daily_at, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert!(!config.run_on_start);
    }
}

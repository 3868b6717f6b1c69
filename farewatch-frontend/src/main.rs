use farewatch_backend::config::AppConfig;
use farewatch_backend::logging;
use farewatch_backend::module::airport::AirportDirectory;
use farewatch_backend::module::fare::{FareApiClient, FareSearchService};
use farewatch_backend::module::handler::MessageHandler;
use farewatch_backend::module::renderer::ReportRenderer;
use farewatch_backend::module::scheduled::{ScheduledTaskConfig, ScheduledTaskManager};
use farewatch_frontend::frontend::TelegramBot;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = AppConfig::load()?;
    let _logging_guard = logging::init_logging("logs", "farewatch", &loaded.config.log_level)?;

    tracing::info!("Farewatch starting...");
    loaded.log_summary();
    let config = loaded.config;

    let search_config = config.search_config()?;
    let daily_at = config.daily_time()?;
    tracing::info!(
        "Searching {} -> {} for {} months, max price {}",
        search_config.origins().join("/"),
        search_config.destination(),
        search_config.months_ahead(),
        search_config.max_price()
    );

    let directory = Arc::new(AirportDirectory::builtin());
    let client = FareApiClient::new(config.api_settings())?;
    let service = FareSearchService::new(client, ReportRenderer::new(directory.clone()), search_config)
        .with_pacing(config.pacing())
        .into_shared();

    let bot = Arc::new(TelegramBot::new(&config.telegram)?);
    let handler = Arc::new(
        MessageHandler::new(service.clone(), directory, bot.clone()).with_daily_search(daily_at),
    );

    // Configure and start scheduled tasks
    let task_config = ScheduledTaskConfig {
        daily_at,
        targets: config.delivery_targets(),
        run_on_start: config.schedule.run_on_start,
    };
    let mut task_manager = ScheduledTaskManager::new(task_config, service, bot.clone());
    task_manager.start_all();

    let mut polling = tokio::spawn(bot.run(handler));
    tracing::info!("Bot started");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown signal received.");
            polling.abort();
        }
        result = &mut polling => {
            tracing::error!("Telegram polling stopped: {:?}", result);
        }
    }

    task_manager.shutdown().await;
    Ok(())
}

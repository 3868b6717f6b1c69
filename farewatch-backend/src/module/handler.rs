//! Chat command handler
//!
//! Routes slash commands to the fare search service and replies through the
//! chat transport. Unresolved city names never touch the search config.
use anyhow::Result;
use chrono::NaiveTime;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::airport::{AirportDirectory, Resolution, ResolveError};
use super::fare::{ConfigProblem, DateFilter, FareSearchService, SearchConfig, SearchError};
use super::renderer::{escape_html, format_duration};
use super::transport::{ChatTransport, IncomingMessage};

const SEARCH_STARTED: &str = "🔍 <b>Начинаю поиск билетов...</b>\nЭто займет несколько секунд.";
const UNKNOWN_COMMAND: &str = "❓ Неизвестная команда. Используйте /help для просмотра доступных команд.";

const HELP_TEXT: &str = "❓ <b>Помощь по боту</b>

<b>Команды:</b>
/search - Запустить поиск билетов
/search ГОРОД [МЕСЯЦЕВ] - Сменить направление и искать
/status - Показать статус бота
/cities - Список доступных городов
/origin set ГОРОД - Сменить город вылета
/help - Эта справка

<b>Автоматический поиск:</b>
Бот автоматически ищет билеты каждый день и присылает уведомления.

<b>Ручной поиск:</b>
Используйте команду /search в любое время для запуска поиска.";

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*/([^\s@]+)(?:@\S+)?\s*(.*)$").expect("command pattern is valid")
});

/// Arguments of `/search [city] [months]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct SearchArgs {
    city: Option<String>,
    months: Option<u32>,
}

/// Message handler with fare search service
pub struct MessageHandler {
    service: Arc<FareSearchService>,
    directory: Arc<AirportDirectory>,
    transport: Arc<dyn ChatTransport>,
    daily_search_at: Option<NaiveTime>,
}

impl MessageHandler {
    /// Create a new message handler
    pub fn new(
        service: Arc<FareSearchService>,
        directory: Arc<AirportDirectory>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            service,
            directory,
            transport,
            daily_search_at: None,
        }
    }

    /// Time of day shown in `/status` for the automatic search
    pub fn with_daily_search(mut self, at: NaiveTime) -> Self {
        self.daily_search_at = Some(at);
        self
    }

    /// Handle incoming message
    pub async fn handle_message(&self, msg: &IncomingMessage) -> Result<()> {
        match parse_command(&msg.text) {
            Some((command, args)) => self.router(msg.chat_id, &command, &args).await,
            None => self.reply(msg.chat_id, UNKNOWN_COMMAND).await,
        }
    }

    /// Route commands to appropriate handlers
    async fn router(&self, chat_id: i64, command: &str, args: &str) -> Result<()> {
        match command.to_lowercase().as_str() {
            "start" => self.start(chat_id).await,
            "search" | "find" | "поиск" => self.search(chat_id, args).await,
            "status" | "статус" => self.status(chat_id).await,
            "help" | "помощь" => self.reply(chat_id, HELP_TEXT).await,
            "cities" | "города" => self.reply(chat_id, &self.cities_text()).await,
            "origin" | "вылет" => self.origin(chat_id, args).await,
            _ => self.reply(chat_id, UNKNOWN_COMMAND).await,
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.transport.send_message(chat_id, text).await
    }

    async fn start(&self, chat_id: i64) -> Result<()> {
        let config = self.service.config().await;
        let text = format!(
            "👋 <b>Бот поиска дешёвых авиабилетов</b>

<b>Команды:</b>
/search - 🔍 Начать поиск билетов
/status - 📊 Статус бота
/help - ❓ Помощь

<b>Направления:</b>
• {} → {}
• Макс. цена: {} руб.
• Поиск на {} мес. вперёд",
            self.origin_names(&config),
            self.directory.display_name(config.destination()),
            config.max_price(),
            config.months_ahead(),
        );
        self.reply(chat_id, &text).await
    }

    async fn search(&self, chat_id: i64, args: &str) -> Result<()> {
        let args = match parse_search_args(args) {
            Ok(args) => args,
            Err(message) => return self.reply(chat_id, &message).await,
        };

        if let Some(city) = &args.city {
            let resolution = match self.resolve_destination(city) {
                Ok(resolution) => resolution,
                Err(err) => return self.reply(chat_id, &city_not_found_text(&err)).await,
            };
            if !self.change_destination(chat_id, &resolution, args.months).await? {
                return Ok(());
            }
        } else if let Some(months) = args.months {
            if !self.change_months(chat_id, months).await? {
                return Ok(());
            }
        }

        self.reply(chat_id, SEARCH_STARTED).await?;

        match self.service.run().await {
            Ok(report) => self.reply(chat_id, &report).await,
            Err(e) => {
                tracing::error!("Search failed: {}", e);
                let text = format!(
                    "❌ <b>Ошибка при поиске:</b>\n<code>{}</code>",
                    escape_html(&e.to_string())
                );
                self.reply(chat_id, &text).await
            }
        }
    }

    /// A typed IATA code wins over city-name matching
    fn resolve_destination(&self, input: &str) -> Result<Resolution, ResolveError> {
        match self.directory.lookup_code(input) {
            Some(resolution) => Ok(resolution),
            None => self.directory.resolve(input),
        }
    }

    fn resolve_origin(&self, input: &str) -> Result<Resolution, ResolveError> {
        match self.directory.lookup_code(input) {
            Some(resolution) => Ok(resolution),
            None => self.directory.resolve_origin(input),
        }
    }

    /// Returns false if the change was rejected (and the user was told why)
    async fn change_destination(
        &self,
        chat_id: i64,
        resolution: &Resolution,
        months: Option<u32>,
    ) -> Result<bool> {
        let update = self
            .service
            .update_config(|config| {
                let previous = config.clone();
                config.set_destination(resolution.primary_code())?;
                if let Some(months) = months {
                    config.set_months_ahead(months)?;
                }
                Ok(previous)
            })
            .await;

        let previous = match update {
            Ok(previous) => previous,
            Err(e) => {
                self.reply(chat_id, &config_error_text(&e)).await?;
                return Ok(false);
            }
        };

        let origins = previous.origins().join("/");
        let mut text = format!(
            "✅ <b>Направление изменено:</b>\n{} → {}\n➡️\n{} → {}",
            origins,
            self.directory.display_name(previous.destination()),
            origins,
            resolution.display_name(),
        );
        if let Some(months) = months {
            text.push_str(&format!(
                "\n📅 Глубина поиска: {} мес. → {} мес.",
                previous.months_ahead(),
                months
            ));
        }
        text.push_str(&airports_info(resolution));

        self.reply(chat_id, &text).await?;
        Ok(true)
    }

    async fn change_months(&self, chat_id: i64, months: u32) -> Result<bool> {
        let update = self
            .service
            .update_config(|config| {
                let previous = config.months_ahead();
                config.set_months_ahead(months)?;
                Ok(previous)
            })
            .await;

        match update {
            Ok(previous) => {
                let text = format!(
                    "✅ <b>Глубина поиска изменена:</b>\n{} мес. → {} мес.",
                    previous, months
                );
                self.reply(chat_id, &text).await?;
                Ok(true)
            }
            Err(e) => {
                self.reply(chat_id, &config_error_text(&e)).await?;
                Ok(false)
            }
        }
    }

    async fn status(&self, chat_id: i64) -> Result<()> {
        let config = self.service.config().await;
        let schedule = match self.daily_search_at {
            Some(at) => format!("каждый день в {}", at.format("%H:%M")),
            None => "выключен".to_string(),
        };

        let text = format!(
            "📊 <b>Статус бота</b>

<b>Направления поиска:</b>
• {} → {}

<b>Параметры:</b>
• Макс. цена: {} руб.
• Макс. время в пути: {}
• Глубина поиска: {} мес.{}
• Авто-поиск: {}

Бот работает в штатном режиме 🟢",
            config.origins().join("/"),
            config.destination(),
            config.max_price(),
            format_duration(config.max_duration_minutes()),
            config.months_ahead(),
            date_filter_line(config.date_filter()),
            schedule,
        );
        self.reply(chat_id, &text).await
    }

    fn cities_text(&self) -> String {
        let mut text = String::from("🏙️ <b>Доступные города для поиска:</b>\n\n");
        text.push_str(&self.directory.city_list().join("\n"));
        text.push_str("\n\n💡 <i>Используйте команду /search ГОРОД для поиска</i>\n");
        text.push_str("Например:\n");
        text.push_str("<code>/search бангкок</code> - поиск по названию\n");
        text.push_str("<code>/search BKK</code> - поиск по коду аэропорта\n");
        text.push_str("<code>/search бали 6</code> - поиск на 6 месяцев вперёд\n");
        text.push_str("<code>/search</code> - поиск в текущее направление");
        text
    }

    async fn origin(&self, chat_id: i64, args: &str) -> Result<()> {
        let args = args.trim();
        let (first, rest) = match args.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim()),
            None => (args, ""),
        };

        let city = match first.to_lowercase().as_str() {
            "" => return self.show_origins(chat_id).await,
            "list" | "список" => return self.reply(chat_id, &self.cities_text()).await,
            "set" | "установить" if rest.is_empty() => {
                let text = "❌ Укажите город вылета. Например: <code>/origin set москва</code>";
                return self.reply(chat_id, text).await;
            }
            "set" | "установить" => rest,
            _ => args,
        };

        let resolution = match self.resolve_origin(city) {
            Ok(resolution) => resolution,
            Err(_) => {
                let text = format!(
                    "❌ <b>Город вылета '{}' не найден.</b>\n\n\
                     💡 <i>Используйте:</i>\n\
                     <code>/origin list</code> - список доступных городов\n\
                     <code>/origin set москва</code> - установить Москву",
                    escape_html(city.trim())
                );
                return self.reply(chat_id, &text).await;
            }
        };

        let update = self
            .service
            .update_config(|config| {
                let previous = config.clone();
                config.set_origin(resolution.primary_code())?;
                Ok(previous)
            })
            .await;

        let previous = match update {
            Ok(previous) => previous,
            Err(e) => return self.reply(chat_id, &config_error_text(&e)).await,
        };

        let destination = self.directory.display_name(previous.destination());
        let text = format!(
            "✅ <b>Город вылета изменен:</b>\n{} → {}\n➡️\n{} → {}{}",
            previous.origins().join("/"),
            destination,
            resolution.primary_code(),
            destination,
            airports_info(&resolution),
        );
        self.reply(chat_id, &text).await
    }

    async fn show_origins(&self, chat_id: i64) -> Result<()> {
        let config = self.service.config().await;
        let text = format!(
            "🛫 <b>Города вылета:</b> {}\n\n\
             💡 <i>Используйте:</i>\n\
             <code>/origin set москва</code> - сменить город вылета\n\
             <code>/origin list</code> - список доступных городов",
            self.origin_names(&config)
        );
        self.reply(chat_id, &text).await
    }

    fn origin_names(&self, config: &SearchConfig) -> String {
        config
            .origins()
            .iter()
            .map(|code| self.directory.display_name(code))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Parse command from message content; a trailing `@botname` is dropped
fn parse_command(content: &str) -> Option<(String, String)> {
    COMMAND_RE.captures(content).map(|caps| {
        let command = caps.get(1).map_or("", |m| m.as_str()).to_string();
        let args = caps.get(2).map_or("", |m| m.as_str()).to_string();
        (command, args)
    })
}

/// `[city words...] [months]`; a trailing integer is the horizon
fn parse_search_args(args: &str) -> Result<SearchArgs, String> {
    let mut tokens: Vec<&str> = args.split_whitespace().collect();
    let mut parsed = SearchArgs::default();

    if let Some(last) = tokens.last() {
        if let Ok(months) = last.parse::<i64>() {
            if months <= 0 {
                return Err(format!(
                    "❌ Глубина поиска должна быть положительным числом, получено: {}",
                    months
                ));
            }
            parsed.months = Some(u32::try_from(months).unwrap_or(u32::MAX));
            tokens.pop();
        }
    }

    if !tokens.is_empty() {
        parsed.city = Some(tokens.join(" "));
    }

    Ok(parsed)
}

fn city_not_found_text(err: &ResolveError) -> String {
    let ResolveError::UnresolvedCity { query, suggestions } = err;

    let mut text = format!(
        "❌ <b>Город '{}' не найден.</b>\n\n\
         💡 <i>Используйте:</i>\n\
         <code>/search бангкок</code> - поиск по названию\n\
         <code>/search BKK</code> - поиск по коду аэропорта\n\
         <code>/cities</code> - список доступных городов",
        escape_html(query)
    );
    if !suggestions.is_empty() {
        text.push_str(&format!("\n\n🤔 Возможно, вы имели в виду: {}", suggestions.join(", ")));
    }
    text
}

/// Rejected config edit, in the chat's language
fn config_error_text(err: &SearchError) -> String {
    let SearchError::InvalidConfig(problem) = err;
    match problem {
        ConfigProblem::NoOrigins => "❌ Не задан ни один город вылета.".to_string(),
        ConfigProblem::ZeroPrice => "❌ Максимальная цена должна быть больше нуля.".to_string(),
        ConfigProblem::ZeroDuration => "❌ Максимальное время в пути должно быть больше нуля.".to_string(),
        ConfigProblem::Horizon { months, max } => format!(
            "❌ Глубина поиска должна быть от 1 до {} мес., получено: {}",
            max, months
        ),
        ConfigProblem::NotAnAirportCode(code) => {
            format!("❌ '{}' не является кодом аэропорта.", escape_html(code))
        }
    }
}

fn airports_info(resolution: &Resolution) -> String {
    if resolution.codes().len() > 1 {
        format!("\n🏢 Доступные аэропорты: {}", resolution.codes().join(", "))
    } else {
        String::new()
    }
}

fn date_filter_line(filter: &DateFilter) -> String {
    match filter {
        DateFilter::Disabled => String::new(),
        DateFilter::Range { start, end } => {
            let bound = |d: &Option<chrono::NaiveDate>| {
                d.map(|d| d.format("%d.%m.%Y").to_string())
                    .unwrap_or_else(|| "…".to_string())
            };
            format!("\n• Даты вылета: {} – {}", bound(start), bound(end))
        }
        DateFilter::List(dates) => {
            let dates: Vec<String> = dates.iter().map(|d| d.format("%d.%m.%Y").to_string()).collect();
            format!("\n• Даты вылета: {}", dates.join(", "))
        }
    }
}

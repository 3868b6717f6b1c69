//! Application configuration
//!
//! Built-in defaults, then `config.toml` (or the file named by
//! `FAREWATCH_CONFIG`), then the flat environment variables, merged with figment.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::module::fare::{
    DEFAULT_CURRENCY, DEFAULT_LINK_BASE, DEFAULT_MAX_DURATION_MINUTES, DEFAULT_PRICE_URL,
    DateFilter, FareApiSettings, Pacing, SearchConfig,
};

pub const CONFIG_PATH_ENV: &str = "FAREWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable → config key
const ENV_KEYS: [(&str, &str); 15] = [
    ("LOG_LEVEL", "log_level"),
    ("TELEGRAM_BOT_URL", "telegram.api_url"),
    ("TELEGRAM_BOT_TOKEN", "telegram.token"),
    ("TELEGRAM_CHAT_ID", "telegram.chat_id"),
    ("ADMIN_USER_IDS", "telegram.admin_user_ids"),
    ("TRAVELPAYOUTS_TOKEN", "travelpayouts.token"),
    ("TRAVELPAYOUTS_URL_PRICE", "travelpayouts.price_url"),
    ("ORIGIN_IATA", "search.origins"),
    ("DESTINATION_IATA", "search.destination"),
    ("MAX_PRICE", "search.max_price"),
    ("MONTHS_TO_SEARCH", "search.months_ahead"),
    ("MAX_FLIGHT_TIME", "search.max_flight_time"),
    ("DATE_FILTER_START", "search.date_filter.start"),
    ("DATE_FILTER_END", "search.date_filter.end"),
    ("DATE_FILTER_LIST", "search.date_filter.dates"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
    #[serde(default, deserialize_with = "plain_string")]
    pub token: String,
    /// Chat that receives the daily report
    #[serde(default)]
    pub chat_id: Option<i64>,
    /// Users allowed to talk to the bot; empty allows everyone
    #[serde(default, deserialize_with = "comma_list")]
    pub admin_user_ids: Vec<i64>,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelpayoutsConfig {
    #[serde(default, deserialize_with = "plain_string")]
    pub token: String,
    #[serde(default = "default_price_url")]
    pub price_url: String,
    #[serde(default = "default_link_base")]
    pub link_base: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Pause between two upstream requests in a search pass
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilterConfig {
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(default, deserialize_with = "comma_list")]
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_origins", deserialize_with = "comma_list")]
    pub origins: Vec<String>,
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default = "default_months_ahead")]
    pub months_ahead: u32,
    #[serde(default = "default_max_price")]
    pub max_price: u32,
    /// Minutes
    #[serde(default = "default_max_flight_time")]
    pub max_flight_time: u32,
    #[serde(default)]
    pub date_filter: DateFilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local time of day, `HH:MM`
    #[serde(default = "default_daily_at")]
    pub daily_at: String,
    #[serde(default)]
    pub run_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub travelpayouts: TravelpayoutsConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    60
}

fn default_price_url() -> String {
    DEFAULT_PRICE_URL.to_string()
}

fn default_link_base() -> String {
    DEFAULT_LINK_BASE.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_origins() -> Vec<String> {
    vec!["OVB".to_string()]
}

fn default_destination() -> String {
    "DPS".to_string()
}

fn default_months_ahead() -> u32 {
    3
}

fn default_max_price() -> u32 {
    30000
}

fn default_max_flight_time() -> u32 {
    DEFAULT_MAX_DURATION_MINUTES
}

fn default_daily_at() -> String {
    "10:00".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            telegram: TelegramConfig::default(),
            travelpayouts: TravelpayoutsConfig::default(),
            search: SearchSettings::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_telegram_api_url(),
            token: String::new(),
            chat_id: None,
            admin_user_ids: Vec::new(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl Default for TravelpayoutsConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            price_url: default_price_url(),
            link_base: default_link_base(),
            currency: default_currency(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            origins: default_origins(),
            destination: default_destination(),
            months_ahead: default_months_ahead(),
            max_price: default_max_price(),
            max_flight_time: default_max_flight_time(),
            date_filter: DateFilterConfig::default(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_at: default_daily_at(),
            run_on_start: false,
        }
    }
}

/// Result of [`AppConfig::load`], kept until logging is up
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub file_found: bool,
    /// Environment values that were skipped
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn log_summary(&self) {
        if self.file_found {
            tracing::info!("Loaded config from {}", self.path.display());
        } else {
            tracing::info!("Config file {} not found, using defaults and environment", self.path.display());
        }
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
    }
}

/// `FAREWATCH_CONFIG`, or `config.toml` in the working directory
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV).map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

impl AppConfig {
    pub fn load() -> Result<LoadedConfig> {
        Self::load_from(config_path())
    }

    /// Merge defaults, the TOML file if present, and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<LoadedConfig> {
        let path = path.as_ref();
        let (env, warnings) = env_provider();

        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(env)
            .extract()
            .with_context(|| format!("failed to load config from {} and environment", path.display()))?;

        Ok(LoadedConfig {
            config,
            path: path.to_path_buf(),
            file_found: path.exists(),
            warnings,
        })
    }

    /// Validated initial search configuration
    pub fn search_config(&self) -> Result<SearchConfig> {
        let search = &self.search;
        let config = SearchConfig::new(
            &search.origins,
            &search.destination,
            search.months_ahead,
            search.max_price,
        )?
        .with_max_duration(search.max_flight_time)?
        .with_date_filter(search.date_filter.to_filter()?);
        Ok(config)
    }

    pub fn api_settings(&self) -> FareApiSettings {
        let mut settings =
            FareApiSettings::new(&self.travelpayouts.price_url, &self.travelpayouts.token);
        settings.currency = self.travelpayouts.currency.clone();
        settings.link_base = self.travelpayouts.link_base.clone();
        settings
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::fixed(Duration::from_millis(self.travelpayouts.request_delay_ms))
    }

    pub fn daily_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.schedule.daily_at.trim(), "%H:%M")
            .with_context(|| format!("invalid schedule.daily_at '{}'", self.schedule.daily_at))
    }

    /// Chats that receive the daily report: the configured chat, then admins, without repeats
    pub fn delivery_targets(&self) -> Vec<i64> {
        let mut targets = Vec::new();
        for id in self.telegram.chat_id.iter().chain(&self.telegram.admin_user_ids) {
            if !targets.contains(id) {
                targets.push(*id);
            }
        }
        targets
    }
}

impl DateFilterConfig {
    /// A non-empty date list wins over the range bounds
    pub fn to_filter(&self) -> Result<DateFilter> {
        if !self.dates.is_empty() {
            let dates = self
                .dates
                .iter()
                .map(|d| parse_date(d))
                .collect::<Result<Vec<_>>>()?;
            return Ok(DateFilter::List(dates));
        }

        let start = self.start.as_deref().map(parse_date).transpose()?;
        let end = self.end.as_deref().map(parse_date).transpose()?;
        if start.is_none() && end.is_none() {
            return Ok(DateFilter::Disabled);
        }
        if let (Some(start), Some(end)) = (start, end) {
            anyhow::ensure!(start <= end, "date filter start {} is after end {}", start, end);
        }
        Ok(DateFilter::Range { start, end })
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Env provider over the known variables. Values that would break extraction
/// are left out so the file or default value stays, and reported back.
fn env_provider() -> (Env, Vec<String>) {
    let names: Vec<&str> = ENV_KEYS.iter().map(|(name, _)| *name).collect();
    let env = Env::raw().only(&names);

    let mut skipped = Vec::new();
    let mut warnings = Vec::new();
    for (key, value) in env.iter() {
        if let Some(reason) = rejected_env_value(key.as_str(), &value) {
            warnings.push(format!("Ignoring {} '{}': {}", key.as_str(), value, reason));
            skipped.push(key.as_str().to_string());
        }
    }

    let skipped: Vec<&str> = skipped.iter().map(String::as_str).collect();
    let env = env
        .ignore(&skipped)
        .map(|key| env_key_path(key.as_str()).to_string().into());
    (env, warnings)
}

fn env_key_path(name: &str) -> &str {
    ENV_KEYS
        .iter()
        .find(|(env_name, _)| env_name.eq_ignore_ascii_case(name))
        .map_or(name, |(_, path)| *path)
}

fn rejected_env_value(name: &str, value: &str) -> Option<&'static str> {
    let value = value.trim();
    if value.is_empty() {
        return Some("empty value");
    }

    match name.to_ascii_uppercase().as_str() {
        "MAX_PRICE" | "MONTHS_TO_SEARCH" | "MAX_FLIGHT_TIME" if value.parse::<u32>().is_err() => {
            Some("not a number")
        }
        "TELEGRAM_CHAT_ID" if value.parse::<i64>().is_err() => Some("not a chat id"),
        "ADMIN_USER_IDS" if split_list(value).any(|id| id.parse::<i64>().is_err()) => {
            Some("not a list of user ids")
        }
        "ORIGIN_IATA" | "DATE_FILTER_LIST" if split_list(value).next().is_none() => Some("empty list"),
        _ => None,
    }
}

/// A string, even when the environment value looks like a number
fn plain_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    struct PlainString;

    impl Visitor<'_> for PlainString {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(PlainString)
}

/// A TOML array, a comma separated string, or a single number
fn comma_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    struct CommaList<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for CommaList<T>
    where
        T: Deserialize<'de> + FromStr,
        T::Err: fmt::Display,
    {
        type Value = Vec<T>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list or a comma separated string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Vec<T>, E> {
            split_list(v).map(|item| item.parse().map_err(E::custom)).collect()
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Vec<T>, E> {
            self.visit_str(&v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Vec<T>, E> {
            self.visit_str(&v.to_string())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Vec<T>, A::Error> {
            let mut items = Vec::new();
            while let Some(item) = seq.next_element()? {
                items.push(item);
            }
            Ok(items)
        }
    }

    deserializer.deserialize_any(CommaList(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.search.max_price, 30000);
        assert_eq!(config.search.months_ahead, 3);
        assert_eq!(config.search.max_flight_time, 1440);
        assert_eq!(config.telegram.poll_timeout_secs, 60);
        assert_eq!(config.daily_time().unwrap(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(config.pacing().delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let loaded = AppConfig::load_from("missing.toml").unwrap();
            assert!(!loaded.file_found);
            assert!(loaded.warnings.is_empty());
            assert_eq!(loaded.config.search.origins, vec!["OVB"]);
            assert_eq!(loaded.config.log_level, "info");
            Ok(())
        });
    }

    #[test]
    fn test_parse_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                log_level = "debug"

                [telegram]
                token = "bot-token"
                chat_id = -100200
                admin_user_ids = [1, 2]

                [search]
                origins = ["ovb", "bax"]
                destination = "dps"
                max_price = 35000
                months_ahead = 2

                [search.date_filter]
                start = "2024-03-01"
                end = "2024-03-31"

                [schedule]
                daily_at = "09:30"
                "#,
            )?;

            let loaded = AppConfig::load_from("config.toml").unwrap();
            assert!(loaded.file_found);
            let config = loaded.config;

            assert_eq!(config.log_level, "debug");
            assert_eq!(config.telegram.api_url, "https://api.telegram.org");
            assert_eq!(config.telegram.admin_user_ids, vec![1, 2]);
            assert_eq!(config.travelpayouts.price_url, DEFAULT_PRICE_URL);

            let search = config.search_config().unwrap();
            assert_eq!(search.origins(), ["OVB", "BAX"]);
            assert_eq!(search.destination(), "DPS");
            assert_eq!(search.max_price(), 35000);
            assert!(search.date_filter().is_enabled());
            assert_eq!(config.daily_time().unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
            Ok(())
        });
    }

    #[test]
    fn test_example_config_loads() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", include_str!("../../config.example.toml"))?;
            let config = AppConfig::load_from("config.toml").unwrap().config;
            assert_eq!(config.search.origins, vec!["OVB", "BAX"]);
            assert!(config.search_config().is_ok());
            assert!(config.daily_time().is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[search]\nmax_price = 35000\ndestination = \"BKK\"")?;
            jail.set_env("TELEGRAM_BOT_TOKEN", "123456:secret");
            jail.set_env("TELEGRAM_CHAT_ID", "42");
            jail.set_env("ADMIN_USER_IDS", "7, 8");
            jail.set_env("TRAVELPAYOUTS_TOKEN", "9876543210");
            jail.set_env("ORIGIN_IATA", "OVB,BAX");
            jail.set_env("MAX_PRICE", "25000");
            jail.set_env("MONTHS_TO_SEARCH", "6");
            jail.set_env("DATE_FILTER_LIST", "2024-03-10, 2024-03-17");
            jail.set_env("LOG_LEVEL", "warn");

            let loaded = AppConfig::load_from("config.toml").unwrap();
            assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
            let config = loaded.config;

            assert_eq!(config.telegram.token, "123456:secret");
            assert_eq!(config.telegram.chat_id, Some(42));
            assert_eq!(config.telegram.admin_user_ids, vec![7, 8]);
            assert_eq!(config.travelpayouts.token, "9876543210");
            assert_eq!(config.search.origins, vec!["OVB", "BAX"]);
            // file value survives where the environment is silent
            assert_eq!(config.search.destination, "BKK");
            assert_eq!(config.search.max_price, 25000);
            assert_eq!(config.search.months_ahead, 6);
            assert_eq!(config.search.date_filter.dates, vec!["2024-03-10", "2024-03-17"]);
            assert_eq!(config.log_level, "warn");
            Ok(())
        });
    }

    #[test]
    fn test_single_admin_id() {
        Jail::expect_with(|jail| {
            jail.set_env("ADMIN_USER_IDS", "42");
            let config = AppConfig::load_from("config.toml").unwrap().config;
            assert_eq!(config.telegram.admin_user_ids, vec![42]);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_env_values_are_skipped() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[search]\nmonths_ahead = 4")?;
            jail.set_env("MAX_PRICE", "cheap");
            jail.set_env("MONTHS_TO_SEARCH", "");
            jail.set_env("ADMIN_USER_IDS", "7,x");
            jail.set_env("ORIGIN_IATA", " , ");

            let loaded = AppConfig::load_from("config.toml").unwrap();
            let config = &loaded.config;
            assert_eq!(config.search.max_price, 30000);
            assert_eq!(config.search.months_ahead, 4);
            assert!(config.telegram.admin_user_ids.is_empty());
            assert_eq!(config.search.origins, vec!["OVB"]);

            assert_eq!(loaded.warnings.len(), 4);
            assert!(loaded.warnings.iter().any(|w| w.contains("MAX_PRICE 'cheap'")));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_search_config() {
        let mut config = AppConfig::default();
        assert!(config.search_config().is_ok());

        config.search.origins.clear();
        assert!(config.search_config().is_err());

        config.search.origins = vec!["OVB".to_string()];
        config.search.months_ahead = 0;
        assert!(config.search_config().is_err());
    }

    #[test]
    fn test_date_filter() {
        let mut filter = DateFilterConfig::default();
        assert_eq!(filter.to_filter().unwrap(), DateFilter::Disabled);

        filter.start = Some("2024-03-01".to_string());
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(filter.to_filter().unwrap(), DateFilter::Range { start: Some(start), end: None });

        filter.dates = vec!["2024-03-10".to_string()];
        let listed = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(filter.to_filter().unwrap(), DateFilter::List(vec![listed]));

        filter.dates = vec!["10.03.2024".to_string()];
        assert!(filter.to_filter().is_err());

        let reversed = DateFilterConfig {
            start: Some("2024-04-01".to_string()),
            end: Some("2024-03-01".to_string()),
            dates: Vec::new(),
        };
        assert!(reversed.to_filter().is_err());
    }

    #[test]
    fn test_delivery_targets() {
        let mut config = AppConfig::default();
        config.telegram.chat_id = Some(7);
        config.telegram.admin_user_ids = vec![5, 7, 9];
        assert_eq!(config.delivery_targets(), vec![7, 5, 9]);

        config.telegram.chat_id = None;
        assert_eq!(config.delivery_targets(), vec![5, 7, 9]);
    }
}

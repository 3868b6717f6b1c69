//! Fare report renderer
//!
//! Produces Telegram HTML: one block per origin with a fixed-width table of
//! the cheapest fares.

use chrono::{Datelike, Weekday};
use std::sync::Arc;

use super::airport::AirportDirectory;
use super::fare::{Fare, SearchConfig};

/// Rows shown per origin; the rest are dropped
pub const MAX_ROWS_PER_ORIGIN: usize = 10;

/// Reply when a pass found nothing under the ceilings
pub const NO_FARES_MESSAGE: &str = "ℹ️ Дешёвых билетов не найдено.";

const REPORT_TITLE: &str = "✈️ <b>НАЙДЕНЫ ДЕШЁВЫЕ БИЛЕТЫ!</b>\n\n";
const TABLE_HEADER: &str = "Дата          | Цена    | Время   | Пересад | Рейс\n";
const TABLE_RULE: &str = "--------------|---------|---------|---------|------\n";
const REPORT_FOOTER: &str = "📊 <b>Информация:</b>\n   • 🎫 - ссылка на покупку\n";

/// Fare report renderer
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    directory: Arc<AirportDirectory>,
}

impl ReportRenderer {
    pub fn new(directory: Arc<AirportDirectory>) -> Self {
        Self { directory }
    }

    /// Render fares grouped by origin, cheapest first
    pub fn render(&self, fares: &[Fare], config: &SearchConfig) -> String {
        let mut output = String::from(REPORT_TITLE);
        let destination = self.directory.display_name(config.destination());

        for (origin, mut group) in group_by_origin(fares) {
            // stable: equal prices keep arrival order
            group.sort_by_key(|fare| fare.price);

            output.push_str(&format!(
                "🛫 <b>{} → {}</b>\n",
                self.directory.display_name(origin),
                destination
            ));
            output.push_str("<code>");
            output.push_str(TABLE_HEADER);
            output.push_str(TABLE_RULE);
            output.push_str("</code>");

            for fare in group.iter().take(MAX_ROWS_PER_ORIGIN) {
                output.push_str(&format_row(fare));
            }
            output.push('\n');
        }

        output.push_str(REPORT_FOOTER);
        output
    }
}

/// Group fares by origin, groups in first-seen order
fn group_by_origin(fares: &[Fare]) -> Vec<(&str, Vec<&Fare>)> {
    let mut groups: Vec<(&str, Vec<&Fare>)> = Vec::new();

    for fare in fares {
        match groups.iter().position(|(origin, _)| *origin == fare.origin.as_str()) {
            Some(index) => groups[index].1.push(fare),
            None => groups.push((fare.origin.as_str(), vec![fare])),
        }
    }

    groups
}

/// One table row plus the purchase link
pub fn format_row(fare: &Fare) -> String {
    format!(
        "<code>{} {} | {:>6}₽ | {} | {:>7} | {}</code> <a href='{}'>🎫</a>\n",
        fare.departure_at.format("%d.%m.%Y"),
        weekday_abbrev(fare.departure_at.weekday()),
        fare.price,
        format_duration(fare.duration_minutes),
        transfers_text(fare.transfers),
        escape_html(&fare.airline),
        escape_html(&fare.link),
    )
}

/// "5ч 30м", "5ч" or "30м"
pub fn format_duration(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;

    if hours > 0 && mins > 0 {
        format!("{}ч {}м", hours, mins)
    } else if hours > 0 {
        format!("{}ч", hours)
    } else {
        format!("{}м", mins)
    }
}

pub fn transfers_text(transfers: u32) -> String {
    match transfers {
        0 => "прямой".to_string(),
        1 => "1 перес".to_string(),
        n => format!("{} перес", n),
    }
}

pub fn weekday_abbrev(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Пн",
        Weekday::Tue => "Вт",
        Weekday::Wed => "Ср",
        Weekday::Thu => "Чт",
        Weekday::Fri => "Пт",
        Weekday::Sat => "Сб",
        Weekday::Sun => "Вс",
    }
}

/// Escape text for Telegram HTML
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
}

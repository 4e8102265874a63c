//! Display formatting for prices and times.

use chrono::{DateTime, Utc};
use rust_decimal::RoundingStrategy;

use crate::types::Amount;

/// Formats an amount as US dollars, e.g. `$1,234.50`.
#[must_use]
pub fn format_currency(amount: Amount) -> String {
    let rounded = amount
        .value()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded);
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("${}.{}", grouped, cents)
}

/// Formats an auction end time.
#[must_use]
pub fn format_end_time(end_time: &DateTime<Utc>) -> String {
    end_time.format("%Y-%m-%d %H:%M UTC").to_string()
}

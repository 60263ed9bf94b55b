use chrono::{DateTime, Utc};

use common::Alarm;

/// Telegram-Markdown notification sent when `alarm` fires at `current_price`.
pub fn trigger_message(alarm: &Alarm, current_price: f64, tick_at: DateTime<Utc>) -> String {
    format!(
        "🚨 *ALARM TRIGGERED!*\n\n\
         📊 {symbol}\n\
         🎯 Target: {target}\n\
         💰 Current: {current}\n\
         📈 Status: {status}\n\n\
         ⏰ {time} UTC",
        symbol = alarm.symbol,
        target = format_usd(alarm.target_price),
        current = format_usd(current_price),
        status = alarm.condition.crossed_text(),
        time = tick_at.format("%H:%M:%S"),
    )
}

/// `$` amount with thousands separators. Sub-dollar prices keep six
/// decimals so small-cap pairs stay readable.
pub fn format_usd(value: f64) -> String {
    let decimals = if value.abs() < 1.0 { 6 } else { 2 };
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{frac_part}")
    }
}

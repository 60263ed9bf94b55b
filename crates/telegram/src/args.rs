//! Parsing of user-typed command arguments.
//!
//! Every error is the reply text to send back to the user.

use common::{normalize_symbol, Condition};

pub const ALARM_USAGE: &str = "❗ Correct usage: /alarm BTCUSDT 70000 above";
pub const DELETE_USAGE: &str = "❗ Correct usage: /delete_alarm <id>";
pub const PRICE_USAGE: &str = "❗ Usage: /price BTCUSDT";

/// Validated arguments of `/alarm <symbol> <price> <above|below>`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmRequest {
    pub symbol: String,
    pub target_price: f64,
    pub condition: Condition,
}

pub fn parse_alarm_args(args: &str) -> Result<AlarmRequest, String> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [symbol, price, condition] = parts.as_slice() else {
        return Err(ALARM_USAGE.to_string());
    };

    let symbol = trading_pair(symbol).ok_or_else(|| ALARM_USAGE.to_string())?;

    let target_price = price
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| "❗ Price must be a positive number.".to_string())?;

    let condition = condition
        .parse::<Condition>()
        .map_err(|_| "❗ Condition must be 'above' or 'below'.".to_string())?;

    Ok(AlarmRequest {
        symbol,
        target_price,
        condition,
    })
}

pub fn parse_alarm_id(args: &str) -> Result<i64, String> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    match parts.as_slice() {
        [id] if id.chars().all(|c| c.is_ascii_digit()) => {
            id.parse::<i64>().map_err(|_| DELETE_USAGE.to_string())
        }
        _ => Err(DELETE_USAGE.to_string()),
    }
}

pub fn parse_symbol(args: &str) -> Result<String, String> {
    args.split_whitespace()
        .next()
        .and_then(trading_pair)
        .ok_or_else(|| PRICE_USAGE.to_string())
}

/// Exchange pairs are plain `[A-Z0-9]+`; symbols are echoed into Markdown.
fn trading_pair(raw: &str) -> Option<String> {
    let symbol = normalize_symbol(raw);
    let valid = !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(symbol)
}

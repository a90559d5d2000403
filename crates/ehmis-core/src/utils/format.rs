use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::CellValue;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Group digits in thousands: `1234567` becomes `1,234,567`
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Whole-number form of a count, grouped in thousands
pub fn format_decimal_count(value: Decimal) -> String {
    let rounded = value.round();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let magnitude = rounded.abs().to_u64().unwrap_or(0);
    format!("{}{}", sign, format_count(magnitude))
}

/// A cell with its unit, e.g. `82.46%` or `N/A`
pub fn format_cell(cell: CellValue, unit: &str) -> String {
    match cell {
        CellValue::Value(_) => format!("{}{}", cell, unit),
        CellValue::NotAvailable => cell.to_string(),
    }
}

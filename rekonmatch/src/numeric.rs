//! Repair of numbers that a spreadsheet export wrote in exponent form,
//! e.g. account numbers that came out as `1.23457E+15`.

use tracing::debug;

use crate::dataset::{CellValue, Dataset};

/// Largest integer an IEEE double holds exactly
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

// Exponents beyond this are not spreadsheet output; leave them alone
const MAX_EXPONENT: i64 = 1024;

/// Expands a text cell written in exponent notation into positional form.
///
/// Whole numbers become `Integer` when they fit an `i64` and digit text
/// otherwise. Fractions become `Number` while within ±[`MAX_SAFE_INTEGER`]
/// and text beyond it. Returns `None` when the cell is not a number in
/// exponent form.
pub fn scientific_to_full(value: &CellValue) -> Option<CellValue> {
    let CellValue::Text(raw) = value else {
        return None;
    };
    let text = raw.trim();
    if !text.contains(['e', 'E']) || text.parse::<f64>().is_err() {
        return None;
    }

    let (mantissa, exponent) = text.split_once(['e', 'E'])?;
    let exp: i64 = exponent.parse().ok()?;
    if exp.abs() > MAX_EXPONENT {
        return None;
    }

    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    let (lead, decimal) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", lead, decimal);
    let point = lead.len() as i64 + exp;

    let (int_part, frac_part) = if point <= 0 {
        (
            String::from("0"),
            format!("{}{}", "0".repeat(point.unsigned_abs() as usize), digits),
        )
    } else if point as usize >= digits.len() {
        (
            format!("{}{}", digits, "0".repeat(point as usize - digits.len())),
            String::new(),
        )
    } else {
        let (int_part, frac_part) = digits.split_at(point as usize);
        (int_part.to_string(), frac_part.to_string())
    };

    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        let full = format!("{}{}", sign, int_part);
        return Some(match full.parse::<i64>() {
            Ok(n) => CellValue::Integer(n),
            Err(_) => CellValue::Text(full),
        });
    }

    let full = format!("{}{}.{}", sign, int_part, frac_part);
    match full.parse::<f64>() {
        Ok(n) if n.abs() <= MAX_SAFE_INTEGER => Some(CellValue::Number(n)),
        _ => Some(CellValue::Text(full)),
    }
}

/// Applies [`scientific_to_full`] to `columns` of every row (all columns
/// when `columns` is empty) and returns how many cells changed.
pub fn convert_scientific(dataset: &mut Dataset, columns: &[String]) -> usize {
    let mut converted = 0;
    for row in &mut dataset.rows {
        for (column, value) in row.iter_mut() {
            if !columns.is_empty() && !columns.iter().any(|c| c == column) {
                continue;
            }
            if let Some(full) = scientific_to_full(value) {
                *value = full;
                converted += 1;
            }
        }
    }
    debug!("Converted {} cells from exponent notation", converted);
    converted
}

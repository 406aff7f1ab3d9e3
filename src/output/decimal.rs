//! Exact plain-decimal rendering
//!
//! JSON numbers keep their upstream text (serde_json `arbitrary_precision`), which
//! may be in exponent form such as `1e21` or `1.5E-3`. A CSV numeric column needs
//! plain digits, so the exponent is applied by shifting the decimal point over the
//! digit string. No floating point rounding is involved.

use serde_json::Number;

/// Largest exponent magnitude that is expanded
pub const MAX_EXPONENT: i64 = 4_096;

/// Render numeric text as a plain decimal
///
/// - sign preserved, except that zero is never negative
/// - exponent removed, every significant digit kept
/// - plain input returned unchanged apart from sign normalization
/// - text that is not a number is returned unchanged
///
/// Only exponents within ±[`MAX_EXPONENT`] are expanded. Text with a larger
/// exponent is returned unchanged, exponent included, so the output for such
/// input is the one case that is not a plain decimal.
///
/// ```
/// use polygon_backfill::output::decimal::plain_decimal;
///
/// assert_eq!(plain_decimal("1e21"), "1000000000000000000000");
/// assert_eq!(plain_decimal("1.5e-3"), "0.0015");
/// assert_eq!(plain_decimal("-0"), "0");
/// ```
pub fn plain_decimal(text: &str) -> String {
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => match unsigned[pos + 1..].parse::<i64>() {
            Ok(exp) if exp.abs() <= MAX_EXPONENT => (&unsigned[..pos], Some(exp)),
            _ => return text.to_string(),
        },
        None => (unsigned, None),
    };

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits_ok = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty())
        || !digits_ok(int_part)
        || !digits_ok(frac_part)
    {
        return text.to_string();
    }

    let is_zero = int_part.bytes().chain(frac_part.bytes()).all(|b| b == b'0');

    let body = match exponent {
        None => mantissa.to_string(),
        Some(_) if is_zero => "0".to_string(),
        Some(exp) => shift_point(int_part, frac_part, exp),
    };

    if negative && !is_zero {
        format!("-{body}")
    } else {
        body
    }
}

/// Move the decimal point of `int_part.frac_part` by `exp` places
fn shift_point(int_part: &str, frac_part: &str, exp: i64) -> String {
    let mut digits: String = format!("{int_part}{frac_part}");
    // Position of the decimal point within `digits`
    let mut point = int_part.len() as i64 + exp;

    let leading_zeros = digits.bytes().take_while(|&b| b == b'0').count();
    digits.drain(..leading_zeros);
    point -= leading_zeros as i64;

    let len = digits.len() as i64;
    let mut out = if point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else if point >= len {
        format!("{}{}", digits, "0".repeat((point - len) as usize))
    } else {
        let (whole, frac) = digits.split_at(point as usize);
        format!("{whole}.{frac}")
    };

    if out.contains('.') {
        let kept = out.trim_end_matches('0').trim_end_matches('.').len();
        out.truncate(kept);
    }
    out
}

/// Render a JSON number as a plain decimal
pub fn format_number(number: &Number) -> String {
    plain_decimal(&number.to_string())
}

/// Render a float as the plain decimal of its shortest round-trip form
pub fn format_f64(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    plain_decimal(&format!("{value:e}"))
}

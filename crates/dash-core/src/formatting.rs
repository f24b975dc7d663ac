/// Format a number with comma thousands separators and exactly `decimals`
/// decimal places.
///
/// Non-finite input prints as zero, and values that round to zero never
/// carry a minus sign.
///
/// # Examples
///
/// ```
/// use dash_core::formatting::format_number;
///
/// assert_eq!(format_number(48_210.0, 0), "48,210");
/// assert_eq!(format_number(1_500.25, 1), "1,500.3");
/// assert_eq!(format_number(-312.0, 2), "-312.00");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let places = decimals as usize;
    if !value.is_finite() {
        return format!("{:.*}", places, 0.0);
    }

    // Scale up by one ULP first so exact decimal midpoints (1.005) round up.
    let scale = 10_f64.powi(decimals as i32);
    let rounded = (value.abs() * scale * (1.0 + f64::EPSILON)).round() / scale;

    let text = format!("{:.*}", places, rounded);
    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + whole.len() / 3 + 1);
    if value < 0.0 && rounded != 0.0 {
        out.push('-');
    }
    out.push_str(&with_separators(whole));
    if let Some(f) = fraction {
        out.push('.');
        out.push_str(f);
    }
    out
}

/// Compact widget notation: `950`, `1.2K`, `3.4M`, `1.1B`.
///
/// The unit is picked after rounding, so a value never prints as `1,000.0`
/// of a smaller unit.
///
/// # Examples
///
/// ```
/// use dash_core::formatting::format_compact;
///
/// assert_eq!(format_compact(950.0), "950");
/// assert_eq!(format_compact(1_250.0), "1.3K");
/// assert_eq!(format_compact(3_400_000.0), "3.4M");
/// assert_eq!(format_compact(999_999.0), "1.0M");
/// ```
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    if !value.is_finite() || abs.round() < 1e3 {
        return format_number(value, 0);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let (scaled, suffix) = [(1e3, "K"), (1e6, "M")]
        .into_iter()
        .map(|(divisor, suffix)| (abs / divisor, suffix))
        .find(|(scaled, _)| (scaled * 10.0 * (1.0 + f64::EPSILON)).round() < 10_000.0)
        .unwrap_or((abs / 1e9, "B"));
    format!("{}{}{}", sign, format_number(scaled, 1), suffix)
}

/// A percentage with a fixed number of decimals and a `%` suffix.
///
/// ```
/// use dash_core::formatting::format_percent;
///
/// assert_eq!(format_percent(36.6667, 2), "36.67%");
/// ```
pub fn format_percent(value: f64, decimals: u32) -> String {
    format!("{}%", format_number(value, decimals))
}

/// A percent change with an explicit sign, e.g. `+12.5%` or `-3.0%`.
///
/// ```
/// use dash_core::formatting::format_change;
///
/// assert_eq!(format_change(12.5, 1), "+12.5%");
/// assert_eq!(format_change(-3.0, 1), "-3.0%");
/// assert_eq!(format_change(0.0, 1), "0.0%");
/// ```
pub fn format_change(value: f64, decimals: u32) -> String {
    let body = format_percent(value, decimals);
    let is_zero = body.trim_end_matches('%').chars().all(|c| matches!(c, '0' | '.' | ','));
    if value > 0.0 && !is_zero {
        format!("+{}", body)
    } else {
        body
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// `"1234567"` → `"1,234,567"`.
fn with_separators(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_zero_keeps_decimals() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 3), "0.000");
    }

    #[test]
    fn test_format_number_separators() {
        assert_eq!(format_number(999.0, 0), "999");
        assert_eq!(format_number(1_000.0, 0), "1,000");
        assert_eq!(format_number(300_000.0, 0), "300,000");
        assert_eq!(format_number(12_345_678.9, 1), "12,345,678.9");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-4_500.5, 1), "-4,500.5");
        assert_eq!(format_number(-0.004, 2), "0.00");
    }

    #[test]
    fn test_format_number_midpoint_rounds_up() {
        assert_eq!(format_number(1.005, 2), "1.01");
        assert_eq!(format_number(2.5, 0), "3");
    }

    #[test]
    fn test_format_number_non_finite() {
        assert_eq!(format_number(f64::NAN, 2), "0.00");
        assert_eq!(format_number(f64::NEG_INFINITY, 0), "0");
    }

    #[test]
    fn test_format_compact_thresholds() {
        assert_eq!(format_compact(0.0), "0");
        assert_eq!(format_compact(999.0), "999");
        assert_eq!(format_compact(1_000.0), "1.0K");
        assert_eq!(format_compact(2_500_000.0), "2.5M");
        assert_eq!(format_compact(1_100_000_000.0), "1.1B");
        assert_eq!(format_compact(-4_200.0), "-4.2K");
    }

    #[test]
    fn test_format_compact_rounding_moves_to_next_unit() {
        assert_eq!(format_compact(999.4), "999");
        assert_eq!(format_compact(999.6), "1.0K");
        assert_eq!(format_compact(999_949.0), "999.9K");
        assert_eq!(format_compact(999_999.0), "1.0M");
        assert_eq!(format_compact(999_999_999.0), "1.0B");
        assert_eq!(format_compact(-999_999.0), "-1.0M");
        assert_eq!(format_compact(2_500_000_000_000.0), "2,500.0B");
        assert_eq!(format_compact(f64::NAN), "0");
    }

    #[test]
    fn test_format_percent_funnel_values() {
        assert_eq!(format_percent(13.3333, 2), "13.33%");
        assert_eq!(format_percent(50.0, 0), "50%");
    }

    #[test]
    fn test_format_change_signs() {
        assert_eq!(format_change(50.0, 0), "+50%");
        assert_eq!(format_change(-25.0, 0), "-25%");
        assert_eq!(format_change(0.0, 2), "0.00%");
        assert_eq!(format_change(0.001, 1), "0.0%");
        assert_eq!(format_change(1_250.0, 0), "+1,250%");
    }
}

//! Number formatting for emitted values

/// Decimal places used when the input does not declare `(<decimalPlacesCarried>`
pub const DEFAULT_DECIMAL_PLACES: u32 = 3;

/// Most decimal places an f64 carries meaningfully
pub const MAX_DECIMAL_PLACES: u32 = 10;

/// Round a value to a number of decimal places, at most [`MAX_DECIMAL_PLACES`]
pub fn round_to_places(value: f64, places: u32) -> f64 {
    let multiplier = 10_f64.powi(places.min(MAX_DECIMAL_PLACES) as i32);
    (value * multiplier).round() / multiplier
}

/// Render a value rounded to `places`, keeping at least one fractional digit
///
/// `5` renders as `5.0`, `0.04108` with three places as `0.041`.
pub fn format_rounded(value: f64, places: u32) -> String {
    let rounded = round_to_places(value, places.max(1));
    // -0.0 renders as "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };

    let mut text = format!("{}", rounded);
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

//! Measurement-unit canonicalization.
//!
//! `normalize_unit` is a case-insensitive, trimmed lookup against a static
//! alias map; on miss the input is returned unchanged. Pure, thread-safe,
//! O(1), no errors. Idempotent: the canonical spellings are not aliases of
//! anything else.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Canonical spellings for brochure unit variants.
static UNIT_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // Fuel efficiency
        ("kmpl", "km/l"),
        ("km per litre", "km/l"),
        ("km per liter", "km/l"),
        ("kms/l", "km/l"),
        ("mpg", "mi/gal"),
        // Distance / dimensions
        ("millimetre", "mm"),
        ("millimeter", "mm"),
        ("millimetres", "mm"),
        ("millimeters", "mm"),
        ("centimetre", "cm"),
        ("centimeter", "cm"),
        ("metre", "m"),
        ("meter", "m"),
        ("metres", "m"),
        ("meters", "m"),
        ("kilometre", "km"),
        ("kilometer", "km"),
        ("kilometres", "km"),
        ("kilometers", "km"),
        ("kms", "km"),
        // Speed
        ("kmph", "km/h"),
        ("km per hour", "km/h"),
        ("kph", "km/h"),
        ("mph", "mi/h"),
        // Volume
        ("litre", "l"),
        ("liter", "l"),
        ("litres", "l"),
        ("liters", "l"),
        ("ltr", "l"),
        ("ltrs", "l"),
        ("cubic centimetre", "cc"),
        ("cubic centimeter", "cc"),
        ("cm3", "cc"),
        // Power / torque
        ("horsepower", "hp"),
        ("brake horsepower", "bhp"),
        ("metric horsepower", "ps"),
        ("newton metre", "nm"),
        ("newton meter", "nm"),
        ("newton metres", "nm"),
        ("newton meters", "nm"),
        ("n-m", "nm"),
        ("n·m", "nm"),
        // Mass
        ("kilogram", "kg"),
        ("kilograms", "kg"),
        ("kgs", "kg"),
        ("tonne", "t"),
        ("tonnes", "t"),
        // Electrical
        ("kilowatt", "kw"),
        ("kilowatts", "kw"),
        ("kilowatt hour", "kwh"),
        ("kilowatt-hour", "kwh"),
        ("kilowatt hours", "kwh"),
        ("ampere hour", "ah"),
        ("ampere-hour", "ah"),
        ("volt", "v"),
        ("volts", "v"),
        // Time
        ("second", "s"),
        ("seconds", "s"),
        ("sec", "s"),
        ("secs", "s"),
        // Rotation
        ("revolutions per minute", "rpm"),
    ])
});

/// Multi-character unit tokens recognized during value scanning.
///
/// Canonical spellings first, followed by alias spellings that appear
/// verbatim in brochures.
pub static KNOWN_UNITS: &[&str] = &[
    "km/l", "kmpl", "mpg", "mm", "cm", "km", "kms", "km/h", "kmph", "kph", "mph", "cc", "hp",
    "bhp", "ps", "nm", "kg", "kgs", "kw", "kwh", "ah", "rpm", "ltr", "litres", "liters",
    "litre", "liter", "sec", "secs", "seconds",
];

/// Single-character unit tokens. These only count as units when the rest
/// of the value is numeric, so free text is not misread as a measurement.
pub static SINGLE_CHAR_UNITS: &[&str] = &["l", "m", "v", "s", "t"];

/// Canonicalize a measurement unit. Unknown units pass through unchanged.
#[must_use]
pub fn normalize_unit(unit: &str) -> String {
    let key = unit.trim().to_lowercase();
    UNIT_ALIASES
        .get(key.as_str())
        .map_or_else(|| unit.trim().to_string(), |canonical| (*canonical).to_string())
}

/// Whether a token is a recognized multi-character unit.
#[must_use]
pub fn is_known_unit(token: &str) -> bool {
    let lower = token.to_lowercase();
    KNOWN_UNITS.contains(&lower.as_str())
}

/// Whether a token is a recognized single-character unit.
#[must_use]
pub fn is_single_char_unit(token: &str) -> bool {
    let lower = token.to_lowercase();
    SINGLE_CHAR_UNITS.contains(&lower.as_str())
}

/// Whether a string is numeric for unit-scanning purposes: digits, `.`,
/// `,`, with an optional leading `-`.
#[must_use]
pub fn is_numeric_portion(s: &str) -> bool {
    let trimmed = s.trim();
    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    !body.is_empty()
        && body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
        && body.chars().any(|c| c.is_ascii_digit())
}

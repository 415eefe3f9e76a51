//! Field extraction helpers for raw ACLED records.
//!
//! ACLED serves most numeric columns as strings, but not consistently, so
//! every numeric helper accepts either a JSON string or a JSON number.

use peace_map_acled_models::RawRecord;
use serde_json::Value;

/// Gets a trimmed, non-empty string field.
#[must_use]
pub fn get_str<'a>(record: &'a RawRecord, field: &str) -> Option<&'a str> {
    record
        .get(field)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parses a coordinate from a numeric string or a JSON number. Returns
/// `None` for anything missing, unparseable or non-finite.
#[must_use]
pub fn parse_coordinate(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Parses the record's `latitude`/`longitude` pair.
///
/// Both must be present, finite and within WGS84 range. Zero is a valid
/// coordinate.
#[must_use]
pub fn parse_lat_lng(record: &RawRecord) -> Option<(f64, f64)> {
    let latitude = parse_coordinate(record.get("latitude"))?;
    let longitude = parse_coordinate(record.get("longitude"))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }
    Some((latitude, longitude))
}

/// Parses a fatality count. Missing, negative or unparseable values count
/// as zero. Strings are read up to the first non-digit, so `"12.0"` is 12.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_fatalities(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
        }),
        Some(Value::String(s)) => leading_integer(s),
        _ => None,
    };
    parsed.map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

/// Leading digits of `s`. A run of digits too wide for `u64` saturates.
fn leading_integer(s: &str) -> Option<u64> {
    let s = s.trim();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let digits = &s[..end];
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn coordinates_accept_strings_and_numbers() {
        assert_eq!(parse_coordinate(Some(&json!("50.45"))), Some(50.45));
        assert_eq!(parse_coordinate(Some(&json!(" -12.5 "))), Some(-12.5));
        assert_eq!(parse_coordinate(Some(&json!(30.52))), Some(30.52));
    }

    #[test]
    fn coordinates_reject_garbage() {
        assert_eq!(parse_coordinate(None), None);
        assert_eq!(parse_coordinate(Some(&json!(""))), None);
        assert_eq!(parse_coordinate(Some(&json!("north"))), None);
        assert_eq!(parse_coordinate(Some(&json!("NaN"))), None);
        assert_eq!(parse_coordinate(Some(&json!("inf"))), None);
        assert_eq!(parse_coordinate(Some(&Value::Null)), None);
    }

    #[test]
    fn lat_lng_must_be_in_range() {
        let ok = record(json!({"latitude": "0", "longitude": "0"}));
        assert_eq!(parse_lat_lng(&ok), Some((0.0, 0.0)));

        let bad_lat = record(json!({"latitude": "91", "longitude": "10"}));
        assert_eq!(parse_lat_lng(&bad_lat), None);

        let bad_lng = record(json!({"latitude": "10", "longitude": "-180.5"}));
        assert_eq!(parse_lat_lng(&bad_lng), None);

        let missing = record(json!({"latitude": "10"}));
        assert_eq!(parse_lat_lng(&missing), None);
    }

    #[test]
    fn fatalities_default_to_zero() {
        assert_eq!(parse_fatalities(None), 0);
        assert_eq!(parse_fatalities(Some(&json!(""))), 0);
        assert_eq!(parse_fatalities(Some(&json!("unknown"))), 0);
        assert_eq!(parse_fatalities(Some(&json!("-3"))), 0);
        assert_eq!(parse_fatalities(Some(&json!(-3))), 0);
    }

    #[test]
    fn fatalities_parse_leading_digits() {
        assert_eq!(parse_fatalities(Some(&json!("12"))), 12);
        assert_eq!(parse_fatalities(Some(&json!("12.9"))), 12);
        assert_eq!(parse_fatalities(Some(&json!(7))), 7);
        assert_eq!(parse_fatalities(Some(&json!(7.8))), 7);
    }

    #[test]
    fn oversized_fatalities_saturate() {
        assert_eq!(
            parse_fatalities(Some(&json!("99999999999999999999"))),
            u32::MAX
        );
        assert_eq!(parse_fatalities(Some(&json!("4294967296 killed"))), u32::MAX);
        assert_eq!(parse_fatalities(Some(&json!(1e20))), u32::MAX);
    }

    #[test]
    fn get_str_skips_blank_values() {
        let r = record(json!({"notes": "  ", "actor1": " Militia ", "n": 3}));
        assert_eq!(get_str(&r, "notes"), None);
        assert_eq!(get_str(&r, "actor1"), Some("Militia"));
        assert_eq!(get_str(&r, "n"), None);
    }
}

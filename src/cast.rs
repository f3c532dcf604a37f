//! Lenient and strict value casting.
//!
//! The pipeline deliberately distinguishes two conversion contracts:
//!
//! - [`lenient_cast`]: never fails; a value that cannot be converted becomes [`Value::Null`].
//!   Declared-type application, filter literals, and harmonization all use this, and
//!   downstream code depends on the null-on-failure behavior.
//! - [`strict_cast`]: all-or-nothing; used only by the fingerprint profiler, where "every
//!   sampled cell converts" is the signal that a column *is* that type.

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::{Column, DataType, Value};

/// Datetime formats tried in order by the permissive temporal parsers.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Date-only formats tried in order by the permissive temporal parsers.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%m/%d/%Y"];

/// Convert `value` to `target`, yielding [`Value::Null`] for anything unconvertible.
///
/// String inputs are trimmed before parsing. A `target` of [`DataType::Null`] leaves the
/// value untouched (there is no concrete type to cast to).
pub fn lenient_cast(value: &Value, target: DataType) -> Value {
    strict_cast(value, target).unwrap_or(Value::Null)
}

/// Convert `value` to `target`, or `None` if the value cannot represent that type.
///
/// Nulls pass through unchanged (`Some(Value::Null)`).
pub fn strict_cast(value: &Value, target: DataType) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }
    match target {
        DataType::Null => Some(value.clone()),
        DataType::Int64 => cast_int(value).map(Value::Int64),
        DataType::Float64 => cast_float(value).map(Value::Float64),
        DataType::Bool => cast_bool(value).map(Value::Bool),
        DataType::Utf8 => Some(Value::Utf8(value.render())),
        DataType::Date => cast_date(value).map(Value::Date),
        DataType::Datetime => cast_datetime(value).map(Value::Datetime),
    }
}

/// Lenient-cast a whole column to `target`, updating its dtype.
pub fn cast_column_lenient(column: &Column, target: DataType) -> Column {
    let values = column.values.iter().map(|v| lenient_cast(v, target)).collect();
    Column::new(column.name.clone(), target, values)
}

/// Fix a freshly sliced raw column to one concrete type.
///
/// If every non-null cell already shares one type class, that class wins; a mix of classes
/// degrades to `Utf8` via lenient casts; an all-null column keeps [`DataType::Null`].
pub fn fix_column_type(name: impl Into<String>, values: Vec<Value>) -> Column {
    let mut observed: Option<DataType> = None;
    let mut mixed = false;
    for v in values.iter().filter(|v| !v.is_null()) {
        match observed {
            None => observed = Some(v.data_type()),
            Some(t) if t == v.data_type() => {}
            Some(_) => {
                mixed = true;
                break;
            }
        }
    }

    match (observed, mixed) {
        (None, _) => Column::new(name, DataType::Null, values),
        (Some(t), false) => Column::new(name, t, values),
        (Some(_), true) => {
            let values = values
                .iter()
                .map(|v| lenient_cast(v, DataType::Utf8))
                .collect();
            Column::new(name, DataType::Utf8, values)
        }
    }
}

fn cast_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int64(v) => Some(*v),
        Value::Float64(v) => {
            if v.is_finite() && v.fract() == 0.0 {
                Some(*v as i64)
            } else {
                None
            }
        }
        Value::Bool(v) => Some(i64::from(*v)),
        Value::Utf8(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn cast_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float64(v) => Some(*v),
        Value::Int64(v) => Some(*v as f64),
        Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        Value::Utf8(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn cast_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(v) => Some(*v),
        Value::Int64(v) => Some(*v != 0),
        Value::Float64(v) => Some(*v != 0.0),
        Value::Utf8(s) => parse_bool_str(s.trim()),
        _ => None,
    }
}

fn cast_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(v) => Some(*v),
        Value::Datetime(v) => Some(v.date()),
        Value::Utf8(s) => parse_date_permissive(s.trim()),
        _ => None,
    }
}

fn cast_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Datetime(v) => Some(*v),
        Value::Date(v) => v.and_hms_opt(0, 0, 0),
        Value::Utf8(s) => parse_datetime_permissive(s.trim()),
        _ => None,
    }
}

fn parse_bool_str(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Parse a datetime from a string, trying a fixed list of common formats.
pub(crate) fn parse_datetime_permissive(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    parse_date_permissive(s).and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_date_permissive(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_cast_yields_null_on_failure() {
        assert_eq!(lenient_cast(&Value::Utf8("abc".into()), DataType::Int64), Value::Null);
        assert_eq!(lenient_cast(&Value::Float64(1.5), DataType::Int64), Value::Null);
        assert_eq!(lenient_cast(&Value::Date(date(2024, 1, 1)), DataType::Float64), Value::Null);
    }

    #[test]
    fn lenient_cast_converts_compatible_values() {
        assert_eq!(lenient_cast(&Value::Utf8(" 42 ".into()), DataType::Int64), Value::Int64(42));
        assert_eq!(lenient_cast(&Value::Float64(3.0), DataType::Int64), Value::Int64(3));
        assert_eq!(lenient_cast(&Value::Int64(7), DataType::Float64), Value::Float64(7.0));
        assert_eq!(lenient_cast(&Value::Utf8("yes".into()), DataType::Bool), Value::Bool(true));
        assert_eq!(
            lenient_cast(&Value::Utf8("2024-05-17".into()), DataType::Date),
            Value::Date(date(2024, 5, 17))
        );
        assert_eq!(
            lenient_cast(&Value::Utf8("17/05/2024".into()), DataType::Date),
            Value::Date(date(2024, 5, 17))
        );
    }

    #[test]
    fn nulls_pass_through_every_target() {
        for target in [
            DataType::Int64,
            DataType::Float64,
            DataType::Bool,
            DataType::Utf8,
            DataType::Date,
            DataType::Datetime,
        ] {
            assert_eq!(lenient_cast(&Value::Null, target), Value::Null);
        }
    }

    #[test]
    fn strict_cast_fails_where_lenient_nulls() {
        assert_eq!(strict_cast(&Value::Utf8("abc".into()), DataType::Float64), None);
        assert_eq!(
            strict_cast(&Value::Utf8("2.5".into()), DataType::Float64),
            Some(Value::Float64(2.5))
        );
    }

    #[test]
    fn fix_column_type_handles_uniform_mixed_and_null() {
        let uniform = fix_column_type("a", vec![Value::Int64(1), Value::Null, Value::Int64(2)]);
        assert_eq!(uniform.dtype, DataType::Int64);

        let mixed = fix_column_type("b", vec![Value::Int64(1), Value::Utf8("x".into())]);
        assert_eq!(mixed.dtype, DataType::Utf8);
        assert_eq!(mixed.values, vec![Value::Utf8("1".into()), Value::Utf8("x".into())]);

        let nulls = fix_column_type("c", vec![Value::Null, Value::Null]);
        assert_eq!(nulls.dtype, DataType::Null);
    }

    #[test]
    fn datetime_parsing_accepts_datetime_and_date_strings() {
        let dt = parse_datetime_permissive("2024-05-17 10:30:00").unwrap();
        assert_eq!(dt.date(), date(2024, 5, 17));
        let midnight = parse_datetime_permissive("2024-05-17").unwrap();
        assert_eq!(midnight, date(2024, 5, 17).and_hms_opt(0, 0, 0).unwrap());
        assert!(parse_datetime_permissive("not a date").is_none());
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }
}

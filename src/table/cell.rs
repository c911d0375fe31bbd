use crate::table::column::ColumnType;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use std::fmt::Display;

/// Literals read as missing values, matching common tabular tooling.
pub(crate) const NULL_LITERALS: [&str; 13] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>", "#NA",
];

/// A single scalar cell of a table.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Missing value
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Hashable view of a value used for exact-row comparison.
/// Floats compare by bit pattern after folding `-0.0` and NaN payloads.
#[derive(Debug, Hash, PartialEq, Eq)]
pub(crate) enum HashKey<'a> {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(u64),
    Text(&'a str),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Reads a raw text field as the most specific value it can represent.
    pub(crate) fn infer(raw: &str) -> Value {
        if NULL_LITERALS.contains(&raw) {
            return Value::Null;
        }
        // surrounding blanks are ignored for parsing only; a blank field stays text
        let trimmed = raw.trim();
        match trimmed {
            "True" | "TRUE" | "true" => return Value::Boolean(true),
            "False" | "FALSE" | "false" => return Value::Boolean(false),
            _ => (),
        }
        if let Ok(integer) = trimmed.parse::<i64>() {
            return Value::Integer(integer);
        }
        if is_float_literal(trimmed) {
            if let Ok(float) = trimmed.parse::<f64>() {
                return Value::Float(float);
            }
        }
        if let Some(date) = parse_iso_date(trimmed) {
            return Value::Date(date);
        }
        if let Some(datetime) = parse_iso_datetime(trimmed) {
            return Value::DateTime(datetime);
        }
        Value::Text(raw.to_owned())
    }

    /// Returns the column type this value belongs to, `None` for missing values.
    pub fn kind(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(ColumnType::Boolean),
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Text(_) => Some(ColumnType::Text),
            Value::Date(_) => Some(ColumnType::Date),
            Value::DateTime(_) => Some(ColumnType::DateTime),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Converts the value into the representation used by a column of `kind`.
    pub(crate) fn coerce(self, kind: ColumnType) -> Value {
        match (self, kind) {
            (Value::Null, _) => Value::Null,
            (Value::Integer(value), ColumnType::Float) => Value::Float(value as f64),
            (Value::Date(date), ColumnType::DateTime) => {
                Value::DateTime(date.and_hms_opt(0, 0, 0).expect("Append 00:00:00"))
            }
            (value @ Value::Text(_), ColumnType::Text) => value,
            (value, ColumnType::Text) => Value::Text(value.to_string()),
            (value, _) => value,
        }
    }

    pub(crate) fn hash_key(&self) -> HashKey<'_> {
        match self {
            Value::Null => HashKey::Null,
            Value::Boolean(value) => HashKey::Boolean(*value),
            Value::Integer(value) => HashKey::Integer(*value),
            Value::Float(value) if value.is_nan() => HashKey::Float(f64::NAN.to_bits()),
            Value::Float(value) if *value == 0.0 => HashKey::Float(0f64.to_bits()),
            Value::Float(value) => HashKey::Float(value.to_bits()),
            Value::Text(value) => HashKey::Text(value),
            Value::Date(value) => HashKey::Date(*value),
            Value::DateTime(value) => HashKey::DateTime(*value),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(true) => write!(f, "True"),
            Value::Boolean(false) => write!(f, "False"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{}", format_float(*value)),
            Value::Text(value) => write!(f, "{value}"),
            Value::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Value::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

/// Formats a float the way spreadsheet exports usually do: integral values keep one decimal.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_owned()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Accepts decimal and exponent notation, rejects words Rust would parse ("inf", "nan").
fn is_float_literal(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub(crate) fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    if value.len() < 16 {
        return None;
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_scalars() {
        assert_eq!(Value::infer(""), Value::Null);
        assert_eq!(Value::infer("NaN"), Value::Null);
        assert_eq!(Value::infer("  "), Value::Text("  ".to_owned()));
        assert_eq!(Value::infer(" 7 "), Value::Integer(7));
        assert_eq!(Value::infer("TRUE"), Value::Boolean(true));
        assert_eq!(Value::infer("42"), Value::Integer(42));
        assert_eq!(Value::infer("-1.5e2"), Value::Float(-150.0));
        assert_eq!(Value::infer("inf"), Value::Text("inf".to_owned()));
        assert_eq!(
            Value::infer("2024-02-29"),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(
            Value::infer("2024-02-29T10:30:00"),
            Value::DateTime(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(10, 30, 0).unwrap())
        );
        assert_eq!(Value::infer("hello"), Value::Text("hello".to_owned()));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Float(4.0).to_string(), "4.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Boolean(false).to_string(), "False");
        assert_eq!(Value::Null.to_string(), "");
        let datetime = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap();
        assert_eq!(Value::DateTime(datetime).to_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn coerce_widens() {
        assert_eq!(Value::Integer(3).coerce(ColumnType::Float), Value::Float(3.0));
        assert_eq!(Value::Integer(3).coerce(ColumnType::Text), Value::Text("3".to_owned()));
        assert_eq!(Value::Null.coerce(ColumnType::Text), Value::Null);
    }

    #[test]
    fn hash_key_folds_floats() {
        assert_eq!(Value::Float(-0.0).hash_key(), Value::Float(0.0).hash_key());
        assert_eq!(Value::Float(f64::NAN).hash_key(), Value::Float(-f64::NAN).hash_key());
        assert_ne!(Value::Float(1.0).hash_key(), Value::Float(2.0).hash_key());
    }
}

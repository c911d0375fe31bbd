//! Office Open XML spreadsheet helpers shared by the reader and the writer:
//! cell kinds, number format classification, package relationships and
//! serial date conversion.
use crate::error::DataSweeperError;
use crate::format::FormatError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use chrono::Datelike;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Timelike;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Microseconds in one day
const DAY_MICROSECONDS: f64 = 86_400_000_000f64;

/// Kinds of cell content found in a worksheet.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as 0/1
    Boolean,
    /// Plain numeric values
    Number,
    /// Serial numbers formatted as dates
    NumberDate,
    /// Serial numbers formatted as dates with time
    NumberDateTime,
    /// Serial numbers formatted as time of day
    NumberTime,
    /// ISO 8601 date/time strings (`t="d"`)
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values such as `#N/A`
    Error,
}

impl CellType {
    /// Classifies built-in number format IDs.
    pub(crate) fn parse_builtin_number_format_id(id: &str) -> Option<Self> {
        match id {
            "22" => Some(Self::NumberDateTime),
            "14" | "15" | "16" | "17" => Some(Self::NumberDate),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::NumberTime),
            _ => None,
        }
    }

    /// Classifies custom number format codes by scanning for date/time tokens
    /// outside literals, escapes and bracketed sections.
    pub(crate) fn parse_custom_number_format(format: &str) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_bracket = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time) {
            (true, true) => Self::NumberDateTime,
            (true, false) => Self::NumberDate,
            (false, true) => Self::NumberTime,
            (false, false) => Self::Number,
        }
    }
}

/// Maps cell style indexes to cell kinds using custom and built-in formats.
pub(crate) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, CellType>) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Loads worksheet relationships (`Id` → part path) from a relationships part.
pub(crate) fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, DataSweeperError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| FormatError::ParseError(format!("Missing package part '{path}'")))?;
    let mut relationships = HashMap::<String, String>::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves a relationship target to a path inside the package.
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Converts a serial day number to a timestamp.
/// The 1900 system reproduces the Lotus 1-2-3 leap year bug (serial 60 is
/// the nonexistent 1900-02-29).
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let date = epoch.checked_add_signed(Duration::days(days))?;
    let micros = (serial.fract() * DAY_MICROSECONDS).round() as i64;
    date.and_hms_opt(0, 0, 0)?.checked_add_signed(Duration::microseconds(micros))
}

/// Returns true for dates a 1900-system workbook can hold as a serial
/// (1900-01-01 through 9999-12-31).
pub(crate) fn has_serial(date: NaiveDate) -> bool {
    (1900..=9999).contains(&date.year())
}

/// Converts a timestamp to a 1900-system serial day number.
pub(crate) fn datetime_to_serial(datetime: &NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).expect("NaiveDate Literal");
    let mut days = (datetime.date() - epoch).num_days();
    if days < 61 {
        days -= 1;
    }
    let time = datetime.time();
    let micros = time.num_seconds_from_midnight() as f64 * 1_000_000f64 + (time.nanosecond() / 1_000) as f64;
    days as f64 + micros / DAY_MICROSECONDS
}

/// Formats a day fraction as `HH:MM:SS`, with milliseconds when present.
pub(crate) fn to_time_string(fraction: f64) -> String {
    let mut milliseconds = (fraction.fract() * 86_400_000f64).round() as i64;
    let millis = milliseconds % 1_000; milliseconds /= 1_000;
    let seconds = milliseconds % 60; milliseconds /= 60;
    let minutes = milliseconds % 60; milliseconds /= 60;
    let hours = milliseconds;
    if millis > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn custom_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd"), CellType::NumberDate);
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd hh:mm:ss"), CellType::NumberDateTime);
        assert_eq!(CellType::parse_custom_number_format("hh:mm"), CellType::NumberTime);
        assert_eq!(CellType::parse_custom_number_format("0.00"), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("\"days\" 0"), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00"), CellType::Number);
    }

    #[test]
    fn builtin_formats() {
        assert_eq!(CellType::parse_builtin_number_format_id("14"), Some(CellType::NumberDate));
        assert_eq!(CellType::parse_builtin_number_format_id("22"), Some(CellType::NumberDateTime));
        assert_eq!(CellType::parse_builtin_number_format_id("0"), None);
    }

    #[test]
    fn number_formats_by_style_index() {
        let custom = HashMap::from([("164".to_owned(), CellType::NumberDate)]);
        let formats = load_number_formats(vec!["0".to_owned(), "164".to_owned(), "22".to_owned()], custom);
        assert_eq!(formats, vec![CellType::Number, CellType::NumberDate, CellType::NumberDateTime]);
    }

    #[test]
    fn serial_dates_1900() {
        assert_eq!(serial_to_datetime(1.0, false), Some(datetime(1900, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(59.0, false), Some(datetime(1900, 2, 28, 0, 0, 0)));
        assert_eq!(serial_to_datetime(61.0, false), Some(datetime(1900, 3, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(45292.5, false), Some(datetime(2024, 1, 1, 12, 0, 0)));
        assert_eq!(serial_to_datetime(-1.0, false), None);
    }

    #[test]
    fn serial_dates_1904() {
        assert_eq!(serial_to_datetime(0.0, true), Some(datetime(1904, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(1462.0, true), Some(datetime(1908, 1, 2, 0, 0, 0)));
    }

    #[test]
    fn serial_round_trip() {
        for value in [datetime(1900, 1, 1, 0, 0, 0), datetime(1999, 12, 31, 23, 59, 59), datetime(2024, 2, 29, 6, 30, 0)] {
            assert_eq!(serial_to_datetime(datetime_to_serial(&value), false), Some(value));
        }
    }

    #[test]
    fn time_strings() {
        assert_eq!(to_time_string(0.5), "12:00:00");
        assert_eq!(to_time_string(0.75), "18:00:00");
        assert_eq!(to_time_string(1.0 / 86_400_000f64), "00:00:00.001");
    }

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path(Cow::Borrowed("worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("/xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
    }
}

//! Comma-separated values reading and writing.

use crate::error::DataSweeperError;
use crate::format::normalize_headers;
use crate::format::FormatError;
use crate::table::Column;
use crate::table::Table;
use csv::ReaderBuilder;
use csv::WriterBuilder;
use encoding_rs::Encoding;
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;

/// Parses CSV bytes, treating the first record as the header.
///
/// Records shorter than the header are padded with missing cells; longer
/// records are rejected.
pub(crate) fn read_csv(bytes: &[u8]) -> Result<Table, DataSweeperError> {
    let text = decode(bytes);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        Err(FormatError::ParseError("No columns to parse from file".to_owned()))?;
    }
    let names = normalize_headers(headers.iter());
    let mut fields = vec![Vec::<String>::new(); names.len()];
    for result in reader.records() {
        let record = result?;
        if record.len() > names.len() {
            let line = record.position().map(|position| position.line()).unwrap_or_default();
            Err(FormatError::ParseError(format!(
                "Expected {} fields in line {}, saw {}",
                names.len(),
                line,
                record.len()
            )))?;
        }
        for (index, column) in fields.iter_mut().enumerate() {
            column.push(record.get(index).unwrap_or_default().to_owned());
        }
    }

    let columns = names
        .iter()
        .zip(fields)
        .map(|(name, fields)| Column::from_text(name, fields))
        .collect();
    let table = Table::new(columns)?;
    tracing::debug!(rows = table.height(), columns = table.width(), "parsed csv");
    Ok(table)
}

/// Serializes a table with a header row and no index column.
pub(crate) fn write_csv(table: &Table) -> Result<Vec<u8>, DataSweeperError> {
    if table.width() == 0 {
        return Ok(Vec::new());
    }
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer.into_inner().map_err(|error| DataSweeperError::IoError(error.into_error()))
}

/// Decodes upload bytes: a byte-order mark wins, then UTF-8, then Windows-1252.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnType;
    use crate::table::Value;

    #[test]
    fn read_infers_types() {
        let table = read_csv(b"name,age,score,active\nann,31,1.5,true\nbob,42,,false\n").unwrap();
        let kinds = table.columns().iter().map(|column| column.kind).collect::<Vec<_>>();
        assert_eq!(kinds, vec![ColumnType::Text, ColumnType::Integer, ColumnType::Float, ColumnType::Boolean]);
        assert_eq!(table.column("score").unwrap().values, vec![Value::Float(1.5), Value::Null]);
    }

    #[test]
    fn read_pads_short_records() {
        let table = read_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(table.column("c").unwrap().values, vec![Value::Null]);
    }

    #[test]
    fn read_rejects_long_records() {
        let error = read_csv(b"a,b\n1,2,3\n").unwrap_err();
        assert!(error.to_string().contains("Expected 2 fields in line 2, saw 3"));
    }

    #[test]
    fn read_rejects_empty_input() {
        assert!(read_csv(b"").is_err());
    }

    #[test]
    fn read_mangles_duplicate_headers() {
        let table = read_csv(b"a,a,\n1,2,3\n").unwrap();
        assert_eq!(table.column_names(), vec!["a", "a.1", "Unnamed: 2"]);
    }

    #[test]
    fn read_strips_bom_and_decodes_latin1() {
        let table = read_csv(b"\xEF\xBB\xBFcity\nZ\xC3\xBCrich\n").unwrap();
        assert_eq!(table.column_names(), vec!["city"]);
        assert_eq!(table.column("city").unwrap().values, vec![Value::Text("Zürich".to_owned())]);

        let table = read_csv(b"city\nZ\xFCrich\n").unwrap();
        assert_eq!(table.column("city").unwrap().values, vec![Value::Text("Zürich".to_owned())]);
    }

    #[test]
    fn write_quotes_and_formats() {
        let table = read_csv(b"label,value\n\"a, b\",1\nc,\n").unwrap();
        let bytes = write_csv(&table).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "label,value\n\"a, b\",1.0\nc,\n");
    }

    #[test]
    fn round_trip_preserves_table() {
        let input = b"id,name,price,available,released\n1,pen,1.25,True,2023-05-01\n2,ink,3.0,False,2024-01-31\n3,pad,,True,\n";
        let table = read_csv(input).unwrap();
        let again = read_csv(&write_csv(&table).unwrap()).unwrap();
        assert_eq!(again, table);
    }

    #[test]
    fn round_trip_keeps_blank_rows() {
        for input in [
            &b"a,b\n1,2\n,\n3,4\n"[..],
            &b"a,b\n1,2\n,\n,\n"[..],
            &b"a,b,c\n,,\n,,\n"[..],
        ] {
            let table = read_csv(input).unwrap();
            let again = read_csv(&write_csv(&table).unwrap()).unwrap();
            assert_eq!(again, table);
        }
    }

    #[test]
    fn round_trip_keeps_out_of_range_dates() {
        let table = read_csv(b"day,at\n1850-01-01,1899-12-31 23:00:00\n9999-12-31,2024-01-31 08:30:00\n").unwrap();
        assert_eq!(table.column("day").unwrap().kind, ColumnType::Date);
        let again = read_csv(&write_csv(&table).unwrap()).unwrap();
        assert_eq!(again, table);
    }
}

//! Office Open XML (`.xlsx`) workbook writer.
//!
//! Produces a single worksheet named `Sheet1`: the header row followed by
//! one row per table row. Text is written as inline strings, so no shared
//! string table is emitted.
use crate::error::DataSweeperError;
use crate::format::excel::datetime_to_serial;
use crate::format::excel::has_serial;
use crate::format::FormatError;
use crate::helpers::reference::index_to_reference;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::ZipWriterHelper;
use crate::table::Table;
use crate::table::Value;
use std::io::Cursor;
use zip::ZipWriter;

/// Maximum number of rows in a worksheet, header included
pub(crate) const MAX_ROWS: usize = 1_048_576;

/// Maximum number of columns in a worksheet
pub(crate) const MAX_COLUMNS: usize = 16_384;

const SHEET_NAME: &str = "Sheet1";

/// Cell style index of dates (`yyyy-mm-dd`)
const STYLE_DATE: &str = "1";

/// Cell style index of timestamps (`yyyy-mm-dd hh:mm:ss`)
const STYLE_DATETIME: &str = "2";

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="2"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd\ hh:mm:ss"/><numFmt numFmtId="165" formatCode="yyyy\-mm\-dd"/></numFmts><fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="165" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Serializes a table as a one-sheet workbook.
///
/// # Errors
///
/// * `WriteError` when the table exceeds worksheet limits, contains a
///   non-finite number, or contains text XML cannot carry
pub(crate) fn write_xlsx(table: &Table) -> Result<Vec<u8>, DataSweeperError> {
    if table.width() > MAX_COLUMNS {
        Err(FormatError::WriteError(format!(
            "{} columns exceed the worksheet limit of {}",
            table.width(),
            MAX_COLUMNS
        )))?;
    }
    if table.height() + 1 > MAX_ROWS {
        Err(FormatError::WriteError(format!(
            "{} rows exceed the worksheet limit of {}",
            table.height(),
            MAX_ROWS - 1
        )))?;
    }

    let sheet = write_sheet(table)?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.add_part("[Content_Types].xml", CONTENT_TYPES.as_bytes())?;
    zip.add_part("_rels/.rels", ROOT_RELATIONSHIPS.as_bytes())?;
    zip.add_part("xl/workbook.xml", &write_workbook()?)?;
    zip.add_part("xl/_rels/workbook.xml.rels", &write_workbook_relationships()?)?;
    zip.add_part("xl/styles.xml", STYLES.as_bytes())?;
    zip.add_part("xl/worksheets/sheet1.xml", &sheet)?;
    let bytes = zip.finish()?.into_inner();
    tracing::debug!(rows = table.height(), columns = table.width(), size = bytes.len(), "wrote workbook");
    Ok(bytes)
}

fn write_workbook() -> Result<Vec<u8>, DataSweeperError> {
    let mut writer = XmlWriter::new()?;
    writer.start("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    writer.start("sheets", &[])?;
    writer.empty("sheet", &[("name", SHEET_NAME), ("sheetId", "1"), ("r:id", "rId1")])?;
    writer.end("sheets")?;
    writer.end("workbook")?;
    Ok(writer.into_inner())
}

fn write_workbook_relationships() -> Result<Vec<u8>, DataSweeperError> {
    let mut writer = XmlWriter::new()?;
    writer.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    writer.empty("Relationship", &[
        ("Id", "rId1"),
        ("Type", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet"),
        ("Target", "worksheets/sheet1.xml"),
    ])?;
    writer.empty("Relationship", &[
        ("Id", "rId2"),
        ("Type", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles"),
        ("Target", "styles.xml"),
    ])?;
    writer.end("Relationships")?;
    Ok(writer.into_inner())
}

fn write_sheet(table: &Table) -> Result<Vec<u8>, DataSweeperError> {
    let dimension = if table.width() == 0 {
        "A1".to_owned()
    } else {
        format!("A1:{}", index_to_reference(table.height(), table.width() - 1))
    };

    let mut writer = XmlWriter::new()?;
    writer.start("worksheet", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    writer.empty("dimension", &[("ref", dimension.as_str())])?;
    writer.start("sheetData", &[])?;

    if table.width() > 0 {
        writer.start("row", &[("r", "1")])?;
        for (col, name) in table.column_names().into_iter().enumerate() {
            write_inline_string(&mut writer, &index_to_reference(0, col), name)?;
        }
        writer.end("row")?;
    }

    for (index, row) in table.rows().enumerate() {
        let row_number = (index + 2).to_string();
        writer.start("row", &[("r", row_number.as_str())])?;
        for (col, value) in row.into_iter().enumerate() {
            let reference = index_to_reference(index + 1, col);
            write_cell(&mut writer, &reference, value)?;
        }
        writer.end("row")?;
    }

    writer.end("sheetData")?;
    writer.end("worksheet")?;
    Ok(writer.into_inner())
}

fn write_cell(writer: &mut XmlWriter, reference: &str, value: &Value) -> Result<(), DataSweeperError> {
    match value {
        Value::Null => Ok(()),
        Value::Boolean(flag) => {
            writer.start("c", &[("r", reference), ("t", "b")])?;
            writer.text_element("v", &[], if *flag { "1" } else { "0" })?;
            writer.end("c")
        }
        Value::Integer(number) => write_number(writer, reference, &number.to_string(), None),
        Value::Float(number) => {
            if !number.is_finite() {
                Err(FormatError::WriteError(format!("Cell {} holds non-finite number {}", reference, number)))?;
            }
            write_number(writer, reference, &number.to_string(), None)
        }
        Value::Text(text) => write_inline_string(writer, reference, text),
        // outside the serial range the ISO form is kept as text
        Value::Date(date) if !has_serial(*date) => write_inline_string(writer, reference, &value.to_string()),
        Value::DateTime(datetime) if !has_serial(datetime.date()) => {
            write_inline_string(writer, reference, &value.to_string())
        }
        Value::Date(date) => {
            let serial = datetime_to_serial(&date.and_time(chrono::NaiveTime::MIN));
            write_number(writer, reference, &serial.to_string(), Some(STYLE_DATE))
        }
        Value::DateTime(datetime) => {
            write_number(writer, reference, &datetime_to_serial(datetime).to_string(), Some(STYLE_DATETIME))
        }
    }
}

fn write_number(writer: &mut XmlWriter, reference: &str, number: &str, style: Option<&str>) -> Result<(), DataSweeperError> {
    match style {
        Some(style) => writer.start("c", &[("r", reference), ("s", style)])?,
        None => writer.start("c", &[("r", reference)])?,
    }
    writer.text_element("v", &[], number)?;
    writer.end("c")
}

fn write_inline_string(writer: &mut XmlWriter, reference: &str, text: &str) -> Result<(), DataSweeperError> {
    if let Some(character) = text.chars().find(|c| !is_xml_char(*c)) {
        Err(FormatError::WriteError(format!(
            "Cell {} contains character U+{:04X} which cannot be stored",
            reference, character as u32
        )))?;
    }
    writer.start("c", &[("r", reference), ("t", "inlineStr")])?;
    writer.start("is", &[])?;
    writer.text_element("t", &[("xml:space", "preserve")], text)?;
    writer.end("is")?;
    writer.end("c")
}

/// Characters allowed by XML 1.0.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::delimited::read_csv;
    use crate::format::xlsx::read_xlsx;
    use crate::table::Column;
    use crate::table::ColumnType;
    use chrono::NaiveDate;
    use std::io::Read;
    use zip::ZipArchive;

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn round_trip_keeps_types() {
        let table = read_csv(b"id,label,price,flag,day,at\n1,a & b,1.5,True,2024-01-31,2024-01-31 08:30:00\n2,,2.25,False,,2024-02-01 00:00:00\n").unwrap();
        let bytes = write_xlsx(&table).unwrap();
        let again = read_xlsx(&bytes).unwrap();
        assert_eq!(again, table);
    }

    #[test]
    fn writes_expected_parts() {
        let table = read_csv(b"x,y\n1,2\n").unwrap();
        let bytes = write_xlsx(&table).unwrap();
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<dimension ref="A1:B2"/>"#));
        assert!(sheet.contains(r#"<c r="A1" t="inlineStr"><is><t xml:space="preserve">x</t></is></c>"#));
        assert!(sheet.contains(r#"<c r="B2"><v>2</v></c>"#));
        assert!(part(&bytes, "xl/workbook.xml").contains(r#"name="Sheet1""#));
    }

    #[test]
    fn null_cells_are_omitted() {
        let table = read_csv(b"x,y\n1,\n").unwrap();
        let sheet = part(&write_xlsx(&table).unwrap(), "xl/worksheets/sheet1.xml");
        assert!(!sheet.contains(r#"r="B2""#));
    }

    #[test]
    fn empty_table_writes_empty_sheet() {
        let bytes = write_xlsx(&Table::default()).unwrap();
        assert_eq!(read_xlsx(&bytes).unwrap().width(), 0);
    }

    #[test]
    fn rejects_non_finite_numbers() {
        let column = Column::from_values("x", vec![Value::Float(f64::INFINITY)]);
        let table = Table::new(vec![column]).unwrap();
        assert!(matches!(
            write_xlsx(&table),
            Err(DataSweeperError::FormatError(FormatError::WriteError(_)))
        ));
    }

    #[test]
    fn rejects_control_characters() {
        let column = Column::from_values("x", vec![Value::Text("bell\u{7}".to_owned())]);
        let table = Table::new(vec![column]).unwrap();
        let error = write_xlsx(&table).unwrap_err();
        assert!(error.to_string().contains("U+0007"));
    }

    #[test]
    fn dates_use_date_style() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let column = Column::from_values("day", vec![Value::Date(day)]);
        let table = Table::new(vec![column]).unwrap();
        let bytes = write_xlsx(&table).unwrap();
        assert!(part(&bytes, "xl/worksheets/sheet1.xml").contains(r#"<c r="A2" s="1"><v>45292</v></c>"#));
        assert_eq!(read_xlsx(&bytes).unwrap().column("day").unwrap().kind, ColumnType::Date);
    }

    #[test]
    fn round_trip_keeps_blank_rows() {
        let table = read_csv(b"a,b\n1,2\n,\n3,4\n").unwrap();
        let again = read_xlsx(&write_xlsx(&table).unwrap()).unwrap();
        assert_eq!(again.height(), 3);
        assert_eq!(again, table);

        let table = read_csv(b"a,b\n1,2\n,\n,\n3,4\n,\n5,6\n").unwrap();
        let again = read_xlsx(&write_xlsx(&table).unwrap()).unwrap();
        assert_eq!(again, table);
    }

    #[test]
    fn trailing_blank_rows_are_trimmed() {
        let table = read_csv(b"a,b\n1,2\n,\n,\n").unwrap();
        assert_eq!(table.height(), 3);
        let again = read_xlsx(&write_xlsx(&table).unwrap()).unwrap();
        assert_eq!(again.height(), 1);
        assert_eq!(again.column("a").unwrap().values, vec![Value::Integer(1)]);
    }

    #[test]
    fn header_survives_without_data() {
        let table = read_csv(b"a,b,c\n,,\n").unwrap();
        let again = read_xlsx(&write_xlsx(&table).unwrap()).unwrap();
        assert_eq!(again.column_names(), vec!["a", "b", "c"]);
        assert_eq!(again.height(), 0);
    }

    #[test]
    fn dates_outside_serial_range_are_text() {
        let table = read_csv(b"day,at\n1850-01-01,1899-12-31 23:00:00\n1900-01-01,2024-01-31 08:30:00\n").unwrap();
        let bytes = write_xlsx(&table).unwrap();
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<c r="A2" t="inlineStr"><is><t xml:space="preserve">1850-01-01</t></is></c>"#));
        assert!(sheet.contains(r#"<c r="A3" s="1"><v>1</v></c>"#));

        let again = read_xlsx(&bytes).unwrap();
        let day = again.column("day").unwrap();
        assert_eq!(day.kind, ColumnType::Text);
        assert_eq!(day.values, vec![Value::Text("1850-01-01".to_owned()), Value::Text("1900-01-01".to_owned())]);
        let at = again.column("at").unwrap();
        assert_eq!(at.values[0], Value::Text("1899-12-31 23:00:00".to_owned()));
    }
}

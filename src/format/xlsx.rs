//! Office Open XML (`.xlsx`) worksheet reader.
//!
//! Only the first worksheet is read. Its first non-empty row is the header and
//! the data rows run down to the last row holding a value or an error cell.
//! Blank rows in between become rows of missing values.
use crate::error::DataSweeperError;
use crate::format::excel;
use crate::format::excel::load_relationships;
use crate::format::excel::serial_to_datetime;
use crate::format::excel::to_time_string;
use crate::format::excel::CellType;
use crate::format::normalize_headers;
use crate::format::FormatError;
use crate::helpers::reference::reference_to_index;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::table::cell::parse_iso_date;
use crate::table::cell::parse_iso_datetime;
use crate::table::cell::NULL_LITERALS;
use crate::table::Column;
use crate::table::Table;
use crate::table::Value;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

// XML tag names of the SpreadsheetML parts
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// Compound File Binary signature, used by encrypted and legacy `.xls` workbooks
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Raw worksheet cell before conversion to a table value.
#[derive(Clone, Debug)]
struct Cell {
    /// Row index (0-based)
    row: usize,
    /// Column index (0-based)
    col: usize,
    kind: CellType,
    value: String,
}

/// Parses the first worksheet of an `.xlsx` document.
pub(crate) fn read_xlsx(bytes: &[u8]) -> Result<Table, DataSweeperError> {
    if bytes.starts_with(&CFB_SIGNATURE) {
        Err(FormatError::ParseError(
            "Password protected or legacy binary workbooks are not supported".to_owned(),
        ))?;
    }

    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    let (sheet_name, sheet_path) = sheets
        .into_iter()
        .next()
        .ok_or_else(|| FormatError::ParseError("Workbook contains no worksheet".to_owned()))?;
    let number_formats = load_number_formats(&mut zip)?;
    let shared_strings = load_shared_strings(&mut zip)?;
    let cells = read_cells(&mut zip, &sheet_path, &number_formats)?;
    let table = build_table(&cells, &shared_strings, is_1904)?;
    tracing::debug!(sheet = %sheet_name, rows = table.height(), columns = table.width(), "parsed worksheet");
    Ok(table)
}

/// Loads the worksheet list (name, part path) in workbook order and the date system flag.
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), DataSweeperError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| FormatError::ParseError("Missing package part 'xl/workbook.xml'".to_owned()))?;
    let mut sheets = Vec::<(String, String)>::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads the cell kind of every cell style from `xl/styles.xml`.
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<CellType>, DataSweeperError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats))
}

/// Loads the shared string table.
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, DataSweeperError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads all non-empty cells of a worksheet in document order. Error cells
/// are kept, valueless, so their rows still count as used.
fn read_cells<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str, number_formats: &[CellType]) -> Result<Vec<Cell>, DataSweeperError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| FormatError::ParseError(format!("Missing package part '{path}'")))?;
    let mut cells = Vec::<Cell>::new();
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = CellType::default();
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            row_count = event.parse_attribute_value::<usize>("r")?
                .filter(|r| *r > 0)
                .map(|r| r - 1)
                .unwrap_or(row_count);
            col_count = 0;
        }
        Event::End(event) if event.name() == TAG_ROW => {
            row_count += 1;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count = col + 1;
            value.clear();
            kind = event.get_attribute_value("t")?.map(|t| {
                match t.as_ref() {
                    "inlineStr" | "str" => CellType::InlineString,
                    "s" => CellType::SharedString,
                    "d" => CellType::IsoDateTime,
                    "b" => CellType::Boolean,
                    "e" => CellType::Error,
                    _ => CellType::Number,
                }
            }).unwrap_or(CellType::Number);
            if kind == CellType::Number {
                if let Some(index) = event.parse_attribute_value::<usize>("s")? {
                    kind = number_formats.get(index).copied().unwrap_or(CellType::Number);
                }
            }
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.name() == TAG_CELL => {
            if kind == CellType::Error || !value.is_empty() {
                cells.push(Cell {
                    row,
                    col,
                    kind,
                    value: std::mem::take(&mut value),
                });
            }
        }
    });
    Ok(cells)
}

/// Reads string content up to `end_tag`, skipping phonetic annotations.
fn read_string_value<B: BufRead>(
    reader: &mut XmlReader<B>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, DataSweeperError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

/// Arranges the used range of the sheet into typed columns.
fn build_table(cells: &[Cell], shared_strings: &[String], is_1904: bool) -> Result<Table, DataSweeperError> {
    let header_row = match cells.iter().map(|cell| cell.row).min() {
        Some(row) => row,
        None => return Ok(Table::default()),
    };
    let last_row = cells.iter().map(|cell| cell.row).max().unwrap_or(header_row);
    let col_lower = cells.iter().map(|cell| cell.col).min().unwrap_or(0);
    let col_upper = cells.iter().map(|cell| cell.col).max().unwrap_or(0);
    let width = col_upper - col_lower + 1;
    let height = last_row - header_row;

    let mut headers = vec![String::new(); width];
    let mut grid = vec![vec![Value::Null; height]; width];
    for cell in cells {
        let value = to_value(cell, shared_strings, is_1904)?;
        if cell.row == header_row {
            headers[cell.col - col_lower] = value.to_string();
        } else {
            grid[cell.col - col_lower][cell.row - header_row - 1] = value;
        }
    }

    let columns = normalize_headers(&headers)
        .iter()
        .zip(grid)
        .map(|(name, values)| Column::from_values(name, values))
        .collect();
    Ok(Table::new(columns)?)
}

/// Converts a raw cell to a table value.
fn to_value(cell: &Cell, shared_strings: &[String], is_1904: bool) -> Result<Value, DataSweeperError> {
    let value = match cell.kind {
        CellType::Empty | CellType::Error => Value::Null,
        CellType::Boolean => Value::Boolean(cell.value == "1" || cell.value.eq_ignore_ascii_case("true")),
        CellType::SharedString => {
            let index = cell.value.trim().parse::<usize>()?;
            let text = shared_strings.get(index).ok_or_else(|| {
                FormatError::ParseError(format!("Shared string {} out of range", index))
            })?;
            to_text(text)
        }
        CellType::InlineString => to_text(&cell.value),
        CellType::Number => {
            let number = cell.value.trim().parse::<f64>()?;
            if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992f64 {
                Value::Integer(number as i64)
            } else {
                Value::Float(number)
            }
        }
        CellType::NumberDate | CellType::NumberDateTime => {
            let serial = cell.value.trim().parse::<f64>()?;
            let datetime = serial_to_datetime(serial, is_1904).ok_or_else(|| {
                FormatError::ParseError(format!("Invalid date serial '{}' at {}", cell.value, cell_reference(cell)))
            })?;
            if cell.kind == CellType::NumberDate && serial.fract() == 0.0 {
                Value::Date(datetime.date())
            } else {
                Value::DateTime(datetime)
            }
        }
        CellType::NumberTime => Value::Text(to_time_string(cell.value.trim().parse::<f64>()?)),
        CellType::IsoDateTime => {
            if let Some(datetime) = parse_iso_datetime(&cell.value) {
                Value::DateTime(datetime)
            } else if let Some(date) = parse_iso_date(&cell.value) {
                Value::Date(date)
            } else {
                to_text(&cell.value)
            }
        }
    };
    Ok(value)
}

fn to_text(text: &str) -> Value {
    if NULL_LITERALS.contains(&text) {
        Value::Null
    } else {
        Value::Text(text.to_owned())
    }
}

fn cell_reference(cell: &Cell) -> String {
    crate::helpers::reference::index_to_reference(cell.row, cell.col)
}

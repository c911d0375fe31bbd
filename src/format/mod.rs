//! # Format Reader and Writer
//!
//! Parses uploaded bytes into a [`Table`] and serializes a table back into a
//! downloadable [`OutputArtifact`]. Two formats are supported in both
//! directions: CSV and Office Open XML spreadsheets (`.xlsx`).
//!
//! Low-level failures (CSV syntax, ZIP or XML corruption, ...) are collapsed
//! into [`FormatError::ParseError`] on the reading side and
//! [`FormatError::WriteError`] on the writing side.
use crate::error::DataSweeperError;
use crate::table::Table;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use std::collections::HashMap;
use std::collections::HashSet;
use thiserror::Error;

pub(crate) mod delimited;
pub(crate) mod excel;
pub(crate) mod xlsx;
pub(crate) mod xlsx_writer;

/// MIME type of `.xlsx` documents
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// MIME type of `.csv` documents
pub const CSV_MIME_TYPE: &str = "text/csv";

/// File-scoped format failures.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Unsupported file type: '{0}'")]
    UnsupportedFormat(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Write error: {0}")]
    WriteError(String),
}

/// Formats accepted on upload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    /// Resolves a declared extension (`"csv"`, `".XLSX"`, ...) to a format.
    pub fn from_extension(extension: &str) -> Result<SourceFormat, FormatError> {
        let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" => Ok(SourceFormat::Xlsx),
            _ => Err(FormatError::UnsupportedFormat(extension.to_owned())),
        }
    }
}

/// Formats a table can be converted to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    Csv,
    #[serde(alias = "xlsx", alias = "excel")]
    #[value(alias = "xlsx", alias = "excel")]
    Spreadsheet,
}

impl TargetFormat {
    pub const fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Csv => "csv",
            TargetFormat::Spreadsheet => "xlsx",
        }
    }

    pub const fn mime_type(&self) -> &'static str {
        match self {
            TargetFormat::Csv => CSV_MIME_TYPE,
            TargetFormat::Spreadsheet => XLSX_MIME_TYPE,
        }
    }

    /// Replaces the extension of `source_name` with this format's extension,
    /// appending one when the name has none.
    pub fn file_name(&self, source_name: &str) -> String {
        let stem = match source_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => source_name,
        };
        format!("{}.{}", stem, self.extension())
    }
}

/// Serialized table ready for download.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputArtifact {
    pub file_name: String,
    pub mime_type: String,
    #[serde(serialize_with = "serialize_base64")]
    pub content: Vec<u8>,
}

fn serialize_base64<S: Serializer>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(content))
}

/// Parses `bytes` according to the declared `extension`.
///
/// # Errors
///
/// * `UnsupportedFormat` when the extension is neither `csv` nor `xlsx`
/// * `ParseError` when the content is not a well-formed file of that format
pub fn read(bytes: &[u8], extension: &str) -> Result<Table, DataSweeperError> {
    let format = SourceFormat::from_extension(extension)?;
    let result = match format {
        SourceFormat::Csv => delimited::read_csv(bytes),
        SourceFormat::Xlsx => xlsx::read_xlsx(bytes),
    };
    result.map_err(|error| match error {
        DataSweeperError::FormatError(_) => error,
        error => FormatError::ParseError(error.to_string()).into(),
    })
}

/// Serializes `table` into `target`, naming the artifact after `source_name`.
///
/// # Errors
///
/// * `WriteError` when a value cannot be represented in the target format
pub fn write(table: &Table, target: TargetFormat, source_name: &str) -> Result<OutputArtifact, DataSweeperError> {
    let result = match target {
        TargetFormat::Csv => delimited::write_csv(table),
        TargetFormat::Spreadsheet => xlsx_writer::write_xlsx(table),
    };
    let content = result.map_err(|error| match error {
        DataSweeperError::FormatError(FormatError::WriteError(_)) => error,
        error => DataSweeperError::from(FormatError::WriteError(error.to_string())),
    })?;
    Ok(OutputArtifact {
        file_name: target.file_name(source_name),
        mime_type: target.mime_type().to_owned(),
        content,
    })
}

/// Makes header names usable as unique column names: blanks become
/// `Unnamed: {position}`, repeats of `a` become `a.1`, `a.2`, ...
pub(crate) fn normalize_headers<I, S>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names = headers
        .into_iter()
        .enumerate()
        .map(|(index, header)| {
            let header = header.as_ref();
            if header.trim().is_empty() {
                format!("Unnamed: {index}")
            } else {
                header.to_owned()
            }
        })
        .collect::<Vec<_>>();

    let mut used = names.iter().cloned().collect::<HashSet<_>>();
    let mut seen = HashSet::<String>::new();
    let mut counters = HashMap::<String, usize>::new();
    for name in names.iter_mut() {
        if seen.insert(name.to_owned()) {
            continue;
        }
        let counter = counters.entry(name.to_owned()).or_insert(0);
        let mut candidate;
        loop {
            *counter += 1;
            candidate = format!("{}.{}", name, counter);
            if !used.contains(&candidate) {
                break;
            }
        }
        used.insert(candidate.to_owned());
        seen.insert(candidate.to_owned());
        *name = candidate;
    }
    names
}

//! # Session Orchestrator
//!
//! Runs the per-file pipeline: read, describe, preview, clean, project,
//! chart and convert. Every call is driven entirely by its inputs, so a
//! caller reruns the pipeline by resupplying the file and its options.
//!
//! Files are independent: [`process_files`] turns a failure into a
//! [`FileOutcome::Failed`] entry and carries on with the next file.
use crate::chart::build_chart;
use crate::chart::ChartSpec;
use crate::cleaning::clean;
use crate::cleaning::CleaningRequest;
use crate::cleaning::CleaningStep;
use crate::error::DataSweeperError;
use crate::error::ErrorKind;
use crate::error::ResultMessage;
use crate::format;
use crate::format::OutputArtifact;
use crate::format::TargetFormat;
use crate::projection::project;
use crate::table::ColumnType;
use crate::table::Table;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use std::path::Path;

/// Number of rows shown in a preview unless configured otherwise
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Pipeline settings shared by every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub preview_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

/// An uploaded file as received.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    /// Size of `content` in bytes
    pub size: usize,
    /// Lower-cased extension including the dot (`.csv`), empty when the name has none
    pub extension: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> UploadedFile {
        let name = name.into();
        let extension = Path::new(&name)
            .extension()
            .map(|extension| format!(".{}", extension.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        UploadedFile {
            size: content.len(),
            name,
            extension,
            content,
        }
    }
}

/// Per-file choices, the explicit form of the page controls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    /// Master toggle; the cleaning flags are ignored while it is off
    pub clean: bool,
    #[serde(flatten)]
    pub cleaning: CleaningRequest,
    /// Columns to keep, in order; `None` keeps all
    pub columns: Option<Vec<String>>,
    pub visualize: bool,
    /// Set when a conversion was requested
    pub convert: Option<TargetFormat>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    pub missing: usize,
}

/// Leading rows of a table rendered as text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Preview {
    pub fn of(table: &Table, rows: usize) -> Preview {
        let head = table.head(rows);
        Preview {
            columns: head.column_names().into_iter().map(str::to_owned).collect(),
            rows: head
                .rows()
                .map(|row| row.iter().map(|value| value.to_string()).collect())
                .collect(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
}

/// User-facing feedback line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    fn new(level: Level, text: impl Into<String>) -> Message {
        Message {
            level,
            text: text.into(),
        }
    }
}

/// Everything produced by one pass over a file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileReport {
    pub name: String,
    pub size_bytes: usize,
    /// Size in kilobytes with two decimals
    pub size_kb: String,
    /// Row count of the table as read
    pub rows: usize,
    /// Columns of the table as read
    pub columns: Vec<ColumnSummary>,
    pub preview: Preview,
    pub cleaning: Vec<CleaningStep>,
    /// Columns of the final table
    pub selected_columns: Vec<String>,
    pub messages: Vec<Message>,
    /// Rendered as a Vega-Lite document
    #[serde(serialize_with = "serialize_chart")]
    pub chart: Option<ChartSpec>,
    pub artifact: Option<OutputArtifact>,
}

fn serialize_chart<S: Serializer>(chart: &Option<ChartSpec>, serializer: S) -> Result<S::Ok, S::Error> {
    match chart {
        Some(chart) => chart.to_vega_lite().serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// Result of one file in a batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Processed(FileReport),
    Failed {
        name: String,
        kind: ErrorKind,
        message: String,
    },
}

impl FileOutcome {
    pub fn name(&self) -> &str {
        match self {
            FileOutcome::Processed(report) => &report.name,
            FileOutcome::Failed { name, .. } => name,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

/// Runs the pipeline on one file.
///
/// # Arguments
/// * `file` - Uploaded name and content
/// * `options` - Cleaning, projection, chart and conversion choices
/// * `settings` - Preview size
///
/// # Errors
/// `UnsupportedFormat`, `ParseError`, `UnknownColumn` or `WriteError`,
/// prefixed with the file name where the message is shown to the user.
pub fn process_file(file: &UploadedFile, options: &FileOptions, settings: &Settings) -> Result<FileReport, DataSweeperError> {
    let table = format::read(&file.content, &file.extension).with_prefix(&file.name)?;
    let rows = table.height();
    let columns = table
        .columns()
        .iter()
        .map(|column| ColumnSummary {
            name: column.name.to_owned(),
            kind: column.kind,
            missing: column.null_count(),
        })
        .collect();
    let preview = Preview::of(&table, settings.preview_rows);
    let mut messages = Vec::new();

    let (table, cleaning) = if options.clean {
        clean(table, &options.cleaning)
    } else {
        (table, Vec::new())
    };
    for step in &cleaning {
        messages.push(Message::new(Level::Success, step.message()));
    }

    let table = project(table, options.columns.as_deref())
        .map_err(DataSweeperError::from)
        .with_prefix(&file.name)?;

    let chart = if options.visualize {
        let chart = build_chart(&table);
        if chart.is_none() {
            messages.push(Message::new(Level::Warning, "At least two numeric columns are needed for a chart"));
        }
        chart
    } else {
        None
    };

    let artifact = match options.convert {
        Some(target) => {
            let artifact = format::write(&table, target, &file.name).with_prefix(&file.name)?;
            messages.push(Message::new(
                Level::Success,
                format!("Converted {} to {}", file.name, artifact.file_name),
            ));
            Some(artifact)
        }
        None => None,
    };

    tracing::info!(
        file = %file.name,
        rows = table.height(),
        columns = table.width(),
        converted = artifact.is_some(),
        "processed file"
    );

    Ok(FileReport {
        name: file.name.to_owned(),
        size_bytes: file.size,
        size_kb: format!("{:.2}", file.size as f64 / 1024f64),
        rows,
        columns,
        preview,
        cleaning,
        selected_columns: table.column_names().into_iter().map(str::to_owned).collect(),
        messages,
        chart,
        artifact,
    })
}

/// Runs the pipeline on every file in upload order. A failing file is
/// reported and does not stop the others.
pub fn process_files(files: Vec<(UploadedFile, FileOptions)>, settings: &Settings) -> Vec<FileOutcome> {
    let outcomes = files
        .into_iter()
        .map(|(file, options)| match process_file(&file, &options, settings) {
            Ok(report) => FileOutcome::Processed(report),
            Err(error) => {
                tracing::warn!(file = %file.name, error = %error, "file failed");
                FileOutcome::Failed {
                    name: file.name,
                    kind: error.kind(),
                    message: error.to_string(),
                }
            }
        })
        .collect::<Vec<_>>();
    let failed = outcomes.iter().filter(|outcome| outcome.is_failed()).count();
    tracing::info!(files = outcomes.len(), failed, "batch processed");
    outcomes
}

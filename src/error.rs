use serde::Serialize;
use thiserror::Error;

/// Main error type for Data Sweeper.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum DataSweeperError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Pipeline module errors
    #[error("{0}")]
    FormatError(#[from] crate::format::FormatError),

    #[error("{0}")]
    TableError(#[from] crate::table::TableError),
}

/// User-facing classification of a failed file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnsupportedFormat,
    ParseError,
    UnknownColumn,
    WriteError,
    Other,
}

impl DataSweeperError {
    /// Classifies the error into one of the file-scoped failure kinds.
    pub fn kind(&self) -> ErrorKind {
        use crate::format::FormatError;
        use crate::table::TableError;
        match self {
            DataSweeperError::FormatError(FormatError::UnsupportedFormat(_)) => ErrorKind::UnsupportedFormat,
            DataSweeperError::FormatError(FormatError::ParseError(_)) => ErrorKind::ParseError,
            DataSweeperError::FormatError(FormatError::WriteError(_)) => ErrorKind::WriteError,
            DataSweeperError::TableError(TableError::UnknownColumn(_)) => ErrorKind::UnknownColumn,
            _ => ErrorKind::Other,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, DataSweeperError> {
    /// Prefixes the error message with context while keeping the taxonomy
    /// variants intact so callers can still classify the failure.
    fn with_prefix(self, message: &str) -> Self {
        use crate::format::FormatError;
        use crate::table::TableError;
        self.map_err(|e| match e {
            DataSweeperError::FormatError(FormatError::ParseError(inner)) => {
                FormatError::ParseError(format!("{}: {}", message, inner)).into()
            }
            DataSweeperError::FormatError(FormatError::WriteError(inner)) => {
                FormatError::WriteError(format!("{}: {}", message, inner)).into()
            }
            error @ (DataSweeperError::FormatError(_) | DataSweeperError::TableError(TableError::UnknownColumn(_))) => error,
            error => DataSweeperError::WithContextError(format!("{}: {}", message, error)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatError;
    use crate::table::TableError;

    #[test]
    fn kind_follows_taxonomy() {
        let error = DataSweeperError::from(FormatError::UnsupportedFormat("txt".to_owned()));
        assert_eq!(error.kind(), ErrorKind::UnsupportedFormat);
        let error = DataSweeperError::from(TableError::UnknownColumn("z".to_owned()));
        assert_eq!(error.kind(), ErrorKind::UnknownColumn);
        let error = DataSweeperError::from(std::io::Error::other("boom"));
        assert_eq!(error.kind(), ErrorKind::Other);
    }

    #[test]
    fn prefix_keeps_kind() {
        let result: Result<(), DataSweeperError> = Err(FormatError::ParseError("bad row".to_owned()).into());
        let error = result.with_prefix("data.csv").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ParseError);
        assert_eq!(error.to_string(), "Parse error: data.csv: bad row");
    }
}

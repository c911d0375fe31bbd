//! # Table Model
//!
//! In-memory tabular structure shared by every stage of the pipeline: an
//! ordered list of named, typed columns of equal length.
use std::collections::HashSet;
use thiserror::Error;

pub mod cell;
pub mod column;

pub use cell::Value;
pub use column::Column;
pub use column::ColumnType;

/// Errors raised when a table invariant would be broken.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("Column '{name}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
}

/// Ordered collection of named columns.
///
/// All columns hold the same number of cells and column names are unique;
/// both are checked by [`Table::new`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Creates a table after validating row counts and name uniqueness.
    pub fn new(columns: Vec<Column>) -> Result<Table, TableError> {
        let mut names = HashSet::<&str>::new();
        for column in &columns {
            if !names.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.to_owned()));
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(column) = columns.iter().find(|column| column.len() != expected) {
                return Err(TableError::RaggedColumn {
                    name: column.name.to_owned(),
                    expected,
                    actual: column.len(),
                });
            }
        }
        Ok(Table { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Mutable access for in-crate transformations that keep row counts intact.
    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Returns the cells of row `index` in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&cell::Value>> {
        if index >= self.height() {
            return None;
        }
        Some(self.columns.iter().map(|column| &column.values[index]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&cell::Value>> + '_ {
        (0..self.height()).map(move |index| {
            self.columns.iter().map(|column| &column.values[index]).collect()
        })
    }

    /// Copies the first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let columns = self.columns
            .iter()
            .map(|column| Column {
                name: column.name.to_owned(),
                kind: column.kind,
                values: column.values.iter().take(n).cloned().collect(),
            })
            .collect();
        Table { columns }
    }

    /// Keeps only the rows whose flag is set.
    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column.values.retain(|_| *flags.next().unwrap_or(&false));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integers(name: &str, values: &[i64]) -> Column {
        Column {
            name: name.to_owned(),
            kind: ColumnType::Integer,
            values: values.iter().map(|value| Value::Integer(*value)).collect(),
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let error = Table::new(vec![integers("a", &[1]), integers("a", &[2])]).unwrap_err();
        assert!(matches!(error, TableError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn rejects_ragged_columns() {
        let error = Table::new(vec![integers("a", &[1, 2]), integers("b", &[1])]).unwrap_err();
        assert!(matches!(error, TableError::RaggedColumn { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn rows_and_head() {
        let table = Table::new(vec![integers("a", &[1, 2, 3]), integers("b", &[4, 5, 6])]).unwrap();
        assert_eq!(table.width(), 2);
        assert_eq!(table.height(), 3);
        assert_eq!(table.row(1), Some(vec![&Value::Integer(2), &Value::Integer(5)]));
        assert_eq!(table.row(3), None);
        assert_eq!(table.rows().count(), 3);

        let head = table.head(2);
        assert_eq!(head.height(), 2);
        assert_eq!(head.column_names(), vec!["a", "b"]);
        assert_eq!(table.head(10), table);
    }

    #[test]
    fn retain_rows_keeps_flags() {
        let mut table = Table::new(vec![integers("a", &[1, 2, 3])]).unwrap();
        table.retain_rows(&[true, false, true]);
        assert_eq!(table.column("a").unwrap().values, vec![Value::Integer(1), Value::Integer(3)]);
    }

    #[test]
    fn empty_table() {
        let table = Table::new(Vec::new()).unwrap();
        assert_eq!(table.height(), 0);
        assert_eq!(table.width(), 0);
    }
}

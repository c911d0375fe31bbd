//! # Cleaning Operations
//!
//! Pure table transformations applied on request: duplicate-row removal and
//! mean imputation of numeric columns. Both are idempotent.
use crate::table::cell::HashKey;
use crate::table::ColumnType;
use crate::table::Table;
use crate::table::Value;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;

/// Cleaning operations requested for one file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningRequest {
    pub remove_duplicates: bool,
    pub fill_missing_numeric: bool,
}

/// An operation that ran, with what it changed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CleaningStep {
    RemoveDuplicates { removed_rows: usize },
    FillMissingNumeric { filled_cells: usize },
}

impl CleaningStep {
    /// User-facing confirmation of the step.
    pub fn message(&self) -> &'static str {
        match self {
            CleaningStep::RemoveDuplicates { .. } => "Duplicates Removed!",
            CleaningStep::FillMissingNumeric { .. } => "Missing Values in Numeric Columns Filled with Column Means!",
        }
    }
}

/// Applies the requested operations in order: duplicates first, then missing values.
pub fn clean(table: Table, request: &CleaningRequest) -> (Table, Vec<CleaningStep>) {
    let mut table = table;
    let mut steps = Vec::new();
    if request.remove_duplicates {
        let before = table.height();
        table = deduplicate(table);
        steps.push(CleaningStep::RemoveDuplicates {
            removed_rows: before - table.height(),
        });
    }
    if request.fill_missing_numeric {
        let before = null_numeric_cells(&table);
        table = fill_missing_numeric(table);
        steps.push(CleaningStep::FillMissingNumeric {
            filled_cells: before - null_numeric_cells(&table),
        });
    }
    (table, steps)
}

/// Removes rows equal to an earlier row across all columns, keeping the first
/// occurrence of each. Missing cells compare equal to each other.
pub fn deduplicate(table: Table) -> Table {
    let mut table = table;
    let keep = {
        let mut seen = HashSet::<Vec<HashKey>>::with_capacity(table.height());
        table
            .rows()
            .map(|row| seen.insert(row.iter().map(|value| value.hash_key()).collect()))
            .collect::<Vec<_>>()
    };
    if keep.iter().any(|keep| !keep) {
        table.retain_rows(&keep);
    }
    table
}

/// Replaces missing cells of every numeric column with the mean of the
/// column's present values. Integer columns receiving a fill become float
/// columns. A numeric column with no present value is left as is.
pub fn fill_missing_numeric(table: Table) -> Table {
    let mut table = table;
    for column in table.columns_mut() {
        if !column.kind.is_numeric() || column.null_count() == 0 {
            continue;
        }
        let present = column.values.iter().filter_map(Value::as_f64).collect::<Vec<_>>();
        if present.is_empty() {
            continue;
        }
        let mean = present.iter().sum::<f64>() / present.len() as f64;
        column.kind = ColumnType::Float;
        for value in column.values.iter_mut() {
            *value = match std::mem::take(value) {
                Value::Null => Value::Float(mean),
                value => value.coerce(ColumnType::Float),
            };
        }
    }
    table
}

fn null_numeric_cells(table: &Table) -> usize {
    table
        .columns()
        .iter()
        .filter(|column| column.kind.is_numeric())
        .map(|column| column.null_count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::read;
    use crate::table::Column;

    fn csv(text: &str) -> Table {
        read(text.as_bytes(), "csv").unwrap()
    }

    #[test]
    fn fill_uses_mean_of_present_values() {
        let table = fill_missing_numeric(csv("a,b\n1,\n2,4\n"));
        assert_eq!(table.column("b").unwrap().values, vec![Value::Float(4.0), Value::Float(4.0)]);
        assert_eq!(table.column("a").unwrap().values, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn fill_keeps_present_values() {
        let table = fill_missing_numeric(csv("x,label\n1.5,a\n,\n2.5,c\n"));
        let x = table.column("x").unwrap();
        assert_eq!(x.values, vec![Value::Float(1.5), Value::Float(2.0), Value::Float(2.5)]);
        assert_eq!(x.null_count(), 0);
        assert_eq!(table.column("label").unwrap().values[1], Value::Null);
    }

    #[test]
    fn fill_widens_integer_columns() {
        let column = Column {
            name: "n".to_owned(),
            kind: ColumnType::Integer,
            values: vec![Value::Integer(1), Value::Null, Value::Integer(2)],
        };
        let table = fill_missing_numeric(Table::new(vec![column]).unwrap());
        let n = table.column("n").unwrap();
        assert_eq!(n.kind, ColumnType::Float);
        assert_eq!(n.values, vec![Value::Float(1.0), Value::Float(1.5), Value::Float(2.0)]);
    }

    #[test]
    fn fill_leaves_all_missing_columns() {
        let table = csv("a,b\n1,\n2,\n");
        let filled = fill_missing_numeric(table.clone());
        assert_eq!(filled, table);
    }

    #[test]
    fn deduplicate_keeps_first_occurrences() {
        let table = deduplicate(csv("a,b\n1,1\n1,1\n2,3\n"));
        assert_eq!(table.height(), 2);
        assert_eq!(table.row(0), Some(vec![&Value::Integer(1), &Value::Integer(1)]));
        assert_eq!(table.row(1), Some(vec![&Value::Integer(2), &Value::Integer(3)]));
    }

    #[test]
    fn deduplicate_treats_missing_as_equal() {
        let table = deduplicate(csv("a,b\nx,\ny,1\nx,\n"));
        assert_eq!(table.height(), 2);
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let once = deduplicate(csv("k,v\na,1\nb,2\na,1\nb,3\nb,2\n"));
        let twice = deduplicate(once.clone());
        assert_eq!(once.height(), 3);
        assert_eq!(twice, once);
    }

    #[test]
    fn clean_reports_steps_in_order() {
        let request = CleaningRequest {
            remove_duplicates: true,
            fill_missing_numeric: true,
        };
        let (table, steps) = clean(csv("a,b\n1,\n1,\n2,4\n"), &request);
        assert_eq!(table.height(), 2);
        assert_eq!(
            steps,
            vec![
                CleaningStep::RemoveDuplicates { removed_rows: 1 },
                CleaningStep::FillMissingNumeric { filled_cells: 1 },
            ]
        );
        assert_eq!(steps[0].message(), "Duplicates Removed!");
    }

    #[test]
    fn clean_without_request_is_noop() {
        let table = csv("a\n1\n1\n");
        let (cleaned, steps) = clean(table.clone(), &CleaningRequest::default());
        assert_eq!(cleaned, table);
        assert!(steps.is_empty());
    }
}

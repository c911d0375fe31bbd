use crate::table::cell::Value;
use serde::Serialize;

/// Inferred data type of a column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Boolean values (true/false)
    Boolean,
    /// 64-bit signed integers
    Integer,
    /// Double-precision floating point numbers
    Float,
    /// Free text
    Text,
    /// Date without time component
    Date,
    /// Date and time without timezone
    DateTime,
}

/// A named column of cells sharing one type.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// Column name (from header row or generated)
    pub name: String,
    /// Column data type
    pub kind: ColumnType,
    /// Cells, one per row
    pub values: Vec<Value>,
}

impl ColumnType {
    /// Returns true for integer and floating point columns.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    #[inline]
    fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::DateTime)
    }

    /// Detects the most specific common type of a column's cells.
    /// Missing cells (`None`) in an integer column widen it to float, and a
    /// column without any present cell is a float column of missing values.
    pub(crate) fn detect<I>(types: I) -> ColumnType
    where
        I: IntoIterator<Item = Option<ColumnType>>,
    {
        let mut has_null = false;
        let mut kinds = Vec::<ColumnType>::new();
        for kind in types {
            match kind {
                Some(kind) => kinds.push(kind),
                None => has_null = true,
            }
        }

        if kinds.is_empty() {
            ColumnType::Float
        } else if kinds.iter().all(|kind| *kind == ColumnType::Boolean) {
            ColumnType::Boolean
        } else if kinds.iter().all(|kind| *kind == ColumnType::Integer) {
            if has_null { ColumnType::Float } else { ColumnType::Integer }
        } else if kinds.iter().all(|kind| kind.is_numeric()) {
            ColumnType::Float
        } else if kinds.iter().all(|kind| *kind == ColumnType::Date) {
            ColumnType::Date
        } else if kinds.iter().all(|kind| kind.is_temporal()) {
            ColumnType::DateTime
        } else {
            ColumnType::Text
        }
    }
}

impl Column {
    /// Builds a column from already-typed cells, inferring the common type
    /// and converting every cell to it.
    pub fn from_values(name: &str, values: Vec<Value>) -> Column {
        let kind = ColumnType::detect(values.iter().map(Value::kind));
        let values = values.into_iter().map(|value| value.coerce(kind)).collect();
        Column {
            name: name.to_owned(),
            kind,
            values,
        }
    }

    /// Builds a column from raw text fields. Text columns keep the fields
    /// verbatim rather than a re-rendering of their inferred values.
    pub fn from_text(name: &str, fields: Vec<String>) -> Column {
        let inferred = fields.iter().map(|field| Value::infer(field)).collect::<Vec<_>>();
        let kind = ColumnType::detect(inferred.iter().map(Value::kind));
        let values = if kind == ColumnType::Text {
            inferred
                .into_iter()
                .zip(fields)
                .map(|(value, field)| if value.is_null() { Value::Null } else { Value::Text(field) })
                .collect()
        } else {
            inferred.into_iter().map(|value| value.coerce(kind)).collect()
        };
        Column {
            name: name.to_owned(),
            kind,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Counts missing cells.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_null()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|field| field.to_string()).collect()
    }

    #[test]
    fn detect_integer_and_float() {
        let column = Column::from_text("a", text(&["1", "2", "3"]));
        assert_eq!(column.kind, ColumnType::Integer);
        assert_eq!(column.values, vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);

        let column = Column::from_text("a", text(&["1", "2.5"]));
        assert_eq!(column.kind, ColumnType::Float);
        assert_eq!(column.values, vec![Value::Float(1.0), Value::Float(2.5)]);
    }

    #[test]
    fn missing_cells_widen_integers() {
        let column = Column::from_text("b", text(&["", "4"]));
        assert_eq!(column.kind, ColumnType::Float);
        assert_eq!(column.values, vec![Value::Null, Value::Float(4.0)]);
        assert_eq!(column.null_count(), 1);
    }

    #[test]
    fn all_missing_is_float() {
        let column = Column::from_text("c", text(&["", "NA"]));
        assert_eq!(column.kind, ColumnType::Float);
        assert_eq!(column.null_count(), 2);
    }

    #[test]
    fn mixed_fields_stay_verbatim() {
        let column = Column::from_text("d", text(&["1.50", "abc", "", "true"]));
        assert_eq!(column.kind, ColumnType::Text);
        assert_eq!(
            column.values,
            vec![
                Value::Text("1.50".to_owned()),
                Value::Text("abc".to_owned()),
                Value::Null,
                Value::Text("true".to_owned()),
            ]
        );
    }

    #[test]
    fn dates_and_datetimes_merge() {
        let column = Column::from_text("e", text(&["2024-01-01", "2024-01-02 12:00:00"]));
        assert_eq!(column.kind, ColumnType::DateTime);
        assert_eq!(column.values[0].to_string(), "2024-01-01 00:00:00");
    }

    #[test]
    fn from_values_coerces() {
        let column = Column::from_values("f", vec![Value::Integer(1), Value::Text("x".to_owned())]);
        assert_eq!(column.kind, ColumnType::Text);
        assert_eq!(column.values, vec![Value::Text("1".to_owned()), Value::Text("x".to_owned())]);
    }
}

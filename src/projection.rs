//! Column projection: restricts a table to an ordered selection of columns.
use crate::table::Column;
use crate::table::Table;
use crate::table::TableError;

/// Keeps exactly the `selected` columns, in the given order.
/// `None` keeps every column in its original order.
///
/// # Errors
///
/// * `UnknownColumn` when a selected name is not a column of `table`
/// * `DuplicateColumn` when a name is selected more than once
pub fn project<S: AsRef<str>>(table: Table, selected: Option<&[S]>) -> Result<Table, TableError> {
    let selected = match selected {
        Some(selected) => selected.iter().map(|name| name.as_ref()).collect::<Vec<&str>>(),
        None => return Ok(table),
    };

    if let Some(name) = selected.iter().find(|name| table.column(name).is_none()) {
        return Err(TableError::UnknownColumn(name.to_string()));
    }

    let mut columns = table.into_columns().into_iter().map(Some).collect::<Vec<Option<Column>>>();
    let mut projected = Vec::with_capacity(selected.len());
    for name in selected {
        let column = columns
            .iter_mut()
            .find(|column| matches!(column, Some(column) if column.name == name))
            .and_then(Option::take)
            .ok_or_else(|| TableError::DuplicateColumn(name.to_owned()))?;
        projected.push(column);
    }
    Table::new(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::read;
    use crate::table::Value;

    fn table() -> Table {
        read(b"a,b,c\n1,x,2.5\n2,y,\n", "csv").unwrap()
    }

    #[test]
    fn selects_in_requested_order() {
        let original = table();
        let projected = project(original.clone(), Some(&["c", "a"][..])).unwrap();
        assert_eq!(projected.column_names(), vec!["c", "a"]);
        assert_eq!(projected.column("a"), original.column("a"));
        assert_eq!(projected.column("c").unwrap().values, vec![Value::Float(2.5), Value::Null]);
    }

    #[test]
    fn default_keeps_everything() {
        let original = table();
        assert_eq!(project::<String>(original.clone(), None).unwrap(), original);
    }

    #[test]
    fn empty_selection_drops_all_columns() {
        let projected = project::<&str>(table(), Some(&[][..])).unwrap();
        assert_eq!(projected.width(), 0);
    }

    #[test]
    fn rejects_unknown_names() {
        let error = project(table(), Some(&["a", "z"][..])).unwrap_err();
        assert!(matches!(error, TableError::UnknownColumn(name) if name == "z"));
    }

    #[test]
    fn rejects_repeated_names() {
        let error = project(table(), Some(&["a", "a"][..])).unwrap_err();
        assert!(matches!(error, TableError::DuplicateColumn(name) if name == "a"));
    }
}

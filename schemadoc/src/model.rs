use serde::{Deserialize, Serialize};

/// Structural facts about one database column, as read from the information schema.
///
/// Everything except `description` is fixed once fetched. `description` may arrive
/// pre-filled (foreign keys get "Foreign key for ...") and is otherwise authored
/// by the description generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// The table this column belongs to.
    pub table_name: String,
    /// The column name in the database.
    pub column_name: String,
    /// The SQL type as reported by the information schema (e.g. "integer", "varchar").
    pub data_type: String,
    /// Character length or numeric precision, whichever the type has.
    pub length: Option<i64>,
    /// Whether this column allows NULL values.
    pub is_nullable: bool,
    /// The column default expression, if any.
    pub default: Option<String>,
    /// Whether this column takes part in a PRIMARY KEY constraint.
    pub is_primary_key: bool,
    /// Whether this column takes part in a FOREIGN KEY constraint.
    pub is_foreign_key: bool,
    /// Constraint expression text (CHECK expressions on PostgreSQL).
    pub constraint_text: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
}

impl ColumnMetadata {
    /// True when the column already carries a non-blank description.
    pub fn has_description(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

/// Columns of one table, in physical ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub table_name: String,
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self { table_name: table_name.into(), columns: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.column_name == name)
    }

    /// Appends a column, folding it into an existing entry of the same name.
    ///
    /// The introspection queries outer-join constraints, so a column that is part
    /// of several constraints comes back once per constraint. Key flags are OR-ed
    /// and the first non-empty constraint text and description win.
    pub fn push_column(&mut self, column: ColumnMetadata) {
        match self.columns.iter_mut().find(|c| c.column_name == column.column_name) {
            Some(existing) => {
                let incoming_described = column.has_description();
                existing.is_primary_key |= column.is_primary_key;
                existing.is_foreign_key |= column.is_foreign_key;
                if is_blank(existing.constraint_text.as_deref()) && !is_blank(column.constraint_text.as_deref()) {
                    existing.constraint_text = column.constraint_text;
                }
                if !existing.has_description() && incoming_described {
                    existing.description = column.description;
                }
            }
            None => self.columns.push(column),
        }
    }
}

/// A table together with its generated documentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub table_name: String,
    pub table_description: String,
    /// Same columns, same order as the [`TableMetadata`] it was produced from.
    pub columns: Vec<ColumnMetadata>,
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_id(primary: bool, foreign: bool, constraint: Option<&str>, description: Option<&str>) -> ColumnMetadata {
        ColumnMetadata {
            table_name: "order_items".to_string(),
            column_name: "order_id".to_string(),
            data_type: "integer".to_string(),
            length: Some(32),
            is_nullable: false,
            default: None,
            is_primary_key: primary,
            is_foreign_key: foreign,
            constraint_text: constraint.map(str::to_string),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn folded_row_contributes_constraint_and_description() {
        let mut table = TableMetadata::new("order_items");
        table.push_column(order_id(true, false, None, None));
        table.push_column(order_id(false, true, Some("(order_id > 0)"), Some("Foreign key for orders")));

        assert_eq!(table.columns.len(), 1);
        let column = &table.columns[0];
        assert!(column.is_primary_key && column.is_foreign_key);
        assert_eq!(column.constraint_text.as_deref(), Some("(order_id > 0)"));
        assert_eq!(column.description.as_deref(), Some("Foreign key for orders"));
    }

    #[test]
    fn first_non_blank_values_win() {
        let mut table = TableMetadata::new("order_items");
        table.push_column(order_id(false, true, Some("(order_id > 0)"), Some("Foreign key for orders")));
        table.push_column(order_id(true, false, Some("(order_id < 10)"), Some("Something else")));

        let column = &table.columns[0];
        assert_eq!(column.constraint_text.as_deref(), Some("(order_id > 0)"));
        assert_eq!(column.description.as_deref(), Some("Foreign key for orders"));
    }
}

use std::collections::HashMap;

use crate::{ColumnMetadata, TableMetadata};

/// Tables of one schema in the order they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMetadata {
    tables: Vec<TableMetadata>,
    positions: HashMap<String, usize>,
}

impl SchemaMetadata {
    pub fn get(&self, table_name: &str) -> Option<&TableMetadata> {
        self.positions.get(table_name).map(|&i| &self.tables[i])
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.table_name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableMetadata> {
        self.tables.iter()
    }

    fn entry(&mut self, table_name: &str) -> &mut TableMetadata {
        let index = match self.positions.get(table_name) {
            Some(&index) => index,
            None => {
                self.tables.push(TableMetadata::new(table_name));
                self.positions.insert(table_name.to_string(), self.tables.len() - 1);
                self.tables.len() - 1
            }
        };
        &mut self.tables[index]
    }
}

impl IntoIterator for SchemaMetadata {
    type Item = TableMetadata;
    type IntoIter = std::vec::IntoIter<TableMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

impl<'a> IntoIterator for &'a SchemaMetadata {
    type Item = &'a TableMetadata;
    type IntoIter = std::slice::Iter<'a, TableMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}

/// Groups introspected rows by table.
///
/// Row order within a table is kept as returned (already ordinal order), and
/// tables appear in the order their first row does. Repeated rows for one
/// column are folded together, see [`TableMetadata::push_column`].
pub fn group_by_table<I>(rows: I) -> SchemaMetadata
where
    I: IntoIterator<Item = ColumnMetadata>,
{
    let mut schema = SchemaMetadata::default();
    for row in rows {
        let table_name = row.table_name.clone();
        schema.entry(&table_name).push_column(row);
    }
    schema
}

//! # Workbook Module
//!
//! Writes described tables into an `.xlsx` data dictionary, one sheet per table.
//!
//! Sheet layout:
//!
//! | row | content |
//! |-----|---------|
//! | 0 | `Table Name: <table>` |
//! | 1 | `Description: <table description>` |
//! | 2 | bold headers |
//! | 3.. | one row per column |

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::collections::HashSet;
use std::path::Path;

use crate::config::ExtraColumns;
use crate::generator::NULL_TEXT;
use crate::{ColumnMetadata, Result, TableDescription};

/// Fixed headers, in column order. Extra columns follow.
pub const HEADERS: [&str; 9] = [
    "Field Name",
    "Data Type",
    "Length",
    "Allow Null?",
    "Foreign Key?",
    "Primary Key?",
    "Default",
    "Description",
    "Valid Values/Constraints",
];

/// Longest sheet name Excel accepts.
pub const MAX_SHEET_NAME: usize = 31;

const HEADER_ROW: u32 = 2;
const FIRST_DATA_ROW: u32 = 3;

/// Receives described tables.
pub trait DictionarySink {
    fn write_table(&mut self, table: &TableDescription) -> Result<()>;
}

// ============================================================================
// Rows
// ============================================================================

/// One column rendered as spreadsheet cells.
///
/// Empty or absent values are `"NULL"`, flags are `Yes`/`No`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryRow {
    pub field_name: String,
    pub data_type: String,
    pub length: String,
    pub allow_null: String,
    pub foreign_key: String,
    pub primary_key: String,
    pub default: String,
    pub description: String,
    pub constraints: String,
    pub extras: Vec<String>,
}

impl DictionaryRow {
    pub fn from_column(column: &ColumnMetadata, extras: &ExtraColumns) -> Self {
        Self {
            field_name: or_null(Some(&column.column_name)),
            data_type: or_null(Some(&column.data_type)),
            length: column.length.map_or_else(|| NULL_TEXT.to_string(), |l| l.to_string()),
            allow_null: yes_no(column.is_nullable),
            foreign_key: yes_no(column.is_foreign_key),
            primary_key: yes_no(column.is_primary_key),
            default: or_null(column.default.as_deref()),
            description: or_null(column.description.as_deref()),
            constraints: or_null(column.constraint_text.as_deref()),
            extras: extras.values().map(|v| or_null(Some(v))).collect(),
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = &str> {
        [
            &self.field_name,
            &self.data_type,
            &self.length,
            &self.allow_null,
            &self.foreign_key,
            &self.primary_key,
            &self.default,
            &self.description,
            &self.constraints,
        ]
        .into_iter()
        .chain(self.extras.iter())
        .map(String::as_str)
    }
}

fn or_null(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NULL_TEXT.to_string(),
    }
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

// ============================================================================
// Sheet Names
// ============================================================================

/// A valid, unused sheet name for `table_name`.
///
/// Invalid characters become `_`, the name is cut to 31 characters and a
/// `~N` suffix resolves clashes. Excel compares sheet names case-insensitively.
pub fn sheet_name(table_name: &str, taken: &HashSet<String>) -> String {
    let mut cleaned: String = table_name
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .collect();
    if cleaned.trim().is_empty() {
        cleaned = "Sheet".to_string();
    }
    if cleaned.starts_with('\'') {
        cleaned.replace_range(..1, "_");
    }
    // Reserved by Excel.
    if cleaned.eq_ignore_ascii_case("history") {
        cleaned.push('_');
    }

    let fit = |base: &str, suffix: &str| {
        let room = MAX_SHEET_NAME - suffix.chars().count();
        let mut name: String = base.chars().take(room).collect();
        if name.ends_with('\'') {
            name.pop();
            name.push('_');
        }
        name + suffix
    };

    let candidate = fit(&cleaned, "");
    if !taken.contains(&candidate.to_lowercase()) {
        return candidate;
    }
    (2..)
        .map(|n| fit(&cleaned, &format!("~{n}")))
        .find(|name| !taken.contains(&name.to_lowercase()))
        .unwrap_or(candidate)
}

// ============================================================================
// Workbook
// ============================================================================

/// Accumulates sheets in memory until [`save`](Self::save) is called.
pub struct DictionaryWorkbook {
    workbook: Workbook,
    extras: ExtraColumns,
    sheet_names: HashSet<String>,
    sheets: Vec<String>,
    bold: Format,
}

impl DictionaryWorkbook {
    pub fn new(extras: ExtraColumns) -> Self {
        Self {
            workbook: Workbook::new(),
            extras,
            sheet_names: HashSet::new(),
            sheets: Vec::new(),
            bold: Format::new().set_bold(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Sheet names in the order they were added.
    pub fn sheet_names(&self) -> &[String] {
        &self.sheets
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.workbook.save(path.as_ref())?;
        Ok(())
    }

    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>> {
        Ok(self.workbook.save_to_buffer()?)
    }

    fn build_sheet(&self, name: &str, table: &TableDescription) -> Result<Worksheet> {
        let mut sheet = Worksheet::new();
        sheet.set_name(name)?;

        sheet.write_string(0, 0, format!("Table Name: {}", table.table_name))?;
        sheet.write_string(1, 0, format!("Description: {}", or_null(Some(&table.table_description))))?;

        let headers = HEADERS.iter().copied().chain(self.extras.names());
        for (col, header) in (0u16..).zip(headers) {
            sheet.write_string_with_format(HEADER_ROW, col, header, &self.bold)?;
        }

        for (row, column) in (FIRST_DATA_ROW..).zip(&table.columns) {
            let record = DictionaryRow::from_column(column, &self.extras);
            for (col, cell) in (0u16..).zip(record.cells()) {
                sheet.write_string(row, col, cell)?;
            }
        }

        sheet.set_column_width(0, 28)?;
        sheet.set_column_width(7, 60)?;
        Ok(sheet)
    }
}

impl DictionarySink for DictionaryWorkbook {
    /// Adds a sheet for `table`. A failed write leaves the workbook unchanged.
    fn write_table(&mut self, table: &TableDescription) -> Result<()> {
        let name = sheet_name(&table.table_name, &self.sheet_names);
        let sheet = self.build_sheet(&name, table)?;

        self.workbook.push_worksheet(sheet);
        self.sheet_names.insert(name.to_lowercase());
        if name != table.table_name {
            log::debug!("Table '{}' written to sheet '{name}'", table.table_name);
        }
        self.sheets.push(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_lowercase()).collect()
    }

    #[test]
    fn names_are_cleaned_and_cut() {
        assert_eq!(sheet_name("users", &taken(&[])), "users");
        assert_eq!(sheet_name("a/b:c", &taken(&[])), "a_b_c");
        let long = "customer_subscription_billing_history_archive";
        assert_eq!(sheet_name(long, &taken(&[])).chars().count(), MAX_SHEET_NAME);
    }

    #[test]
    fn clashes_get_a_suffix_within_the_limit() {
        let long = "customer_subscription_billing_history_archive";
        let first = sheet_name(long, &taken(&[]));
        let second = sheet_name(long, &taken(&[&first]));
        assert_ne!(first, second);
        assert!(second.ends_with("~2"));
        assert_eq!(second.chars().count(), MAX_SHEET_NAME);
        assert_eq!(sheet_name("Users", &taken(&["users"])), "Users~2");
    }

    #[test]
    fn rows_render_nulls_and_flags() {
        let column = ColumnMetadata {
            table_name: "users".to_string(),
            column_name: "email".to_string(),
            data_type: "character varying".to_string(),
            length: Some(255),
            is_nullable: false,
            default: Some("  ".to_string()),
            is_primary_key: false,
            is_foreign_key: false,
            constraint_text: None,
            description: Some("Login address".to_string()),
        };
        let extras = ExtraColumns::parse("owner", "DataGov");
        let row = DictionaryRow::from_column(&column, &extras);
        let cells: Vec<&str> = row.cells().collect();
        assert_eq!(
            cells,
            ["email", "character varying", "255", "No", "No", "No", "NULL", "Login address", "NULL", "DataGov"]
        );
    }
}

//! # Prompt Module
//!
//! Serializes table metadata for the model and renders the generation prompt.
//!
//! Templates use `{slot}` placeholders. Rendering is a single left-to-right
//! pass: a placeholder is replaced only when it names a known slot, anything
//! else (including the braces of inline JSON examples) is copied verbatim, and
//! substituted values are never scanned again.

use serde::Serialize;

use crate::{ColumnMetadata, Result, TableMetadata};

/// Template used when none is supplied.
pub const DEFAULT_TEMPLATE: &str = r#"You are an expert database documenter writing a data dictionary for the {domain_name} domain.

Below is the metadata of the table "{table_name}" as JSON. Each column carries, in this order:
table_name, column_name, datatype, length, is_nullable, default, primary_key, foreign_key, constraints, description.

{metadata}

Rules:
1. Return every column exactly once, in the same order. Do not change any field except "description".
2. For each column whose description is empty or null, write a meaningful description of at most 255 characters. Replace any other empty or null value with "NULL".
3. If a column already has a description, return it unchanged.
4. Never mention {domain_name} in a column or table description.
5. Write a short description of the table as a whole.

Respond with a single JSON object and nothing else, no markdown and no commentary:
{"table_name": "{table_name}", "table_description": "...", "columns": [{"column_name": "...", "description": "..."}]}
"#;

// ============================================================================
// Metadata Serialization
// ============================================================================

/// Wire form of one column; field order is the order the model is told about.
#[derive(Serialize)]
struct PromptColumn<'a> {
    table_name: &'a str,
    column_name: &'a str,
    datatype: &'a str,
    length: Option<i64>,
    is_nullable: &'static str,
    default: Option<&'a str>,
    primary_key: &'static str,
    foreign_key: &'static str,
    constraints: Option<&'a str>,
    description: Option<&'a str>,
}

#[derive(Serialize)]
struct PromptTable<'a> {
    table_name: &'a str,
    columns: Vec<PromptColumn<'a>>,
}

impl<'a> From<&'a ColumnMetadata> for PromptColumn<'a> {
    fn from(column: &'a ColumnMetadata) -> Self {
        Self {
            table_name: &column.table_name,
            column_name: &column.column_name,
            datatype: &column.data_type,
            length: column.length,
            is_nullable: if column.is_nullable { "YES" } else { "NO" },
            default: column.default.as_deref(),
            primary_key: yes_no(column.is_primary_key),
            foreign_key: yes_no(column.is_foreign_key),
            constraints: column.constraint_text.as_deref(),
            description: column.description.as_deref().filter(|d| !d.trim().is_empty()),
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Pretty-printed JSON of the table and its columns.
pub fn serialize_metadata(table: &TableMetadata) -> Result<String> {
    let payload = PromptTable {
        table_name: &table.table_name,
        columns: table.columns.iter().map(PromptColumn::from).collect(),
    };
    serde_json::to_string_pretty(&payload)
        .map_err(|e| crate::Error::parse(&table.table_name, format!("could not serialize metadata: {e}")))
}

// ============================================================================
// Template
// ============================================================================

/// Values for the three template slots.
#[derive(Debug, Clone, Copy)]
pub struct PromptSlots<'a> {
    pub metadata: &'a str,
    pub domain_name: &'a str,
    pub table_name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn render(&self, slots: &PromptSlots<'_>) -> String {
        let mut out = String::with_capacity(self.text.len() + slots.metadata.len());
        let mut rest = self.text.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let value = after.find('}').and_then(|close| {
                let name = &after[..close];
                let value = match name {
                    "metadata" => slots.metadata,
                    "domain_name" => slots.domain_name,
                    "table_name" => slots.table_name,
                    _ => return None,
                };
                Some((value, close))
            });

            match value {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

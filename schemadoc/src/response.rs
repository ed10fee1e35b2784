//! # Response Module
//!
//! Turns whatever a provider returned into a [`ParsedDescription`].
//!
//! Models are asked for one JSON object but do not always comply. Three shapes
//! are accepted:
//!
//! - `{"table_name": .., "table_description": .., "columns": [..]}`
//! - `{"text": {..}}` or `{"text": "<json string>"}` wrapping the first shape
//! - a bare `[..]` list of columns, with an empty table description
//!
//! Each column entry is either an object keyed by `column_name` (or
//! `column name`, or `name`) with a `description`, or a positional array in the
//! order the metadata was serialized.

use serde_json::{Map, Value};

use crate::provider::Generation;
use crate::{Error, Result};

/// Index of `column_name` in a positional column array.
const POSITIONAL_NAME: usize = 1;
/// Index of `description` in a positional column array.
const POSITIONAL_DESCRIPTION: usize = 9;

/// The parts of a model answer the generator uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDescription {
    pub table_name: Option<String>,
    pub table_description: String,
    pub columns: Vec<ColumnAnswer>,
}

/// One column as the model returned it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnAnswer {
    pub column_name: Option<String>,
    pub description: Option<String>,
}

/// Decodes a generation into JSON, cleaning up raw text first.
pub fn parse_generation(table: &str, generation: Generation) -> Result<Value> {
    match generation {
        Generation::Json(value) => Ok(value),
        Generation::Text(text) => parse_text(table, &text),
    }
}

fn parse_text(table: &str, text: &str) -> Result<Value> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return Err(Error::parse(table, "empty response"));
    }
    serde_json::from_str(cleaned).map_err(|e| Error::parse(table, format!("response is not valid JSON ({e})")))
}

/// Strips a markdown code fence and any leading label such as `Output:`.
///
/// Returns the slice from the first `{` or `[` to the last matching closer.
/// Text without either is returned trimmed so the JSON error stays meaningful.
pub fn clean_text(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(fenced) = text.strip_prefix("```") {
        // Drop the info string (`json`, `JSON`, ...) up to the end of the line.
        text = match fenced.find('\n') {
            Some(newline) => &fenced[newline + 1..],
            None => fenced.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        text = text.trim_end();
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }

    let Some(start) = text.find(['{', '[']) else {
        return text;
    };
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    match text.rfind(closer) {
        Some(end) if end > start => &text[start..=end],
        _ => &text[start..],
    }
}

// ============================================================================
// Shape Normalization
// ============================================================================

/// Reduces any accepted response shape to a [`ParsedDescription`].
///
/// # Errors
///
/// [`Error::DescriptionParse`] when no `columns` array can be found.
pub fn normalize(table: &str, value: Value) -> Result<ParsedDescription> {
    match value {
        Value::Array(columns) => Ok(ParsedDescription {
            table_name: None,
            table_description: String::new(),
            columns: columns.iter().map(column_answer).collect(),
        }),
        Value::Object(mut object) => match object.remove("text") {
            Some(Value::String(inner)) => normalize_object(table, unwrap_object(table, parse_text(table, &inner)?)?),
            Some(Value::Object(inner)) => normalize_object(table, inner),
            Some(other) => {
                object.insert("text".to_string(), other);
                normalize_object(table, object)
            }
            None => normalize_object(table, object),
        },
        _ => Err(Error::parse(table, "response is neither an object nor a list")),
    }
}

fn unwrap_object(table: &str, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(object) => Ok(object),
        Value::Array(columns) => {
            let mut object = Map::new();
            object.insert("columns".to_string(), Value::Array(columns));
            Ok(object)
        }
        _ => Err(Error::parse(table, "\"text\" does not hold a JSON object")),
    }
}

fn normalize_object(table: &str, object: Map<String, Value>) -> Result<ParsedDescription> {
    let columns = match object.get("columns") {
        Some(Value::Array(columns)) => columns.iter().map(column_answer).collect(),
        _ => return Err(Error::parse(table, "no \"columns\" array in response")),
    };

    Ok(ParsedDescription {
        table_name: string_field(&object, &["table_name"]),
        table_description: string_field(&object, &["table_description", "description"]).unwrap_or_default(),
        columns,
    })
}

fn column_answer(entry: &Value) -> ColumnAnswer {
    match entry {
        Value::Object(object) => ColumnAnswer {
            column_name: string_field(object, &["column_name", "column name", "name"]),
            description: string_field(object, &["description"]),
        },
        Value::Array(fields) => ColumnAnswer {
            column_name: fields.get(POSITIONAL_NAME).and_then(non_blank),
            description: fields.get(POSITIONAL_DESCRIPTION).and_then(non_blank),
        },
        _ => ColumnAnswer::default(),
    }
}

fn string_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| object.get(*key).and_then(non_blank))
}

fn non_blank(value: &Value) -> Option<String> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

//! # Generator Module
//!
//! Produces a [`TableDescription`] for one table with a single model call.
//!
//! The model only ever contributes text. Column set, order and every key field
//! come from the request, and a column that already had a description keeps it.

use log::debug;
use std::collections::HashMap;
use std::fmt;

use crate::prompt::{serialize_metadata, PromptSlots, PromptTemplate};
use crate::provider::TextGenerator;
use crate::response::{normalize, parse_generation, ColumnAnswer, ParsedDescription};
use crate::{Error, Result, TableDescription, TableMetadata};

/// Upper bound for an authored column description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 255;

/// Placeholder for values that are absent.
pub const NULL_TEXT: &str = "NULL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Serialized,
    RequestSent,
    ResponseReceived,
    Parsed,
    Normalized,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks one `describe` call for debug logging.
struct Invocation<'a> {
    table: &'a str,
    stage: Stage,
}

impl<'a> Invocation<'a> {
    fn start(table: &'a str) -> Self {
        Self { table, stage: Stage::Idle }
    }

    fn advance(&mut self, next: Stage) {
        debug!("{}: {} -> {}", self.table, self.stage, next);
        self.stage = next;
    }

    fn step<T>(&mut self, next: Stage, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.advance(next);
                Ok(value)
            }
            Err(e) => {
                debug!("{}: {} -> {} ({e})", self.table, self.stage, Stage::Failed);
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }
}

/// Builds prompts, calls the model and merges its answer back into the metadata.
pub struct DescriptionGenerator {
    client: Box<dyn TextGenerator>,
    domain_name: String,
    template: PromptTemplate,
}

impl DescriptionGenerator {
    pub fn new(client: Box<dyn TextGenerator>, domain_name: impl Into<String>) -> Self {
        Self { client, domain_name: domain_name.into(), template: PromptTemplate::default() }
    }

    /// Replaces the default prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn client(&self) -> &dyn TextGenerator {
        self.client.as_ref()
    }

    /// Prompt that would be sent for `table`.
    pub fn render_prompt(&self, table: &TableMetadata) -> Result<String> {
        let metadata = serialize_metadata(table)?;
        Ok(self.template.render(&PromptSlots {
            metadata: &metadata,
            domain_name: &self.domain_name,
            table_name: &table.table_name,
        }))
    }

    /// Describes one table.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyMetadata`] if the table has no columns; the model is not called
    /// - [`Error::Generation`] if the provider request fails
    /// - [`Error::DescriptionParse`] if the answer is not usable JSON
    pub async fn describe(&self, table: &TableMetadata) -> Result<TableDescription> {
        if table.is_empty() {
            return Err(Error::EmptyMetadata(table.table_name.clone()));
        }

        let mut run = Invocation::start(&table.table_name);
        let prompt = run.step(Stage::Serialized, self.render_prompt(table))?;

        run.advance(Stage::RequestSent);
        let generation = run.step(Stage::ResponseReceived, self.client.generate(&prompt).await)?;

        let value = run.step(Stage::Parsed, parse_generation(&table.table_name, generation))?;
        let parsed = run.step(Stage::Normalized, normalize(&table.table_name, value))?;

        let description = merge(table, parsed);
        run.advance(Stage::Done);
        Ok(description)
    }
}

// ============================================================================
// Merge
// ============================================================================

/// Answers indexed by column name.
///
/// Exact names match first. A case-insensitive match is used only when the
/// folded name is unique among both the requested columns and the answers, so
/// quoted identifiers such as `"ID"` and `id` never share a description.
struct AnswerIndex<'a> {
    exact: HashMap<&'a str, &'a ColumnAnswer>,
    folded: HashMap<String, Option<&'a ColumnAnswer>>,
    requested: HashMap<String, usize>,
}

impl<'a> AnswerIndex<'a> {
    fn new(table: &TableMetadata, answers: &'a [ColumnAnswer]) -> Self {
        let mut exact = HashMap::new();
        let mut folded: HashMap<String, Option<&ColumnAnswer>> = HashMap::new();
        for answer in answers {
            let Some(name) = answer.column_name.as_deref() else {
                continue;
            };
            exact.entry(name).or_insert(answer);
            folded
                .entry(name.to_lowercase())
                .and_modify(|slot| *slot = None)
                .or_insert(Some(answer));
        }

        let mut requested = HashMap::new();
        for column in &table.columns {
            *requested.entry(column.column_name.to_lowercase()).or_insert(0) += 1;
        }

        Self { exact, folded, requested }
    }

    fn get(&self, name: &str) -> Option<&'a ColumnAnswer> {
        if let Some(answer) = self.exact.get(name) {
            return Some(*answer);
        }
        let key = name.to_lowercase();
        if self.requested.get(&key).copied() != Some(1) {
            return None;
        }
        self.folded.get(&key).copied().flatten()
    }
}

/// Folds model answers into the request's columns.
///
/// Answers are matched by exact column name, then case-insensitively when that
/// is unambiguous, then by position when the answer at the same index carries
/// no name.
pub fn merge(table: &TableMetadata, parsed: ParsedDescription) -> TableDescription {
    if let Some(returned) = parsed.table_name.as_deref() {
        if returned != table.table_name {
            debug!("{}: response named the table '{returned}', keeping the requested name", table.table_name);
        }
    }

    let by_name = AnswerIndex::new(table, &parsed.columns);

    let columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(position, column)| {
            let mut column = column.clone();
            if !column.has_description() {
                let answer = by_name.get(&column.column_name).or_else(|| {
                    parsed.columns.get(position).filter(|answer| answer.column_name.is_none())
                });
                let authored = answer.and_then(|a| a.description.as_deref()).map(str::trim).filter(|d| !d.is_empty());
                column.description = Some(match authored {
                    Some(text) => truncate_chars(text, MAX_DESCRIPTION_CHARS).to_string(),
                    None => NULL_TEXT.to_string(),
                });
            }
            column
        })
        .collect();

    TableDescription {
        table_name: table.table_name.clone(),
        table_description: parsed.table_description.trim().to_string(),
        columns,
    }
}

/// Cuts `text` to at most `max` characters, never inside a character.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

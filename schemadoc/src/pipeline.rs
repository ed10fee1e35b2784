//! # Pipeline Module
//!
//! Drives introspection, grouping, description and output for one schema.
//! Tables are handled one after another; a failure skips that table only.

use log::{info, warn};

use crate::aggregate::{group_by_table, SchemaMetadata};
use crate::database::MetadataSource;
use crate::generator::DescriptionGenerator;
use crate::workbook::DictionarySink;
use crate::{Error, Result, TableMetadata};

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tables that reached the sink, in processing order.
    pub written: Vec<String>,
    /// Tables that were skipped, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl RunSummary {
    /// At least one table was written.
    pub fn is_success(&self) -> bool {
        !self.written.is_empty()
    }

    fn skip(&mut self, table: &str, err: &Error) {
        warn!("Skipping table {table}: {err}");
        self.skipped.push((table.to_string(), err.to_string()));
    }
}

pub struct DictionaryPipeline<'a> {
    source: &'a dyn MetadataSource,
    generator: &'a DescriptionGenerator,
}

impl<'a> DictionaryPipeline<'a> {
    pub fn new(source: &'a dyn MetadataSource, generator: &'a DescriptionGenerator) -> Self {
        Self { source, generator }
    }

    /// Documents `schema` into `sink`.
    ///
    /// With an empty `tables` list the whole schema is read in one query.
    /// Otherwise each named table is fetched on its own, and a named table
    /// without columns is reported as skipped.
    pub async fn run(&self, schema: &str, tables: &[String], sink: &mut dyn DictionarySink) -> RunSummary {
        let mut summary = RunSummary::default();

        let metadata = if tables.is_empty() {
            info!("Extracting metadata for schema {schema} using {}", self.source.driver().label());
            group_by_table(self.source.fetch_metadata(schema).await)
        } else {
            self.fetch_selected(schema, tables, &mut summary).await
        };

        if metadata.is_empty() && summary.skipped.is_empty() {
            warn!("No tables found in schema {schema}");
        }

        for table in &metadata {
            info!("Processing table: {}...", table.table_name);
            match self.process(table, sink).await {
                Ok(()) => {
                    info!("Successfully generated data dictionary for {}", table.table_name);
                    summary.written.push(table.table_name.clone());
                }
                Err(err) => summary.skip(&table.table_name, &err),
            }
        }

        info!("Run finished: {} table(s) written, {} skipped", summary.written.len(), summary.skipped.len());
        summary
    }

    async fn fetch_selected(&self, schema: &str, tables: &[String], summary: &mut RunSummary) -> SchemaMetadata {
        let mut rows = Vec::new();
        for table in tables {
            match self.source.fetch_columns(schema, table).await {
                Ok(columns) if columns.is_empty() => summary.skip(table, &Error::EmptyMetadata(table.clone())),
                Ok(columns) => rows.extend(columns),
                Err(err) => summary.skip(table, &err),
            }
        }
        group_by_table(rows)
    }

    async fn process(&self, table: &TableMetadata, sink: &mut dyn DictionarySink) -> Result<()> {
        let description = self.generator.describe(table).await?;
        sink.write_table(&description)
    }
}

//! # schemadoc
//!
//! Builds data dictionaries for PostgreSQL and MySQL schemas. Column metadata
//! is read from the information schema, a language model writes the missing
//! descriptions, and the result is written as one spreadsheet sheet per table.
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemadoc::{
//!     database, Config, DescriptionGenerator, DictionaryPipeline, DictionaryWorkbook, ProviderRegistry,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> schemadoc::Result<()> {
//!     let config = Config::from_env()?;
//!     let source = database::introspector(&config.database)?;
//!     let client = ProviderRegistry::with_defaults().select(&config.llm)?;
//!     let generator = DescriptionGenerator::new(client, &config.domain_name);
//!
//!     let mut workbook = DictionaryWorkbook::new(config.extra_columns.clone());
//!     let summary = DictionaryPipeline::new(source.as_ref(), &generator)
//!         .run(&config.schema_name, &config.tables, &mut workbook)
//!         .await;
//!
//!     if summary.is_success() {
//!         workbook.save(config.output_file())?;
//!     }
//!     Ok(())
//! }
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod aggregate;
pub mod config;
pub mod database;
pub mod error;
pub mod generator;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod response;
pub mod workbook;

// ============================================================================
// Public API Re-exports
// ============================================================================

pub use aggregate::{group_by_table, SchemaMetadata};
pub use config::{Config, DatabaseConfig, ExtraColumns, LlmConfig};
pub use database::{introspector, Drivers, MetadataSource};
pub use error::{Error, Result};
pub use generator::DescriptionGenerator;
pub use model::{ColumnMetadata, TableDescription, TableMetadata};
pub use pipeline::{DictionaryPipeline, RunSummary};
pub use prompt::PromptTemplate;
pub use provider::{Credential, Generation, ProviderRegistry, ProviderSettings, TextGenerator};
pub use workbook::{DictionaryRow, DictionarySink, DictionaryWorkbook};

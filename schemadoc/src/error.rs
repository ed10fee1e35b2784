//! # Error Module
//!
//! A single error enum covers every failure the pipeline can produce. Variants
//! fall into two groups: fatal ones that abort a run before any table is
//! processed, and per-table ones that the pipeline logs and skips.

use thiserror::Error;

/// Errors produced by schemadoc.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration, unknown provider, missing credential.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `DBMS` names a database without an introspector.
    #[error("unsupported database '{0}', expected 'postgres' or 'mysql'")]
    UnsupportedDatabase(String),

    /// The database could not be reached.
    #[error("could not connect to {driver}: {source}")]
    Connection {
        driver: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The metadata query failed or returned rows of an unexpected shape.
    #[error("failed to fetch metadata for '{target}': {source}")]
    MetadataFetch {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// The table has no columns; no generation request is made.
    #[error("no column metadata found for table '{0}'")]
    EmptyMetadata(String),

    /// The provider answered with something that is not a usable description.
    #[error("could not parse description for table '{table}': {reason}")]
    DescriptionParse { table: String, reason: String },

    /// The provider client could not be constructed.
    #[error("failed to initialize {provider} client: {reason}")]
    ProviderInit { provider: String, reason: String },

    /// The generation request failed or the response envelope was unreadable.
    #[error("{provider} generation request failed: {reason}")]
    Generation { provider: String, reason: String },

    /// Spreadsheet write or save failure.
    #[error("workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error aborts the whole run rather than skipping one table.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::UnsupportedDatabase(_) | Error::ProviderInit { .. } | Error::Io(_)
        )
    }

    pub(crate) fn parse(table: &str, reason: impl Into<String>) -> Self {
        Error::DescriptionParse { table: table.to_string(), reason: reason.into() }
    }

    pub(crate) fn generation(provider: &str, reason: impl Into<String>) -> Self {
        Error::Generation { provider: provider.to_string(), reason: reason.into() }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

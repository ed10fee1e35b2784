//! # Database Module
//!
//! Schema introspection for PostgreSQL and MySQL. Each dialect implements
//! [`MetadataSource`]; [`introspector`] picks one from the configuration.
//!
//! Every call opens its own connection and closes it before returning. There is
//! no pool: a run touches the database a handful of times at most.

// ============================================================================
// External Crate Imports
// ============================================================================

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{config::DatabaseConfig, model::is_blank, ColumnMetadata, Error, Result};

mod mysql;
mod postgres;

pub use mysql::MySqlIntrospector;
pub use postgres::PostgresIntrospector;

// ============================================================================
// Database Driver Enum
// ============================================================================

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drivers {
    /// PostgreSQL driver
    Postgres,
    /// MySQL driver
    MySQL,
}

impl Drivers {
    /// Human-readable product name, used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            Drivers::Postgres => "PostgreSQL",
            Drivers::MySQL => "MySQL",
        }
    }
}

impl FromStr for Drivers {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Drivers::Postgres),
            "mysql" => Ok(Drivers::MySQL),
            other => Err(Error::UnsupportedDatabase(other.to_string())),
        }
    }
}

impl fmt::Display for Drivers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Drivers::Postgres => "postgres",
            Drivers::MySQL => "mysql",
        })
    }
}

// ============================================================================
// MetadataSource Trait
// ============================================================================

/// Column-level metadata extraction for one database dialect.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    fn driver(&self) -> Drivers;

    /// Opens and closes one connection. Used at startup so an unreachable
    /// database fails the run before any table is processed.
    async fn check_connection(&self) -> Result<()>;

    /// Columns of a single table in ordinal order.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] when the database is unreachable and
    /// [`Error::MetadataFetch`] when the query fails.
    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnMetadata>>;

    /// Columns of every table in `schema`, grouped by table and in ordinal order
    /// within each table.
    async fn try_fetch_metadata(&self, schema: &str) -> Result<Vec<ColumnMetadata>>;

    /// Schema-wide extraction that never fails: errors are logged and an empty
    /// result is returned.
    async fn fetch_metadata(&self, schema: &str) -> Vec<ColumnMetadata> {
        match self.try_fetch_metadata(schema).await {
            Ok(rows) => rows,
            Err(err) => {
                log::error!("Error fetching metadata for schema {schema} from {}: {err}", self.driver().label());
                Vec::new()
            }
        }
    }
}

/// Builds the introspector for the configured dialect.
pub fn introspector(config: &DatabaseConfig) -> Result<Box<dyn MetadataSource>> {
    let source: Box<dyn MetadataSource> = match config.driver {
        Drivers::Postgres => Box::new(PostgresIntrospector::new(config)?),
        Drivers::MySQL => Box::new(MySqlIntrospector::new(config)?),
    };
    log::info!("Using {} introspector", config.driver.label());
    Ok(source)
}

// ============================================================================
// Shared Row Handling
// ============================================================================

/// One row of either dialect's column query, before normalization.
///
/// Both queries alias their columns to these names and cast every value to
/// text or bigint so both drivers decode them the same way.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RawColumnRow {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub length: Option<i64>,
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub primary_key: String,
    pub foreign_key: String,
    pub constraints: Option<String>,
    pub description: Option<String>,
}

impl RawColumnRow {
    pub(crate) fn into_column(self) -> ColumnMetadata {
        ColumnMetadata {
            table_name: self.table_name,
            column_name: self.column_name,
            data_type: self.data_type,
            length: self.length,
            is_nullable: self.is_nullable.eq_ignore_ascii_case("YES"),
            default: non_blank(self.column_default),
            is_primary_key: self.primary_key.eq_ignore_ascii_case("Yes"),
            is_foreign_key: self.foreign_key.eq_ignore_ascii_case("Yes"),
            constraint_text: non_blank(self.constraints),
            description: non_blank(self.description),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    if is_blank(value.as_deref()) { None } else { value }
}

/// Closes a connection, logging instead of failing: by the time this runs the
/// query result is already in hand.
pub(crate) async fn release<C: sqlx::Connection>(conn: C, driver: Drivers) {
    if let Err(err) = conn.close().await {
        log::warn!("Failed to close {} connection cleanly: {err}", driver.label());
    }
}

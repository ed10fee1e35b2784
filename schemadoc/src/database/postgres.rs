use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection as _;
use std::str::FromStr;

use super::{release, Drivers, MetadataSource, RawColumnRow};
use crate::{config::DatabaseConfig, ColumnMetadata, Error, Result};

// information_schema exposes domain types (sql_identifier, cardinal_number,
// yes_or_no) that the driver will not decode as String/i64, hence the casts.
// key_column_usage never lists CHECK constraints, so their expressions come
// from a separate lookup on pg_constraint keyed by the column's attnum.
macro_rules! pg_columns_query {
    ($filter:literal) => {
        concat!(
            r#"
SELECT
    c.table_name::text AS table_name,
    c.column_name::text AS column_name,
    c.data_type::text AS data_type,
    COALESCE(c.character_maximum_length, c.numeric_precision)::bigint AS length,
    c.is_nullable::text AS is_nullable,
    c.column_default::text AS column_default,
    CASE WHEN tc.constraint_type = 'PRIMARY KEY' THEN 'Yes' ELSE 'No' END AS primary_key,
    CASE WHEN tc.constraint_type = 'FOREIGN KEY' THEN 'Yes' ELSE 'No' END AS foreign_key,
    COALESCE(pg_get_expr(pgc.conbin, pgc.conrelid), chk.expr) AS constraints,
    CASE
        WHEN tc.constraint_type = 'FOREIGN KEY' THEN 'Foreign key for ' || pgc.confrelid::regclass::text
        ELSE ''
    END AS description
FROM information_schema.columns c
LEFT JOIN information_schema.key_column_usage kcu
       ON c.table_schema = kcu.table_schema
      AND c.table_name   = kcu.table_name
      AND c.column_name  = kcu.column_name
LEFT JOIN information_schema.table_constraints tc
       ON kcu.constraint_name = tc.constraint_name
      AND tc.table_schema     = c.table_schema
      AND tc.table_name       = c.table_name
LEFT JOIN pg_constraint pgc
       ON tc.constraint_name  = pgc.conname
      AND pgc.connamespace    = (SELECT oid FROM pg_namespace WHERE nspname = c.table_schema)
      AND pgc.conrelid        = (quote_ident(c.table_schema) || '.' || quote_ident(c.table_name))::regclass
LEFT JOIN LATERAL (
    SELECT string_agg(pg_get_expr(ck.conbin, ck.conrelid), ' AND ' ORDER BY ck.conname) AS expr
    FROM pg_constraint ck
    JOIN pg_attribute att
      ON att.attrelid = ck.conrelid
     AND att.attnum   = ANY (ck.conkey)
    WHERE ck.contype  = 'c'
      AND ck.conrelid = (quote_ident(c.table_schema) || '.' || quote_ident(c.table_name))::regclass
      AND att.attname::text = c.column_name::text
) chk ON true
WHERE c.table_schema = $1"#,
            $filter,
            r#"
ORDER BY c.table_name, c.ordinal_position"#
        )
    };
}

pub(crate) const SCHEMA_COLUMNS_QUERY: &str = pg_columns_query!("");
pub(crate) const TABLE_COLUMNS_QUERY: &str = pg_columns_query!("\n  AND c.table_name   = $2");

/// Reads column metadata from PostgreSQL's information schema and `pg_constraint`.
#[derive(Debug, Clone)]
pub struct PostgresIntrospector {
    options: PgConnectOptions,
}

impl PostgresIntrospector {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = match &config.url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| Error::Configuration(format!("invalid DATABASE_URL for PostgreSQL: {e}")))?,
            None => PgConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.user)
                .password(&config.password)
                .database(&config.database),
        };
        Ok(Self { options })
    }

    async fn connect(&self) -> Result<PgConnection> {
        PgConnection::connect_with(&self.options)
            .await
            .map_err(|source| Error::Connection { driver: Drivers::Postgres.label(), source })
    }

    async fn query(&self, sql: &'static str, schema: &str, table: Option<&str>) -> Result<Vec<ColumnMetadata>> {
        let target = match table {
            Some(table) => format!("{schema}.{table}"),
            None => schema.to_string(),
        };
        log::info!("Fetching metadata from PostgreSQL for '{target}'");

        let mut conn = self.connect().await?;
        let mut query = sqlx::query_as::<_, RawColumnRow>(sql).bind(schema);
        if let Some(table) = table {
            query = query.bind(table);
        }
        let fetched = query.fetch_all(&mut conn).await;
        release(conn, Drivers::Postgres).await;

        let rows = fetched.map_err(|source| Error::MetadataFetch { target, source })?;
        Ok(rows.into_iter().map(RawColumnRow::into_column).collect())
    }
}

#[async_trait]
impl MetadataSource for PostgresIntrospector {
    fn driver(&self) -> Drivers {
        Drivers::Postgres
    }

    async fn check_connection(&self) -> Result<()> {
        let conn = self.connect().await?;
        log::info!("Connected to PostgreSQL");
        release(conn, Drivers::Postgres).await;
        Ok(())
    }

    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnMetadata>> {
        self.query(TABLE_COLUMNS_QUERY, schema, Some(table)).await
    }

    async fn try_fetch_metadata(&self, schema: &str) -> Result<Vec<ColumnMetadata>> {
        self.query(SCHEMA_COLUMNS_QUERY, schema, None).await
    }
}

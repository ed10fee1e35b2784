use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection as _;
use std::str::FromStr;

use super::{release, Drivers, MetadataSource, RawColumnRow};
use crate::{config::DatabaseConfig, ColumnMetadata, Error, Result};

// MySQL has no CHECK-expression equivalent here, so `constraints` is always
// empty and only the referenced table is reported for foreign keys.
macro_rules! mysql_columns_query {
    ($filter:literal) => {
        concat!(
            r#"
SELECT
    CAST(c.TABLE_NAME AS CHAR) AS table_name,
    CAST(c.COLUMN_NAME AS CHAR) AS column_name,
    CAST(c.DATA_TYPE AS CHAR) AS data_type,
    CAST(COALESCE(c.CHARACTER_MAXIMUM_LENGTH, c.NUMERIC_PRECISION) AS SIGNED) AS length,
    CAST(c.IS_NULLABLE AS CHAR) AS is_nullable,
    CAST(c.COLUMN_DEFAULT AS CHAR) AS column_default,
    CASE WHEN tc.CONSTRAINT_TYPE = 'PRIMARY KEY' THEN 'Yes' ELSE 'No' END AS primary_key,
    CASE WHEN tc.CONSTRAINT_TYPE = 'FOREIGN KEY' THEN 'Yes' ELSE 'No' END AS foreign_key,
    '' AS constraints,
    CASE
        WHEN tc.CONSTRAINT_TYPE = 'FOREIGN KEY' THEN CAST(CONCAT('Foreign key for ', kcu.REFERENCED_TABLE_NAME) AS CHAR)
        ELSE ''
    END AS description
FROM information_schema.COLUMNS c
LEFT JOIN information_schema.KEY_COLUMN_USAGE kcu
       ON c.TABLE_SCHEMA = kcu.TABLE_SCHEMA
      AND c.TABLE_NAME   = kcu.TABLE_NAME
      AND c.COLUMN_NAME  = kcu.COLUMN_NAME
LEFT JOIN information_schema.TABLE_CONSTRAINTS tc
       ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
      AND tc.TABLE_SCHEMA     = c.TABLE_SCHEMA
      AND tc.TABLE_NAME       = c.TABLE_NAME
WHERE c.TABLE_SCHEMA = ?"#,
            $filter,
            r#"
ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION"#
        )
    };
}

pub(crate) const SCHEMA_COLUMNS_QUERY: &str = mysql_columns_query!("");
pub(crate) const TABLE_COLUMNS_QUERY: &str = mysql_columns_query!("\n  AND c.TABLE_NAME   = ?");

/// Reads column metadata from MySQL's information schema.
#[derive(Debug, Clone)]
pub struct MySqlIntrospector {
    options: MySqlConnectOptions,
}

impl MySqlIntrospector {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = match &config.url {
            Some(url) => MySqlConnectOptions::from_str(url)
                .map_err(|e| Error::Configuration(format!("invalid DATABASE_URL for MySQL: {e}")))?,
            None => {
                let options = MySqlConnectOptions::new()
                    .host(&config.host)
                    .port(config.port)
                    .username(&config.user)
                    .password(&config.password);
                if config.database.is_empty() { options } else { options.database(&config.database) }
            }
        };
        Ok(Self { options })
    }

    async fn connect(&self) -> Result<MySqlConnection> {
        MySqlConnection::connect_with(&self.options)
            .await
            .map_err(|source| Error::Connection { driver: Drivers::MySQL.label(), source })
    }

    async fn query(&self, sql: &'static str, schema: &str, table: Option<&str>) -> Result<Vec<ColumnMetadata>> {
        let target = match table {
            Some(table) => format!("{schema}.{table}"),
            None => schema.to_string(),
        };
        log::info!("Fetching metadata from MySQL for '{target}'");

        let mut conn = self.connect().await?;
        let mut query = sqlx::query_as::<_, RawColumnRow>(sql).bind(schema);
        if let Some(table) = table {
            query = query.bind(table);
        }
        let fetched = query.fetch_all(&mut conn).await;
        release(conn, Drivers::MySQL).await;

        let rows = fetched.map_err(|source| Error::MetadataFetch { target, source })?;
        Ok(rows.into_iter().map(RawColumnRow::into_column).collect())
    }
}

#[async_trait]
impl MetadataSource for MySqlIntrospector {
    fn driver(&self) -> Drivers {
        Drivers::MySQL
    }

    async fn check_connection(&self) -> Result<()> {
        let conn = self.connect().await?;
        log::info!("Connected to MySQL");
        release(conn, Drivers::MySQL).await;
        Ok(())
    }

    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnMetadata>> {
        self.query(TABLE_COLUMNS_QUERY, schema, Some(table)).await
    }

    async fn try_fetch_metadata(&self, schema: &str) -> Result<Vec<ColumnMetadata>> {
        self.query(SCHEMA_COLUMNS_QUERY, schema, None).await
    }
}

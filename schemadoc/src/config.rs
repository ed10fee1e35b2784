//! # Configuration Module
//!
//! Settings are read once at startup into a [`Config`] value that is handed to
//! each component. Nothing in the crate reads the environment after that.

use std::fmt;
use std::path::PathBuf;

use crate::database::Drivers;
use crate::{Error, Result};

const DEFAULT_DOMAIN: &str = "generic";
const DEFAULT_OUTPUT_DIR: &str = "output";

// ============================================================================
// Config Struct
// ============================================================================

/// Process-wide settings, immutable after loading.
#[derive(Clone)]
pub struct Config {
    /// Schema to document. For MySQL this is the database name.
    pub schema_name: String,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    /// Business context used to steer description tone.
    pub domain_name: String,
    /// Constant columns appended to every sheet.
    pub extra_columns: ExtraColumns,
    /// When non-empty, only these tables are documented.
    pub tables: Vec<String>,
    pub output_dir: PathBuf,
}

/// Connection settings for the selected dialect.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub driver: Drivers,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
}

/// Language model selection.
#[derive(Clone, Default)]
pub struct LlmConfig {
    /// `provider:model`, e.g. `openai:gpt-4o`.
    pub model_name: String,
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint.
    pub base_url: Option<String>,
}

impl Config {
    /// Loads settings from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let dbms = get("DBMS").unwrap_or_default().to_lowercase();
        if dbms.is_empty() {
            return Err(Error::Configuration("DBMS is not set; use 'postgres' or 'mysql'".to_string()));
        }
        let driver: Drivers = dbms.parse()?;

        let database = match driver {
            Drivers::Postgres => DatabaseConfig {
                driver,
                host: get("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_port("DB_PORT", get("DB_PORT"), 5432)?,
                user: get("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                database: get("DB_NAME").unwrap_or_else(|| "postgres".to_string()),
                url: get("DATABASE_URL"),
            },
            Drivers::MySQL => DatabaseConfig {
                driver,
                host: get("MYSQL_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_port("MYSQL_PORT", get("MYSQL_PORT"), 3306)?,
                user: get("MYSQL_USER").unwrap_or_else(|| "root".to_string()),
                password: lookup("MYSQL_PASSWORD").unwrap_or_default(),
                database: get("MYSQL_DATABASE").unwrap_or_default(),
                url: get("DATABASE_URL"),
            },
        };

        let schema_name = match (get("SCHEMA_NAME"), driver) {
            (Some(schema), _) => schema,
            (None, Drivers::MySQL) if !database.database.is_empty() => database.database.clone(),
            _ => return Err(Error::Configuration("SCHEMA_NAME is not set".to_string())),
        };

        let add_extra = match get("ADD_EXTRA_COLUMNS") {
            Some(raw) => Some(parse_bool("ADD_EXTRA_COLUMNS", &raw)?),
            None => None,
        };
        let mut extra_columns = ExtraColumns::parse(
            &lookup("EXTRA_COLUMNS").unwrap_or_default(),
            &lookup("EXTRA_COLUMN_VALUES").unwrap_or_default(),
        );
        if add_extra == Some(false) {
            extra_columns = ExtraColumns::default();
        }

        let tables = get("TABLE_NAMES")
            .map(|raw| raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            schema_name,
            database,
            llm: LlmConfig {
                model_name: get("LLM_MODEL_NAME").unwrap_or_default(),
                api_key: get("API_KEY"),
                base_url: get("LLM_BASE_URL"),
            },
            domain_name: get("DOMAIN_NAME").unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            extra_columns,
            tables,
            output_dir: PathBuf::from(get("OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())),
        })
    }

    /// Path of the workbook this run writes.
    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join(format!("{}_data_dictionary_({}).xlsx", self.schema_name, self.database.driver))
    }
}

fn parse_port(key: &str, raw: Option<String>, default: u16) -> Result<u16> {
    match raw {
        Some(raw) => raw.parse().map_err(|_| Error::Configuration(format!("{key} must be a port number, got '{raw}'"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(Error::Configuration(format!("{key} must be true or false, got '{raw}'"))),
    }
}

// ============================================================================
// Extra Columns
// ============================================================================

/// Ordered `name -> constant value` pairs added to every dictionary sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraColumns(Vec<(String, String)>);

impl ExtraColumns {
    /// Zips two comma-separated lists.
    ///
    /// Yields an empty mapping when the list lengths differ or the first name is empty.
    pub fn parse(names: &str, values: &str) -> Self {
        let names: Vec<&str> = names.split(',').collect();
        let values: Vec<&str> = values.split(',').collect();

        if names.len() != values.len() || names.first().is_none_or(|n| n.trim().is_empty()) {
            return Self::default();
        }

        Self(names.iter().zip(values).map(|(n, v)| (n.trim().to_string(), v.trim().to_string())).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }
}

// ============================================================================
// Debug (secrets redacted)
// ============================================================================

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("schema_name", &self.schema_name)
            .field("database", &self.database)
            .field("llm", &self.llm)
            .field("domain_name", &self.domain_name)
            .field("extra_columns", &self.extra_columns)
            .field("tables", &self.tables)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("url", &self.url.as_ref().map(|_| "***"))
            .finish()
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("model_name", &self.model_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use schemadoc::{
    ColumnMetadata, DictionarySink, Drivers, Error, Generation, MetadataSource, Result, TableDescription,
    TextGenerator,
};

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn column(table: &str, name: &str, data_type: &str) -> ColumnMetadata {
    ColumnMetadata {
        table_name: table.to_string(),
        column_name: name.to_string(),
        data_type: data_type.to_string(),
        length: None,
        is_nullable: true,
        default: None,
        is_primary_key: false,
        is_foreign_key: false,
        constraint_text: None,
        description: None,
    }
}

/// `users (id int PK, email varchar(255) NOT NULL)`
pub fn users_rows() -> Vec<ColumnMetadata> {
    let mut id = column("users", "id", "integer");
    id.length = Some(32);
    id.is_nullable = false;
    id.is_primary_key = true;
    id.default = Some("nextval('users_id_seq'::regclass)".to_string());

    let mut email = column("users", "email", "character varying");
    email.length = Some(255);
    email.is_nullable = false;

    vec![id, email]
}

pub fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key: &str| map.get(key).cloned()
}

// ============================================================================
// Scripted text generator
// ============================================================================

/// Prompts received by a [`ScriptedGenerator`].
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Answers prompts with canned replies, in order.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Generation>>,
    calls: Calls,
}

impl ScriptedGenerator {
    pub fn new<I: IntoIterator<Item = Generation>>(replies: I) -> (Box<dyn TextGenerator>, Calls) {
        let calls = Calls::default();
        let generator = Self { replies: Mutex::new(replies.into_iter().collect()), calls: calls.clone() };
        (Box::new(generator), calls)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "fixture"
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        self.calls.0.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop_front().ok_or_else(|| Error::Generation {
            provider: "scripted".to_string(),
            reason: "no scripted reply left".to_string(),
        })
    }
}

pub fn text(reply: &str) -> Generation {
    Generation::Text(reply.to_string())
}

// ============================================================================
// In-memory metadata source
// ============================================================================

#[derive(Default)]
pub struct MemorySource {
    pub rows: Vec<ColumnMetadata>,
    /// Tables whose per-table fetch fails.
    pub broken_tables: Vec<String>,
    /// Makes the schema-wide fetch fail.
    pub broken_schema: bool,
}

impl MemorySource {
    pub fn new(rows: Vec<ColumnMetadata>) -> Self {
        Self { rows, ..Self::default() }
    }
}

#[async_trait]
impl MetadataSource for MemorySource {
    fn driver(&self) -> Drivers {
        Drivers::Postgres
    }

    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_columns(&self, _schema: &str, table: &str) -> Result<Vec<ColumnMetadata>> {
        if self.broken_tables.iter().any(|t| t == table) {
            return Err(Error::MetadataFetch { target: table.to_string(), source: sqlx::Error::RowNotFound });
        }
        Ok(self.rows.iter().filter(|c| c.table_name == table).cloned().collect())
    }

    async fn try_fetch_metadata(&self, schema: &str) -> Result<Vec<ColumnMetadata>> {
        if self.broken_schema {
            return Err(Error::MetadataFetch { target: schema.to_string(), source: sqlx::Error::PoolTimedOut });
        }
        Ok(self.rows.clone())
    }
}

// ============================================================================
// Collecting sink
// ============================================================================

#[derive(Default)]
pub struct CollectingSink {
    pub tables: Vec<TableDescription>,
}

impl DictionarySink for CollectingSink {
    fn write_table(&mut self, table: &TableDescription) -> Result<()> {
        self.tables.push(table.clone());
        Ok(())
    }
}

use serde_json::json;

use schemadoc::generator::{MAX_DESCRIPTION_CHARS, NULL_TEXT};
use schemadoc::{DescriptionGenerator, DictionaryRow, Error, ExtraColumns, Generation, PromptTemplate, TableMetadata};

mod common;
use common::{column, text, users_rows, ScriptedGenerator};

fn users_table() -> TableMetadata {
    let mut table = TableMetadata::new("users");
    for row in users_rows() {
        table.push_column(row);
    }
    table
}

fn full_answer() -> serde_json::Value {
    json!({
        "table_name": "users",
        "table_description": "Registered user accounts",
        "columns": [
            { "column_name": "id", "description": "Unique identifier of the user" },
            { "column_name": "email", "description": "Address used to sign in" }
        ]
    })
}

#[tokio::test]
async fn test_zero_columns_never_calls_the_model() {
    common::init_logs();
    let (client, calls) = ScriptedGenerator::new([text("{}")]);
    let generator = DescriptionGenerator::new(client, "retail");

    let err = generator.describe(&TableMetadata::new("empty_table")).await.unwrap_err();
    assert!(matches!(err, Error::EmptyMetadata(ref t) if t == "empty_table"));
    assert_eq!(calls.count(), 0);
}

#[tokio::test]
async fn test_describe_keeps_columns_and_order() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logs();
    let (client, calls) = ScriptedGenerator::new([Generation::Json(full_answer())]);
    let generator = DescriptionGenerator::new(client, "retail");

    let table = users_table();
    let described = generator.describe(&table).await?;

    assert_eq!(calls.count(), 1);
    assert_eq!(described.table_name, "users");
    assert_eq!(described.table_description, "Registered user accounts");
    assert_eq!(described.columns.len(), table.columns.len());
    for (before, after) in table.columns.iter().zip(&described.columns) {
        assert_eq!(before.column_name, after.column_name);
        assert_eq!(before.data_type, after.data_type);
        assert_eq!(before.is_primary_key, after.is_primary_key);
        assert_eq!(before.default, after.default);
    }
    assert_eq!(described.columns[0].description.as_deref(), Some("Unique identifier of the user"));
    Ok(())
}

#[tokio::test]
async fn test_prompt_carries_metadata_and_domain() -> Result<(), Box<dyn std::error::Error>> {
    let (client, calls) = ScriptedGenerator::new([Generation::Json(full_answer())]);
    let generator = DescriptionGenerator::new(client, "healthcare");
    generator.describe(&users_table()).await?;

    let prompt = &calls.prompts()[0];
    assert!(prompt.contains("healthcare"));
    assert!(prompt.contains("\"column_name\": \"email\""));
    assert!(prompt.contains("\"datatype\": \"character varying\""));
    assert!(prompt.contains("255 characters"));
    Ok(())
}

#[tokio::test]
async fn test_custom_template() -> Result<(), Box<dyn std::error::Error>> {
    let (client, calls) = ScriptedGenerator::new([Generation::Json(full_answer())]);
    let generator = DescriptionGenerator::new(client, "retail")
        .with_template(PromptTemplate::new("Document {table_name} for {domain_name}: {metadata}"));
    generator.describe(&users_table()).await?;

    assert!(calls.prompts()[0].starts_with("Document users for retail: {"));
    Ok(())
}

#[tokio::test]
async fn test_all_response_shapes_are_equivalent() -> Result<(), Box<dyn std::error::Error>> {
    let answer = full_answer();
    let columns = answer["columns"].clone();
    let (client, _calls) = ScriptedGenerator::new([
        text(&format!("```json\n{answer}\n```")),
        Generation::Json(json!({ "text": answer.clone() })),
        text(&json!({ "text": answer.to_string() }).to_string()),
        text(&format!("Output: {columns}")),
    ]);
    let generator = DescriptionGenerator::new(client, "retail");
    let table = users_table();

    let fenced = generator.describe(&table).await?;
    let wrapped = generator.describe(&table).await?;
    let wrapped_string = generator.describe(&table).await?;
    let bare_list = generator.describe(&table).await?;

    assert_eq!(fenced, wrapped);
    assert_eq!(fenced, wrapped_string);
    assert_eq!(bare_list.table_description, "");
    assert_eq!(bare_list.columns, fenced.columns);
    Ok(())
}

#[tokio::test]
async fn test_not_json_is_parse_error() {
    let (client, calls) = ScriptedGenerator::new([text("not json")]);
    let generator = DescriptionGenerator::new(client, "retail");

    let err = generator.describe(&users_table()).await.unwrap_err();
    assert!(matches!(err, Error::DescriptionParse { ref table, .. } if table == "users"));
    assert!(!err.is_fatal());
    assert_eq!(calls.count(), 1);
}

#[tokio::test]
async fn test_missing_columns_array_is_parse_error() {
    let (client, _calls) = ScriptedGenerator::new([text(r#"{"table_description": "only this"}"#)]);
    let generator = DescriptionGenerator::new(client, "retail");
    assert!(matches!(generator.describe(&users_table()).await, Err(Error::DescriptionParse { .. })));
}

#[tokio::test]
async fn test_provider_failure_surfaces_as_generation_error() {
    let (client, _calls) = ScriptedGenerator::new([]);
    let generator = DescriptionGenerator::new(client, "retail");
    assert!(matches!(generator.describe(&users_table()).await, Err(Error::Generation { .. })));
}

#[tokio::test]
async fn test_existing_descriptions_are_never_regenerated() -> Result<(), Box<dyn std::error::Error>> {
    let mut table = TableMetadata::new("orders");
    let mut user_id = column("orders", "user_id", "integer");
    user_id.is_foreign_key = true;
    user_id.description = Some("Foreign key for users".to_string());
    table.push_column(column("orders", "id", "integer"));
    table.push_column(user_id);

    let reply = json!({
        "table_name": "orders",
        "table_description": "Customer orders",
        "columns": [
            { "column_name": "id", "description": "Order number" },
            { "column_name": "user_id", "description": "The customer who placed the order" }
        ]
    });
    let (client, _calls) = ScriptedGenerator::new([Generation::Json(reply.clone()), Generation::Json(reply)]);
    let generator = DescriptionGenerator::new(client, "retail");

    let first = generator.describe(&table).await?;
    assert_eq!(first.columns[1].description.as_deref(), Some("Foreign key for users"));

    let again = TableMetadata { table_name: first.table_name.clone(), columns: first.columns.clone() };
    let second = generator.describe(&again).await?;
    assert_eq!(second.columns, first.columns);
    Ok(())
}

#[tokio::test]
async fn test_rows_have_bounded_descriptions_and_no_empty_cells() -> Result<(), Box<dyn std::error::Error>> {
    let long = "x".repeat(400);
    let reply = json!({
        "table_description": "Accounts",
        "columns": [
            { "column_name": "id", "description": long },
            { "column_name": "email", "description": "" }
        ]
    });
    let (client, _calls) = ScriptedGenerator::new([Generation::Json(reply)]);
    let generator = DescriptionGenerator::new(client, "retail");
    let described = generator.describe(&users_table()).await?;

    let extras = ExtraColumns::parse("owner,freq", "DataGov,Daily");
    for column in &described.columns {
        let row = DictionaryRow::from_column(column, &extras);
        assert!(row.description.chars().count() <= MAX_DESCRIPTION_CHARS);
        assert!(row.cells().all(|cell| !cell.trim().is_empty()));
    }
    assert_eq!(described.columns[0].description.as_ref().map(|d| d.len()), Some(MAX_DESCRIPTION_CHARS));
    assert_eq!(described.columns[1].description.as_deref(), Some(NULL_TEXT));
    Ok(())
}

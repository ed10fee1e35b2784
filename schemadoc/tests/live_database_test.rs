//! Runs against real servers only when `SCHEMADOC_TEST_POSTGRES_URL` or
//! `SCHEMADOC_TEST_MYSQL_URL` is set; otherwise each test returns early.

use sqlx::mysql::MySqlConnection;
use sqlx::postgres::PgConnection;
use sqlx::Connection;

use schemadoc::{group_by_table, introspector, DatabaseConfig, Drivers};

mod common;

fn config_for(driver: Drivers, url: String) -> DatabaseConfig {
    DatabaseConfig {
        driver,
        host: String::new(),
        port: 0,
        user: String::new(),
        password: String::new(),
        database: String::new(),
        url: Some(url),
    }
}

#[tokio::test]
async fn test_postgres_introspection() -> Result<(), Box<dyn std::error::Error>> {
    let Ok(url) = std::env::var("SCHEMADOC_TEST_POSTGRES_URL") else {
        return Ok(());
    };
    common::init_logs();

    let mut conn = PgConnection::connect(&url).await?;
    for statement in [
        "DROP SCHEMA IF EXISTS schemadoc_it CASCADE",
        "CREATE SCHEMA schemadoc_it",
        "CREATE TABLE schemadoc_it.users (id SERIAL PRIMARY KEY, email VARCHAR(255) NOT NULL, age INT CHECK (age > 0))",
        "CREATE TABLE schemadoc_it.orders (id SERIAL PRIMARY KEY, user_id INT REFERENCES schemadoc_it.users(id), total NUMERIC(10, 2))",
    ] {
        sqlx::query(statement).execute(&mut conn).await?;
    }
    conn.close().await?;

    let source = introspector(&config_for(Drivers::Postgres, url))?;
    source.check_connection().await?;

    let users = source.fetch_columns("schemadoc_it", "users").await?;
    let names: Vec<&str> = users.iter().map(|c| c.column_name.as_str()).collect();
    assert_eq!(names, ["id", "email", "age"]);
    assert!(users[0].is_primary_key);
    assert!(!users[1].is_nullable);
    assert_eq!(users[1].length, Some(255));
    assert_eq!(users[1].constraint_text, None);
    assert_eq!(users[2].constraint_text.as_deref(), Some("(age > 0)"));

    let schema = group_by_table(source.fetch_metadata("schemadoc_it").await);
    assert_eq!(schema.len(), 2);
    let orders = schema.get("orders").expect("orders table");
    let user_id = orders.column("user_id").expect("user_id column");
    assert!(user_id.is_foreign_key);
    assert!(user_id.description.as_deref().unwrap_or_default().starts_with("Foreign key for"));

    assert!(source.fetch_columns("schemadoc_it", "missing").await?.is_empty());

    println!("PostgreSQL introspection test passed!");
    Ok(())
}

#[tokio::test]
async fn test_mysql_introspection() -> Result<(), Box<dyn std::error::Error>> {
    let Ok(url) = std::env::var("SCHEMADOC_TEST_MYSQL_URL") else {
        return Ok(());
    };
    common::init_logs();

    let mut conn = MySqlConnection::connect(&url).await?;
    for statement in [
        "DROP DATABASE IF EXISTS schemadoc_it",
        "CREATE DATABASE schemadoc_it",
        "CREATE TABLE schemadoc_it.users (id INT AUTO_INCREMENT PRIMARY KEY, email VARCHAR(255) NOT NULL)",
        "CREATE TABLE schemadoc_it.orders (id INT AUTO_INCREMENT PRIMARY KEY, user_id INT, FOREIGN KEY (user_id) REFERENCES schemadoc_it.users(id))",
    ] {
        sqlx::query(statement).execute(&mut conn).await?;
    }
    conn.close().await?;

    let source = introspector(&config_for(Drivers::MySQL, url))?;

    let orders = source.fetch_columns("schemadoc_it", "orders").await?;
    let names: Vec<&str> = orders.iter().map(|c| c.column_name.as_str()).collect();
    assert_eq!(names, ["id", "user_id"]);
    assert!(orders[0].is_primary_key);
    assert!(orders[1].is_foreign_key);
    assert_eq!(orders[1].description.as_deref(), Some("Foreign key for users"));
    assert_eq!(orders[1].constraint_text, None);

    println!("MySQL introspection test passed!");
    Ok(())
}

//! Test fixtures for driver integration tests
//!
//! A small Ensembl-style core schema: genes, their transcripts and a meta
//! table, loaded into a SQLite database file.

#![allow(dead_code)]

use dbhealth_core::{SqlType, Value};
use dbhealth_driver::ColumnMeta;
use std::path::Path;

/// DDL for the fixture schema
pub const CORE_SCHEMA: &[&str] = &[
    "CREATE TABLE gene (gene_id INTEGER PRIMARY KEY, stable_id VARCHAR(128) NOT NULL, \
     biotype VARCHAR(40), is_current BOOLEAN, gc_content DECIMAL(5,2), created_date DATETIME)",
    "CREATE TABLE transcript (transcript_id INTEGER PRIMARY KEY, gene_id INT(10) NOT NULL, \
     stable_id VARCHAR(128) NOT NULL)",
    "CREATE TABLE meta (meta_id INTEGER PRIMARY KEY, meta_key VARCHAR(40), meta_value TEXT)",
];

/// Rows inserted into `gene`
pub fn gene_rows() -> Vec<Vec<Value>> {
    vec![
        dbhealth_core::params![1, "ENSG00000139618", "protein_coding", true, rust_decimal::Decimal::new(4012, 2), "2023-05-01 12:00:00"],
        dbhealth_core::params![2, "ENSG00000012048", "protein_coding", true, rust_decimal::Decimal::new(4387, 2), "2023-05-01 12:00:00"],
        dbhealth_core::params![3, "ENSG00000228794", "lncRNA", false, Value::Null, "2024-01-15 08:30:00"],
    ]
}

/// Column metadata matching `SELECT gene_id, stable_id FROM gene`
pub fn gene_columns() -> Vec<ColumnMeta> {
    vec![
        ColumnMeta::new("gene_id", SqlType::Integer),
        ColumnMeta::new("stable_id", SqlType::VarChar),
    ]
}

/// Create and populate the fixture database at `path`
pub async fn create_core_db(path: &Path) -> std::sync::Arc<dyn dbhealth_driver::Connection> {
    use dbhealth_driver::Driver;

    let url = format!("sqlite://{}", path.display());
    let conn = dbhealth_driver::SqliteDriver.connect(&url).await.unwrap();

    for ddl in CORE_SCHEMA {
        conn.execute(ddl, &[]).await.unwrap();
    }
    for row in gene_rows() {
        conn.execute("INSERT INTO gene VALUES (?1, ?2, ?3, ?4, ?5, ?6)", &row)
            .await
            .unwrap();
    }
    for (id, gene_id, stable_id) in [(1, 1, "ENST00000380152"), (2, 1, "ENST00000544455"), (3, 2, "ENST00000357654")] {
        conn.execute(
            "INSERT INTO transcript VALUES (?1, ?2, ?3)",
            &dbhealth_core::params![id, gene_id, stable_id],
        )
        .await
        .unwrap();
    }
    conn.execute(
        "INSERT INTO meta (meta_key, meta_value) VALUES ('schema_version', '110')",
        &[],
    )
    .await
    .unwrap();

    conn
}

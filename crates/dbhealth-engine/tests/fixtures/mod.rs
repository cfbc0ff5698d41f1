//! Test fixtures for engine integration tests
//!
//! Builds SQLite replicas of a small core schema on disk so the same query
//! can be run against several databases.

#![allow(dead_code)]

use dbhealth_core::params;
use dbhealth_driver::Connection;
use dbhealth_engine::ConnectionPool;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// SQLite URL for a database file
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

/// Pool with the SQLite driver registered
pub fn sqlite_pool() -> ConnectionPool {
    ConnectionPool::new(Default::default()).with_default_drivers()
}

/// A replica with `genes` rows in `gene` and 7 rows in `meta`
///
/// `gene` has three columns; `gene_id` is declared with `id_type` so
/// replicas can differ in integer subtype.
pub async fn create_replica(
    pool: &ConnectionPool,
    dir: &Path,
    name: &str,
    genes: i64,
    id_type: &str,
) -> (PathBuf, Arc<dyn Connection>) {
    let path = dir.join(format!("{}.db", name));
    let conn = pool.get(&sqlite_url(&path)).await.unwrap();

    conn.execute(
        &format!(
            "CREATE TABLE gene (gene_id {} PRIMARY KEY, stable_id VARCHAR(128), biotype VARCHAR(40))",
            id_type
        ),
        &[],
    )
    .await
    .unwrap();
    conn.execute(
        "CREATE TABLE meta (meta_id INTEGER PRIMARY KEY, species_id INTEGER, meta_key VARCHAR(40), meta_value TEXT)",
        &[],
    )
    .await
    .unwrap();

    for i in 1..=genes {
        let biotype = if i % 3 == 0 { "lncRNA" } else { "protein_coding" };
        conn.execute(
            "INSERT INTO gene VALUES (?1, ?2, ?3)",
            &params![i, format!("ENSG{:011}", i), biotype],
        )
        .await
        .unwrap();
    }

    let meta = [
        (1, "schema_version", "110"),
        (1, "schema_type", "core"),
        (1, "species.production_name", "homo_sapiens"),
        (1, "species.taxonomy_id", "9606"),
        (1, "assembly.default", "GRCh38"),
        (1, "genebuild.version", "2014-07"),
        (1, "patch", "patch_109_110_a.sql|schema_version"),
    ];
    for (species_id, key, value) in meta {
        conn.execute(
            "INSERT INTO meta (species_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
            &params![species_id, key, value],
        )
        .await
        .unwrap();
    }

    (path, conn)
}

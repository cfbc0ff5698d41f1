//! Database drivers for the dbhealth query engine
//!
//! This crate defines the boundary the engine is written against: connect by
//! URL, execute parameterized statements, and walk a rewindable cursor with
//! column name/type introspection.
//!
//! ## Features
//!
//! Enable backends via Cargo features:
//! - `sqlite` - SQLite via rusqlite (default)
//! - `postgres` - PostgreSQL via tokio-postgres, with TLS
//! - `all-drivers` - every backend
//!
//! The in-memory [`MockDriver`] is always available.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbhealth_driver::{Driver, SqliteDriver};
//!
//! let conn = SqliteDriver.connect("sqlite:///data/homo_sapiens_core.db").await?;
//! let mut cursor = conn.query("SELECT stable_id FROM gene WHERE biotype = ?1", &params!["lncRNA"]).await?;
//! while let Some(row) = cursor.next_row() {
//!     let stable_id: String = row.get(0)?;
//! }
//! ```

pub mod connection;
pub mod mock;
pub mod result_set;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use connection::{database_identity, redact_url, same_connection, Connection, Driver, DriverError};
pub use mock::{MockConnection, MockDriver};
pub use result_set::{ColumnMeta, ResultSet, Row, RowError};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnection, SqliteDriver};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConnection, PostgresDriver};

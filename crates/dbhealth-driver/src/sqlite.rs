//! SQLite driver using rusqlite
//!
//! Accepted URLs:
//! - `sqlite::memory:` - a private in-memory database
//! - `sqlite://<path>` - a database file (e.g. `sqlite:///data/core.db`)
//!
//! SQLite stores values by storage class, not by declared type, so the
//! declared column type is used to turn INTEGER/REAL/TEXT cells back into
//! booleans, decimals, dates and timestamps.

use crate::connection::{database_identity, Connection, Driver, DriverError};
use crate::result_set::{ColumnMeta, ResultSet};
use async_trait::async_trait;
use chrono::NaiveDate;
use dbhealth_core::{SqlType, Value};
use rusqlite::types::Value as SqliteValue;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const URL_PREFIX: &str = "sqlite:";
const MEMORY_URL: &str = "sqlite::memory:";

/// Driver for `sqlite:` URLs
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

#[async_trait]
impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn accepts(&self, url: &str) -> bool {
        url.starts_with(URL_PREFIX)
    }

    async fn connect(&self, url: &str) -> Result<Arc<dyn Connection>, DriverError> {
        Ok(Arc::new(SqliteConnection::open(url)?))
    }
}

/// A connection to one SQLite database
pub struct SqliteConnection {
    url: String,
    identity: String,
    /// `None` once closed
    conn: Mutex<Option<rusqlite::Connection>>,
}

impl SqliteConnection {
    /// Open the database named by a `sqlite:` URL
    pub fn open(url: &str) -> Result<Self, DriverError> {
        let conn = if url == MEMORY_URL {
            rusqlite::Connection::open_in_memory()
        } else {
            let path = url
                .strip_prefix("sqlite://")
                .filter(|p| !p.is_empty())
                .ok_or_else(|| DriverError::ConfigError(format!(
                    "Invalid SQLite URL '{}': expected sqlite://<path> or {}",
                    url, MEMORY_URL
                )))?;
            rusqlite::Connection::open(path)
        }
        .map_err(|e| DriverError::ConnectionError(format!(
            "Failed to open SQLite database {}: {}",
            url, e
        )))?;

        tracing::debug!(url, "opened SQLite connection");

        Ok(Self {
            url: url.to_string(),
            identity: database_identity(url),
            conn: Mutex::new(Some(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| DriverError::ConnectionError("SQLite connection lock poisoned".to_string()))?;
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(DriverError::Closed),
        }
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<ResultSet, DriverError> {
        let bound = bind_params(params);

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| DriverError::QueryError(e.to_string()))?;

            let columns: Vec<ColumnMeta> = stmt
                .columns()
                .iter()
                .map(|c| {
                    let sql_type = c.decl_type().map_or(SqlType::Unknown, SqlType::from_declared);
                    ColumnMeta::new(c.name(), sql_type)
                })
                .collect();

            let mut rows = stmt
                .query(rusqlite::params_from_iter(bound.iter()))
                .map_err(|e| DriverError::QueryError(e.to_string()))?;

            let mut fetched = Vec::new();
            while let Some(row) = rows
                .next()
                .map_err(|e| DriverError::QueryError(e.to_string()))?
            {
                let mut values = Vec::with_capacity(columns.len());
                for (i, column) in columns.iter().enumerate() {
                    let raw: SqliteValue = row
                        .get(i)
                        .map_err(|e| DriverError::DecodeError {
                            column: column.name.clone(),
                            message: e.to_string(),
                        })?;
                    values.push(decode_value(raw, &column.sql_type));
                }
                fetched.push(values);
            }

            Ok(ResultSet::new(columns, fetched))
        })
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Option<u64>, DriverError> {
        let bound = bind_params(params);

        self.with_conn(|conn| {
            conn.execute(sql, rusqlite::params_from_iter(bound.iter()))
                .map(|n| Some(n as u64))
                .map_err(|e| DriverError::QueryError(e.to_string()))
        })
    }

    async fn close(&self) -> Result<(), DriverError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DriverError::ConnectionError("SQLite connection lock poisoned".to_string()))?
            .take();

        match conn {
            Some(conn) => conn
                .close()
                .map_err(|(_, e)| DriverError::ConnectionError(format!(
                    "Failed to close {}: {}",
                    self.url, e
                ))),
            None => Err(DriverError::Closed),
        }
    }
}

/// Convert parameters into SQLite storage classes
fn bind_params(params: &[Value]) -> Vec<SqliteValue> {
    params.iter().map(bind_value).collect()
}

fn bind_value(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Int(n) => SqliteValue::Integer(i64::from(*n)),
        Value::Long(n) => SqliteValue::Integer(*n),
        Value::Short(n) => SqliteValue::Integer(i64::from(*n)),
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Decimal(d) => SqliteValue::Text(d.to_string()),
        Value::Float(n) => SqliteValue::Real(f64::from(*n)),
        Value::Double(n) => SqliteValue::Real(*n),
        Value::Date(_) | Value::Timestamp(_) => {
            SqliteValue::Text(value.to_text().unwrap_or_default())
        }
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
    }
}

/// Convert a stored cell back into a [`Value`], guided by the declared type
fn decode_value(raw: SqliteValue, declared: &SqlType) -> Value {
    match (raw, declared) {
        (SqliteValue::Null, _) => Value::Null,

        (SqliteValue::Integer(n), SqlType::Boolean) => Value::Bool(n != 0),
        (SqliteValue::Integer(n), SqlType::Decimal) => Value::Decimal(Decimal::from(n)),
        (SqliteValue::Integer(n), _) => Value::Long(n),

        (SqliteValue::Real(n), SqlType::Decimal) => {
            Decimal::try_from(n).map_or(Value::Double(n), Value::Decimal)
        }
        (SqliteValue::Real(n), _) => Value::Double(n),

        (SqliteValue::Text(s), SqlType::Decimal) => match Decimal::from_str(s.trim()) {
            Ok(d) => Value::Decimal(d),
            Err(_) => Value::Text(s),
        },
        (SqliteValue::Text(s), SqlType::Date) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
            Ok(d) => Value::Date(d),
            Err(_) => Value::Text(s),
        },
        (SqliteValue::Text(s), SqlType::Timestamp) => {
            match Value::Text(s.clone()).as_timestamp() {
                Some(ts) => Value::Timestamp(ts),
                None => Value::Text(s),
            }
        }
        (SqliteValue::Text(s), _) => Value::Text(s),

        (SqliteValue::Blob(b), _) => Value::Bytes(b),
    }
}

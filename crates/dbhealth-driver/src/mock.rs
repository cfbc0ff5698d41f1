//! Mock driver for testing
//!
//! Connections return predefined result sets without touching a database.
//! Useful for:
//! - Unit testing the query engine and comparator
//! - Verifying that every opened cursor is released
//! - Simulating driver failures, dead connections and failing closes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbhealth_driver::{MockConnection, ColumnMeta};
//! use dbhealth_core::{SqlType, Value};
//!
//! let conn = MockConnection::new("mock://core_a");
//! conn.add_result(
//!     "SELECT COUNT(*) FROM gene",
//!     vec![ColumnMeta::new("COUNT(*)", SqlType::BigInt)],
//!     vec![vec![Value::Long(7)]],
//! ).await;
//!
//! let cursor = conn.query("SELECT COUNT(*) FROM gene", &[]).await?;
//! assert_eq!(conn.open_cursors(), 1);
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! conn.add_error("SELECT * FROM missing", "Table 'missing' doesn't exist").await;
//! let conn = MockConnection::new("mock://db").with_close_failure();
//! conn.set_valid(false);
//! ```

use crate::connection::{database_identity, Connection, Driver, DriverError};
use crate::result_set::{ColumnMeta, ResultSet};
use async_trait::async_trait;
use dbhealth_core::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Canned outcome of one statement
#[derive(Debug, Clone)]
enum MockResponse {
    Rows {
        columns: Vec<ColumnMeta>,
        rows: Vec<Vec<Value>>,
    },
    Affected(Option<u64>),
    Error(String),
}

/// In-memory connection with predefined responses
///
/// Statements are matched on whitespace-normalized SQL text. Parameters are
/// recorded but do not influence the response.
pub struct MockConnection {
    url: String,
    identity: String,

    /// Responses by normalized SQL
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,

    /// Every statement executed, with its parameters
    history: Arc<RwLock<Vec<(String, Vec<Value>)>>>,

    /// Cursors handed out and not yet released
    open_cursors: Arc<AtomicUsize>,

    /// Cursors released so far
    released_cursors: Arc<AtomicUsize>,

    /// Reported by the native liveness probe
    valid: AtomicBool,

    /// Whether `is_valid` reports anything at all
    native_probe: bool,

    /// Simulate a failing close
    fail_close: bool,

    /// Number of `close` calls
    close_calls: AtomicUsize,

    closed: AtomicBool,
}

impl MockConnection {
    /// Create a mock connection with no predefined responses
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            identity: database_identity(&url),
            url,
            responses: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(Vec::new())),
            open_cursors: Arc::new(AtomicUsize::new(0)),
            released_cursors: Arc::new(AtomicUsize::new(0)),
            valid: AtomicBool::new(true),
            native_probe: false,
            fail_close: false,
            close_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Answer `is_valid` natively instead of forcing a probe statement
    pub fn with_native_probe(mut self) -> Self {
        self.native_probe = true;
        self
    }

    /// Make `close` fail (the connection is still marked closed)
    pub fn with_close_failure(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Define the rows returned for a statement
    pub async fn add_result(&self, sql: &str, columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) {
        self.responses
            .write()
            .await
            .insert(normalize(sql), MockResponse::Rows { columns, rows });
    }

    /// Define the affected-row count reported for a statement
    pub async fn add_affected(&self, sql: &str, affected: Option<u64>) {
        self.responses
            .write()
            .await
            .insert(normalize(sql), MockResponse::Affected(affected));
    }

    /// Make a statement fail with a driver error
    pub async fn add_error(&self, sql: &str, message: impl Into<String>) {
        self.responses
            .write()
            .await
            .insert(normalize(sql), MockResponse::Error(message.into()));
    }

    /// Flip the liveness state; a dead connection also fails every statement
    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    /// Cursors currently open
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Cursors released so far
    pub fn released_cursors(&self) -> usize {
        self.released_cursors.load(Ordering::SeqCst)
    }

    /// Number of times `close` was called
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Whether the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Statements executed so far, in order
    pub async fn executed_statements(&self) -> Vec<String> {
        self.history.read().await.iter().map(|(sql, _)| sql.clone()).collect()
    }

    /// Parameters of the most recent statement
    pub async fn last_params(&self) -> Option<Vec<Value>> {
        self.history.read().await.last().map(|(_, params)| params.clone())
    }

    async fn respond(&self, sql: &str, params: &[Value]) -> Result<MockResponse, DriverError> {
        if self.is_closed() {
            return Err(DriverError::Closed);
        }

        self.history
            .write()
            .await
            .push((sql.to_string(), params.to_vec()));

        if !self.valid.load(Ordering::SeqCst) {
            return Err(DriverError::ConnectionError(format!(
                "Connection to {} was lost",
                self.identity
            )));
        }

        self.responses
            .read()
            .await
            .get(&normalize(sql))
            .cloned()
            .ok_or_else(|| DriverError::QueryError(format!("No mock response for: {}", sql)))
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<ResultSet, DriverError> {
        match self.respond(sql, params).await? {
            MockResponse::Rows { columns, rows } => {
                self.open_cursors.fetch_add(1, Ordering::SeqCst);
                let open = self.open_cursors.clone();
                let released = self.released_cursors.clone();
                Ok(ResultSet::new(columns, rows).with_close_hook(move || {
                    open.fetch_sub(1, Ordering::SeqCst);
                    released.fetch_add(1, Ordering::SeqCst);
                }))
            }
            MockResponse::Affected(_) => Err(DriverError::QueryError(format!(
                "Statement does not return rows: {}",
                sql
            ))),
            MockResponse::Error(message) => Err(DriverError::QueryError(message)),
        }
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Option<u64>, DriverError> {
        match self.respond(sql, params).await? {
            MockResponse::Affected(affected) => Ok(affected),
            MockResponse::Rows { .. } => Err(DriverError::QueryError(format!(
                "Statement returns rows: {}",
                sql
            ))),
            MockResponse::Error(message) => Err(DriverError::QueryError(message)),
        }
    }

    async fn is_valid(&self) -> Option<bool> {
        if self.native_probe {
            Some(!self.is_closed() && self.valid.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            Err(DriverError::ConnectionError(format!(
                "Simulated close failure for {}",
                self.identity
            )))
        } else {
            Ok(())
        }
    }
}

/// Driver for `mock://` URLs
///
/// Every `connect` creates a fresh [`MockConnection`]; the driver keeps a
/// handle to each one so tests can configure or inspect them afterwards.
#[derive(Default)]
pub struct MockDriver {
    connections: Mutex<Vec<Arc<MockConnection>>>,
    failing_urls: Mutex<HashSet<String>>,
    native_probe: bool,
    close_failure: bool,
}

impl MockDriver {
    /// Create a mock driver
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every created connection a native liveness probe
    pub fn with_native_probe(mut self) -> Self {
        self.native_probe = true;
        self
    }

    /// Make `close` fail on every created connection
    pub fn with_close_failure(mut self) -> Self {
        self.close_failure = true;
        self
    }

    /// Make `connect` fail for a URL
    pub fn fail_connect(&self, url: impl Into<String>) {
        if let Ok(mut failing) = self.failing_urls.lock() {
            failing.insert(url.into());
        }
    }

    /// All connections created so far, oldest first
    pub fn connections(&self) -> Vec<Arc<MockConnection>> {
        self.connections
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Number of successful `connect` calls
    pub fn connect_count(&self) -> usize {
        self.connections.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn accepts(&self, url: &str) -> bool {
        url.starts_with("mock://")
    }

    async fn connect(&self, url: &str) -> Result<Arc<dyn Connection>, DriverError> {
        let failing = self
            .failing_urls
            .lock()
            .map(|f| f.contains(url))
            .unwrap_or(false);
        if failing {
            return Err(DriverError::ConnectionError(format!(
                "Simulated connection failure for {}",
                url
            )));
        }

        let mut conn = MockConnection::new(url);
        if self.native_probe {
            conn = conn.with_native_probe();
        }
        if self.close_failure {
            conn = conn.with_close_failure();
        }
        let conn = Arc::new(conn);

        self.connections
            .lock()
            .map_err(|_| DriverError::ConnectionError("mock driver lock poisoned".to_string()))?
            .push(conn.clone());

        Ok(conn)
    }
}

fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

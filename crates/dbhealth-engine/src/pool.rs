//! URL-keyed connection pool
//!
//! One live connection per distinct URL string, created on first use and
//! kept until [`ConnectionPool::close_all`]. Cached connections can be
//! probed before they are handed out; a dead one is closed, evicted and
//! replaced.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let pool = ConnectionPool::new(PoolConfig::default()).with_default_drivers();
//!
//! let core = pool.get("sqlite:///data/homo_sapiens_core.db").await?;
//! let template = SqlTemplate::new(core);
//!
//! pool.close_all().await;
//! ```

use crate::error::PoolError;
use dbhealth_core::PoolConfig;
use dbhealth_driver::{redact_url, Connection, Driver};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cache of one connection per database URL
pub struct ConnectionPool {
    drivers: Vec<Arc<dyn Driver>>,
    config: PoolConfig,
    /// Exact URL string -> connection
    connections: Mutex<HashMap<String, Arc<dyn Connection>>>,
}

impl ConnectionPool {
    /// Create an empty pool with no drivers registered
    pub fn new(config: PoolConfig) -> Self {
        Self {
            drivers: Vec::new(),
            config,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Register a driver; earlier registrations win when several accept a URL
    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.drivers.push(driver);
        self
    }

    /// Register every driver compiled into this build
    pub fn with_default_drivers(self) -> Self {
        #[allow(unused_mut)]
        let mut pool = self;

        #[cfg(feature = "sqlite")]
        {
            pool = pool.with_driver(Arc::new(dbhealth_driver::SqliteDriver));
        }

        #[cfg(feature = "postgres")]
        {
            pool = pool.with_driver(Arc::new(dbhealth_driver::PostgresDriver));
        }

        pool
    }

    /// Connection for `url`, opening it on first request
    ///
    /// Calls are serialized, so concurrent first requests for one URL open a
    /// single connection.
    pub async fn get(&self, url: &str) -> Result<Arc<dyn Connection>, PoolError> {
        let mut connections = self.connections.lock().await;

        if let Some(conn) = connections.get(url).cloned() {
            if !self.config.validate_on_borrow || self.is_alive(conn.as_ref()).await {
                return Ok(conn);
            }

            tracing::warn!(url = %redact_url(url), "replacing invalid pooled connection");
            if let Err(e) = conn.close().await {
                tracing::debug!(url = %redact_url(url), error = %e, "ignoring close failure of invalid connection");
            }
            connections.remove(url);
        }

        let driver = self
            .drivers
            .iter()
            .find(|d| d.accepts(url))
            .ok_or_else(|| PoolError::NoDriver(redact_url(url)))?;

        let conn = driver
            .connect(url)
            .await
            .map_err(|source| PoolError::Connect {
                url: redact_url(url),
                source,
            })?;

        tracing::info!(url = %redact_url(url), driver = driver.name(), "opened pooled connection");
        connections.insert(url.to_string(), conn.clone());
        Ok(conn)
    }

    /// Close and forget every connection
    ///
    /// Individual close failures are logged and otherwise ignored.
    pub async fn close_all(&self) {
        let drained: Vec<(String, Arc<dyn Connection>)> =
            self.connections.lock().await.drain().collect();

        for (url, conn) in drained {
            match conn.close().await {
                Ok(()) => tracing::info!(url = %redact_url(&url), "closed pooled connection"),
                Err(e) => {
                    tracing::warn!(url = %redact_url(&url), error = %e, "failed to close pooled connection")
                }
            }
        }
    }

    /// Number of cached connections
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Whether the pool holds no connections
    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }

    /// Whether a connection for exactly this URL is cached
    pub async fn contains(&self, url: &str) -> bool {
        self.connections.lock().await.contains_key(url)
    }

    /// Native probe if the backend has one, otherwise the validation query
    async fn is_alive(&self, conn: &dyn Connection) -> bool {
        if let Some(valid) = conn.is_valid().await {
            return valid;
        }

        match conn.query(&self.config.validation_query, &[]).await {
            Ok(cursor) => {
                cursor.close();
                true
            }
            Err(_) => false,
        }
    }
}

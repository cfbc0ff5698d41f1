//! Typed query execution against one connection
//!
//! [`SqlTemplate`] runs literal SQL with positional parameters, maps the
//! rows and wraps every failure in a [`QueryError`] that names the
//! operation, the database, the SQL and the parameters.
//!
//! Each call opens its own cursor and releases it before returning. On
//! success the cursor is closed explicitly; on any error path it is
//! dropped, which releases it just the same.

use crate::error::{Cardinality, QueryError, QueryErrorKind};
use crate::mapper::{DefaultMapper, MapRowMapper, RowMapper};
use crate::params::render_params;
use dbhealth_core::{FromSqlValue, QueryConfig, Value};
use dbhealth_driver::{Connection, ResultSet};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Query engine bound to one connection
#[derive(Clone)]
pub struct SqlTemplate {
    connection: Arc<dyn Connection>,
    config: QueryConfig,
}

impl SqlTemplate {
    /// Create a template with default settings
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self::with_config(connection, QueryConfig::default())
    }

    /// Create a template with explicit settings
    pub fn with_config(connection: Arc<dyn Connection>, config: QueryConfig) -> Self {
        Self { connection, config }
    }

    /// The underlying connection
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Map every row and require exactly one
    pub async fn query_for_object<T, M>(&self, sql: &str, mapper: &M, params: &[Value]) -> Result<T, QueryError>
    where
        M: RowMapper<T>,
    {
        let op = "query_for_object";
        let mut results = self.map_rows(op, sql, mapper, params, None).await?;
        if results.len() != 1 {
            return Err(self.error(op, sql, params, QueryErrorKind::Cardinality {
                expected: Cardinality::ExactlyOne,
                actual: results.len(),
            }));
        }
        Ok(results.remove(0))
    }

    /// Single-column, single-row query converted straight into `T`
    pub async fn query_for_default_object<T: FromSqlValue>(&self, sql: &str, params: &[Value]) -> Result<T, QueryError> {
        self.query_for_object(sql, &DefaultMapper::<T>::new(), params).await
    }

    /// First mapped row of a query that must return at least one
    pub async fn query_for_first_object<T, M>(&self, sql: &str, mapper: &M, params: &[Value]) -> Result<T, QueryError>
    where
        M: RowMapper<T>,
    {
        let op = "query_for_first_object";
        let mut cursor = self.open(op, sql, params).await?;

        let first = match cursor.next_row() {
            Some(row) => mapper
                .map_row(&row, 0)
                .map_err(|e| self.error(op, sql, params, QueryErrorKind::mapping(0, e)))?,
            None => {
                return Err(self.error(op, sql, params, QueryErrorKind::Cardinality {
                    expected: Cardinality::AtLeastOne,
                    actual: 0,
                }))
            }
        };

        cursor.close();
        Ok(first)
    }

    /// Every row mapped, in row order
    pub async fn query_for_list<T, M>(&self, sql: &str, mapper: &M, params: &[Value]) -> Result<Vec<T>, QueryError>
    where
        M: RowMapper<T>,
    {
        self.map_rows("query_for_list", sql, mapper, params, None).await
    }

    /// Every row mapped; more than `limit` rows is a cardinality error
    pub async fn query_for_list_with_limit<T, M>(
        &self,
        sql: &str,
        mapper: &M,
        params: &[Value],
        limit: usize,
    ) -> Result<Vec<T>, QueryError>
    where
        M: RowMapper<T>,
    {
        self.map_rows("query_for_list_with_limit", sql, mapper, params, Some(limit))
            .await
    }

    /// Single-column query converted straight into a list of `T`
    pub async fn query_for_default_object_list<T: FromSqlValue>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<T>, QueryError> {
        self.map_rows(
            "query_for_default_object_list",
            sql,
            &DefaultMapper::<T>::new(),
            params,
            None,
        )
        .await
    }

    /// Fold the rows into a map using the mapper's duplicate-key policy
    pub async fn query_for_map<K, T, M>(&self, sql: &str, mapper: &M, params: &[Value]) -> Result<HashMap<K, T>, QueryError>
    where
        K: Eq + Hash,
        M: MapRowMapper<K, T>,
    {
        let op = "query_for_map";
        let mut cursor = self.open(op, sql, params).await?;
        let mut map = mapper.new_map();

        let mut index = 0;
        while let Some(row) = cursor.next_row() {
            let folded = mapper.key(&row).and_then(|key| match map.get_mut(&key) {
                Some(current) => mapper.existing(&key, current, &row, index),
                None => {
                    let value = mapper.map_row(&row, index)?;
                    map.insert(key, value);
                    Ok(())
                }
            });
            folded.map_err(|e| self.error(op, sql, params, QueryErrorKind::mapping(index, e)))?;
            index += 1;
        }

        cursor.close();
        Ok(map)
    }

    /// Run DDL/DML without parameters; 0 when no count is reported
    pub async fn execute(&self, sql: &str) -> Result<u64, QueryError> {
        self.run_update("execute", sql, &[]).await
    }

    /// Run parameterized DML and return the affected-row count
    pub async fn update(&self, sql: &str, params: &[Value]) -> Result<u64, QueryError> {
        self.run_update("update", sql, params).await
    }

    /// Number of rows a query returns
    pub async fn row_count(&self, sql: &str, params: &[Value]) -> Result<usize, QueryError> {
        let cursor = self.open("row_count", sql, params).await?;
        let count = cursor.row_count();
        cursor.close();
        Ok(count)
    }

    /// `SELECT COUNT(*)` on a table
    pub async fn count_rows_in_table(&self, table: &str) -> Result<i64, QueryError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        self.query_for_default_object(&sql, &[]).await
    }

    async fn run_update(&self, op: &str, sql: &str, params: &[Value]) -> Result<u64, QueryError> {
        tracing::debug!(db = self.connection.identity(), op, sql, "executing update");

        let affected = self
            .connection
            .execute(sql, params)
            .await
            .map_err(|e| self.error(op, sql, params, e.into()))?;

        Ok(affected.unwrap_or(0))
    }

    async fn open(&self, op: &str, sql: &str, params: &[Value]) -> Result<ResultSet, QueryError> {
        tracing::debug!(
            db = self.connection.identity(),
            op,
            sql,
            params = params.len(),
            "executing query"
        );

        self.connection
            .query(sql, params)
            .await
            .map_err(|e| self.error(op, sql, params, e.into()))
    }

    async fn map_rows<T, M>(
        &self,
        op: &str,
        sql: &str,
        mapper: &M,
        params: &[Value],
        limit: Option<usize>,
    ) -> Result<Vec<T>, QueryError>
    where
        M: RowMapper<T>,
    {
        let mut cursor = self.open(op, sql, params).await?;

        if let Some(limit) = limit {
            if cursor.row_count() > limit {
                return Err(self.error(op, sql, params, QueryErrorKind::Cardinality {
                    expected: Cardinality::AtMost(limit),
                    actual: cursor.row_count(),
                }));
            }
        }

        let mut results = Vec::with_capacity(cursor.row_count());
        while let Some(row) = cursor.next_row() {
            let index = results.len();
            let value = mapper
                .map_row(&row, index)
                .map_err(|e| self.error(op, sql, params, QueryErrorKind::mapping(index, e)))?;
            results.push(value);
        }

        cursor.close();
        Ok(results)
    }

    fn error(&self, op: &str, sql: &str, params: &[Value], kind: QueryErrorKind) -> QueryError {
        QueryError {
            operation: op.to_string(),
            connection: self.connection.identity().to_string(),
            sql: sql.to_string(),
            params: render_params(params, &self.config),
            kind,
        }
    }
}

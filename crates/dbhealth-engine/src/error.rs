//! Error types for the query engine and connection pool

use dbhealth_core::{ConversionError, Diagnostic, DiagnosticCode, Severity};
use dbhealth_driver::{DriverError, RowError};

/// A row could not be mapped
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error(transparent)]
    Row(#[from] RowError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("expected exactly one column, found {0}")]
    ColumnCount(usize),

    #[error("duplicate key {0}")]
    DuplicateKey(String),

    #[error("{0}")]
    Custom(String),
}

impl MapError {
    /// Mapper-defined failure
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Row count a query was required to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ExactlyOne,
    AtLeastOne,
    AtMost(usize),
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactlyOne => write!(f, "exactly one row"),
            Self::AtLeastOne => write!(f, "at least one row"),
            Self::AtMost(n) => write!(f, "at most {} rows", n),
        }
    }
}

/// What went wrong inside a [`QueryError`]
#[derive(Debug, thiserror::Error)]
pub enum QueryErrorKind {
    /// A parameter could not be bound
    #[error("{0}")]
    Binding(#[source] DriverError),

    /// The query returned the wrong number of rows
    #[error("expected {expected}, got {actual}")]
    Cardinality { expected: Cardinality, actual: usize },

    /// The driver failed to connect, prepare or execute
    #[error("{0}")]
    Driver(#[source] DriverError),

    /// Two rows produced the same key for a unique keyed mapper
    #[error("duplicate key {0}")]
    DuplicateKey(String),

    /// A row could not be mapped into the target type
    #[error("row {row}: {source}")]
    Mapping {
        row: usize,
        #[source]
        source: MapError,
    },
}

impl From<DriverError> for QueryErrorKind {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::BindError { .. } => Self::Binding(err),
            other => Self::Driver(other),
        }
    }
}

impl QueryErrorKind {
    /// Classify a mapping failure on the given row
    pub fn mapping(row: usize, err: MapError) -> Self {
        match err {
            MapError::DuplicateKey(key) => Self::DuplicateKey(key),
            source => Self::Mapping { row, source },
        }
    }
}

/// Any failure of a [`SqlTemplate`](crate::SqlTemplate) call
///
/// Carries enough context to reproduce the call: the operation, the
/// database it ran against, the SQL and a bounded rendering of the
/// parameters.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed on {connection}: {kind} [sql: {sql}] [params: {params}]")]
pub struct QueryError {
    /// Engine operation (e.g. "query_for_object")
    pub operation: String,

    /// Identity of the database
    pub connection: String,

    /// Offending SQL
    pub sql: String,

    /// Rendered parameters
    pub params: String,

    #[source]
    pub kind: QueryErrorKind,
}

impl QueryError {
    /// Whether the query ran but its result violated an expectation
    ///
    /// Cardinality and duplicate-key failures are validation outcomes;
    /// everything else is an execution failure.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self.kind,
            QueryErrorKind::Cardinality { .. } | QueryErrorKind::DuplicateKey(_)
        )
    }

    /// Report the failure as an error diagnostic against its database
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(DiagnosticCode::QueryFailed, Severity::Error, self.to_string())
            .with_database(self.connection.clone())
    }
}

/// Connection pool failures
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("No driver registered for URL: {0}")]
    NoDriver(String),

    #[error("Cannot connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: DriverError,
    },
}

impl From<PoolError> for QueryError {
    fn from(err: PoolError) -> Self {
        let (connection, source) = match err {
            PoolError::NoDriver(url) => (url.clone(), DriverError::UnsupportedUrl(url)),
            PoolError::Connect { url, source } => (url, source),
        };
        Self {
            operation: "connect".to_string(),
            connection,
            sql: String::new(),
            params: "[]".to_string(),
            kind: QueryErrorKind::Driver(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(kind: QueryErrorKind) -> QueryError {
        QueryError {
            operation: "query_for_default_object".into(),
            connection: "homo_sapiens_core".into(),
            sql: "SELECT COUNT(*) FROM gene".into(),
            params: "[]".into(),
            kind,
        }
    }

    #[test]
    fn test_cardinality_message_names_sql_and_count() {
        let err = error(QueryErrorKind::Cardinality {
            expected: Cardinality::ExactlyOne,
            actual: 2,
        });
        let message = err.to_string();
        assert!(message.contains("expected exactly one row, got 2"));
        assert!(message.contains("SELECT COUNT(*) FROM gene"));
        assert!(err.is_validation_failure());
    }

    #[test]
    fn test_driver_errors_are_not_validation_failures() {
        let err = error(DriverError::QueryError("no such table: gene".into()).into());
        assert!(!err.is_validation_failure());
        assert!(matches!(err.kind, QueryErrorKind::Driver(_)));

        let bind = error(
            DriverError::BindError {
                index: 1,
                kind: "bytes",
                message: "cannot bind to a int4 placeholder".into(),
            }
            .into(),
        );
        assert!(matches!(bind.kind, QueryErrorKind::Binding(_)));
    }

    #[test]
    fn test_duplicate_key_mapping_is_reclassified() {
        let kind = QueryErrorKind::mapping(3, MapError::DuplicateKey("\"ENSG1\"".into()));
        assert!(matches!(kind, QueryErrorKind::DuplicateKey(_)));

        let kind = QueryErrorKind::mapping(3, MapError::ColumnCount(2));
        assert_eq!(kind.to_string(), "row 3: expected exactly one column, found 2");
    }

    #[test]
    fn test_to_diagnostic() {
        let diagnostic = error(QueryErrorKind::DuplicateKey("7".into())).to_diagnostic();
        assert_eq!(diagnostic.code, DiagnosticCode::QueryFailed);
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.database.as_deref(), Some("homo_sapiens_core"));
    }

    #[test]
    fn test_pool_error_converts_to_query_error() {
        let err: QueryError = PoolError::NoDriver("oracle://db/core".into()).into();
        assert_eq!(err.operation, "connect");
        assert!(matches!(err.kind, QueryErrorKind::Driver(DriverError::UnsupportedUrl(_))));
    }
}

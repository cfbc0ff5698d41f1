//! Diagnostic codes and discrepancy reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Structural comparison (1xxx)
    /// Two result sets have a different number of columns
    ComparisonColumnCount,

    /// Column names differ at the same position
    ComparisonColumnName,

    /// Declared column types differ
    ComparisonColumnType,

    /// A column requested for comparison is absent from one result set
    ComparisonColumnMissing,

    // Data comparison (2xxx)
    /// A cell value differs between two result sets
    ComparisonValueMismatch,

    /// One result set has rows the other does not
    ComparisonAdditionalRows,

    // Query execution (3xxx)
    /// A query failed to execute or map
    QueryFailed,

    // General (9xxx)
    /// General informational message
    Info,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComparisonColumnCount => "COMPARISON_COLUMN_COUNT",
            Self::ComparisonColumnName => "COMPARISON_COLUMN_NAME",
            Self::ComparisonColumnType => "COMPARISON_COLUMN_TYPE",
            Self::ComparisonColumnMissing => "COMPARISON_COLUMN_MISSING",
            Self::ComparisonValueMismatch => "COMPARISON_VALUE_MISMATCH",
            Self::ComparisonAdditionalRows => "COMPARISON_ADDITIONAL_ROWS",
            Self::QueryFailed => "QUERY_FAILED",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - the check that produced it has failed
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message attributed to one database
///
/// This is the whole contract with the reporting side: a severity, the
/// database responsible and a human-readable message. Formatting and
/// storage happen elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Identity of the database the discrepancy is attributed to
    pub database: Option<String>,

    /// Human-readable message
    pub message: String,

    /// Expected value (for comparison diagnostics)
    pub expected: Option<String>,

    /// Actual value (for comparison diagnostics)
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            database: None,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Attribute the diagnostic to a database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.database {
            Some(db) => write!(f, "[{}] {} ({}): {}", self.severity, self.code, db, self.message),
            None => write!(f, "[{}] {}: {}", self.severity, self.code, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        // Ensure codes are stable strings
        assert_eq!(DiagnosticCode::ComparisonAdditionalRows.as_str(), "COMPARISON_ADDITIONAL_ROWS");
        assert_eq!(DiagnosticCode::QueryFailed.as_str(), "QUERY_FAILED");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::new(
            DiagnosticCode::ComparisonValueMismatch,
            Severity::Error,
            "column 'name' differs at row 3",
        )
        .with_database("homo_sapiens_core_110")
        .with_comparison("BRCA2", "BRCA1");

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("COMPARISON_VALUE_MISMATCH"));
        assert!(json.contains("\"error\""));
        assert!(json.contains("homo_sapiens_core_110"));
    }

    #[test]
    fn diagnostic_display_includes_database() {
        let diag = Diagnostic::new(DiagnosticCode::Warning, Severity::Warn, "slow")
            .with_database("db_a");
        assert_eq!(diag.to_string(), "[warn] WARNING (db_a): slow");

        let diag = Diagnostic::new(DiagnosticCode::Info, Severity::Info, "ok");
        assert_eq!(diag.to_string(), "[info] INFO: ok");
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
    }
}

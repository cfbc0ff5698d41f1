//! Cross-database result-set comparison
//!
//! Runs the same query against several databases and checks that every
//! pair of results agrees: same columns, same declared type families, same
//! rows in the same order.
//!
//! Each pair is checked independently and stops at its first discrepancy.
//! Values are compared according to the column's type family:
//! - **Integer**: numeric value, so `INT` and `BIGINT` columns agree
//! - **Decimal/Text**: string value after removing volatile substrings
//!   such as `AUTO_INCREMENT=<n>`
//! - **Float**: primitive equality
//! - **Temporal**: timestamp equality
//! - **Everything else**: string representation

use crate::error::{QueryError, QueryErrorKind};
use crate::params::render_params;
use dbhealth_core::config::AUTO_INCREMENT_PATTERN;
use dbhealth_core::{
    ComparisonConfig, Config, ConfigError, Diagnostic, DiagnosticCode, QueryConfig, Severity,
    SeverityThreshold, SqlType, TypeFamily, Value,
};
use dbhealth_driver::{redact_url, same_connection, Connection, ResultSet};
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

/// Verdict of a comparison plus one diagnostic per discrepancy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonOutcome {
    /// Whether every compared pair agreed
    pub equal: bool,

    /// Discrepancies, each attributed to a database
    pub diagnostics: Vec<Diagnostic>,
}

impl ComparisonOutcome {
    fn equal() -> Self {
        Self {
            equal: true,
            diagnostics: Vec::new(),
        }
    }

    fn discrepancy(diagnostic: Diagnostic) -> Self {
        Self {
            equal: false,
            diagnostics: vec![diagnostic],
        }
    }

    fn absorb(&mut self, other: ComparisonOutcome) {
        self.equal &= other.equal;
        self.diagnostics.extend(other.diagnostics);
    }

    /// Diagnostic messages in report order
    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    /// Check if any discrepancy is reported at error severity
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

/// A column resolved on both sides of a pair
struct ColumnPair {
    name: String,
    left: usize,
    right: usize,
    family: TypeFamily,
}

/// Compares result sets pairwise
#[derive(Debug, Clone)]
pub struct ResultSetComparator {
    volatile: Vec<Regex>,
    lenient_null_fallback: bool,
    columns: Option<Vec<String>>,
    schema_comparison: bool,
    severity: SeverityThreshold,
    query: QueryConfig,
}

impl Default for ResultSetComparator {
    fn default() -> Self {
        Self {
            volatile: Regex::new(AUTO_INCREMENT_PATTERN).into_iter().collect(),
            lenient_null_fallback: false,
            columns: None,
            schema_comparison: false,
            severity: SeverityThreshold::default(),
            query: QueryConfig::default(),
        }
    }
}

impl ResultSetComparator {
    /// Comparator with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Comparator configured from `dbhealth.toml` settings
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut comparator = Self::from_comparison_config(&config.comparison)?;
        comparator.severity = config.severity.clone();
        comparator.query = config.query.clone();
        Ok(comparator)
    }

    /// Comparator using only the `[comparison]` settings
    pub fn from_comparison_config(config: &ComparisonConfig) -> Result<Self, ConfigError> {
        let volatile = config
            .volatile_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            volatile,
            lenient_null_fallback: config.lenient_null_fallback,
            ..Self::default()
        })
    }

    /// Compare only these columns, located by name on each side
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Mark the compared query as a schema dump
    ///
    /// Additional-row failures then carry a hint to look for missing
    /// columns.
    pub fn schema_comparison(mut self) -> Self {
        self.schema_comparison = true;
        self
    }

    /// Compare two cursors; `left`/`right` name their databases
    ///
    /// Both cursors are rewound before and left exhausted (or positioned at
    /// the first discrepancy) after.
    pub fn compare_pair(
        &self,
        a: &mut ResultSet,
        left: &str,
        b: &mut ResultSet,
        right: &str,
    ) -> ComparisonOutcome {
        let columns = match self.resolve_columns(a, left, b, right) {
            Ok(columns) => columns,
            Err(diagnostic) => return self.fail(diagnostic),
        };

        a.before_first();
        b.before_first();

        let mut row_number = 0;
        loop {
            row_number += 1;
            match (a.next(), b.next()) {
                (true, true) => {
                    let (Some(row_a), Some(row_b)) = (a.current(), b.current()) else {
                        break;
                    };
                    for column in &columns {
                        let va = row_a.value(column.left).unwrap_or(&Value::Null);
                        let vb = row_b.value(column.right).unwrap_or(&Value::Null);
                        if !self.values_equal(column.family, va, vb) {
                            let message = format!(
                                "Column '{}' differs at row {}: {} in {}, {} in {}",
                                column.name, row_number, va, left, vb, right
                            );
                            return self.fail(
                                self.diagnostic(DiagnosticCode::ComparisonValueMismatch, right, message)
                                    .with_comparison(va.to_string(), vb.to_string()),
                            );
                        }
                    }
                }
                (true, false) => return self.fail(self.additional_rows(left, right)),
                (false, true) => return self.fail(self.additional_rows(right, left)),
                (false, false) => break,
            }
        }

        ComparisonOutcome::equal()
    }

    /// Run `sql` on every connection and compare all pairs of results
    ///
    /// One cursor is opened per distinct connection; a connection listed
    /// twice shares its cursor and that pair is trivially equal. Every
    /// cursor is closed before returning, whatever the outcome.
    pub async fn compare_across(
        &self,
        sql: &str,
        params: &[Value],
        connections: &[Arc<dyn Connection>],
    ) -> Result<ComparisonOutcome, QueryError> {
        let mut cursors: Vec<ResultSet> = Vec::new();
        let mut opened: Vec<&Arc<dyn Connection>> = Vec::new();
        let mut slots: Vec<usize> = Vec::with_capacity(connections.len());

        for (i, conn) in connections.iter().enumerate() {
            if let Some(earlier) = (0..i).find(|&j| same_connection(&connections[j], conn)) {
                slots.push(slots[earlier]);
                continue;
            }

            tracing::debug!(db = conn.identity(), sql, "opening comparison cursor");
            let cursor = conn.query(sql, params).await.map_err(|e| QueryError {
                operation: "compare_across".to_string(),
                connection: conn.identity().to_string(),
                sql: sql.to_string(),
                params: render_params(params, &self.query),
                kind: QueryErrorKind::from(e),
            })?;

            slots.push(cursors.len());
            cursors.push(cursor);
            opened.push(conn);
        }

        let names = attribution_names(&opened);

        let mut outcome = ComparisonOutcome::equal();
        for i in 0..slots.len() {
            for j in (i + 1)..slots.len() {
                let (x, y) = (slots[i], slots[j]);
                if x == y {
                    continue;
                }

                let (low, high) = (x.min(y), x.max(y));
                let (head, tail) = cursors.split_at_mut(high);
                let (low_cursor, high_cursor) = (&mut head[low], &mut tail[0]);

                let pair = if x < y {
                    self.compare_pair(low_cursor, &names[x], high_cursor, &names[y])
                } else {
                    self.compare_pair(high_cursor, &names[x], low_cursor, &names[y])
                };
                outcome.absorb(pair);
            }
        }

        for cursor in cursors {
            cursor.close();
        }

        Ok(outcome)
    }

    fn resolve_columns(
        &self,
        a: &ResultSet,
        left: &str,
        b: &ResultSet,
        right: &str,
    ) -> Result<Vec<ColumnPair>, Diagnostic> {
        let indices: Vec<(usize, usize)> = match &self.columns {
            Some(names) => {
                let mut indices = Vec::with_capacity(names.len());
                for name in names {
                    let ia = a.column_index(name).ok_or_else(|| self.missing_column(name, left))?;
                    let ib = b.column_index(name).ok_or_else(|| self.missing_column(name, right))?;
                    indices.push((ia, ib));
                }
                indices
            }
            None => {
                if a.column_count() != b.column_count() {
                    let message = format!(
                        "Column counts differ: {} has {}, {} has {}",
                        left,
                        a.column_count(),
                        right,
                        b.column_count()
                    );
                    return Err(self
                        .diagnostic(DiagnosticCode::ComparisonColumnCount, right, message)
                        .with_comparison(a.column_count().to_string(), b.column_count().to_string()));
                }
                (0..a.column_count()).map(|i| (i, i)).collect()
            }
        };

        let mut pairs = Vec::with_capacity(indices.len());
        for (ia, ib) in indices {
            let (ca, cb) = (&a.columns()[ia], &b.columns()[ib]);

            if !ca.name.eq_ignore_ascii_case(&cb.name) {
                let message = format!(
                    "Column {} name differs: '{}' in {}, '{}' in {}",
                    ia + 1,
                    ca.name,
                    left,
                    cb.name,
                    right
                );
                return Err(self
                    .diagnostic(DiagnosticCode::ComparisonColumnName, right, message)
                    .with_comparison(ca.name.clone(), cb.name.clone()));
            }

            if !types_compatible(&ca.sql_type, &cb.sql_type) {
                let message = format!(
                    "Column '{}' type differs: {} in {}, {} in {}",
                    ca.name, ca.sql_type, left, cb.sql_type, right
                );
                return Err(self
                    .diagnostic(DiagnosticCode::ComparisonColumnType, right, message)
                    .with_comparison(ca.sql_type.to_string(), cb.sql_type.to_string()));
            }

            let family = match ca.sql_type {
                SqlType::Unknown => cb.sql_type.family(),
                _ => ca.sql_type.family(),
            };
            pairs.push(ColumnPair {
                name: ca.name.clone(),
                left: ia,
                right: ib,
                family,
            });
        }

        Ok(pairs)
    }

    fn values_equal(&self, family: TypeFamily, a: &Value, b: &Value) -> bool {
        match (a.is_null(), b.is_null()) {
            (true, true) => return true,
            (true, false) | (false, true) => {
                return !matches!(
                    family,
                    TypeFamily::Integer | TypeFamily::Decimal | TypeFamily::Text | TypeFamily::Float | TypeFamily::Temporal
                ) && self.lenient_null_fallback;
            }
            (false, false) => {}
        }

        match family {
            TypeFamily::Integer => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => self.fallback_equal(a, b),
            },
            TypeFamily::Decimal | TypeFamily::Text => {
                self.strip_volatile(&comparable_text(a)) == self.strip_volatile(&comparable_text(b))
            }
            TypeFamily::Float => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => self.fallback_equal(a, b),
            },
            TypeFamily::Temporal => match (a.as_timestamp(), b.as_timestamp()) {
                (Some(x), Some(y)) => x == y,
                _ => self.fallback_equal(a, b),
            },
            TypeFamily::Boolean | TypeFamily::Binary | TypeFamily::Other => self.fallback_equal(a, b),
        }
    }

    fn fallback_equal(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Bytes(x), Value::Bytes(y)) => x == y,
            _ => comparable_text(a) == comparable_text(b),
        }
    }

    fn strip_volatile(&self, text: &str) -> String {
        self.volatile
            .iter()
            .fold(text.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
    }

    fn additional_rows(&self, longer: &str, shorter: &str) -> Diagnostic {
        let mut message = format!("{} has additional rows not in {}", longer, shorter);
        if self.schema_comparison {
            message.push_str(&format!(
                "; this is a schema comparison, so check {} for missing columns",
                shorter
            ));
        }
        self.diagnostic(DiagnosticCode::ComparisonAdditionalRows, longer, message)
    }

    fn missing_column(&self, name: &str, database: &str) -> Diagnostic {
        self.diagnostic(
            DiagnosticCode::ComparisonColumnMissing,
            database,
            format!("Column '{}' not found in {}", name, database),
        )
    }

    fn diagnostic(&self, code: DiagnosticCode, database: &str, message: String) -> Diagnostic {
        let severity = self.severity.get_severity(code, Severity::Error);
        Diagnostic::new(code, severity, message).with_database(database)
    }

    fn fail(&self, diagnostic: Diagnostic) -> ComparisonOutcome {
        tracing::warn!(
            code = diagnostic.code.as_str(),
            db = diagnostic.database.as_deref().unwrap_or("?"),
            "{}",
            diagnostic.message
        );
        ComparisonOutcome::discrepancy(diagnostic)
    }
}

/// Declared types are compatible when their families match
///
/// An undeclared type (SQLite expression columns) is compatible with
/// anything.
fn types_compatible(a: &SqlType, b: &SqlType) -> bool {
    matches!(a, SqlType::Unknown) || matches!(b, SqlType::Unknown) || a.family() == b.family()
}

fn comparable_text(value: &Value) -> String {
    match value {
        Value::Decimal(d) => d.normalize().to_string(),
        other => other.to_text().unwrap_or_default(),
    }
}

/// Name each connection for diagnostics
///
/// The database identity is used when no other connection shares it;
/// otherwise the redacted URL. Connections whose URLs also coincide get
/// their position appended.
fn attribution_names(connections: &[&Arc<dyn Connection>]) -> Vec<String> {
    let identities: Vec<&str> = connections.iter().map(|c| c.identity()).collect();
    let names: Vec<String> = connections
        .iter()
        .zip(&identities)
        .map(|(conn, identity)| {
            if identities.iter().filter(|other| *other == identity).count() == 1 {
                identity.to_string()
            } else {
                redact_url(conn.url())
            }
        })
        .collect();

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if names.iter().filter(|other| *other == name).count() == 1 {
                name.clone()
            } else {
                format!("{}#{}", name, i + 1)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbhealth_core::params;
    use dbhealth_driver::{ColumnMeta, MockConnection};
    use pretty_assertions::assert_eq;

    const GENE_SQL: &str = "SELECT gene_id, stable_id FROM gene ORDER BY gene_id";

    fn cursor(types: &[(&str, SqlType)], rows: Vec<Vec<Value>>) -> ResultSet {
        let columns = types
            .iter()
            .map(|(name, ty)| ColumnMeta::new(*name, ty.clone()))
            .collect();
        ResultSet::new(columns, rows)
    }

    fn genes(rows: usize, id_type: SqlType) -> ResultSet {
        cursor(
            &[("gene_id", id_type), ("stable_id", SqlType::VarChar), ("gc", SqlType::Double)],
            (0..rows)
                .map(|i| params![i as i64, format!("ENSG{:011}", i), 0.4 + i as f64 / 1000.0])
                .collect(),
        )
    }

    #[test]
    fn test_identical_cursors_are_equal() {
        let comparator = ResultSetComparator::new();
        let (mut a, mut b) = (genes(100, SqlType::Integer), genes(100, SqlType::Integer));

        let outcome = comparator.compare_pair(&mut a, "core_a", &mut b, "core_b");
        assert_eq!(outcome, ComparisonOutcome::equal());

        // Cursors are rewound, so a second run gives the same verdict
        let outcome = comparator.compare_pair(&mut a, "core_a", &mut b, "core_b");
        assert!(outcome.equal);
    }

    #[test]
    fn test_additional_rows_attributed_to_longer_side() {
        let comparator = ResultSetComparator::new();
        let (mut a, mut b) = (genes(100, SqlType::Integer), genes(99, SqlType::Integer));

        let outcome = comparator.compare_pair(&mut a, "core_a", &mut b, "core_b");
        assert!(!outcome.equal);
        assert_eq!(outcome.messages(), vec!["core_a has additional rows not in core_b"]);
        assert_eq!(outcome.diagnostics[0].database.as_deref(), Some("core_a"));
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::ComparisonAdditionalRows);

        let outcome = comparator.compare_pair(&mut b, "core_b", &mut a, "core_a");
        assert_eq!(outcome.messages(), vec!["core_a has additional rows not in core_b"]);
    }

    #[test]
    fn test_schema_comparison_hint() {
        let comparator = ResultSetComparator::new().schema_comparison();
        let (mut a, mut b) = (genes(3, SqlType::Integer), genes(2, SqlType::Integer));

        let outcome = comparator.compare_pair(&mut a, "core_a", &mut b, "core_b");
        assert!(outcome.messages()[0].starts_with("core_a has additional rows not in core_b; "));
        assert!(outcome.messages()[0].contains("check core_b for missing columns"));
    }

    #[test]
    fn test_integer_subtypes_compare_by_value() {
        let comparator = ResultSetComparator::new();
        let mut a = cursor(&[("n", SqlType::SmallInt)], vec![vec![Value::Short(7)]]);
        let mut b = cursor(&[("n", SqlType::BigInt)], vec![vec![Value::Long(7)]]);
        assert!(comparator.compare_pair(&mut a, "a", &mut b, "b").equal);
    }

    #[test]
    fn test_auto_increment_is_ignored() {
        let comparator = ResultSetComparator::new();
        let ddl = |n: u32| {
            vec![Value::Text(format!(
                "CREATE TABLE `gene` (`gene_id` int(10)) ENGINE=MyISAM AUTO_INCREMENT={} DEFAULT CHARSET=latin1",
                n
            ))]
        };
        let mut a = cursor(&[("Create Table", SqlType::Text)], vec![ddl(1001)]);
        let mut b = cursor(&[("Create Table", SqlType::Text)], vec![ddl(2048)]);
        assert!(comparator.compare_pair(&mut a, "a", &mut b, "b").equal);
    }

    #[test]
    fn test_value_mismatch_reports_both_values() {
        let comparator = ResultSetComparator::new();
        let mut a = cursor(&[("biotype", SqlType::VarChar)], vec![params!["lncRNA"]]);
        let mut b = cursor(&[("biotype", SqlType::VarChar)], vec![params!["protein_coding"]]);

        let outcome = comparator.compare_pair(&mut a, "a", &mut b, "b");
        let diagnostic = &outcome.diagnostics[0];
        assert_eq!(diagnostic.code, DiagnosticCode::ComparisonValueMismatch);
        assert_eq!(diagnostic.expected.as_deref(), Some("'lncRNA'"));
        assert_eq!(diagnostic.actual.as_deref(), Some("'protein_coding'"));
        assert_eq!(
            diagnostic.message,
            "Column 'biotype' differs at row 1: 'lncRNA' in a, 'protein_coding' in b"
        );
    }

    #[test]
    fn test_structural_mismatches() {
        let comparator = ResultSetComparator::new();

        let mut a = cursor(&[("x", SqlType::Integer)], vec![]);
        let mut b = cursor(&[("x", SqlType::Integer), ("y", SqlType::Integer)], vec![]);
        let outcome = comparator.compare_pair(&mut a, "a", &mut b, "b");
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::ComparisonColumnCount);

        let mut a = cursor(&[("x", SqlType::Integer)], vec![]);
        let mut b = cursor(&[("z", SqlType::Integer)], vec![]);
        let outcome = comparator.compare_pair(&mut a, "a", &mut b, "b");
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::ComparisonColumnName);

        let mut a = cursor(&[("x", SqlType::Integer)], vec![]);
        let mut b = cursor(&[("x", SqlType::VarChar)], vec![]);
        let outcome = comparator.compare_pair(&mut a, "a", &mut b, "b");
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::ComparisonColumnType);
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn test_column_subset_located_by_name() {
        let comparator = ResultSetComparator::new().with_columns(["stable_id"]);
        let mut a = cursor(
            &[("gene_id", SqlType::Integer), ("stable_id", SqlType::VarChar)],
            vec![params![1, "ENSG1"]],
        );
        let mut b = cursor(
            &[("stable_id", SqlType::VarChar), ("gene_id", SqlType::Integer), ("extra", SqlType::Text)],
            vec![params!["ENSG1", 99, "x"]],
        );
        assert!(comparator.compare_pair(&mut a, "a", &mut b, "b").equal);

        let comparator = ResultSetComparator::new().with_columns(["biotype"]);
        let outcome = comparator.compare_pair(&mut a, "a", &mut b, "b");
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::ComparisonColumnMissing);
        assert_eq!(outcome.diagnostics[0].database.as_deref(), Some("a"));
    }

    #[test]
    fn test_null_handling() {
        let mut a = cursor(&[("flag", SqlType::Boolean)], vec![vec![Value::Null]]);
        let mut b = cursor(&[("flag", SqlType::Boolean)], vec![vec![Value::Bool(false)]]);
        assert!(!ResultSetComparator::new().compare_pair(&mut a, "a", &mut b, "b").equal);

        let lenient = ResultSetComparator::from_comparison_config(&ComparisonConfig {
            lenient_null_fallback: true,
            ..ComparisonConfig::default()
        })
        .unwrap();
        assert!(lenient.compare_pair(&mut a, "a", &mut b, "b").equal);

        // Typed branches never treat a one-sided NULL as equal
        let mut a = cursor(&[("n", SqlType::Integer)], vec![vec![Value::Null]]);
        let mut b = cursor(&[("n", SqlType::Integer)], vec![vec![Value::Long(0)]]);
        assert!(!lenient.compare_pair(&mut a, "a", &mut b, "b").equal);

        let mut a = cursor(&[("n", SqlType::Integer)], vec![vec![Value::Null]]);
        let mut b = cursor(&[("n", SqlType::Integer)], vec![vec![Value::Null]]);
        assert!(lenient.compare_pair(&mut a, "a", &mut b, "b").equal);
    }

    #[test]
    fn test_decimal_scale_is_normalized() {
        let comparator = ResultSetComparator::new();
        let mut a = cursor(&[("gc", SqlType::Decimal)], vec![vec![Value::Decimal("44.25".parse().unwrap())]]);
        let mut b = cursor(&[("gc", SqlType::Decimal)], vec![vec![Value::Decimal("44.250".parse().unwrap())]]);
        assert!(comparator.compare_pair(&mut a, "a", &mut b, "b").equal);
    }

    #[test]
    fn test_severity_override() {
        let mut config = Config::default();
        config
            .severity
            .set_override(DiagnosticCode::ComparisonAdditionalRows, Severity::Warn);
        let comparator = ResultSetComparator::from_config(&config).unwrap();

        let (mut a, mut b) = (genes(2, SqlType::Integer), genes(1, SqlType::Integer));
        let outcome = comparator.compare_pair(&mut a, "a", &mut b, "b");
        assert_eq!(outcome.diagnostics[0].severity, Severity::Warn);
        assert!(!outcome.has_errors());
    }

    #[test]
    fn test_invalid_volatile_pattern() {
        let mut config = Config::default();
        config.comparison.volatile_patterns = vec!["AUTO_INCREMENT=(".into()];
        assert!(matches!(
            ResultSetComparator::from_config(&config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    async fn gene_source(url: &str, rows: i64) -> Arc<MockConnection> {
        let conn = Arc::new(MockConnection::new(url));
        conn.add_result(
            GENE_SQL,
            vec![
                ColumnMeta::new("gene_id", SqlType::Integer),
                ColumnMeta::new("stable_id", SqlType::VarChar),
            ],
            (0..rows).map(|i| params![i, format!("ENSG{:011}", i)]).collect(),
        )
        .await;
        conn
    }

    fn shared(conn: &Arc<MockConnection>) -> Arc<dyn Connection> {
        conn.clone()
    }

    #[tokio::test]
    async fn test_shared_identity_attributed_by_url() {
        let staging = gene_source("mock://staging/core", 3).await;
        let live = gene_source("mock://live/core", 2).await;
        assert_eq!(staging.identity(), live.identity());

        let outcome = ResultSetComparator::new()
            .compare_across(GENE_SQL, &[], &[shared(&staging), shared(&live)])
            .await
            .unwrap();

        assert_eq!(
            outcome.messages(),
            vec!["mock://staging/core has additional rows not in mock://live/core"]
        );
        assert_eq!(outcome.diagnostics[0].database.as_deref(), Some("mock://staging/core"));
    }

    #[test]
    fn test_attribution_names() {
        let a: Arc<dyn Connection> = Arc::new(MockConnection::new("mock://staging/core"));
        let b: Arc<dyn Connection> = Arc::new(MockConnection::new("mock://live/core"));
        let c: Arc<dyn Connection> = Arc::new(MockConnection::new("mock://live/variation"));
        assert_eq!(
            attribution_names(&[&a, &b, &c]),
            vec!["mock://staging/core", "mock://live/core", "variation"]
        );

        let x: Arc<dyn Connection> = Arc::new(MockConnection::new("sqlite::memory:"));
        let y: Arc<dyn Connection> = Arc::new(MockConnection::new("sqlite::memory:"));
        assert_eq!(
            attribution_names(&[&x, &y]),
            vec!["sqlite::memory:#1", "sqlite::memory:#2"]
        );
    }

    #[tokio::test]
    async fn test_failed_query_releases_opened_cursors() {
        let a = gene_source("mock://staging/core", 3).await;
        let b = Arc::new(MockConnection::new("mock://live/core"));
        b.add_error(GENE_SQL, "Table 'gene' doesn't exist").await;

        let result = ResultSetComparator::new()
            .compare_across(GENE_SQL, &[], &[shared(&a), shared(&b)])
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.connection, "core");
        assert_eq!(a.open_cursors(), 0);
        assert_eq!(a.released_cursors(), 1);
        assert_eq!(b.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_repeated_connection_opens_one_cursor() {
        let a = gene_source("mock://staging/core", 4).await;
        let b = gene_source("mock://live/otherfeatures", 4).await;

        let outcome = ResultSetComparator::new()
            .compare_across(GENE_SQL, &[], &[shared(&a), shared(&a), shared(&b)])
            .await
            .unwrap();

        assert!(outcome.equal);
        for conn in [&a, &b] {
            assert_eq!(conn.open_cursors(), 0);
            assert_eq!(conn.released_cursors(), 1);
        }
        assert_eq!(a.executed_statements().await.len(), 1);
    }
}

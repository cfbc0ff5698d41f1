//! dbhealth core
//!
//! Shared domain model for the query engine and the cross-database comparator:
//! parameter/column values, declared SQL types, diagnostics and configuration.
//! Never rename diagnostic codes - they are part of the public API.

pub mod config;
pub mod diagnostic;
pub mod types;
pub mod value;

pub use config::{ComparisonConfig, Config, ConfigError, PoolConfig, QueryConfig, SeverityThreshold};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use types::{SqlType, TypeFamily};
pub use value::{ConversionError, FromSqlValue, Number, Value};

//! Configuration schema (dbhealth.toml)

use crate::diagnostic::{DiagnosticCode, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pattern stripped from text values before comparison.
///
/// `SHOW CREATE TABLE` output embeds the table's next auto-increment value,
/// which never matches across independently loaded copies of a schema.
pub const AUTO_INCREMENT_PATTERN: &str = r"\s*AUTO_INCREMENT=\d+";

/// Severity threshold overrides for specific diagnostic codes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of diagnostic code to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for a diagnostic code, or default
    pub fn get_severity(&self, code: DiagnosticCode, default: Severity) -> Severity {
        self.overrides
            .get(code.as_str())
            .copied()
            .unwrap_or(default)
    }

    /// Set severity override for a code
    pub fn set_override(&mut self, code: DiagnosticCode, severity: Severity) {
        self.overrides.insert(code.as_str().to_string(), severity);
    }
}

/// Query engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum number of parameters rendered into an error message
    #[serde(default = "default_max_rendered_params")]
    pub max_rendered_params: usize,

    /// Maximum rendered length of a single parameter
    #[serde(default = "default_max_rendered_param_len")]
    pub max_rendered_param_len: usize,
}

fn default_max_rendered_params() -> usize {
    10
}

fn default_max_rendered_param_len() -> usize {
    64
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_rendered_params: default_max_rendered_params(),
            max_rendered_param_len: default_max_rendered_param_len(),
        }
    }
}

/// Result-set comparison settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Regular expressions removed from decimal/text values before comparing
    #[serde(default = "default_volatile_patterns")]
    pub volatile_patterns: Vec<String>,

    /// Treat a NULL on only one side as equal in the string fallback branch
    #[serde(default)]
    pub lenient_null_fallback: bool,
}

fn default_volatile_patterns() -> Vec<String> {
    vec![AUTO_INCREMENT_PATTERN.to_string()]
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            volatile_patterns: default_volatile_patterns(),
            lenient_null_fallback: false,
        }
    }
}

/// Connection pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Probe a cached connection before handing it out
    #[serde(default = "default_validate_on_borrow")]
    pub validate_on_borrow: bool,

    /// Statement used when the driver has no native liveness probe
    #[serde(default = "default_validation_query")]
    pub validation_query: String,
}

fn default_validate_on_borrow() -> bool {
    true
}

fn default_validation_query() -> String {
    "SELECT 1".to_string()
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            validate_on_borrow: default_validate_on_borrow(),
            validation_query: default_validation_query(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Query engine settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Comparison settings
    #[serde(default)]
    pub comparison: ComparisonConfig,

    /// Connection pool settings
    #[serde(default)]
    pub pool: PoolConfig,

    /// Severity thresholds
    #[serde(default)]
    pub severity: SeverityThreshold,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

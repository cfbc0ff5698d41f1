//! Declared column types and the type families used for comparison

use serde::{Deserialize, Serialize};

/// Column type as declared by the database
///
/// Backends map their native type names onto this set. Anything that has
/// no dedicated variant is kept verbatim in [`SqlType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum SqlType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Char,
    VarChar,
    Text,
    Real,
    Double,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
    Json,
    /// Vendor type with no portable equivalent (name as reported)
    Other(String),
    /// No declared type (e.g. an expression column in SQLite)
    Unknown,
}

/// Coarse grouping of [`SqlType`] that drives value comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFamily {
    /// TINYINT, SMALLINT, INTEGER, BIGINT - compared by numeric value
    Integer,
    /// DECIMAL/NUMERIC - compared by string value
    Decimal,
    /// CHAR, VARCHAR, TEXT - compared by string value
    Text,
    /// REAL, DOUBLE - compared by primitive equality
    Float,
    /// DATE, TIME, TIMESTAMP - compared as timestamps
    Temporal,
    Boolean,
    Binary,
    /// Everything else - compared by string representation
    Other,
}

impl SqlType {
    /// The comparison family of this type
    pub fn family(&self) -> TypeFamily {
        match self {
            Self::TinyInt | Self::SmallInt | Self::Integer | Self::BigInt => TypeFamily::Integer,
            Self::Decimal => TypeFamily::Decimal,
            Self::Char | Self::VarChar | Self::Text => TypeFamily::Text,
            Self::Real | Self::Double => TypeFamily::Float,
            Self::Date | Self::Time | Self::Timestamp => TypeFamily::Temporal,
            Self::Boolean => TypeFamily::Boolean,
            Self::Binary => TypeFamily::Binary,
            Self::Json | Self::Other(_) | Self::Unknown => TypeFamily::Other,
        }
    }

    /// Map a declared type name (as found in DDL or driver metadata)
    ///
    /// Handles the common spellings across MySQL, PostgreSQL and SQLite:
    /// - **Integer**: `tinyint`, `smallint`, `int`, `integer`, `mediumint`, `bigint`, serials
    /// - **Decimal**: `decimal(p,s)`, `numeric`, `money`
    /// - **String**: `char`, `varchar`, `text` and its size variants, `enum`, `set`
    /// - **Floating point**: `real`, `float`, `double`, `double precision`
    /// - **Date/Time**: `date`, `time`, `datetime`, `timestamp`
    /// - **Binary**: `blob` variants, `binary`, `varbinary`, `bytea`
    ///
    /// Unrecognised names fall back to SQLite's affinity rules before
    /// ending up as [`SqlType::Other`].
    pub fn from_declared(declared: &str) -> Self {
        let lowered = declared.trim().to_lowercase();
        if lowered.is_empty() {
            return Self::Unknown;
        }

        let base = lowered
            .split('(')
            .next()
            .unwrap_or(&lowered)
            .trim()
            .trim_end_matches(" unsigned")
            .trim();

        match base {
            "tinyint" | "int1" => Self::TinyInt,
            "smallint" | "int2" | "smallserial" | "serial2" => Self::SmallInt,
            "int" | "integer" | "int4" | "mediumint" | "serial" | "serial4" => Self::Integer,
            "bigint" | "int8" | "bigserial" | "serial8" | "oid" => Self::BigInt,

            "decimal" | "numeric" | "money" => Self::Decimal,

            "char" | "character" | "bpchar" | "nchar" => Self::Char,
            "varchar" | "character varying" | "nvarchar" | "varchar2" => Self::VarChar,
            "text" | "tinytext" | "mediumtext" | "longtext" | "clob" | "name" | "citext"
            | "enum" | "set" => Self::Text,

            "real" | "float4" => Self::Real,
            "float" | "double" | "double precision" | "float8" => Self::Double,

            "bool" | "boolean" | "bit" => Self::Boolean,

            "date" => Self::Date,
            "time" | "time without time zone" | "time with time zone" | "timetz" => Self::Time,
            "datetime" | "timestamp" | "timestamp without time zone"
            | "timestamp with time zone" | "timestamptz" => Self::Timestamp,

            "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" | "bytea" => {
                Self::Binary
            }

            "json" | "jsonb" => Self::Json,

            _ => Self::from_affinity(base),
        }
    }

    /// SQLite column affinity rules (section 3.1 of the SQLite datatype docs)
    fn from_affinity(base: &str) -> Self {
        if base.contains("int") {
            Self::BigInt
        } else if base.contains("char") || base.contains("clob") || base.contains("text") {
            Self::Text
        } else if base.contains("blob") {
            Self::Binary
        } else if base.contains("real") || base.contains("floa") || base.contains("doub") {
            Self::Double
        } else {
            Self::Other(base.to_string())
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TinyInt => write!(f, "TINYINT"),
            Self::SmallInt => write!(f, "SMALLINT"),
            Self::Integer => write!(f, "INTEGER"),
            Self::BigInt => write!(f, "BIGINT"),
            Self::Decimal => write!(f, "DECIMAL"),
            Self::Char => write!(f, "CHAR"),
            Self::VarChar => write!(f, "VARCHAR"),
            Self::Text => write!(f, "TEXT"),
            Self::Real => write!(f, "REAL"),
            Self::Double => write!(f, "DOUBLE"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Date => write!(f, "DATE"),
            Self::Time => write!(f, "TIME"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Binary => write!(f, "BINARY"),
            Self::Json => write!(f, "JSON"),
            Self::Other(name) => write!(f, "{}", name.to_uppercase()),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

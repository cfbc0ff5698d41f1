//! Parameter and column values
//!
//! One exhaustive enum covers every semantic kind a query parameter or a
//! result cell can take. Binding and comparison dispatch on the variant, and
//! [`FromSqlValue`] converts a cell into the caller's declared target type.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQL value used for parameters and result cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Text (CHAR, VARCHAR, TEXT)
    Text(String),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 16-bit integer
    Short(i16),
    /// Boolean
    Bool(bool),
    /// Arbitrary precision decimal
    Decimal(Decimal),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// Date without time
    Date(NaiveDate),
    /// Timestamp without time zone
    Timestamp(NaiveDateTime),
    /// Raw bytes; also the opaque fallback for serialized values
    Bytes(Vec<u8>),
}

impl Value {
    /// Serialize any value into an opaque binary parameter
    ///
    /// This is the fallback binding for types with no dedicated variant.
    pub fn serialized<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_vec(value).map(Self::Bytes)
    }

    /// Check if value is NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the semantic kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Text(_) => "text",
            Self::Int(_) => "integer",
            Self::Long(_) => "long",
            Self::Short(_) => "short",
            Self::Bool(_) => "boolean",
            Self::Decimal(_) => "decimal",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Integer value, if this is an integral number
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(i64::from(*n)),
            Self::Long(n) => Some(*n),
            Self::Short(n) => Some(i64::from(*n)),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Floating point value, if this is numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(f64::from(*n)),
            Self::Long(n) => Some(*n as f64),
            Self::Short(n) => Some(f64::from(*n)),
            Self::Float(n) => Some(f64::from(*n)),
            Self::Double(n) => Some(*n),
            Self::Decimal(d) => d.to_f64(),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Timestamp value; dates are widened to midnight
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            Self::Date(d) => Some(d.and_time(NaiveTime::MIN)),
            Self::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    /// String representation, `None` for NULL
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            Self::Long(n) => Some(n.to_string()),
            Self::Short(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Decimal(d) => Some(d.to_string()),
            Self::Float(n) => Some(n.to_string()),
            Self::Double(n) => Some(n.to_string()),
            Self::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            Self::Timestamp(ts) => Some(ts.format(TIMESTAMP_FORMATS[0]).to_string()),
            Self::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

/// Renders values the way they would appear in a SQL literal
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Text(s) => write!(f, "'{}'", s),
            Self::Date(_) | Self::Timestamp(_) => {
                write!(f, "'{}'", self.to_text().unwrap_or_default())
            }
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            other => write!(f, "{}", other.to_text().unwrap_or_default()),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Long(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Build a parameter list from heterogeneous values
///
/// ```rust,ignore
/// let params = params!["ENSG00000139618", 13, true];
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::Value::from($value)),+]
    };
}

/// Generic numeric value for callers that do not care about width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Number {
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
}

impl Number {
    /// Lossy conversion to f64
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(n) => *n as f64,
            Self::Float(n) => *n,
            Self::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Decimal(d) => write!(f, "{}", d),
        }
    }
}

/// A value could not be converted into the requested target type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot convert {found} value {value} to {target}")]
pub struct ConversionError {
    /// Name of the requested target type
    pub target: &'static str,
    /// Kind of the value that was found
    pub found: &'static str,
    /// Rendering of the offending value
    pub value: String,
}

impl ConversionError {
    /// Create an error for `value` failing to convert into `target`
    pub fn new(target: &'static str, value: &Value) -> Self {
        Self {
            target,
            found: value.kind(),
            value: value.to_string(),
        }
    }
}

/// Target types a single column can be converted into
///
/// Implemented for the supported scalar targets: text, integer, long, short,
/// float, double, decimal, boolean, generic number, timestamp and date,
/// plus [`Value`] itself and `Option<T>` for nullable columns. NULL only
/// converts into `Option<T>` or `Value`.
pub trait FromSqlValue: Sized {
    /// Name used in conversion errors
    const TYPE_NAME: &'static str;

    /// Convert a cell value
    fn from_sql_value(value: &Value) -> Result<Self, ConversionError>;
}

impl FromSqlValue for Value {
    const TYPE_NAME: &'static str = "Value";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

impl FromSqlValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Err(ConversionError::new(Self::TYPE_NAME, value)),
            Value::Bytes(b) => String::from_utf8(b.clone())
                .map_err(|_| ConversionError::new(Self::TYPE_NAME, value)),
            other => other
                .to_text()
                .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

impl FromSqlValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        value
            .as_i64()
            .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value))
    }
}

impl FromSqlValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value))
    }
}

impl FromSqlValue for i16 {
    const TYPE_NAME: &'static str = "i16";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        value
            .as_i64()
            .and_then(|n| i16::try_from(n).ok())
            .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value))
    }
}

impl FromSqlValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        value
            .as_f64()
            .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value))
    }
}

impl FromSqlValue for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(n) => Ok(*n),
            other => other
                .as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

impl FromSqlValue for Decimal {
    const TYPE_NAME: &'static str = "Decimal";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        let converted = match value {
            Value::Decimal(d) => Some(*d),
            Value::Int(n) => Some(Decimal::from(*n)),
            Value::Long(n) => Some(Decimal::from(*n)),
            Value::Short(n) => Some(Decimal::from(*n)),
            Value::Float(n) => Decimal::try_from(*n).ok(),
            Value::Double(n) => Decimal::try_from(*n).ok(),
            Value::Text(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        };
        converted.ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value))
    }
}

impl FromSqlValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        let converted = match value {
            Value::Bool(b) => Some(*b),
            Value::Int(_) | Value::Long(_) | Value::Short(_) => value.as_i64().map(|n| n != 0),
            Value::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        converted.ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value))
    }
}

impl FromSqlValue for Number {
    const TYPE_NAME: &'static str = "Number";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(_) | Value::Long(_) | Value::Short(_) => value
                .as_i64()
                .map(Number::Integer)
                .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value)),
            Value::Float(n) => Ok(Number::Float(f64::from(*n))),
            Value::Double(n) => Ok(Number::Float(*n)),
            Value::Decimal(d) => Ok(Number::Decimal(*d)),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Number::Integer)
                    .or_else(|_| Decimal::from_str(s).map(Number::Decimal))
                    .map_err(|_| ConversionError::new(Self::TYPE_NAME, value))
            }
            _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    const TYPE_NAME: &'static str = "NaiveDateTime";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        value
            .as_timestamp()
            .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value))
    }
}

impl FromSqlValue for NaiveDate {
    const TYPE_NAME: &'static str = "NaiveDate";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Date(d) => Ok(*d),
            other => other
                .as_timestamp()
                .map(|ts| ts.date())
                .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn from_sql_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

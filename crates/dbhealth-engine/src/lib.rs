//! dbhealth engine
//!
//! The pieces validation rules are written against:
//! - Row mappers and keyed aggregation
//! - [`SqlTemplate`], typed query execution with uniform errors
//! - [`ResultSetComparator`], cross-database result comparison
//! - [`ConnectionPool`], one connection per database URL

pub mod comparison;
pub mod error;
pub mod mapper;
pub mod params;
pub mod pool;
pub mod template;

pub use comparison::{ComparisonOutcome, ResultSetComparator};
pub use error::{Cardinality, MapError, PoolError, QueryError, QueryErrorKind};
pub use mapper::{DefaultMapper, KeyedMapper, MapRowMapper, RowMapper};
pub use params::render_params;
pub use pool::ConnectionPool;
pub use template::SqlTemplate;

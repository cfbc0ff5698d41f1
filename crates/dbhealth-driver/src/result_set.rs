//! Buffered, rewindable result cursors

use dbhealth_core::{ConversionError, FromSqlValue, SqlType, Value};

/// Name and declared type of one result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column label as reported by the database
    pub name: String,

    /// Declared type
    pub sql_type: SqlType,
}

impl ColumnMeta {
    /// Create column metadata
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// Errors reading a column from a row
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("no column at index {index} (row has {count} columns)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("no column named '{0}'")]
    NoSuchColumn(String),

    #[error("column '{column}': {source}")]
    Conversion {
        column: String,
        #[source]
        source: ConversionError,
    },
}

type CloseHook = Box<dyn FnOnce() + Send>;

/// A result cursor over rows fetched by one statement
///
/// Rows are held in memory, so the cursor can be rewound with
/// [`ResultSet::before_first`]. The cursor is released exactly once: either
/// by [`ResultSet::close`] or when it is dropped.
pub struct ResultSet {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Value>>,
    /// Number of rows advanced over; current row is `position - 1`
    position: usize,
    on_close: Option<CloseHook>,
}

impl ResultSet {
    /// Create a cursor positioned before the first row
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: 0,
            on_close: None,
        }
    }

    /// Register a callback run when the cursor is released
    pub fn with_close_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    /// Column metadata
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of a column by name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Total number of rows fetched
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Advance to the next row; false once the rows are exhausted
    pub fn next(&mut self) -> bool {
        if self.position < self.rows.len() {
            self.position += 1;
            true
        } else {
            self.position = self.rows.len() + 1;
            false
        }
    }

    /// Advance and return the new current row
    pub fn next_row(&mut self) -> Option<Row<'_>> {
        if self.next() {
            self.current()
        } else {
            None
        }
    }

    /// The row the cursor is positioned on
    pub fn current(&self) -> Option<Row<'_>> {
        if self.position == 0 {
            return None;
        }
        self.rows.get(self.position - 1).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Rewind to before the first row
    pub fn before_first(&mut self) {
        self.position = 0;
    }

    /// Release the cursor
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl Drop for ResultSet {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("columns", &self.columns)
            .field("rows", &self.rows.len())
            .field("position", &self.position)
            .finish()
    }
}

/// View of one row of a [`ResultSet`]
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [ColumnMeta],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Build a row view from parallel column and value slices
    pub fn new(columns: &'a [ColumnMeta], values: &'a [Value]) -> Self {
        Self { columns, values }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column metadata
    pub fn columns(&self) -> &'a [ColumnMeta] {
        self.columns
    }

    /// Raw values
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Raw value at a zero-based index
    pub fn value(&self, index: usize) -> Result<&'a Value, RowError> {
        self.values.get(index).ok_or(RowError::IndexOutOfRange {
            index,
            count: self.values.len(),
        })
    }

    /// Typed value at a zero-based index
    pub fn get<T: FromSqlValue>(&self, index: usize) -> Result<T, RowError> {
        let value = self.value(index)?;
        T::from_sql_value(value).map_err(|source| RowError::Conversion {
            column: self.column_name(index).to_string(),
            source,
        })
    }

    /// Typed value of a named column (case-insensitive)
    pub fn get_by_name<T: FromSqlValue>(&self, name: &str) -> Result<T, RowError> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| RowError::NoSuchColumn(name.to_string()))?;
        self.get(index)
    }

    fn column_name(&self, index: usize) -> &'a str {
        self.columns
            .get(index)
            .map(|c| c.name.as_str())
            .unwrap_or("?")
    }
}

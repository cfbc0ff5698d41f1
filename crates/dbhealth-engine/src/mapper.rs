//! Row mapping
//!
//! A [`RowMapper`] turns one row into one value. A [`MapRowMapper`]
//! additionally derives a key per row and decides what happens when a key
//! is seen again, so a query can be folded into a map.
//!
//! ## Usage
//!
//! ```rust,ignore
//! // Closures are row mappers
//! let genes = template
//!     .query_for_list("SELECT stable_id FROM gene", &|row: &Row<'_>, _| Ok(row.get::<String>(0)?), &[])
//!     .await?;
//!
//! // Transcripts per gene
//! let per_gene = template
//!     .query_for_map(
//!         "SELECT gene_id, stable_id FROM transcript",
//!         &KeyedMapper::grouped(|row| Ok(row.get::<i64>(0)?), |row, _| Ok(row.get::<String>(1)?)),
//!         &[],
//!     )
//!     .await?;
//! ```

use crate::error::MapError;
use dbhealth_core::FromSqlValue;
use dbhealth_driver::Row;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// Converts one row into one value
pub trait RowMapper<T> {
    /// Map the row at zero-based position `index`
    fn map_row(&self, row: &Row<'_>, index: usize) -> Result<T, MapError>;
}

impl<T, F> RowMapper<T> for F
where
    F: Fn(&Row<'_>, usize) -> Result<T, MapError>,
{
    fn map_row(&self, row: &Row<'_>, index: usize) -> Result<T, MapError> {
        self(row, index)
    }
}

/// Folds rows into a keyed map
///
/// For each row [`key`](Self::key) is called first. A new key is mapped
/// with [`map_row`](RowMapper::map_row) and inserted; a key already in the
/// map goes to [`existing`](Self::existing) instead, which updates the
/// current entry in place. No key ever produces two entries.
pub trait MapRowMapper<K, T>: RowMapper<T>
where
    K: Eq + Hash,
{
    /// Fresh, empty container
    fn new_map(&self) -> HashMap<K, T> {
        HashMap::new()
    }

    /// Key of a row; must depend only on the row
    fn key(&self, row: &Row<'_>) -> Result<K, MapError>;

    /// Fold a row whose key is already present
    fn existing(&self, key: &K, current: &mut T, row: &Row<'_>, index: usize) -> Result<(), MapError>;
}

type KeyFn<K> = Arc<dyn Fn(&Row<'_>) -> Result<K, MapError> + Send + Sync>;
type ValueFn<T> = Arc<dyn Fn(&Row<'_>, usize) -> Result<T, MapError> + Send + Sync>;
type MergeFn<K, T> = Arc<dyn Fn(&K, &mut T, &Row<'_>, usize) -> Result<(), MapError> + Send + Sync>;

/// Closure-based [`MapRowMapper`] with an explicit duplicate-key policy
pub struct KeyedMapper<K, T> {
    key: KeyFn<K>,
    value: ValueFn<T>,
    merge: MergeFn<K, T>,
}

impl<K, T> KeyedMapper<K, T>
where
    K: Eq + Hash + 'static,
    T: 'static,
{
    /// Custom policy: `merge(key, existing, row, index)` folds a repeated key
    pub fn merging<KF, VF, MF>(key: KF, value: VF, merge: MF) -> Self
    where
        KF: Fn(&Row<'_>) -> Result<K, MapError> + Send + Sync + 'static,
        VF: Fn(&Row<'_>, usize) -> Result<T, MapError> + Send + Sync + 'static,
        MF: Fn(&K, &mut T, &Row<'_>, usize) -> Result<(), MapError> + Send + Sync + 'static,
    {
        Self {
            key: Arc::new(key),
            value: Arc::new(value),
            merge: Arc::new(merge),
        }
    }

    /// A repeated key fails with [`MapError::DuplicateKey`]
    pub fn unique<KF, VF>(key: KF, value: VF) -> Self
    where
        K: Debug,
        KF: Fn(&Row<'_>) -> Result<K, MapError> + Send + Sync + 'static,
        VF: Fn(&Row<'_>, usize) -> Result<T, MapError> + Send + Sync + 'static,
    {
        Self::merging(key, value, |key: &K, _: &mut T, _: &Row<'_>, _: usize| {
            Err(MapError::DuplicateKey(format!("{:?}", key)))
        })
    }
}

impl<K, V> KeyedMapper<K, Vec<V>>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    /// Rows sharing a key are collected in row order
    pub fn grouped<KF, VF>(key: KF, value: VF) -> Self
    where
        KF: Fn(&Row<'_>) -> Result<K, MapError> + Send + Sync + 'static,
        VF: Fn(&Row<'_>, usize) -> Result<V, MapError> + Send + Sync + 'static,
    {
        let value: ValueFn<V> = Arc::new(value);
        let first = value.clone();
        Self::merging(
            key,
            move |row: &Row<'_>, index: usize| Ok(vec![first(row, index)?]),
            move |_: &K, group: &mut Vec<V>, row: &Row<'_>, index: usize| {
                group.push(value(row, index)?);
                Ok(())
            },
        )
    }
}

impl<K> KeyedMapper<K, u64>
where
    K: Eq + Hash + 'static,
{
    /// Number of rows per key
    pub fn counting<KF>(key: KF) -> Self
    where
        KF: Fn(&Row<'_>) -> Result<K, MapError> + Send + Sync + 'static,
    {
        Self::merging(
            key,
            |_: &Row<'_>, _: usize| Ok(1),
            |_: &K, count: &mut u64, _: &Row<'_>, _: usize| {
                *count += 1;
                Ok(())
            },
        )
    }
}

impl<K, T> RowMapper<T> for KeyedMapper<K, T> {
    fn map_row(&self, row: &Row<'_>, index: usize) -> Result<T, MapError> {
        (self.value)(row, index)
    }
}

impl<K, T> MapRowMapper<K, T> for KeyedMapper<K, T>
where
    K: Eq + Hash,
{
    fn key(&self, row: &Row<'_>) -> Result<K, MapError> {
        (self.key)(row)
    }

    fn existing(&self, key: &K, current: &mut T, row: &Row<'_>, index: usize) -> Result<(), MapError> {
        (self.merge)(key, current, row, index)
    }
}

impl<K, T> Clone for KeyedMapper<K, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            merge: self.merge.clone(),
        }
    }
}

/// Maps a single-column row straight into `T`
///
/// Fails with [`MapError::ColumnCount`] unless the row has exactly one
/// column, and with a conversion error naming `T` when the value does not
/// fit.
pub struct DefaultMapper<T>(PhantomData<fn() -> T>);

impl<T: FromSqlValue> DefaultMapper<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: FromSqlValue> Default for DefaultMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromSqlValue> RowMapper<T> for DefaultMapper<T> {
    fn map_row(&self, row: &Row<'_>, _index: usize) -> Result<T, MapError> {
        if row.len() != 1 {
            return Err(MapError::ColumnCount(row.len()));
        }
        Ok(row.get(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbhealth_core::{params, Number, SqlType, Value};
    use dbhealth_driver::ColumnMeta;

    fn columns() -> Vec<ColumnMeta> {
        vec![
            ColumnMeta::new("gene_id", SqlType::Integer),
            ColumnMeta::new("stable_id", SqlType::VarChar),
        ]
    }

    /// Feed rows through a map mapper the way the template does
    fn fold<K: Eq + Hash, T>(
        mapper: &impl MapRowMapper<K, T>,
        rows: &[Vec<Value>],
    ) -> Result<HashMap<K, T>, MapError> {
        let columns = columns();
        let mut map = mapper.new_map();
        for (index, values) in rows.iter().enumerate() {
            let row = Row::new(&columns, values);
            let key = mapper.key(&row)?;
            match map.get_mut(&key) {
                Some(current) => mapper.existing(&key, current, &row, index)?,
                None => {
                    let value = mapper.map_row(&row, index)?;
                    map.insert(key, value);
                }
            }
        }
        Ok(map)
    }

    fn transcripts() -> Vec<Vec<Value>> {
        vec![
            params![1, "ENST00000380152"],
            params![1, "ENST00000544455"],
            params![2, "ENST00000357654"],
        ]
    }

    #[test]
    fn test_closure_mapper() {
        let columns = columns();
        let values = params![7, "ENSG00000139618"];
        let row = Row::new(&columns, &values);

        let mapper = |row: &Row<'_>, index: usize| -> Result<String, MapError> {
            Ok(format!("{}:{}", index, row.get::<String>(1)?))
        };
        assert_eq!(mapper.map_row(&row, 4).unwrap(), "4:ENSG00000139618");
    }

    #[test]
    fn test_unique_rejects_duplicate_key() {
        let mapper = KeyedMapper::unique(|row| Ok(row.get::<i64>(0)?), |row, _| Ok(row.get::<String>(1)?));
        let err = fold(&mapper, &transcripts()).unwrap_err();
        assert!(matches!(err, MapError::DuplicateKey(ref key) if key == "1"));
    }

    #[test]
    fn test_grouped_keeps_row_order() {
        let mapper = KeyedMapper::grouped(|row| Ok(row.get::<i64>(0)?), |row, _| Ok(row.get::<String>(1)?));
        let map = fold(&mapper, &transcripts()).unwrap();
        assert_eq!(map[&1], vec!["ENST00000380152", "ENST00000544455"]);
        assert_eq!(map[&2], vec!["ENST00000357654"]);
    }

    #[test]
    fn test_counting_tallies_per_key() {
        let mapper = KeyedMapper::counting(|row| Ok(row.get::<i64>(0)?));
        let map = fold(&mapper, &transcripts()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&1], 2);
        assert_eq!(map[&2], 1);
    }

    #[test]
    fn test_merging_uses_custom_policy() {
        // Keep the lexically greatest transcript per gene
        let mapper = KeyedMapper::merging(
            |row| Ok(row.get::<i64>(0)?),
            |row, _| Ok(row.get::<String>(1)?),
            |_, best: &mut String, row, _| {
                let candidate: String = row.get(1)?;
                if candidate > *best {
                    *best = candidate;
                }
                Ok(())
            },
        );
        let map = fold(&mapper, &transcripts()).unwrap();
        assert_eq!(map[&1], "ENST00000544455");
    }

    #[test]
    fn test_default_mapper_requires_one_column() {
        let columns = columns();
        let values = params![7, "ENSG00000139618"];
        let row = Row::new(&columns, &values);
        assert!(matches!(
            DefaultMapper::<i64>::new().map_row(&row, 0),
            Err(MapError::ColumnCount(2))
        ));
    }

    #[test]
    fn test_default_mapper_conversions() {
        let columns = vec![ColumnMeta::new("n", SqlType::Unknown)];

        let values = params![7i64];
        let row = Row::new(&columns, &values);
        assert_eq!(DefaultMapper::<i32>::new().map_row(&row, 0).unwrap(), 7);
        assert_eq!(DefaultMapper::<Number>::new().map_row(&row, 0).unwrap(), Number::Integer(7));

        let values = vec![Value::Null];
        let row = Row::new(&columns, &values);
        assert_eq!(DefaultMapper::<Option<i64>>::new().map_row(&row, 0).unwrap(), None);
        assert!(DefaultMapper::<i64>::new().map_row(&row, 0).is_err());

        let values = params!["not a number"];
        let row = Row::new(&columns, &values);
        let err = DefaultMapper::<i64>::new().map_row(&row, 0).unwrap_err();
        assert!(err.to_string().contains("to i64"));
    }
}

//! Core tabular types.
//!
//! Sources are read into column-major [`Table`]s whose cells are tagged [`Value`] scalars.
//! Raw (pre-schema) rows use the same scalar type; immediately after header slicing every
//! column is fixed to one concrete [`DataType`] so variant handling does not leak into the
//! rest of the pipeline.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};

/// Logical data type of a [`Column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Column with no non-null values observed (type unknown).
    Null,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Calendar date.
    Date,
    /// Date and time (no timezone).
    Datetime,
}

impl DataType {
    /// `Int64` or `Float64`.
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// `Date` or `Datetime`.
    pub fn is_temporal(self) -> bool {
        matches!(self, DataType::Date | DataType::Datetime)
    }
}

/// A single tagged scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time (no timezone).
    Datetime(NaiveDateTime),
}

impl Value {
    /// Whether this value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The [`DataType`] this value belongs to (`Null` for [`Value::Null`]).
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::Bool(_) => DataType::Bool,
            Value::Utf8(_) => DataType::Utf8,
            Value::Date(_) => DataType::Date,
            Value::Datetime(_) => DataType::Datetime,
        }
    }

    /// Canonical textual rendering; nulls render as the empty string.
    ///
    /// Dates render ISO (`%Y-%m-%d`), datetimes as `%Y-%m-%d %H:%M:%S`.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int64(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Utf8(v) => v.clone(),
            Value::Date(v) => v.format("%Y-%m-%d").to_string(),
            Value::Datetime(v) => v.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Hashable identity of a [`Value`], used for grouping and deduplication keys.
///
/// Floats hash by bit pattern, which is fine for key purposes: two rows are duplicates
/// only when their key cells are bit-identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Int64(i64),
    Float64(u64),
    Bool(bool),
    Utf8(String),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
}

impl From<&Value> for ValueKey {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => ValueKey::Null,
            Value::Int64(x) => ValueKey::Int64(*x),
            Value::Float64(x) => ValueKey::Float64(x.to_bits()),
            Value::Bool(x) => ValueKey::Bool(*x),
            Value::Utf8(x) => ValueKey::Utf8(x.clone()),
            Value::Date(x) => ValueKey::Date(*x),
            Value::Datetime(x) => ValueKey::Datetime(*x),
        }
    }
}

/// Ordering between two values of the same (or cross-numeric) type.
///
/// Returns `None` when either side is null or the types are not comparable; callers decide
/// what that means (filters treat it as "no match", sorts treat it as equal-with-nulls-first).
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int64(x), Value::Int64(y)) => Some(x.cmp(y)),
        (Value::Float64(x), Value::Float64(y)) => x.partial_cmp(y),
        (Value::Int64(x), Value::Float64(y)) => (*x as f64).partial_cmp(y),
        (Value::Float64(x), Value::Int64(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Utf8(x), Value::Utf8(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Datetime(x), Value::Datetime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// A named, typed column of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Fixed logical type; every non-null value matches it.
    pub dtype: DataType,
    /// Cell values, one per row.
    pub values: Vec<Value>,
}

impl Column {
    /// Create a column from parts.
    pub fn new(name: impl Into<String>, dtype: DataType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    /// Create an all-null column of the given length.
    pub fn null(name: impl Into<String>, dtype: DataType, len: usize) -> Self {
        Self::new(name, dtype, vec![Value::Null; len])
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Share of null values (0.0 for an empty column).
    pub fn null_ratio(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let nulls = self.values.iter().filter(|v| v.is_null()).count();
        nulls as f64 / self.values.len() as f64
    }
}

/// In-memory column-major tabular frame.
///
/// All columns have the same length. Column names are unique within a table (enforced
/// upstream by [`crate::headers::make_headers_unique`] and the mapping step).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Ordered columns.
    pub columns: Vec<Column>,
}

impl Table {
    /// Create a table from columns.
    ///
    /// # Panics
    ///
    /// Panics if the columns have differing lengths.
    pub fn new(columns: Vec<Column>) -> Self {
        if let Some(first) = columns.first() {
            let len = first.len();
            assert!(
                columns.iter().all(|c| c.len() == len),
                "all table columns must have the same length"
            );
        }
        Self { columns }
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    /// Find a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find a column by name, mutably.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Iterate column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Append a column.
    ///
    /// # Panics
    ///
    /// Panics if the column length does not match the table height (unless the table is
    /// column-less).
    pub fn push_column(&mut self, column: Column) {
        if !self.columns.is_empty() {
            assert!(
                column.len() == self.height(),
                "pushed column length must match table height"
            );
        }
        self.columns.push(column);
    }

    /// One row as owned values, in column order.
    pub fn row(&self, idx: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.values[idx].clone()).collect()
    }

    /// Keep only rows whose mask entry is `true`.
    ///
    /// # Panics
    ///
    /// Panics if `mask.len() != self.height()`.
    pub fn filter_mask(&self, mask: &[bool]) -> Table {
        assert!(mask.len() == self.height(), "mask length must match height");
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = c
                    .values
                    .iter()
                    .zip(mask.iter())
                    .filter(|(_, keep)| **keep)
                    .map(|(v, _)| v.clone())
                    .collect();
                Column::new(c.name.clone(), c.dtype, values)
            })
            .collect();
        Table { columns }
    }

    /// Copy of the rows at `indices`, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = indices.iter().map(|&i| c.values[i].clone()).collect();
                Column::new(c.name.clone(), c.dtype, values)
            })
            .collect();
        Table { columns }
    }

    /// Contiguous row slice `[offset, offset + len)`, clamped to the table height.
    pub fn slice_rows(&self, offset: usize, len: usize) -> Table {
        let height = self.height();
        let start = offset.min(height);
        let end = (offset + len).min(height);
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.dtype, c.values[start..end].to_vec()))
            .collect();
        Table { columns }
    }

    /// Reorder/select columns by name, dropping any name not present.
    pub fn select(&self, names: &[&str]) -> Table {
        let columns = names
            .iter()
            .filter_map(|n| self.column(n).cloned())
            .collect();
        Table { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::new(vec![
            Column::new(
                "id",
                DataType::Int64,
                vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)],
            ),
            Column::new(
                "name",
                DataType::Utf8,
                vec![
                    Value::Utf8("a".to_string()),
                    Value::Null,
                    Value::Utf8("c".to_string()),
                ],
            ),
        ])
    }

    #[test]
    fn filter_mask_keeps_marked_rows() {
        let t = sample_table();
        let out = t.filter_mask(&[true, false, true]);
        assert_eq!(out.height(), 2);
        assert_eq!(out.column("id").unwrap().values, vec![Value::Int64(1), Value::Int64(3)]);
    }

    #[test]
    fn slice_rows_clamps_to_height() {
        let t = sample_table();
        let out = t.slice_rows(2, 10);
        assert_eq!(out.height(), 1);
        assert_eq!(out.column("id").unwrap().values, vec![Value::Int64(3)]);
    }

    #[test]
    fn select_reorders_and_drops_missing() {
        let t = sample_table();
        let out = t.select(&["name", "missing", "id"]);
        assert_eq!(out.column_names().collect::<Vec<_>>(), vec!["name", "id"]);
    }

    #[test]
    fn null_ratio_counts_nulls() {
        let t = sample_table();
        let ratio = t.column("name").unwrap().null_ratio();
        assert!((ratio - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn compare_values_crosses_int_and_float() {
        assert_eq!(
            compare_values(&Value::Int64(2), &Value::Float64(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(compare_values(&Value::Null, &Value::Int64(1)), None);
        assert_eq!(
            compare_values(&Value::Utf8("b".into()), &Value::Utf8("a".into())),
            Some(Ordering::Greater)
        );
    }
}

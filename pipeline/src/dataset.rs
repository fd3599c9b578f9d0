//! An in-memory, column oriented table holding one cycler export or a result derived from one.
//!
//! A [Dataset] is never modified once built: every operation returns a new table, so results
//! held by the caller cannot be disturbed by later pipeline runs.
use h2f_common::{Count, Real};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),
    #[error("Column '{name}' holds {found} values, expected {expected}")]
    ColumnTypeMismatch {
        name: String,
        expected: ColumnKind,
        found: ColumnKind,
    },
    #[error("Column '{name}' has {found} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Column '{0}' appears more than once")]
    DuplicateColumn(String),
    #[error("Column '{0}' holds fractional values and cannot be used to group rows")]
    NotGroupable(String),
}

/// The type of the values held in a [Column].
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum ColumnKind {
    #[strum(to_string = "float")]
    Float,
    #[strum(to_string = "integer")]
    Int,
    #[strum(to_string = "text")]
    Text,
}

/// A single cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Float(Real),
    Int(Count),
    Text(String),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// A homogeneous column of values.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Float(Vec<Real>),
    Int(Vec<Count>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Float(_) => ColumnKind::Float,
            Column::Int(_) => ColumnKind::Int,
            Column::Text(_) => ColumnKind::Text,
        }
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Column::Float(v) => v.get(index).copied().map(Value::Float),
            Column::Int(v) => v.get(index).copied().map(Value::Int),
            Column::Text(v) => v.get(index).cloned().map(Value::Text),
        }
    }

    /// Numeric view of the column, integers are widened. Returns [None] for text.
    pub fn to_reals(&self) -> Option<Vec<Real>> {
        match self {
            Column::Float(v) => Some(v.clone()),
            Column::Int(v) => Some(v.iter().map(|&i| i as Real).collect()),
            Column::Text(_) => None,
        }
    }

    /// Keeps the values whose corresponding mask entry is `true`, preserving order.
    fn select(&self, mask: &[bool]) -> Column {
        fn keep<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter_map(|(value, &keep)| keep.then(|| value.clone()))
                .collect()
        }
        match self {
            Column::Float(v) => Column::Float(keep(v, mask)),
            Column::Int(v) => Column::Int(keep(v, mask)),
            Column::Text(v) => Column::Text(keep(v, mask)),
        }
    }
}

/// Key of a group of rows sharing the same value in a column.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupKey {
    Int(Count),
    Text(String),
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKey::Int(v) => write!(f, "{v}"),
            GroupKey::Text(v) => f.write_str(v),
        }
    }
}

/// An ordered collection of equal length, named columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<(String, Column)>,
    rows: usize,
}

impl Dataset {
    /// Builds a dataset from named columns, which must all have the same length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        columns
            .into_iter()
            .try_fold(Dataset::default(), |dataset, (name, column)| {
                let name = name.into();
                if dataset.has_column(&name) {
                    return Err(DatasetError::DuplicateColumn(name));
                }
                dataset.with_column(name, column)
            })
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns
            .iter()
            .map(|(name, column)| (name.as_str(), column))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, DatasetError> {
        self.columns
            .iter()
            .find_map(|(n, column)| (n == name).then_some(column))
            .ok_or_else(|| DatasetError::ColumnNotFound(name.to_owned()))
    }

    /// Numeric values of the named column, integer columns are widened to [Real].
    pub fn reals(&self, name: &str) -> Result<Vec<Real>, DatasetError> {
        let column = self.column(name)?;
        column
            .to_reals()
            .ok_or_else(|| DatasetError::ColumnTypeMismatch {
                name: name.to_owned(),
                expected: ColumnKind::Float,
                found: column.kind(),
            })
    }

    pub fn integers(&self, name: &str) -> Result<&[Count], DatasetError> {
        match self.column(name)? {
            Column::Int(values) => Ok(values),
            other => Err(DatasetError::ColumnTypeMismatch {
                name: name.to_owned(),
                expected: ColumnKind::Int,
                found: other.kind(),
            }),
        }
    }

    pub fn texts(&self, name: &str) -> Result<&[String], DatasetError> {
        match self.column(name)? {
            Column::Text(values) => Ok(values),
            other => Err(DatasetError::ColumnTypeMismatch {
                name: name.to_owned(),
                expected: ColumnKind::Text,
                found: other.kind(),
            }),
        }
    }

    /// Returns the cells of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<Value>> {
        self.columns
            .iter()
            .map(|(_, column)| column.get(index))
            .collect()
    }

    /// Appends a column, or replaces the column of the same name in place.
    ///
    /// The first column added to an empty dataset fixes the row count.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<Self, DatasetError> {
        let name = name.into();
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(DatasetError::LengthMismatch {
                name,
                expected: self.rows,
                found: column.len(),
            });
        }
        self.rows = column.len();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = column,
            None => self.columns.push((name, column)),
        }
        Ok(self)
    }

    /// Builds a new dataset containing the rows whose mask entry is `true`, in their original order.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Dataset, DatasetError> {
        if mask.len() != self.rows {
            return Err(DatasetError::LengthMismatch {
                name: "row mask".to_owned(),
                expected: self.rows,
                found: mask.len(),
            });
        }
        Ok(Dataset {
            columns: self
                .columns
                .iter()
                .map(|(name, column)| (name.clone(), column.select(mask)))
                .collect(),
            rows: mask.iter().filter(|&&keep| keep).count(),
        })
    }

    /// Keys of the named column for each row, or [None] for rows which belong to no group.
    ///
    /// A float column can be grouped if every value is a whole number or `NaN`. Rows holding `NaN`
    /// are left out of every group.
    fn group_keys(&self, name: &str) -> Result<Vec<Option<GroupKey>>, DatasetError> {
        match self.column(name)? {
            Column::Int(values) => Ok(values.iter().map(|&v| Some(GroupKey::Int(v))).collect()),
            Column::Text(values) => Ok(values
                .iter()
                .map(|v| Some(GroupKey::Text(v.clone())))
                .collect()),
            Column::Float(values) => values
                .iter()
                .map(|&value| {
                    if value.is_nan() {
                        Ok(None)
                    } else if value.is_finite() && value.fract() == 0.0 {
                        Ok(Some(GroupKey::Int(value as Count)))
                    } else {
                        Err(DatasetError::NotGroupable(name.to_owned()))
                    }
                })
                .collect(),
        }
    }

    /// Splits the dataset into one dataset per distinct value of the named column.
    ///
    /// Groups are returned sorted by key, and rows keep their original order within each group.
    pub fn group_by(&self, name: &str) -> Result<Vec<(GroupKey, Dataset)>, DatasetError> {
        let keys = self.group_keys(name)?;
        let mut members = BTreeMap::<&GroupKey, Vec<bool>>::new();
        for (index, key) in keys.iter().enumerate() {
            let Some(key) = key else {
                continue;
            };
            let mask = members
                .entry(key)
                .or_insert_with(|| vec![false; self.rows]);
            if let Some(flag) = mask.get_mut(index) {
                *flag = true;
            }
        }
        members
            .into_iter()
            .map(|(key, mask)| Ok((key.clone(), self.filter_rows(&mask)?)))
            .collect()
    }

    /// Distinct values of the named column, sorted. Rows left out of grouping are ignored.
    pub fn unique_keys(&self, name: &str) -> Result<Vec<GroupKey>, DatasetError> {
        let mut keys = self
            .group_keys(name)?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

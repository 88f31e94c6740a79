//! In-memory tabular data read by the engine and by statistic functions.
//!
//! A [`Dataset`] is an immutable table of named columns. The engine only
//! needs the row count (see [`RowSource`]); statistic functions read cells
//! through a [`DatasetView`], which is the dataset seen through a resample's
//! index multiset.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{BootstrapError, Stage, StatisticError};

/// Anything with a fixed number of rows that can be resampled by index.
pub trait RowSource {
    /// Number of rows, N.
    fn n_rows(&self) -> usize;
}

impl<T> RowSource for [T] {
    fn n_rows(&self) -> usize {
        self.len()
    }
}

impl<T> RowSource for Vec<T> {
    fn n_rows(&self) -> usize {
        self.len()
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A number.
    Numeric(f64),
    /// A category label.
    Categorical(String),
    /// No value recorded.
    Missing,
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Numeric(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Categorical(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

/// Immutable table of rows with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    lookup: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset from column names and row-major cells.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if a column name repeats or a row has the wrong width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, BootstrapError> {
        let mut lookup = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if lookup.insert(name.clone(), i).is_some() {
                return Err(BootstrapError::invalid(
                    Stage::Dataset,
                    format!("duplicate column '{}'", name),
                ));
            }
        }

        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns.len())
        {
            return Err(BootstrapError::invalid(
                Stage::Dataset,
                format!(
                    "row {} has {} values, expected {}",
                    row,
                    cells.len(),
                    columns.len()
                ),
            ));
        }

        Ok(Self {
            columns,
            lookup,
            rows,
        })
    }

    /// Build an all-numeric dataset from named columns of equal length.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the columns differ in length or a name repeats.
    pub fn from_numeric_columns(columns: &[(&str, Vec<f64>)]) -> Result<Self, BootstrapError> {
        let n = columns.first().map_or(0, |(_, values)| values.len());
        if let Some((name, values)) = columns.iter().find(|(_, values)| values.len() != n) {
            return Err(BootstrapError::invalid(
                Stage::Dataset,
                format!("column '{}' has {} rows, expected {}", name, values.len(), n),
            ));
        }

        let names = columns.iter().map(|(name, _)| name.to_string()).collect();
        let rows = (0..n)
            .map(|row| {
                columns
                    .iter()
                    .map(|(_, values)| Value::Numeric(values[row]))
                    .collect()
            })
            .collect();

        Self::new(names, rows)
    }

    /// Column names in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Result<usize, StatisticError> {
        self.lookup
            .get(name)
            .copied()
            .ok_or_else(|| StatisticError::MissingColumn(name.to_string()))
    }

    /// The cell at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn value(&self, row: usize, col: usize) -> &Value {
        &self.rows[row][col]
    }

    /// Numeric cell, with missing and categorical cells reported as errors.
    pub fn numeric(&self, row: usize, col: usize) -> Result<f64, StatisticError> {
        match self.value(row, col) {
            Value::Numeric(x) => Ok(*x),
            Value::Missing => Err(StatisticError::Missing {
                column: self.columns[col].clone(),
                row,
            }),
            Value::Categorical(_) => Err(StatisticError::NotNumeric {
                column: self.columns[col].clone(),
                row,
            }),
        }
    }

    /// View the dataset through an index multiset.
    pub fn view<'a>(&'a self, indices: &'a [usize]) -> DatasetView<'a> {
        DatasetView {
            data: self,
            indices,
        }
    }
}

impl RowSource for Dataset {
    fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

/// A dataset read through a resample's indices.
///
/// Row `i` of the view is row `indices[i]` of the dataset; a row drawn
/// twice appears twice.
#[derive(Debug, Clone, Copy)]
pub struct DatasetView<'a> {
    data: &'a Dataset,
    indices: &'a [usize],
}

impl<'a> DatasetView<'a> {
    /// Number of rows in the view.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the view has no rows.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The underlying dataset.
    pub fn dataset(&self) -> &'a Dataset {
        self.data
    }

    /// Dataset row index behind view row `i`.
    pub fn source_row(&self, i: usize) -> usize {
        self.indices[i]
    }

    /// A numeric column, in view order.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, StatisticError> {
        let col = self.data.column_index(name)?;
        self.indices
            .iter()
            .map(|&row| self.data.numeric(row, col))
            .collect()
    }

    /// A numeric column with NaN and infinite cells reported as errors.
    pub fn finite_column(&self, name: &str) -> Result<Vec<f64>, StatisticError> {
        let col = self.data.column_index(name)?;
        self.indices
            .iter()
            .map(|&row| {
                let value = self.data.numeric(row, col)?;
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(StatisticError::NotFinite {
                        column: name.to_string(),
                        row,
                        value,
                    })
                }
            })
            .collect()
    }

    /// A column rendered as stratum keys, in view order.
    ///
    /// Numbers are keyed by their display form, so `1.0` becomes `"1"`.
    pub fn key_column(&self, name: &str) -> Result<Vec<String>, StatisticError> {
        let col = self.data.column_index(name)?;
        self.indices
            .iter()
            .map(|&row| match self.data.value(row, col) {
                // -0.0 and 0.0 are one stratum
                Value::Numeric(x) if *x == 0.0 => Ok("0".to_string()),
                Value::Numeric(x) => Ok(format!("{}", x)),
                Value::Categorical(label) => Ok(label.clone()),
                Value::Missing => Err(StatisticError::Missing {
                    column: name.to_string(),
                    row,
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Dataset {
        Dataset::new(
            vec!["y".into(), "a".into(), "l".into()],
            vec![
                vec![Value::Numeric(1.0), Value::Numeric(0.0), "low".into()],
                vec![Value::Numeric(2.0), Value::Numeric(1.0), "high".into()],
                vec![Value::Missing, Value::Numeric(1.0), "low".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = Dataset::new(vec!["x".into()], vec![vec![], vec![Value::Numeric(1.0)]]).unwrap_err();
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let err = Dataset::new(vec!["x".into(), "x".into()], vec![]).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Dataset));
        assert_eq!(
            err.to_string(),
            "invalid input during dataset construction: duplicate column 'x'"
        );
    }

    #[test]
    fn test_signed_zero_is_one_stratum() {
        let data = Dataset::from_numeric_columns(&[("l", vec![-0.0, 0.0, 1.0])]).unwrap();
        let idx = [0, 1, 2];
        assert_eq!(data.view(&idx).key_column("l").unwrap(), vec!["0", "0", "1"]);
    }

    #[test]
    fn test_finite_column_rejects_nan_and_infinity() {
        let data =
            Dataset::from_numeric_columns(&[("x", vec![0.5, f64::NAN, f64::INFINITY])]).unwrap();
        let idx = [0];
        assert_eq!(data.view(&idx).finite_column("x").unwrap(), vec![0.5]);

        let idx = [0, 1];
        let err = data.view(&idx).finite_column("x").unwrap_err();
        assert!(matches!(err, StatisticError::NotFinite { ref column, row: 1, .. } if column == "x"));

        let idx = [2];
        let err = data.view(&idx).finite_column("x").unwrap_err();
        assert!(matches!(err, StatisticError::NotFinite { row: 2, value, .. } if value == f64::INFINITY));
    }

    #[test]
    fn test_view_repeats_rows() {
        let data = small();
        let idx = [1, 1, 0];
        let view = data.view(&idx);
        assert_eq!(view.len(), 3);
        assert_eq!(view.numeric_column("a").unwrap(), vec![1.0, 1.0, 0.0]);
        assert_eq!(view.key_column("l").unwrap(), vec!["high", "high", "low"]);
    }

    #[test]
    fn test_missing_and_categorical_cells_are_errors() {
        let data = small();
        let idx = [2];
        let err = data.view(&idx).numeric_column("y").unwrap_err();
        assert_eq!(
            err,
            StatisticError::Missing {
                column: "y".into(),
                row: 2
            }
        );

        let idx = [0];
        let err = data.view(&idx).numeric_column("l").unwrap_err();
        assert!(matches!(err, StatisticError::NotNumeric { .. }));
        assert!(matches!(
            data.view(&idx).numeric_column("nope"),
            Err(StatisticError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_numeric_columns_constructor() {
        let data =
            Dataset::from_numeric_columns(&[("x", vec![1.0, 2.0]), ("y", vec![3.0, 4.0])]).unwrap();
        assert_eq!(data.n_rows(), 2);
        assert_eq!(data.numeric(1, 1).unwrap(), 4.0);
        assert!(Dataset::from_numeric_columns(&[("x", vec![1.0]), ("y", vec![])]).is_err());
    }
}

//! Read-only training and query data
//!
//! A [`Data`] value is an `n_rows x n_cols` numeric matrix with a designated
//! outcome column and optional secondary columns (treatment, instrument).
//! Dense and sparse backings are interchangeable behind the same read
//! interface. `NaN` is the missingness sentinel; the splitter routes missing
//! values with its `send_missing_left` flag.

mod sparse;

pub use sparse::SparseColumns;

use crate::error::{GrfError, Result};
use ndarray::Array2;

/// Matrix storage for [`Data`].
#[derive(Debug, Clone)]
pub enum Backing {
    Dense(Array2<f64>),
    Sparse(SparseColumns),
}

/// Read-only access to features and outcomes.
#[derive(Debug, Clone)]
pub struct Data {
    backing: Backing,
    outcome_index: usize,
    treatment_index: Option<usize>,
    instrument_index: Option<usize>,
}

impl Data {
    /// Wrap a dense row-major matrix.
    pub fn dense(matrix: Array2<f64>, outcome_index: usize) -> Result<Self> {
        Self::new(Backing::Dense(matrix), outcome_index)
    }

    /// Build dense data from a row-major buffer, the layout binding layers
    /// marshal matrices in.
    pub fn from_row_major(
        values: Vec<f64>,
        num_rows: usize,
        num_cols: usize,
        outcome_index: usize,
    ) -> Result<Self> {
        let matrix = Array2::from_shape_vec((num_rows, num_cols), values).map_err(|e| {
            GrfError::DataProcessing(format!("row-major buffer has wrong length: {}", e))
        })?;
        Self::dense(matrix, outcome_index)
    }

    /// Wrap a CSC sparse matrix.
    pub fn sparse(columns: SparseColumns, outcome_index: usize) -> Result<Self> {
        Self::new(Backing::Sparse(columns), outcome_index)
    }

    fn new(backing: Backing, outcome_index: usize) -> Result<Self> {
        let data = Self {
            backing,
            outcome_index,
            treatment_index: None,
            instrument_index: None,
        };
        if data.num_rows() == 0 || data.num_cols() == 0 {
            return Err(GrfError::DataProcessing(
                "training data must have at least one row and one column".to_string(),
            ));
        }
        if outcome_index >= data.num_cols() {
            return Err(GrfError::Configuration(format!(
                "outcome index {} out of range for {} columns",
                outcome_index,
                data.num_cols()
            )));
        }
        Ok(data)
    }

    /// Designate a treatment column for downstream forest flavors.
    pub fn with_treatment(mut self, index: usize) -> Result<Self> {
        self.check_column(index)?;
        self.treatment_index = Some(index);
        Ok(self)
    }

    /// Designate an instrument column for downstream forest flavors.
    pub fn with_instrument(mut self, index: usize) -> Result<Self> {
        self.check_column(index)?;
        self.instrument_index = Some(index);
        Ok(self)
    }

    fn check_column(&self, index: usize) -> Result<()> {
        if index >= self.num_cols() {
            return Err(GrfError::Configuration(format!(
                "column index {} out of range for {} columns",
                index,
                self.num_cols()
            )));
        }
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        match &self.backing {
            Backing::Dense(matrix) => matrix[[row, col]],
            Backing::Sparse(columns) => columns.get(row, col),
        }
    }

    pub fn outcome(&self, row: usize) -> f64 {
        self.get(row, self.outcome_index)
    }

    pub fn outcome_index(&self) -> usize {
        self.outcome_index
    }

    pub fn num_rows(&self) -> usize {
        match &self.backing {
            Backing::Dense(matrix) => matrix.nrows(),
            Backing::Sparse(columns) => columns.num_rows(),
        }
    }

    pub fn num_cols(&self) -> usize {
        match &self.backing {
            Backing::Dense(matrix) => matrix.ncols(),
            Backing::Sparse(columns) => columns.num_cols(),
        }
    }

    /// Columns that may never be drawn as split candidates: the outcome and
    /// any designated secondary columns.
    pub fn disallowed_split_columns(&self) -> Vec<usize> {
        let mut columns = vec![self.outcome_index];
        columns.extend(self.treatment_index);
        columns.extend(self.instrument_index);
        columns.sort_unstable();
        columns.dedup();
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dense_read_interface() {
        let matrix = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let data = Data::dense(matrix, 1).unwrap();
        assert_eq!(data.num_rows(), 3);
        assert_eq!(data.num_cols(), 2);
        assert_eq!(data.get(2, 0), 3.0);
        assert_eq!(data.outcome(1), 20.0);
    }

    #[test]
    fn test_outcome_index_out_of_range() {
        let matrix = array![[1.0, 2.0]];
        assert!(Data::dense(matrix, 2).is_err());
    }

    #[test]
    fn test_disallowed_split_columns() {
        let matrix = array![[1.0, 2.0, 3.0, 4.0]];
        let data = Data::dense(matrix, 3).unwrap().with_treatment(1).unwrap();
        assert_eq!(data.disallowed_split_columns(), vec![1, 3]);
    }
}

use std::io::Read;
use std::path::Path;

use ndarray::Array2;

use crate::error::DataError;

/// A read-only numeric grid with named columns
///
/// One row per event or observation. The table is expected to be sorted by
/// subject id, then by time within subject; this is a caller responsibility
/// and is not enforced here (see [SubjectIndex](crate::data::SubjectIndex)).
///
/// # Examples
///
/// ```
/// use dosetab::table::Table;
///
/// let table = Table::from_rows(
///     vec!["ID".to_string(), "time".to_string()],
///     &[vec![1.0, 0.0], vec![1.0, 1.0]],
/// ).unwrap();
///
/// assert_eq!(table.nrows(), 2);
/// assert_eq!(table.get(1, 1), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    values: Array2<f64>,
    names: Vec<String>,
}

impl Table {
    /// Create a table from a value grid and its column names
    ///
    /// # Errors
    ///
    /// Returns [DataError::ShapeMismatch] if the number of names does not
    /// match the number of columns.
    pub fn new(values: Array2<f64>, names: Vec<String>) -> Result<Self, DataError> {
        if names.len() != values.ncols() {
            return Err(DataError::ShapeMismatch {
                names: names.len(),
                ncols: values.ncols(),
            });
        }
        Ok(Table { values, names })
    }

    /// Create a table from row slices
    ///
    /// Convenient for tests and programmatic construction. Every row must
    /// have one value per column name.
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, DataError> {
        let ncols = names.len();
        let mut flat = Vec::with_capacity(rows.len() * ncols);
        for row in rows {
            if row.len() != ncols {
                return Err(DataError::ShapeMismatch {
                    names: ncols,
                    ncols: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        let values = Array2::from_shape_vec((rows.len(), ncols), flat)
            .map_err(|_| DataError::ShapeMismatch {
                names: ncols,
                ncols,
            })?;
        Ok(Table { values, names })
    }

    /// Read a table from a CSV file
    ///
    /// Headers are taken verbatim (both the lower-case and upper-case naming
    /// conventions must survive), lines starting with `#` are skipped, and
    /// every body cell is parsed as `f64`. Blank cells parse as `0.0`; the
    /// grid has no missing-value representation.
    ///
    /// # Errors
    ///
    /// Returns [DataError::Csv] on I/O or format errors and
    /// [DataError::NonNumericCell] when a cell cannot be parsed.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let file = std::fs::File::open(path).map_err(|e| DataError::Csv(e.to_string()))?;
        Self::from_csv_reader(file)
    }

    /// Read a table from any CSV reader
    ///
    /// See [Table::from_csv_path] for format details.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .has_headers(true)
            .from_reader(reader);

        let names: Vec<String> = reader
            .headers()
            .map_err(|e| DataError::Csv(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let ncols = names.len();
        let mut flat: Vec<f64> = Vec::new();
        let mut nrows = 0;
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| DataError::Csv(e.to_string()))?;
            for (column, cell) in record.iter().enumerate() {
                let cell = cell.trim();
                if cell.is_empty() {
                    flat.push(0.0);
                    continue;
                }
                let value = cell
                    .parse::<f64>()
                    .map_err(|_| DataError::NonNumericCell {
                        row,
                        column: names
                            .get(column)
                            .cloned()
                            .unwrap_or_else(|| column.to_string()),
                        value: cell.to_string(),
                    })?;
                flat.push(value);
            }
            nrows += 1;
        }

        let values = Array2::from_shape_vec((nrows, ncols), flat)
            .map_err(|e| DataError::Csv(e.to_string()))?;
        Ok(Table { values, names })
    }

    /// Get the value at a row and column
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[[row, col]]
    }

    /// Number of rows in the table
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns in the table
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// The resolved column names, in column order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Find the index of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

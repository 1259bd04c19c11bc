use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

use crate::error::DataError;
use crate::table::Table;

/// A contiguous block of rows belonging to one subject
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectRun {
    id: f64,
    start: usize,
    end: usize,
}

impl SubjectRun {
    /// The subject id shared by every row in the run
    pub fn id(&self) -> f64 {
        self.id
    }

    /// First row of the run
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last row of the run (inclusive)
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of rows in the run
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// A run always holds at least one row
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The run's row indices
    pub fn rows(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Per-subject partition of a table's rows
///
/// The table must already be grouped by subject: a new run starts whenever
/// the id value differs from the immediately preceding row's. The index does
/// not sort and does not detect violations of the grouping precondition by
/// default; [SubjectIndex::validate_contiguous] offers that check explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectIndex {
    runs: Vec<SubjectRun>,
}

impl SubjectIndex {
    /// Partition a table's rows into contiguous per-subject runs
    ///
    /// # Errors
    ///
    /// [DataError::EmptyTable] when the table has no rows.
    pub fn build(table: &Table, id_column: usize) -> Result<Self, DataError> {
        if table.nrows() == 0 {
            return Err(DataError::EmptyTable);
        }

        let mut runs = Vec::new();
        let mut start = 0;
        let mut current = table.get(0, id_column);

        for row in 1..table.nrows() {
            let id = table.get(row, id_column);
            if id != current {
                runs.push(SubjectRun {
                    id: current,
                    start,
                    end: row - 1,
                });
                start = row;
                current = id;
            }
        }
        runs.push(SubjectRun {
            id: current,
            start,
            end: table.nrows() - 1,
        });

        Ok(SubjectIndex { runs })
    }

    /// The per-subject runs, in table order
    pub fn runs(&self) -> &[SubjectRun] {
        &self.runs
    }

    /// Number of subjects
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the index holds no subjects
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// One id per run, in table order
    pub fn ids(&self) -> Vec<f64> {
        self.runs.iter().map(|run| run.id).collect()
    }

    /// Iterate over the runs
    pub fn iter(&'_ self) -> std::slice::Iter<'_, SubjectRun> {
        self.runs.iter()
    }

    /// Check that no subject id recurs after its run has ended
    ///
    /// The grouping precondition is not enforced by [SubjectIndex::build];
    /// a violated precondition silently yields wrong per-subject boundaries.
    /// This opt-in scan fails fast instead.
    ///
    /// # Errors
    ///
    /// [DataError::SubjectNotContiguous] naming the id and the row where it
    /// reappears.
    pub fn validate_contiguous(&self) -> Result<(), DataError> {
        let mut seen: HashSet<u64> = HashSet::with_capacity(self.runs.len());
        for run in &self.runs {
            if !seen.insert(run.id.to_bits()) {
                return Err(DataError::SubjectNotContiguous {
                    id: run.id,
                    row: run.start,
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SubjectIndex {
    type Item = &'a SubjectRun;
    type IntoIter = std::slice::Iter<'a, SubjectRun>;
    /// Iterate over the per-subject runs
    fn into_iter(self) -> Self::IntoIter {
        self.runs.iter()
    }
}

/// Point lookup from subject id to row index
///
/// Intended for tables expected to hold exactly one row per subject (the
/// covariate/initialization table). Built over all rows with a plain scan;
/// a duplicated id silently keeps the last row seen. Ids are matched by
/// exact bit pattern, consistent with the equality used by [SubjectIndex].
#[derive(Debug, Clone, Default)]
pub struct RowLookup {
    map: HashMap<u64, usize>,
}

impl RowLookup {
    /// Map every row's subject id to its row index, last occurrence wins
    pub fn build(table: &Table, id_column: usize) -> Self {
        let mut map = HashMap::with_capacity(table.nrows());
        for row in 0..table.nrows() {
            map.insert(table.get(row, id_column).to_bits(), row);
        }
        RowLookup { map }
    }

    /// The row holding this subject id, if any
    pub fn row(&self, id: f64) -> Option<usize> {
        self.map.get(&id.to_bits()).copied()
    }

    /// Number of distinct subject ids
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the lookup is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

use std::sync::OnceLock;

use crate::data::builder::{RecordBuilder, RecordStream};
use crate::data::columns::ColumnSet;
use crate::data::index::{RowLookup, SubjectIndex};
use crate::data::projector::{ParameterMap, SimulationState};
use crate::error::DataError;
use crate::table::Table;

/// A dosing dataset bound to a model's declared names
///
/// Owns one [Table] together with what construction resolves from it: the
/// subject-id column and the name-matched [ParameterMap]. The dosing roles
/// ([ColumnSet]) and the [SubjectIndex] are resolved on demand, once; an
/// initialization table is mostly used through its [RowLookup] and never
/// needs role resolution (it has no time column to resolve).
///
/// # Examples
///
/// ```
/// use dosetab::prelude::*;
///
/// let table = Table::from_rows(
///     vec![
///         "ID".to_string(), "time".to_string(), "amt".to_string(),
///         "evid".to_string(), "cmt".to_string(),
///     ],
///     &[
///         vec![1.0, 0.0, 100.0, 1.0, 1.0],
///         vec![1.0, 2.0, 0.0, 0.0, 1.0],
///     ],
/// )?;
///
/// let dataset = Dataset::new(table, &[], &[])?;
/// let index = dataset.subject_index()?;
/// let stream = dataset.records(&index, 1, false)?;
///
/// assert_eq!(stream.doses(), 1);
/// assert_eq!(stream.observations(), 1);
/// # Ok::<(), dosetab::DataError>(())
/// ```
#[derive(Debug)]
pub struct Dataset {
    table: Table,
    id_column: usize,
    map: ParameterMap,
    columns: OnceLock<ColumnSet>,
}

impl Dataset {
    /// Bind a table to the model's declared parameter and compartment names
    ///
    /// Locates the `"ID"` column and builds the name-matched parameter map;
    /// both are immutable afterwards. The dosing roles are not resolved
    /// here (see [Dataset::columns]), so covariate and initialization
    /// tables without event columns are valid datasets.
    ///
    /// # Errors
    ///
    /// [DataError::MissingColumn] when the `"ID"` column is absent.
    pub fn new(
        table: Table,
        parameter_names: &[String],
        compartment_names: &[String],
    ) -> Result<Self, DataError> {
        let id_column = table
            .column_index("ID")
            .ok_or_else(|| DataError::MissingColumn {
                name: "ID".to_string(),
            })?;
        let map = ParameterMap::resolve(&table, parameter_names, compartment_names);
        Ok(Dataset {
            table,
            id_column,
            map,
            columns: OnceLock::new(),
        })
    }

    /// The underlying table
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Index of the subject-id column
    pub fn id_column(&self) -> usize {
        self.id_column
    }

    /// The resolved column roles, resolving them on first use
    ///
    /// Resolution happens at most once per dataset; the result is immutable
    /// afterwards.
    ///
    /// # Errors
    ///
    /// [DataError::MissingColumn] when the time or compartment column cannot
    /// be located.
    pub fn columns(&self) -> Result<&ColumnSet, DataError> {
        if let Some(columns) = self.columns.get() {
            return Ok(columns);
        }
        let resolved = ColumnSet::resolve(&self.table)?;
        Ok(self.columns.get_or_init(|| resolved))
    }

    /// The resolved parameter and initial-condition maps
    pub fn parameter_map(&self) -> &ParameterMap {
        &self.map
    }

    /// Partition the table into contiguous per-subject runs
    ///
    /// # Errors
    ///
    /// [DataError::EmptyTable] when the table has no rows.
    pub fn subject_index(&self) -> Result<SubjectIndex, DataError> {
        SubjectIndex::build(&self.table, self.id_column)
    }

    /// Build the id-to-row lookup for a one-row-per-subject table
    pub fn row_lookup(&self) -> RowLookup {
        RowLookup::build(&self.table, self.id_column)
    }

    /// The subject id of every row, in row order
    pub fn subject_ids(&self) -> Vec<f64> {
        (0..self.table.nrows())
            .map(|row| self.table.get(row, self.id_column))
            .collect()
    }

    /// Build every subject's validated record sequence
    ///
    /// Resolves the column roles if they have not been resolved yet. See
    /// [RecordBuilder::build] for the validation contract.
    pub fn records(
        &self,
        index: &SubjectIndex,
        equations: usize,
        observations_only: bool,
    ) -> Result<RecordStream, DataError> {
        let columns = self.columns()?;
        RecordBuilder::new(&self.table, columns, equations, observations_only).build(index)
    }

    /// Copy a row's mapped parameter columns into the engine
    pub fn apply_parameters(&self, row: usize, engine: &mut impl SimulationState) {
        self.map.apply_parameters(&self.table, row, engine);
    }

    /// Copy a row's mapped initial-condition columns into the engine
    ///
    /// Intended only for per-subject initialization tables; see
    /// [ParameterMap::apply_initial_conditions].
    pub fn apply_initial_conditions(&self, row: usize, engine: &mut impl SimulationState) {
        self.map.apply_initial_conditions(&self.table, row, engine);
    }

    /// Re-push mapped parameters from a slot-indexed vector
    pub fn reapply_parameters(&self, values: &[f64], engine: &mut impl SimulationState) {
        self.map.reapply_parameters(values, engine);
    }

    /// Check that every subject dosed here also appears in `init`
    ///
    /// The initialization table may legitimately list extra subjects that
    /// are never dosed; the reverse is an error. `None` means no
    /// initialization table was supplied and passes.
    ///
    /// # Errors
    ///
    /// [DataError::UnknownSubject] naming the first missing id.
    pub fn check_ids(&self, init: Option<&Dataset>) -> Result<(), DataError> {
        match init {
            Some(init) => check_subset(&self.subject_ids(), &init.subject_ids()),
            None => Ok(()),
        }
    }
}

/// Check that every dosing-dataset id appears in the initialization-dataset ids
///
/// Both id lists are sorted and deduplicated before the superset check, so
/// repeated rows per subject are fine on either side.
///
/// # Errors
///
/// [DataError::UnknownSubject] naming the first dosing id absent from
/// `init_ids`.
pub fn check_subset(dosing_ids: &[f64], init_ids: &[f64]) -> Result<(), DataError> {
    let dosing = sort_unique(dosing_ids);
    let init = sort_unique(init_ids);

    for id in dosing {
        if init.binary_search_by(|probe| probe.total_cmp(&id)).is_err() {
            return Err(DataError::UnknownSubject { id });
        }
    }
    Ok(())
}

fn sort_unique(ids: &[f64]) -> Vec<f64> {
    let mut ids = ids.to_vec();
    ids.sort_by(f64::total_cmp);
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_dataset(ids: &[f64]) -> Dataset {
        let rows: Vec<Vec<f64>> = ids.iter().map(|&id| vec![id]).collect();
        let table = Table::from_rows(vec!["ID".to_string()], &rows).unwrap();
        Dataset::new(table, &[], &[]).unwrap()
    }

    #[test]
    fn test_check_subset_ok() {
        assert!(check_subset(&[1.0, 1.0, 2.0], &[3.0, 2.0, 1.0]).is_ok());
    }

    #[test]
    fn test_check_subset_extra_init_ids_ok() {
        // init may list subjects that are never dosed
        assert!(check_subset(&[1.0], &[1.0, 2.0, 3.0]).is_ok());
    }

    #[test]
    fn test_check_subset_missing_id() {
        let result = check_subset(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
        assert_eq!(result, Err(DataError::UnknownSubject { id: 3.0 }));
    }

    #[test]
    fn test_check_ids_between_datasets() {
        let dosing = id_dataset(&[1.0, 1.0, 2.0, 2.0]);
        let init = id_dataset(&[1.0, 2.0, 5.0]);
        assert!(dosing.check_ids(Some(&init)).is_ok());

        let short_init = id_dataset(&[1.0]);
        assert_eq!(
            dosing.check_ids(Some(&short_init)),
            Err(DataError::UnknownSubject { id: 2.0 })
        );

        // no initialization table supplied
        assert!(dosing.check_ids(None).is_ok());
    }

    #[test]
    fn test_init_table_without_time_column() {
        // initialization tables carry no event columns; construction and the
        // row lookup must work without role resolution
        let table = Table::from_rows(
            vec!["ID".to_string(), "CENT".to_string()],
            &[vec![1.0, 10.0], vec![2.0, 0.0]],
        )
        .unwrap();
        let dataset = Dataset::new(table, &[], &["CENT".to_string()]).unwrap();

        assert_eq!(dataset.row_lookup().row(2.0), Some(1));
        assert_eq!(dataset.parameter_map().inits(), &[(1, 0)]);
        // role resolution over this table fails, and that is fine as long
        // as records are never requested from it
        assert!(matches!(
            dataset.columns(),
            Err(DataError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_subject_ids_in_row_order() {
        let dataset = id_dataset(&[3.0, 3.0, 1.0]);
        assert_eq!(dataset.subject_ids(), vec![3.0, 3.0, 1.0]);
    }
}

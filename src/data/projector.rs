use crate::table::Table;

/// Engine-side capability the projector writes into
///
/// The simulation engine exposes slot-addressed parameter and
/// initial-condition vectors; this crate never touches solver state in any
/// other way.
pub trait SimulationState {
    /// Write one parameter slot
    fn set_parameter(&mut self, slot: usize, value: f64);

    /// Write one initial-condition slot
    fn set_initial_condition(&mut self, slot: usize, value: f64);

    /// Read access to the current parameter vector, indexed by slot
    fn parameters(&self) -> &[f64];
}

/// Column-to-slot correspondences for parameters and initial conditions
///
/// Built once by matching the table's column names against the model's
/// declared parameter names and compartment names. Unmatched names on either
/// side are simply absent from the map, not an error: a table may carry
/// covariates the model never reads, and a model may declare parameters the
/// table does not override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    params: Vec<(usize, usize)>,
    inits: Vec<(usize, usize)>,
}

impl ParameterMap {
    /// Match a table's column names against the model's declared name lists
    ///
    /// # Arguments
    ///
    /// * `table` - The table whose columns are matched
    /// * `parameter_names` - The model's parameter names, in slot order
    /// * `compartment_names` - The model's compartment names, in slot order
    pub fn resolve(table: &Table, parameter_names: &[String], compartment_names: &[String]) -> Self {
        ParameterMap {
            params: Self::match_names(table, parameter_names),
            inits: Self::match_names(table, compartment_names),
        }
    }

    fn match_names(table: &Table, names: &[String]) -> Vec<(usize, usize)> {
        table
            .names()
            .iter()
            .enumerate()
            .filter_map(|(column, name)| {
                names.iter().position(|n| n == name).map(|slot| (column, slot))
            })
            .collect()
    }

    /// The resolved `(column, parameter slot)` pairs
    pub fn params(&self) -> &[(usize, usize)] {
        &self.params
    }

    /// The resolved `(column, compartment slot)` pairs
    pub fn inits(&self) -> &[(usize, usize)] {
        &self.inits
    }

    /// Copy the mapped parameter columns of a row into the engine
    pub fn apply_parameters(
        &self,
        table: &Table,
        row: usize,
        engine: &mut impl SimulationState,
    ) {
        for &(column, slot) in &self.params {
            engine.set_parameter(slot, table.get(row, column));
        }
    }

    /// Copy the mapped initial-condition columns of a row into the engine
    ///
    /// Intended only for per-subject initialization tables, never the main
    /// dosing table; the main table's rows would overwrite compartment state
    /// mid-stream.
    pub fn apply_initial_conditions(
        &self,
        table: &Table,
        row: usize,
        engine: &mut impl SimulationState,
    ) {
        for &(column, slot) in &self.inits {
            engine.set_initial_condition(slot, table.get(row, column));
        }
    }

    /// Re-push mapped parameters from a slot-indexed vector
    ///
    /// Used when a higher layer has already resolved parameter overrides
    /// into a full slot-ordered vector and needs them re-synced onto the
    /// engine. `values` must cover every mapped slot; shorter vectors leave
    /// the uncovered slots untouched.
    pub fn reapply_parameters(&self, values: &[f64], engine: &mut impl SimulationState) {
        for &(_, slot) in &self.params {
            if let Some(&value) = values.get(slot) {
                engine.set_parameter(slot, value);
            }
        }
    }
}

use thiserror::Error;

/// Errors produced while ingesting a dosing dataset.
///
/// Every failure is fatal to the current build: there is no partial or
/// resumable state, and the error is meant to be surfaced to the user
/// as-is.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// A required column (id, time, or compartment) could not be located
    /// under either naming convention
    #[error("could not find {name} column in the data set")]
    MissingColumn { name: String },

    /// A subject's rows are not non-decreasing in time
    #[error("data set is not sorted by time for subject {id} (row {row}: time {time} precedes {last})")]
    UnsortedTime {
        id: f64,
        row: usize,
        time: f64,
        last: f64,
    },

    /// Compartment number outside the model's range
    #[error("compartment {cmt} out of range in {kind} record for subject {id} at row {row} (model has {neq} equations)")]
    CompartmentOutOfRange {
        id: f64,
        row: usize,
        cmt: i64,
        neq: usize,
        kind: &'static str,
    },

    /// Negative infusion rate that is not one of the modeled-duration (-1)
    /// or modeled-rate (-2) codes
    #[error("non-zero rate must be positive or equal to -1 or -2, found {rate} for subject {id} at row {row}")]
    InvalidRate { id: f64, row: usize, rate: f64 },

    /// Infusion dose with a non-positive amount
    #[error("non-zero rate requires positive amt, found {amount} for subject {id} at row {row}")]
    InvalidAmount { id: f64, row: usize, amount: f64 },

    /// `addl > 0` or steady state requested without a positive dosing interval
    #[error("dosing record with addl {addl} and ss {ss} but ii {ii} <= 0 for subject {id} at row {row}")]
    InvalidRepeatSchedule {
        id: f64,
        row: usize,
        addl: i64,
        ss: i64,
        ii: f64,
    },

    /// A dosing-dataset subject id is absent from the initialization dataset
    #[error("subject {id} found in the data set, but not in the initialization data")]
    UnknownSubject { id: f64 },

    /// The table has no rows
    #[error("data set has no rows")]
    EmptyTable,

    /// A subject id recurs after its contiguous block has ended
    #[error("subject {id} reappears at row {row} after its block ended; data set must be grouped by subject")]
    SubjectNotContiguous { id: f64, row: usize },

    /// Error reading or parsing CSV input
    #[error("CSV error: {0}")]
    Csv(String),

    /// A body cell could not be parsed as a number
    #[error("non-numeric value {value:?} in column {column} at row {row}")]
    NonNumericCell {
        row: usize,
        column: String,
        value: String,
    },

    /// Column name count does not match the grid width
    #[error("table has {ncols} columns but {names} column names")]
    ShapeMismatch { names: usize, ncols: usize },
}

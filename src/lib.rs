//! Ingestion and validation of tabular dosing datasets for ODE-based
//! pharmacometric simulation.
//!
//! A dataset is a numeric table with named columns, one row per observation
//! or dosing event, grouped by subject and sorted by time within subject.
//! This crate turns such a table into validated, per-subject, time-ordered
//! streams of typed [Record]s, and projects named covariate columns into a
//! simulation engine's parameter and initial-condition slots. The numerical
//! integration itself lives behind the [SimulationState] trait and is out of
//! scope here.
//!
//! The pipeline, in order:
//!
//! 1. [ColumnSet] discovers which columns carry the subject id, time, and
//!    the dosing roles (`amt`, `ii`, `addl`, `ss`, `rate`, `evid`, `cmt`),
//!    tolerating lower-case and upper-case naming conventions.
//! 2. [SubjectIndex] partitions the rows into contiguous per-subject runs.
//! 3. [RecordBuilder] walks each run, validates the dosing semantics and
//!    emits [Record]s, fail-fast on the first bad row.
//! 4. [ParameterMap] pushes per-row covariate and initial-condition values
//!    into the engine before each subject is integrated.
//!
//! [Dataset] ties the four together over one table.
//!
//! # Example
//!
//! ```
//! use dosetab::prelude::*;
//!
//! let table = Table::from_csv_reader(
//!     "ID,time,amt,ii,addl,ss,rate,evid,cmt\n\
//!      1,0,100,24,3,0,0,1,1\n\
//!      1,2,0,0,0,0,0,0,1\n\
//!      2,0,50,0,0,0,0,1,1\n"
//!         .as_bytes(),
//! )?;
//!
//! let dataset = Dataset::new(table, &[], &[])?;
//! let index = dataset.subject_index()?;
//! let stream = dataset.records(&index, 1, false)?;
//!
//! assert_eq!(index.len(), 2);
//! assert_eq!(stream.doses(), 2);
//! assert_eq!(stream.observations(), 1);
//! # Ok::<(), dosetab::DataError>(())
//! ```

pub mod data;
pub mod error;
pub mod table;

pub use crate::data::builder::{RecordBuilder, RecordStream};
pub use crate::data::columns::{ColumnRef, ColumnSet, Role};
pub use crate::data::dataset::{check_subset, Dataset};
pub use crate::data::index::{RowLookup, SubjectIndex, SubjectRun};
pub use crate::data::projector::{ParameterMap, SimulationState};
pub use crate::data::record::{Dose, Observation, Record};
pub use crate::error::DataError;
pub use crate::table::Table;

pub mod prelude {
    pub use crate::data::builder::{RecordBuilder, RecordStream};
    pub use crate::data::columns::{ColumnRef, ColumnSet, Role};
    pub use crate::data::dataset::{check_subset, Dataset};
    pub use crate::data::index::{RowLookup, SubjectIndex, SubjectRun};
    pub use crate::data::projector::{ParameterMap, SimulationState};
    pub use crate::data::record::{Dose, Observation, Record};
    pub use crate::error::DataError;
    pub use crate::table::Table;
}

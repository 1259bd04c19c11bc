pub mod builder;
pub mod columns;
pub mod dataset;
pub mod index;
pub mod projector;
pub mod record;

pub use builder::{RecordBuilder, RecordStream};
pub use columns::{ColumnRef, ColumnSet, Role};
pub use dataset::{check_subset, Dataset};
pub use index::{RowLookup, SubjectIndex, SubjectRun};
pub use projector::{ParameterMap, SimulationState};
pub use record::{Dose, Observation, Record};

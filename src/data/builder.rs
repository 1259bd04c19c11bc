use std::sync::Arc;

use rayon::prelude::*;

use crate::data::columns::{ColumnSet, Role};
use crate::data::index::{SubjectIndex, SubjectRun};
use crate::data::record::{Dose, Observation, Record};
use crate::error::DataError;
use crate::table::Table;

/// Event-type code for a dosing event proper
///
/// Other non-observation codes describe events (resets, other-type doses)
/// that do not require a positive amount.
const EVID_DOSE: i64 = 1;

/// The validated output of a record build
///
/// One record sequence per subject, in [SubjectIndex] order, plus aggregate
/// counts used by the driver for output buffer sizing. Records are shared
/// via `Arc` so the solver can splice them into a combined queue alongside
/// synthetic records it creates itself.
#[derive(Debug, Clone, Default)]
pub struct RecordStream {
    per_subject: Vec<Vec<Arc<Record>>>,
    observations: usize,
    doses: usize,
}

impl RecordStream {
    /// Per-subject record sequences, in subject-index order
    pub fn per_subject(&self) -> &[Vec<Arc<Record>>] {
        &self.per_subject
    }

    /// The record sequence of one subject by its position in the index
    pub fn subject(&self, position: usize) -> &[Arc<Record>] {
        &self.per_subject[position]
    }

    /// Total number of observation records
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Total number of dose-event records
    pub fn doses(&self) -> usize {
        self.doses
    }

    /// Total number of records across all subjects
    pub fn len(&self) -> usize {
        self.per_subject.iter().map(Vec::len).sum()
    }

    /// Whether no records were built
    pub fn is_empty(&self) -> bool {
        self.per_subject.iter().all(Vec::is_empty)
    }

    /// Iterate over all records, subject by subject
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.per_subject.iter().flatten()
    }
}

/// Walks each subject's row range and emits validated [Record] sequences
///
/// The builder borrows the table and its resolved [ColumnSet]; both stay
/// read-only throughout. Any validation failure aborts the entire build
/// immediately.
pub struct RecordBuilder<'a> {
    table: &'a Table,
    columns: &'a ColumnSet,
    equations: usize,
    observations_only: bool,
}

impl<'a> RecordBuilder<'a> {
    /// Create a builder over a table and its resolved columns
    ///
    /// # Arguments
    ///
    /// * `table` - The dosing dataset
    /// * `columns` - Column roles resolved from the same table
    /// * `equations` - Number of model equations, for compartment-range checks
    /// * `observations_only` - When set, dose records are not marked for solver output
    pub fn new(
        table: &'a Table,
        columns: &'a ColumnSet,
        equations: usize,
        observations_only: bool,
    ) -> Self {
        RecordBuilder {
            table,
            columns,
            equations,
            observations_only,
        }
    }

    /// Build every subject's record sequence
    ///
    /// Returns an empty stream (one empty sequence per subject, zero counts)
    /// when the table has only the id column; such tables carry covariates,
    /// not events.
    ///
    /// # Errors
    ///
    /// [DataError::UnsortedTime], [DataError::CompartmentOutOfRange],
    /// [DataError::InvalidRate], [DataError::InvalidAmount] or
    /// [DataError::InvalidRepeatSchedule] on the first offending row.
    pub fn build(&self, index: &SubjectIndex) -> Result<RecordStream, DataError> {
        if self.table.ncols() <= 1 {
            return Ok(Self::empty_stream(index.len()));
        }

        let mut per_subject = Vec::with_capacity(index.len());
        let mut observations = 0;
        let mut doses = 0;
        for run in index.runs() {
            let subject = self.build_subject(run)?;
            observations += subject.observations;
            doses += subject.doses;
            per_subject.push(subject.records);
        }

        Ok(RecordStream {
            per_subject,
            observations,
            doses,
        })
    }

    /// Build every subject's record sequence, subjects in parallel
    ///
    /// Each subject's build touches only its own row range, so the runs are
    /// processed on the rayon pool. Errors are still reported
    /// deterministically: the first failing subject in index order wins.
    pub fn build_par(&self, index: &SubjectIndex) -> Result<RecordStream, DataError> {
        if self.table.ncols() <= 1 {
            return Ok(Self::empty_stream(index.len()));
        }

        let built: Vec<Result<SubjectRecords, DataError>> = index
            .runs()
            .par_iter()
            .map(|run| self.build_subject(run))
            .collect();

        let mut per_subject = Vec::with_capacity(built.len());
        let mut observations = 0;
        let mut doses = 0;
        for result in built {
            let subject = result?;
            observations += subject.observations;
            doses += subject.doses;
            per_subject.push(subject.records);
        }

        Ok(RecordStream {
            per_subject,
            observations,
            doses,
        })
    }

    fn empty_stream(subjects: usize) -> RecordStream {
        RecordStream {
            per_subject: vec![Vec::new(); subjects],
            observations: 0,
            doses: 0,
        }
    }

    fn build_subject(&self, run: &SubjectRun) -> Result<SubjectRecords, DataError> {
        // slack for synthetic records the solver may splice in later
        let mut records = Vec::with_capacity(run.len() + 5);
        let mut observations = 0;
        let mut doses = 0;
        let mut last_time = 0.0;
        let neq = self.equations as i64;

        for row in run.rows() {
            let time = self.value(row, Role::Time);
            if time < last_time {
                return Err(DataError::UnsortedTime {
                    id: run.id(),
                    row,
                    time,
                    last: last_time,
                });
            }
            last_time = time;

            let cmt = self.value(row, Role::Cmt) as i64;
            let evid = self.value(row, Role::Evid) as i64;

            if evid == 0 {
                if cmt < 0 || cmt > neq {
                    return Err(DataError::CompartmentOutOfRange {
                        id: run.id(),
                        row,
                        cmt,
                        neq: self.equations,
                        kind: "observation",
                    });
                }
                records.push(Arc::new(Record::Observation(Observation::new(
                    time,
                    cmt,
                    row,
                    run.id(),
                ))));
                observations += 1;
                continue;
            }

            if cmt == 0 || cmt.abs() > neq {
                return Err(DataError::CompartmentOutOfRange {
                    id: run.id(),
                    row,
                    cmt,
                    neq: self.equations,
                    kind: "dosing",
                });
            }
            doses += 1;

            let amount = self.value(row, Role::Amt);
            let rate = self.value(row, Role::Rate);
            let mut dose = Dose::new(cmt, evid, amount, time, rate, row, run.id());

            if rate < 0.0 && rate != -1.0 && rate != -2.0 {
                return Err(DataError::InvalidRate {
                    id: run.id(),
                    row,
                    rate,
                });
            }
            if rate != 0.0 && amount <= 0.0 && evid == EVID_DOSE {
                return Err(DataError::InvalidAmount {
                    id: run.id(),
                    row,
                    amount,
                });
            }

            dose.set_output(!self.observations_only);
            dose.set_ss(self.value(row, Role::Ss) as i64);
            dose.set_addl(self.value(row, Role::Addl) as i64);
            dose.set_ii(self.value(row, Role::Ii));

            if dose.ii() <= 0.0 && (dose.addl() > 0 || dose.steady_state()) {
                return Err(DataError::InvalidRepeatSchedule {
                    id: run.id(),
                    row,
                    addl: dose.addl(),
                    ss: dose.ss(),
                    ii: dose.ii(),
                });
            }

            records.push(Arc::new(Record::Dose(dose)));
        }

        Ok(SubjectRecords {
            records,
            observations,
            doses,
        })
    }

    fn value(&self, row: usize, role: Role) -> f64 {
        self.columns.value(self.table, row, role)
    }
}

struct SubjectRecords {
    records: Vec<Arc<Record>>,
    observations: usize,
    doses: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 9] = ["ID", "time", "amt", "ii", "addl", "ss", "rate", "evid", "cmt"];

    fn table(rows: &[Vec<f64>]) -> Table {
        Table::from_rows(NAMES.iter().map(|n| n.to_string()).collect(), rows).unwrap()
    }

    fn build(rows: &[Vec<f64>], neq: usize, obsonly: bool) -> Result<RecordStream, DataError> {
        let table = table(rows);
        let columns = ColumnSet::resolve(&table).unwrap();
        let index = SubjectIndex::build(&table, columns.id()).unwrap();
        RecordBuilder::new(&table, &columns, neq, obsonly).build(&index)
    }

    #[test]
    fn test_single_dose_row() {
        //            ID   time amt    ii    addl ss   rate evid cmt
        let rows = [vec![1., 0., 100., 24., 3., 0., 0., 1., 1.]];
        let stream = build(&rows, 1, false).unwrap();

        assert_eq!(stream.doses(), 1);
        assert_eq!(stream.observations(), 0);
        assert_eq!(stream.subject(0).len(), 1);
        match stream.subject(0)[0].as_ref() {
            Record::Dose(dose) => {
                assert!(dose.from_data());
                assert!(dose.output());
                assert_eq!(dose.amount(), 100.0);
                assert_eq!(dose.ii(), 24.0);
                assert_eq!(dose.addl(), 3);
            }
            other => panic!("expected dose, got {}", other),
        }
    }

    #[test]
    fn test_observations_only_clears_output() {
        let rows = [vec![1., 0., 100., 0., 0., 0., 0., 1., 1.]];
        let stream = build(&rows, 1, true).unwrap();
        match stream.subject(0)[0].as_ref() {
            Record::Dose(dose) => assert!(!dose.output()),
            other => panic!("expected dose, got {}", other),
        }
    }

    #[test]
    fn test_unsorted_time_fails() {
        let rows = [
            vec![1., 0., 100., 0., 0., 0., 0., 1., 1.],
            vec![1., -1., 0., 0., 0., 0., 0., 0., 1.],
        ];
        let result = build(&rows, 1, false);
        assert!(matches!(result, Err(DataError::UnsortedTime { row: 1, .. })));
    }

    #[test]
    fn test_time_resets_per_subject() {
        // subject 2 starts earlier than subject 1 ended; still valid
        let rows = [
            vec![1., 0., 100., 0., 0., 0., 0., 1., 1.],
            vec![1., 10., 0., 0., 0., 0., 0., 0., 1.],
            vec![2., 0., 100., 0., 0., 0., 0., 1., 1.],
        ];
        let stream = build(&rows, 1, false).unwrap();
        assert_eq!(stream.per_subject().len(), 2);
        assert_eq!(stream.doses(), 2);
        assert_eq!(stream.observations(), 1);
    }

    #[test]
    fn test_observation_cmt_range() {
        // observation may target compartment 0, but not one past neq
        let ok = [vec![1., 0., 0., 0., 0., 0., 0., 0., 0.]];
        assert!(build(&ok, 1, false).is_ok());

        let bad = [vec![1., 0., 0., 0., 0., 0., 0., 0., 2.]];
        assert!(matches!(
            build(&bad, 1, false),
            Err(DataError::CompartmentOutOfRange {
                kind: "observation",
                ..
            })
        ));
    }

    #[test]
    fn test_dose_cmt_range() {
        // zero compartment is invalid for a dose
        let zero = [vec![1., 0., 100., 0., 0., 0., 0., 1., 0.]];
        assert!(matches!(
            build(&zero, 1, false),
            Err(DataError::CompartmentOutOfRange { kind: "dosing", .. })
        ));

        // negative compartment within |cmt| <= neq is allowed (turns the
        // compartment off)
        let negative = [vec![1., 0., 100., 0., 0., 0., 0., 2., -1.]];
        assert!(build(&negative, 1, false).is_ok());

        let too_big = [vec![1., 0., 100., 0., 0., 0., 0., 1., -2.]];
        assert!(matches!(
            build(&too_big, 1, false),
            Err(DataError::CompartmentOutOfRange { kind: "dosing", .. })
        ));
    }

    #[test]
    fn test_rate_sentinels() {
        for rate in [-1.0, -2.0, 0.0, 5.0] {
            let rows = [vec![1., 0., 100., 0., 0., 0., rate, 1., 1.]];
            assert!(build(&rows, 1, false).is_ok(), "rate {} should pass", rate);
        }

        let rows = [vec![1., 0., 100., 0., 0., 0., -3., 1., 1.]];
        assert!(matches!(
            build(&rows, 1, false),
            Err(DataError::InvalidRate { rate, .. }) if rate == -3.0
        ));
    }

    #[test]
    fn test_infusion_requires_positive_amount() {
        let rows = [vec![1., 0., 0., 0., 0., 0., 5., 1., 1.]];
        assert!(matches!(
            build(&rows, 1, false),
            Err(DataError::InvalidAmount { amount, .. }) if amount == 0.0
        ));

        // only the dosing-event code requires positive amt
        let other_evid = [vec![1., 0., 0., 0., 0., 0., 5., 2., 1.]];
        assert!(build(&other_evid, 1, false).is_ok());
    }

    #[test]
    fn test_repeat_schedule() {
        // addl without interval
        let addl = [vec![1., 0., 100., 0., 2., 0., 0., 1., 1.]];
        assert!(matches!(
            build(&addl, 1, false),
            Err(DataError::InvalidRepeatSchedule { addl: 2, .. })
        ));

        // steady state without interval
        let ss = [vec![1., 0., 100., 0., 0., 1., 0., 1., 1.]];
        assert!(matches!(
            build(&ss, 1, false),
            Err(DataError::InvalidRepeatSchedule { ss: 1, .. })
        ));

        // all zero is fine
        let quiet = [vec![1., 0., 100., 0., 0., 0., 0., 1., 1.]];
        assert!(build(&quiet, 1, false).is_ok());
    }

    #[test]
    fn test_id_only_table_builds_nothing() {
        let table = Table::from_rows(vec!["ID".to_string()], &[vec![1.0], vec![2.0]]).unwrap();
        let columns = ColumnSet::resolve(&table).unwrap();
        let index = SubjectIndex::build(&table, columns.id()).unwrap();
        let stream = RecordBuilder::new(&table, &columns, 3, false)
            .build(&index)
            .unwrap();
        assert_eq!(stream.per_subject().len(), 2);
        assert!(stream.is_empty());
        assert_eq!(stream.observations(), 0);
        assert_eq!(stream.doses(), 0);
    }

    #[test]
    fn test_parallel_build_matches_sequential() {
        let mut rows = Vec::new();
        for id in 1..=20 {
            rows.push(vec![id as f64, 0., 100., 24., 3., 0., 0., 1., 1.]);
            for t in 1..=5 {
                rows.push(vec![id as f64, t as f64, 0., 0., 0., 0., 0., 0., 1.]);
            }
        }
        let table = table(&rows);
        let columns = ColumnSet::resolve(&table).unwrap();
        let index = SubjectIndex::build(&table, columns.id()).unwrap();
        let builder = RecordBuilder::new(&table, &columns, 1, false);

        let sequential = builder.build(&index).unwrap();
        let parallel = builder.build_par(&index).unwrap();

        assert_eq!(sequential.observations(), parallel.observations());
        assert_eq!(sequential.doses(), parallel.doses());
        assert_eq!(sequential.len(), parallel.len());
        for (a, b) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(a.as_ref(), b.as_ref());
        }
    }

    #[test]
    fn test_parallel_build_reports_first_error() {
        let rows = [
            vec![1., 0., 100., 0., 0., 0., -3., 1., 1.],
            vec![2., 0., 100., 0., 2., 0., 0., 1., 1.],
        ];
        let table = table(&rows);
        let columns = ColumnSet::resolve(&table).unwrap();
        let index = SubjectIndex::build(&table, columns.id()).unwrap();
        let result = RecordBuilder::new(&table, &columns, 1, false).build_par(&index);
        assert!(matches!(result, Err(DataError::InvalidRate { row: 0, .. })));
    }
}

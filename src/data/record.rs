use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed record produced from one dataset row
///
/// Records come in two closed variants:
/// - [Observation]s (a measured quantity at a point in time)
/// - [Dose]s (administration of a substance, possibly infused or repeated)
///
/// Within a subject, records preserve table row order; the downstream solver
/// is free to merge them with synthetic records of its own, which is why
/// record streams hand them out behind `Arc`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Record {
    /// A measured quantity, no dose content
    Observation(Observation),
    /// A dosing event
    Dose(Dose),
}

impl Record {
    /// Get the time of the record
    pub fn time(&self) -> f64 {
        match self {
            Record::Observation(observation) => observation.time,
            Record::Dose(dose) => dose.time,
        }
    }

    /// Get the table row the record originates from
    pub fn row(&self) -> usize {
        match self {
            Record::Observation(observation) => observation.row,
            Record::Dose(dose) => dose.row,
        }
    }

    /// Get the subject id the record belongs to
    pub fn subject_id(&self) -> f64 {
        match self {
            Record::Observation(observation) => observation.subject_id,
            Record::Dose(dose) => dose.subject_id,
        }
    }
}

/// A measured quantity at a point in time
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Observation {
    time: f64,
    cmt: i64,
    row: usize,
    subject_id: f64,
}

impl Observation {
    /// Create a new observation record
    ///
    /// # Arguments
    ///
    /// * `time` - Time of the observation
    /// * `cmt` - Compartment number the observation targets
    /// * `row` - Originating table row
    /// * `subject_id` - Subject the observation belongs to
    pub(crate) fn new(time: f64, cmt: i64, row: usize, subject_id: f64) -> Self {
        Observation {
            time,
            cmt,
            row,
            subject_id,
        }
    }

    /// Get the time of the observation
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Get the compartment number the observation targets
    pub fn cmt(&self) -> i64 {
        self.cmt
    }

    /// Get the originating table row
    pub fn row(&self) -> usize {
        self.row
    }

    /// Get the subject id
    pub fn subject_id(&self) -> f64 {
        self.subject_id
    }
}

/// A dosing event
///
/// Carries the dose content (amount, infusion rate, repeat schedule) plus
/// provenance and output flags. Identity fields never change after
/// construction; only `output`, `ss`, `addl` and `ii` are set during the
/// validation pass that follows.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Dose {
    cmt: i64,
    evid: i64,
    amount: f64,
    time: f64,
    rate: f64,
    row: usize,
    subject_id: f64,
    from_data: bool,
    output: bool,
    ss: i64,
    addl: i64,
    ii: f64,
}

impl Dose {
    /// Create a new dose record
    ///
    /// Table-sourced doses always carry `from_data = true`. The `output`
    /// flag and the repeat-dosing fields start zeroed and are set by the
    /// record builder.
    ///
    /// # Arguments
    ///
    /// * `cmt` - Compartment number receiving the dose (signed, non-zero)
    /// * `evid` - Event-type code
    /// * `amount` - Dose amount
    /// * `time` - Time of the dose
    /// * `rate` - Infusion rate; `0` for bolus, `-1`/`-2` for modeled duration/rate
    /// * `row` - Originating table row
    /// * `subject_id` - Subject the dose belongs to
    pub(crate) fn new(
        cmt: i64,
        evid: i64,
        amount: f64,
        time: f64,
        rate: f64,
        row: usize,
        subject_id: f64,
    ) -> Self {
        Dose {
            cmt,
            evid,
            amount,
            time,
            rate,
            row,
            subject_id,
            from_data: true,
            output: false,
            ss: 0,
            addl: 0,
            ii: 0.0,
        }
    }

    /// Get the compartment number receiving the dose
    pub fn cmt(&self) -> i64 {
        self.cmt
    }

    /// Get the event-type code
    pub fn evid(&self) -> i64 {
        self.evid
    }

    /// Get the dose amount
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Get the time of the dose
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Get the infusion rate
    ///
    /// `0` means a bolus; `-1` and `-2` flag an infusion whose duration or
    /// rate is supplied by the model rather than the data.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Get the originating table row
    pub fn row(&self) -> usize {
        self.row
    }

    /// Get the subject id
    pub fn subject_id(&self) -> f64 {
        self.subject_id
    }

    /// Whether the dose was sourced from a dataset (always true here)
    pub fn from_data(&self) -> bool {
        self.from_data
    }

    /// Whether the dose should appear in solver output
    pub fn output(&self) -> bool {
        self.output
    }

    /// Get the steady-state flag
    pub fn ss(&self) -> i64 {
        self.ss
    }

    /// Whether the dose should be treated as at pharmacologic steady state
    pub fn steady_state(&self) -> bool {
        self.ss != 0
    }

    /// Get the count of additional doses
    pub fn addl(&self) -> i64 {
        self.addl
    }

    /// Get the inter-dose interval
    pub fn ii(&self) -> f64 {
        self.ii
    }

    pub(crate) fn set_output(&mut self, output: bool) {
        self.output = output;
    }

    pub(crate) fn set_ss(&mut self, ss: i64) {
        self.ss = ss;
    }

    pub(crate) fn set_addl(&mut self, addl: i64) {
        self.addl = addl;
    }

    pub(crate) fn set_ii(&mut self, ii: f64) {
        self.ii = ii;
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Record::Observation(observation) => write!(
                f,
                "Observation at time {:.2} in compartment {} (subject {}, row {})",
                observation.time, observation.cmt, observation.subject_id, observation.row
            ),
            Record::Dose(dose) => {
                let schedule = if dose.addl > 0 {
                    format!(" plus {} doses every {:.2}", dose.addl, dose.ii)
                } else {
                    String::new()
                };
                write!(
                    f,
                    "Dose of {:.2} at time {:.2} in compartment {} (evid {}, rate {:.2}, subject {}, row {}){}",
                    dose.amount,
                    dose.time,
                    dose.cmt,
                    dose.evid,
                    dose.rate,
                    dose.subject_id,
                    dose.row,
                    schedule
                )
            }
        }
    }
}

use crate::error::DataError;
use crate::table::Table;

/// The eight logical roles a dosing dataset column can carry
///
/// Roles are discovered by name under one of two conventions: lower-case
/// (`time`, `amt`, ...) or upper-case (`TIME`, `AMT`, ...). The convention is
/// chosen by whichever time column is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Event or observation time
    Time,
    /// Dose amount
    Amt,
    /// Inter-dose interval
    Ii,
    /// Count of additional doses
    Addl,
    /// Steady-state flag
    Ss,
    /// Infusion rate
    Rate,
    /// Event-type code
    Evid,
    /// Compartment number
    Cmt,
}

impl Role {
    /// All roles, in a fixed order
    pub const ALL: [Role; 8] = [
        Role::Time,
        Role::Amt,
        Role::Ii,
        Role::Addl,
        Role::Ss,
        Role::Rate,
        Role::Evid,
        Role::Cmt,
    ];

    fn lower(self) -> &'static str {
        match self {
            Role::Time => "time",
            Role::Amt => "amt",
            Role::Ii => "ii",
            Role::Addl => "addl",
            Role::Ss => "ss",
            Role::Rate => "rate",
            Role::Evid => "evid",
            Role::Cmt => "cmt",
        }
    }

    fn upper(self) -> &'static str {
        match self {
            Role::Time => "TIME",
            Role::Amt => "AMT",
            Role::Ii => "II",
            Role::Addl => "ADDL",
            Role::Ss => "SS",
            Role::Rate => "RATE",
            Role::Evid => "EVID",
            Role::Cmt => "CMT",
        }
    }

    fn name(self, upper_case: bool) -> &'static str {
        if upper_case {
            self.upper()
        } else {
            self.lower()
        }
    }
}

/// Where a role's values are read from
///
/// A role whose column is absent does not fail resolution (except `cmt`, see
/// [ColumnSet::resolve]); instead it falls through to a sentinel column and
/// reads whatever that column holds. Making the fallback explicit keeps that
/// behavior visible to callers deciding whether a role is actually present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef {
    /// Column found by name under the active convention
    Named(usize),
    /// Role absent; reads fall through to the sentinel column
    Fallback(usize),
}

impl ColumnRef {
    /// The column index reads go through, resolved or not
    pub fn index(self) -> usize {
        match self {
            ColumnRef::Named(index) | ColumnRef::Fallback(index) => index,
        }
    }

    /// Whether the role's column was actually found
    pub fn is_named(self) -> bool {
        matches!(self, ColumnRef::Named(_))
    }
}

/// Resolved column indices for the subject-id column and the eight roles
///
/// Built once per [Table] and immutable thereafter. If the table has no
/// columns besides the id column, all eight roles fall back to the id column
/// itself and record construction is skipped entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    id: usize,
    roles: [ColumnRef; 8],
    upper_case: bool,
}

impl ColumnSet {
    /// Locate the id column and the eight role columns in a table
    ///
    /// The `"ID"` column is required unconditionally. The time column is
    /// probed as `"time"` first, then `"TIME"`; the chosen convention is used
    /// for the remaining seven roles. Optional roles (`amt`, `ii`, `addl`,
    /// `ss`, `rate`, `evid`) fall back to the last column when absent; the
    /// compartment column is mandatory whenever the table has more than the
    /// bare id column, because event content is meaningless without it.
    ///
    /// # Errors
    ///
    /// [DataError::MissingColumn] when the id, time, or compartment column
    /// cannot be located.
    pub fn resolve(table: &Table) -> Result<Self, DataError> {
        let id = table
            .column_index("ID")
            .ok_or_else(|| DataError::MissingColumn {
                name: "ID".to_string(),
            })?;

        // Covariate-only tables carry nothing but the id column; every role
        // falls back to it and record construction is a no-op.
        if table.ncols() <= 1 {
            return Ok(ColumnSet {
                id,
                roles: [ColumnRef::Fallback(id); 8],
                upper_case: false,
            });
        }

        let (time, upper_case) = match table.column_index("time") {
            Some(index) => (index, false),
            None => match table.column_index("TIME") {
                Some(index) => (index, true),
                None => {
                    return Err(DataError::MissingColumn {
                        name: "time or TIME".to_string(),
                    })
                }
            },
        };

        let sentinel = table.ncols() - 1;
        let mut roles = [ColumnRef::Fallback(sentinel); 8];
        roles[Role::Time as usize] = ColumnRef::Named(time);

        for role in Role::ALL {
            if role == Role::Time {
                continue;
            }
            if let Some(index) = table.column_index(role.name(upper_case)) {
                roles[role as usize] = ColumnRef::Named(index);
            }
        }

        if !roles[Role::Cmt as usize].is_named() {
            return Err(DataError::MissingColumn {
                name: "cmt or CMT".to_string(),
            });
        }

        Ok(ColumnSet {
            id,
            roles,
            upper_case,
        })
    }

    /// Index of the subject-id column
    pub fn id(&self) -> usize {
        self.id
    }

    /// The column reference for a role
    pub fn get(&self, role: Role) -> ColumnRef {
        self.roles[role as usize]
    }

    /// The column index a role reads through
    pub fn index(&self, role: Role) -> usize {
        self.get(role).index()
    }

    /// Whether the upper-case naming convention was chosen
    pub fn upper_case(&self) -> bool {
        self.upper_case
    }

    /// Read a role's value from a table row
    pub(crate) fn value(&self, table: &Table, row: usize, role: Role) -> f64 {
        table.get(row, self.index(role))
    }
}

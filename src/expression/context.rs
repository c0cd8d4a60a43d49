//! Evaluation context
//!
//! The context is built explicitly from a snapshot, a function table and a
//! clock. Nothing is looked up ambiently.

use chrono::{DateTime, TimeZone, Utc};

use super::functions::FunctionTable;
use crate::schema::{FieldValue, Snapshot};

/// Source of the current time for `now()` and `dateDiff()`.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    millis: i64,
}

impl FixedClock {
    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::from_millis(instant.timestamp_millis())
    }

    /// Midnight UTC on the given calendar day.
    ///
    /// Out-of-range dates fall back to the epoch.
    pub fn on_date(year: i32, month: u32, day: u32) -> Self {
        match Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single() {
            Some(instant) => Self::at(instant),
            None => Self::from_millis(0),
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis
    }
}

/// Variables, functions and clock visible to one evaluation.
pub struct EvalContext<'a> {
    variables: Snapshot,
    functions: &'a FunctionTable,
    clock: &'a dyn Clock,
}

impl<'a> EvalContext<'a> {
    pub fn new(functions: &'a FunctionTable, clock: &'a dyn Clock) -> Self {
        Self {
            variables: Snapshot::new(),
            functions,
            clock,
        }
    }

    /// Every snapshot entry becomes a variable.
    pub fn from_snapshot(
        snapshot: &Snapshot,
        functions: &'a FunctionTable,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            variables: snapshot.clone(),
            functions,
            clock,
        }
    }

    pub fn variable(&self, name: &str) -> Option<&FieldValue> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.variables.insert(name.into(), value);
    }

    pub fn variables(&self) -> &Snapshot {
        &self.variables
    }

    pub fn into_variables(self) -> Snapshot {
        self.variables
    }

    pub fn functions(&self) -> &FunctionTable {
        self.functions
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock
    }
}

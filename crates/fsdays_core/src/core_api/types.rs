use std::path::PathBuf;

use serde::Serialize;

use crate::calendar::{DayPolicy, DayShift};
use crate::fields::FieldUpdate;
use crate::forecast::InvalidationCount;
use crate::store::WriteOutcome;
use crate::sync::SyncOutcome;
use crate::zero::FieldChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResetKind {
    Statistics,
    Finances,
}

impl ResetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Statistics => "statistics",
            Self::Finances => "finances",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayChangeReport {
    pub environment_path: PathBuf,
    pub policy: DayPolicy,
    pub shift: DayShift,
    pub period_fields: Vec<FieldUpdate>,
    pub current_day: FieldUpdate,
    pub forecast: InvalidationCount,
    pub write: WriteOutcome,
    pub career: SyncOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub kind: ResetKind,
    pub path: PathBuf,
    pub changes: Vec<FieldChange>,
    pub write: WriteOutcome,
}

impl ResetReport {
    pub fn changed(&self) -> usize {
        self.changes.len()
    }
}

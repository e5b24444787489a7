//! Run outcome types
//!
//! A run moves through `EnsuringHistory -> Diffing -> Applying(i)` and ends
//! in either [`RunOutcome::Done`] or [`RunOutcome::Failed`]. Failures are
//! reported, never rolled back.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::Error;

/// Stage of a run, used to locate a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "stage")]
pub enum RunStage {
    EnsuringHistory,
    Diffing,
    /// Applying the catalog entry at `index`
    Applying { index: usize },
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStage::EnsuringHistory => f.write_str("ensuring history"),
            RunStage::Diffing => f.write_str("diffing"),
            RunStage::Applying { index } => write!(f, "applying #{}", index),
        }
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Names applied by this run, in order
    pub applied: Vec<String>,
    /// Names that were already in the history table, in history order
    pub previously_applied: Vec<String>,
}

impl RunReport {
    /// Count of catalog entries skipped because they were already applied
    pub fn already_applied(&self) -> usize {
        self.previously_applied.len()
    }
}

/// Why and where a run stopped
#[derive(Debug)]
pub struct RunFailure {
    pub run_id: Uuid,
    pub stage: RunStage,
    /// The migration being applied, if the failure happened while applying
    pub migration: Option<String>,
    pub error: Error,
    /// Names applied by this run before the failure
    pub applied: Vec<String>,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.migration {
            Some(name) => write!(f, "Failed: {}: {}", name, self.error.message()),
            None => write!(f, "Failed while {}: {}", self.stage, self.error.message()),
        }
    }
}

/// Terminal state of a run
#[derive(Debug)]
pub enum RunOutcome {
    Done(RunReport),
    Failed(RunFailure),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Done(_))
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            RunOutcome::Done(report) => report.run_id,
            RunOutcome::Failed(failure) => failure.run_id,
        }
    }

    /// Names applied by the run, whether or not it finished
    pub fn applied(&self) -> &[String] {
        match self {
            RunOutcome::Done(report) => &report.applied,
            RunOutcome::Failed(failure) => &failure.applied,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            RunOutcome::Failed(failure) => Some(failure),
            RunOutcome::Done(_) => None,
        }
    }
}

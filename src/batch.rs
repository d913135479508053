// 🚪 Batch Gate - all-or-nothing commit point
// A batch either reconciles completely or is rejected with every
// validation error collected; nothing is ever half-applied.

use crate::model::{NameChange, Station, SurveyResult};
use crate::reconcile::{reconcile, ConsistencyViolation};
use crate::validation::{validate_name_changes, ValidationError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// RECONCILED BATCH
// ============================================================================

/// Everything a successful run hands to persistence: the now-canonical
/// inputs plus the stations reconstructed from them. Station indices
/// refer into `results` and `name_changes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledBatch {
    pub results: Vec<SurveyResult>,
    pub name_changes: Vec<NameChange>,
    pub stations: Vec<Station>,
}

// ============================================================================
// BATCH ERRORS
// ============================================================================

#[derive(Debug)]
pub enum BatchError {
    /// Data-quality failures. The whole batch is rejected before any
    /// lineage work; every violation is reported together so operators
    /// can fix the source data in one pass.
    Rejected(Vec<ValidationError>),

    /// A reconciliation invariant broke mid-run. Programming defect, not
    /// bad input; must never be swallowed.
    Consistency(ConsistencyViolation),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Rejected(errors) => {
                write!(f, "batch rejected with {} validation error(s)", errors.len())?;
                for error in errors {
                    write!(f, "\n  {}", error)?;
                }
                Ok(())
            }
            BatchError::Consistency(violation) => write!(f, "{}", violation),
        }
    }
}

impl std::error::Error for BatchError {}

// ============================================================================
// GATE
// ============================================================================

/// Run validation, then reconciliation, atomically from the caller's
/// point of view: any invalid name change rejects the batch before a
/// single lineage is built, and nothing reaches persistence.
pub fn run_batch(
    results: Vec<SurveyResult>,
    name_changes: Vec<NameChange>,
) -> Result<ReconciledBatch, BatchError> {
    let errors = validate_name_changes(&results, &name_changes);
    if !errors.is_empty() {
        return Err(BatchError::Rejected(errors));
    }

    let stations = reconcile(&results, &name_changes).map_err(BatchError::Consistency)?;

    Ok(ReconciledBatch {
        results,
        name_changes,
        stations,
    })
}

// ============================================================================
// PERSISTENCE SEAM
// ============================================================================

/// Where a reconciled batch goes once the gate lets it through.
///
/// Assigning durable identifiers is the sink's responsibility; the core
/// never knows how or where the batch is stored.
pub trait PersistenceSink {
    fn store(&mut self, batch: &ReconciledBatch) -> Result<StoreSummary>;
}

/// Counts reported back by a sink after a successful store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub stations: usize,
    pub results: usize,
    pub name_changes: usize,
}

// ✅ Rename Validation - check every name change against the result set
// All changes are checked and all errors collected before returning, so a
// single run surfaces every problem at once.

use crate::model::{NameChange, SurveyResult};
use crate::period::previous_quarter_end;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// VALIDATION ERRORS
// ============================================================================

/// A name change that does not line up with the survey results.
/// Data-quality errors: fix the source files and rerun.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    /// The change's `to` name has no result in the stated quarter.
    RenameTargetMissing {
        survey_end_date: NaiveDate,
        to: String,
    },

    /// The change's `from` name has no result in the preceding quarter.
    RenameSourceMissing {
        survey_end_date: NaiveDate,
        from: String,
        previous_quarter: NaiveDate,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::RenameTargetMissing {
                survey_end_date,
                to,
            } => write!(
                f,
                "{} - new name {} not found in results",
                survey_end_date, to
            ),
            ValidationError::RenameSourceMissing {
                survey_end_date,
                from,
                previous_quarter,
            } => write!(
                f,
                "{} - old name {} not found in previous quarter ({}) results",
                survey_end_date, from, previous_quarter
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// VALIDATOR
// ============================================================================

/// Check every name change against the result set.
///
/// Two independent checks per change: the new name must have a result in
/// the change's quarter, and the old name must have a result in the
/// immediately preceding quarter. Each failing check appends one error;
/// nothing aborts early and nothing is mutated. Empty = all valid.
pub fn validate_name_changes(
    results: &[SurveyResult],
    changes: &[NameChange],
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for change in changes {
        let has_target = results.iter().any(|r| {
            r.survey_end_date == change.survey_end_date && r.station_group == change.to
        });
        if !has_target {
            errors.push(ValidationError::RenameTargetMissing {
                survey_end_date: change.survey_end_date,
                to: change.to.clone(),
            });
        }

        let previous_quarter = previous_quarter_end(change.survey_end_date);
        let has_source = results.iter().any(|r| {
            r.survey_end_date == previous_quarter && r.station_group == change.from
        });
        if !has_source {
            errors.push(ValidationError::RenameSourceMissing {
                survey_end_date: change.survey_end_date,
                from: change.from.clone(),
                previous_quarter,
            });
        }
    }

    errors
}

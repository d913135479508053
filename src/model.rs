// 📊 Data Model - survey results, name changes, reconstructed stations

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// SURVEY RESULT
// ============================================================================

/// One station's reported audience figures for one quarterly survey.
///
/// The metric fields are inert cargo: reconciliation carries them through
/// untouched and never interprets their values. Immutable once parsed.
/// Durable identifiers are assigned by the persistence sink, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResult {
    /// Last day of the quarter this result reports on.
    pub survey_end_date: NaiveDate,

    /// Name the station reported under for this quarter.
    pub station_group: String,

    // Metric cargo, scaled to absolute figures at parse time.
    pub survey_period: String,
    pub population: f64,
    pub reach: f64,
    pub reach_percent: f64,
    pub avg_hours_per_head: f64,
    pub avg_hours_per_listener: f64,
    pub total_hours: f64,
    pub tsa_listening_share_percent: f64,

    /// Provenance: which report file this row came from.
    pub source_file: String,
}

impl SurveyResult {
    /// Hash for duplicate detection at the persistence layer.
    /// Deduplication key, not identity.
    pub fn idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}{}{}{}",
            self.survey_end_date, self.station_group, self.reach, self.total_hours
        ));
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// NAME CHANGE
// ============================================================================

/// Assertion that the station reporting as `from` in the previous quarter
/// reports as `to` from `survey_end_date` onwards.
///
/// Never assumed correct: the validator checks both sides against the
/// result set before any lineage is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameChange {
    pub survey_end_date: NaiveDate,
    pub from: String,
    pub to: String,
}

// ============================================================================
// STATION (reconstructed lineage)
// ============================================================================

/// The reconstructed identity of one station across quarters, despite
/// name changes.
///
/// `results` and `name_changes` are indices into the batch slices the
/// reconciler was given, in chronological order. Invariants maintained by
/// construction: every result belongs to exactly one station,
/// `latest_survey` equals the last attached result's survey end date, and
/// `current_name` equals the last attached result's station group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub current_name: String,
    pub first_survey: NaiveDate,
    pub latest_survey: NaiveDate,
    pub results: Vec<usize>,
    pub name_changes: Vec<usize>,
}

impl Station {
    /// Start a new lineage from a single result.
    pub fn seeded(name: String, survey_end_date: NaiveDate, result_index: usize) -> Self {
        Station {
            current_name: name,
            first_survey: survey_end_date,
            latest_survey: survey_end_date,
            results: vec![result_index],
            name_changes: Vec::new(),
        }
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// True if this station has ever reported under a different name.
    pub fn has_renames(&self) -> bool {
        !self.name_changes.is_empty()
    }

    /// One-line diagnostic used in consistency-violation reports.
    pub fn describe(&self) -> String {
        format!(
            "{} ({} to {}, {} results, {} renames)",
            self.current_name,
            self.first_survey,
            self.latest_survey,
            self.results.len(),
            self.name_changes.len()
        )
    }
}

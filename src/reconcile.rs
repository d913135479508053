// 🧬 Lineage Reconciliation - stitch quarterly results into stations
// Matches each incoming result to the station it continues, applies
// validated name changes, or starts a new station.

use crate::model::{NameChange, Station, SurveyResult};
use crate::period::previous_quarter_end;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// CONSISTENCY VIOLATION
// ============================================================================

/// Two live stations ended up holding the same `(name, latest survey)`
/// continuation key. The construction guarantees this cannot happen for
/// well-formed input, so it signals a broken invariant, not bad data.
/// Fatal: the run aborts rather than picking a station arbitrarily.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyViolation {
    /// The contested continuation key.
    pub station_group: String,
    pub survey_end_date: NaiveDate,

    /// Diagnostics for the station already holding the key and the one
    /// that tried to claim it.
    pub holder: String,
    pub claimant: String,
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "internal consistency violation: continuation key ({}, {}) claimed by two stations: held by {}; claimed by {}",
            self.station_group, self.survey_end_date, self.holder, self.claimant
        )
    }
}

impl std::error::Error for ConsistencyViolation {}

// ============================================================================
// RECONCILER
// ============================================================================

/// Reconstruct station lineages from survey results and validated name
/// changes.
///
/// Results are processed strictly in arrival order; the caller guarantees
/// (but this function does not enforce) that results for any one lineage
/// stream arrive in increasing survey order. For each result:
///
/// 1. Continuation: a live station with the same name whose latest survey
///    is the immediately preceding quarter gets the result attached.
/// 2. Rename: a validated change with `to` matching this result's name,
///    dated this result's quarter, whose `from` name matches a live
///    station at the preceding quarter; the result attaches there, the
///    change is recorded, and the station takes the new name.
/// 3. Otherwise the result seeds a brand-new station.
///
/// Live stations are tracked in an index keyed by
/// `(current_name, latest_survey)`, owned by this one call. A key
/// collision means two stations would answer the same continuation probe
/// and aborts the run with a [`ConsistencyViolation`].
pub fn reconcile(
    results: &[SurveyResult],
    changes: &[NameChange],
) -> Result<Vec<Station>, ConsistencyViolation> {
    let mut stations: Vec<Station> = Vec::new();

    // Continuation index over live stations: (current_name, latest_survey).
    let mut live: HashMap<(String, NaiveDate), usize> = HashMap::new();

    // Validated changes keyed by the new name and its effective survey.
    // First change wins if a key repeats, matching linear-scan semantics.
    let mut renames: HashMap<(String, NaiveDate), usize> = HashMap::new();
    for (change_index, change) in changes.iter().enumerate() {
        renames
            .entry((change.to.clone(), change.survey_end_date))
            .or_insert(change_index);
    }

    for (result_index, result) in results.iter().enumerate() {
        let previous_quarter = previous_quarter_end(result.survey_end_date);

        // 1. Straight continuation under the same name.
        let continuation_key = (result.station_group.clone(), previous_quarter);
        if let Some(station_index) = live.remove(&continuation_key) {
            let station = &mut stations[station_index];
            station.results.push(result_index);
            station.latest_survey = result.survey_end_date;
            claim_key(
                &mut live,
                &stations,
                (result.station_group.clone(), result.survey_end_date),
                station_index,
            )?;
            continue;
        }

        // 2. A validated rename whose new name matches this result.
        let rename_key = (result.station_group.clone(), result.survey_end_date);
        if let Some(&change_index) = renames.get(&rename_key) {
            let change = &changes[change_index];
            let renamed_key = (
                change.from.clone(),
                previous_quarter_end(change.survey_end_date),
            );
            if let Some(station_index) = live.remove(&renamed_key) {
                let station = &mut stations[station_index];
                station.name_changes.push(change_index);
                station.results.push(result_index);
                station.current_name = result.station_group.clone();
                station.latest_survey = result.survey_end_date;
                claim_key(
                    &mut live,
                    &stations,
                    (result.station_group.clone(), result.survey_end_date),
                    station_index,
                )?;
                continue;
            }
        }

        // 3. Nothing to continue: a new station.
        let station_index = stations.len();
        stations.push(Station::seeded(
            result.station_group.clone(),
            result.survey_end_date,
            result_index,
        ));
        claim_key(
            &mut live,
            &stations,
            (result.station_group.clone(), result.survey_end_date),
            station_index,
        )?;
    }

    Ok(stations)
}

/// Register a station under its new continuation key, failing loudly if
/// another live station already holds it.
fn claim_key(
    live: &mut HashMap<(String, NaiveDate), usize>,
    stations: &[Station],
    key: (String, NaiveDate),
    station_index: usize,
) -> Result<(), ConsistencyViolation> {
    if let Some(&holder_index) = live.get(&key) {
        return Err(ConsistencyViolation {
            station_group: key.0,
            survey_end_date: key.1,
            holder: stations[holder_index].describe(),
            claimant: stations[station_index].describe(),
        });
    }

    live.insert(key, station_index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::next_quarter_end;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn result(name: &str, survey_end_date: NaiveDate) -> SurveyResult {
        SurveyResult {
            survey_end_date,
            station_group: name.to_string(),
            survey_period: "Q".to_string(),
            population: 52_000_000.0,
            reach: 1_000_000.0,
            reach_percent: 2.0,
            avg_hours_per_head: 0.2,
            avg_hours_per_listener: 8.0,
            total_hours: 8_000_000.0,
            tsa_listening_share_percent: 1.0,
            source_file: "test.csv".to_string(),
        }
    }

    fn change(from: &str, to: &str, survey_end_date: NaiveDate) -> NameChange {
        NameChange {
            survey_end_date,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn test_continuation_under_same_name() {
        let q1 = date(2008, 12, 31);
        let q2 = next_quarter_end(q1);
        let results = vec![result("Kerrang!", q1), result("Kerrang!", q2)];

        let stations = reconcile(&results, &[]).unwrap();

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].current_name, "Kerrang!");
        assert_eq!(stations[0].first_survey, q1);
        assert_eq!(stations[0].latest_survey, q2);
        assert_eq!(stations[0].results, vec![0, 1]);
        assert!(stations[0].name_changes.is_empty());
    }

    #[test]
    fn test_rename_continuity() {
        let q1 = date(2008, 12, 31);
        let q2 = next_quarter_end(q1);
        let results = vec![result("A", q1), result("B", q2)];
        let changes = vec![change("A", "B", q2)];

        let stations = reconcile(&results, &changes).unwrap();

        assert_eq!(stations.len(), 1, "rename must not split the lineage");
        assert_eq!(stations[0].current_name, "B");
        assert_eq!(stations[0].results, vec![0, 1]);
        assert_eq!(stations[0].name_changes, vec![0]);
        assert_eq!(stations[0].first_survey, q1);
        assert_eq!(stations[0].latest_survey, q2);
    }

    #[test]
    fn test_unmatched_result_starts_new_station() {
        let q1 = date(2008, 12, 31);
        let q3 = date(2009, 6, 30);
        let results = vec![result("A", q1), result("B", q3)];

        let stations = reconcile(&results, &[]).unwrap();

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].current_name, "B");
        assert_eq!(stations[1].first_survey, q3);
        assert_eq!(stations[1].latest_survey, q3);
        assert_eq!(stations[1].result_count(), 1);
    }

    #[test]
    fn test_same_name_after_gap_is_not_stitched() {
        // A station disappears for a quarter and a result under the same
        // name shows up later: two distinct lineages, no silent fill.
        let q1 = date(2008, 12, 31);
        let q3 = date(2009, 6, 30);
        let results = vec![result("Phoenix FM", q1), result("Phoenix FM", q3)];

        let stations = reconcile(&results, &[]).unwrap();

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].latest_survey, q1);
        assert_eq!(stations[1].first_survey, q3);
    }

    #[test]
    fn test_rename_chain_across_three_quarters() {
        let q1 = date(2008, 12, 31);
        let q2 = next_quarter_end(q1);
        let q3 = next_quarter_end(q2);
        let results = vec![result("A", q1), result("B", q2), result("C", q3)];
        let changes = vec![change("A", "B", q2), change("B", "C", q3)];

        let stations = reconcile(&results, &changes).unwrap();

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].current_name, "C");
        assert_eq!(stations[0].results, vec![0, 1, 2]);
        assert_eq!(stations[0].name_changes, vec![0, 1]);
    }

    #[test]
    fn test_interleaved_stations_stay_separate() {
        let q1 = date(2008, 12, 31);
        let q2 = next_quarter_end(q1);
        let results = vec![
            result("A", q1),
            result("B", q1),
            result("A", q2),
            result("B", q2),
        ];

        let stations = reconcile(&results, &[]).unwrap();

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].results, vec![0, 2]);
        assert_eq!(stations[1].results, vec![1, 3]);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let q1 = date(2008, 12, 31);
        let q2 = next_quarter_end(q1);
        let results = vec![
            result("A", q1),
            result("B", q1),
            result("C", q2),
            result("B", q2),
        ];
        let changes = vec![change("A", "C", q2)];

        let first = reconcile(&results, &changes).unwrap();
        let second = reconcile(&results, &changes).unwrap();

        assert_eq!(first, second, "same input must yield identical lineages");
    }

    #[test]
    fn test_duplicate_name_and_quarter_fails_loudly() {
        // Two results with the same name in the same quarter would leave
        // two live stations answering the same continuation probe.
        let q1 = date(2008, 12, 31);
        let results = vec![result("A", q1), result("A", q1)];

        let violation = reconcile(&results, &[]).unwrap_err();

        assert_eq!(violation.station_group, "A");
        assert_eq!(violation.survey_end_date, q1);
        let message = violation.to_string();
        assert!(message.contains("consistency violation"));
        assert!(message.contains("2008-12-31"));
    }

    #[test]
    fn test_rename_without_live_source_starts_new_station() {
        // The change is dated right but nothing is live under the old
        // name, so the result cannot attach through it.
        let q2 = date(2009, 3, 31);
        let results = vec![result("B", q2)];
        let changes = vec![change("A", "B", q2)];

        let stations = reconcile(&results, &changes).unwrap();

        assert_eq!(stations.len(), 1);
        assert!(stations[0].name_changes.is_empty());
        assert_eq!(stations[0].first_survey, q2);
    }
}

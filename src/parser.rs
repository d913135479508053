// 📂 Input Normalization - RAJAR quarterly CSVs and name-change JSON
// Turns raw files into typed records; the survey end date comes from the
// YYYYMM token embedded in each filename.

use crate::model::{NameChange, SurveyResult};
use crate::period::period_end_from_yyyymm;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Quarterly report filenames: rajar_quarterly_listening_report_to_YYYYMM.csv
const RESULTS_PREFIX: &str = "rajar_quarterly_listening_report_to_";

/// Banner line repeated through the reports; never real data.
const BANNER_PREFIX: &str = "All Individuals 15+ for period ending";

// ============================================================================
// CSV ROW SHAPE
// ============================================================================

/// One row as it appears in the published reports. The `000s` columns are
/// scaled to absolute figures during conversion.
#[derive(Debug, Deserialize)]
struct RawResultRow {
    #[serde(rename = "Station/Group")]
    station_group: String,

    #[serde(rename = "Survey Period")]
    survey_period: String,

    #[serde(rename = "Population 000s")]
    population_000s: f64,

    #[serde(rename = "Reach 000s")]
    reach_000s: f64,

    #[serde(rename = "Reach Percent")]
    reach_percent: f64,

    #[serde(rename = "Average Hours Per Head")]
    avg_hours_per_head: f64,

    #[serde(rename = "Average Hours Per Listener")]
    avg_hours_per_listener: f64,

    #[serde(rename = "Total Hours 000s")]
    total_hours_000s: f64,

    #[serde(rename = "Listening Share In TSA %")]
    tsa_listening_share_percent: f64,
}

impl RawResultRow {
    fn into_result(self, survey_end_date: NaiveDate, source_file: &str) -> SurveyResult {
        SurveyResult {
            survey_end_date,
            station_group: self.station_group,
            survey_period: self.survey_period,
            population: self.population_000s * 1000.0,
            reach: self.reach_000s * 1000.0,
            reach_percent: self.reach_percent,
            avg_hours_per_head: self.avg_hours_per_head,
            avg_hours_per_listener: self.avg_hours_per_listener,
            total_hours: self.total_hours_000s * 1000.0,
            tsa_listening_share_percent: self.tsa_listening_share_percent,
            source_file: source_file.to_string(),
        }
    }
}

// ============================================================================
// SURVEY RESULTS
// ============================================================================

/// Load every quarterly report in `dir`, in ascending filename order so
/// quarters arrive chronologically.
pub fn load_results_dir(dir: &Path) -> Result<Vec<SurveyResult>> {
    let mut reports: Vec<(String, NaiveDate)> = Vec::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read results directory {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(date) = results_filename_date(&name) {
            reports.push((name, date));
        }
    }

    // Filename order == survey order for the YYYYMM naming scheme.
    reports.sort();

    let mut results = Vec::new();
    for (name, survey_end_date) in reports {
        results.extend(parse_results_csv(&dir.join(&name), survey_end_date, &name)?);
    }

    Ok(results)
}

/// Survey end date for a report filename, or `None` if the name does not
/// match the expected pattern.
fn results_filename_date(filename: &str) -> Option<NaiveDate> {
    let rest = filename.strip_prefix(RESULTS_PREFIX)?;
    let token = rest.strip_suffix(".csv")?;
    period_end_from_yyyymm(token)
}

/// Parse one quarterly report, stamping every row with the survey end
/// date and source filename.
pub fn parse_results_csv(
    path: &Path,
    survey_end_date: NaiveDate,
    source_file: &str,
) -> Result<Vec<SurveyResult>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    // The published files carry banner lines and blank padding rows the
    // CSV reader must never see.
    let cleaned = raw
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with(BANNER_PREFIX))
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(cleaned.as_bytes());

    let mut results = Vec::new();
    for (line, row) in reader.deserialize().enumerate() {
        let raw_row: RawResultRow = row
            .with_context(|| format!("Failed to parse row {} of {}", line + 1, source_file))?;
        results.push(raw_row.into_result(survey_end_date, source_file));
    }

    Ok(results)
}

// ============================================================================
// NAME CHANGES
// ============================================================================

/// Load every name-change file in `dir`. Each `YYYYMM.json` file holds an
/// array of `[from, to]` pairs effective at that month's survey end.
pub fn load_name_changes_dir(dir: &Path) -> Result<Vec<NameChange>> {
    let mut files: Vec<(String, NaiveDate)> = Vec::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read name change directory {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(date) = name.strip_suffix(".json").and_then(period_end_from_yyyymm) {
            files.push((name, date));
        }
    }

    files.sort();

    let mut changes = Vec::new();
    for (name, survey_end_date) in files {
        let raw = fs::read_to_string(dir.join(&name))
            .with_context(|| format!("Failed to read {}", name))?;
        let pairs: Vec<(String, String)> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse name changes in {}", name))?;

        for (from, to) in pairs {
            changes.push(NameChange {
                survey_end_date,
                from,
                to,
            });
        }
    }

    Ok(changes)
}

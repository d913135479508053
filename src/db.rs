// 💾 SQLite Persistence Sink - full-batch replace storage
// Three tables mirroring the reconciled batch: results, name_changes,
// stations. Stations reference their results and changes by UUID; the
// UUIDs are minted here, at the storage boundary, never in the core.

use crate::batch::{PersistenceSink, ReconciledBatch, StoreSummary};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Results Table - one row per station per quarterly survey
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            result_uuid TEXT UNIQUE NOT NULL,
            idempotency_hash TEXT NOT NULL,
            survey_end_date TEXT NOT NULL,
            station_group TEXT NOT NULL,
            survey_period TEXT NOT NULL,
            population REAL NOT NULL,
            reach REAL NOT NULL,
            reach_percent REAL NOT NULL,
            avg_hours_per_head REAL NOT NULL,
            avg_hours_per_listener REAL NOT NULL,
            total_hours REAL NOT NULL,
            tsa_listening_share_percent REAL NOT NULL,
            source_file TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Name Changes Table - one row per rename assertion
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS name_changes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            change_uuid TEXT UNIQUE NOT NULL,
            survey_end_date TEXT NOT NULL,
            from_name TEXT NOT NULL,
            to_name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Stations Table - one row per reconstructed lineage, referencing its
    // results and name changes by UUID (JSON arrays)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS stations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            station_uuid TEXT UNIQUE NOT NULL,
            current_name TEXT NOT NULL,
            first_survey TEXT NOT NULL,
            latest_survey TEXT NOT NULL,
            result_uuids TEXT NOT NULL,
            change_uuids TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_survey ON results(survey_end_date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_station ON results(station_group)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_hash ON results(idempotency_hash)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stations_name ON stations(current_name)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SINK
// ============================================================================

pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        setup_database(&conn)?;
        Ok(SqliteSink { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        setup_database(&conn)?;
        Ok(SqliteSink { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl PersistenceSink for SqliteSink {
    /// Store a reconciled batch, replacing whatever a previous run left
    /// behind. Runs inside one SQL transaction so a crash mid-store never
    /// leaves a half-written picture.
    fn store(&mut self, batch: &ReconciledBatch) -> Result<StoreSummary> {
        let tx = self.conn.transaction()?;

        // Full-batch replace: every run rebuilds from scratch.
        tx.execute("DELETE FROM stations", [])?;
        tx.execute("DELETE FROM name_changes", [])?;
        tx.execute("DELETE FROM results", [])?;

        let mut result_uuids = Vec::with_capacity(batch.results.len());
        for result in &batch.results {
            let result_uuid = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO results (
                    result_uuid, idempotency_hash, survey_end_date, station_group,
                    survey_period, population, reach, reach_percent,
                    avg_hours_per_head, avg_hours_per_listener, total_hours,
                    tsa_listening_share_percent, source_file
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    result_uuid,
                    result.idempotency_hash(),
                    result.survey_end_date.format(DATE_FORMAT).to_string(),
                    result.station_group,
                    result.survey_period,
                    result.population,
                    result.reach,
                    result.reach_percent,
                    result.avg_hours_per_head,
                    result.avg_hours_per_listener,
                    result.total_hours,
                    result.tsa_listening_share_percent,
                    result.source_file,
                ],
            )?;
            result_uuids.push(result_uuid);
        }

        let mut change_uuids = Vec::with_capacity(batch.name_changes.len());
        for change in &batch.name_changes {
            let change_uuid = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO name_changes (change_uuid, survey_end_date, from_name, to_name)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    change_uuid,
                    change.survey_end_date.format(DATE_FORMAT).to_string(),
                    change.from,
                    change.to,
                ],
            )?;
            change_uuids.push(change_uuid);
        }

        for station in &batch.stations {
            let station_uuid = uuid::Uuid::new_v4().to_string();
            let result_refs: Vec<&str> = station
                .results
                .iter()
                .map(|&i| result_uuids[i].as_str())
                .collect();
            let change_refs: Vec<&str> = station
                .name_changes
                .iter()
                .map(|&i| change_uuids[i].as_str())
                .collect();

            tx.execute(
                "INSERT INTO stations (
                    station_uuid, current_name, first_survey, latest_survey,
                    result_uuids, change_uuids
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    station_uuid,
                    station.current_name,
                    station.first_survey.format(DATE_FORMAT).to_string(),
                    station.latest_survey.format(DATE_FORMAT).to_string(),
                    serde_json::to_string(&result_refs)?,
                    serde_json::to_string(&change_refs)?,
                ],
            )?;
        }

        tx.commit()?;

        println!(
            "✓ Inserted {} stations, {} results and {} name changes",
            batch.stations.len(),
            batch.results.len(),
            batch.name_changes.len()
        );

        Ok(StoreSummary {
            stations: batch.stations.len(),
            results: batch.results.len(),
            name_changes: batch.name_changes.len(),
        })
    }
}

// ============================================================================
// READ-BACK
// ============================================================================

/// A station as persisted, references resolved to UUID lists.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredStation {
    pub station_uuid: String,
    pub current_name: String,
    pub first_survey: NaiveDate,
    pub latest_survey: NaiveDate,
    pub result_uuids: Vec<String>,
    pub change_uuids: Vec<String>,
}

pub fn get_all_stations(conn: &Connection) -> Result<Vec<StoredStation>> {
    let mut stmt = conn.prepare(
        "SELECT station_uuid, current_name, first_survey, latest_survey,
                result_uuids, change_uuids
         FROM stations
         ORDER BY current_name",
    )?;

    let stations = stmt
        .query_map([], |row| {
            let first_survey: String = row.get(2)?;
            let latest_survey: String = row.get(3)?;
            let result_uuids_json: String = row.get(4)?;
            let change_uuids_json: String = row.get(5)?;

            Ok(StoredStation {
                station_uuid: row.get(0)?,
                current_name: row.get(1)?,
                first_survey: NaiveDate::parse_from_str(&first_survey, DATE_FORMAT)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                latest_survey: NaiveDate::parse_from_str(&latest_survey, DATE_FORMAT)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                result_uuids: serde_json::from_str(&result_uuids_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                change_uuids: serde_json::from_str(&change_uuids_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(stations)
}

/// All stored result UUIDs, for reference checking.
pub fn get_result_uuids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT result_uuid FROM results")?;
    let uuids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(uuids)
}

pub fn count_results(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_name_changes(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM name_changes", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_stations(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM stations", [], |row| row.get(0))?;
    Ok(count)
}

// Station Lineage - Core Library
// Reconstructs the continuous identity of radio stations across quarterly
// audience surveys and name changes. Exposes all modules for the CLI and
// for tests.

pub mod batch;
pub mod db;
pub mod model;
pub mod parser;
pub mod period;
pub mod reconcile;
pub mod validation;

// Re-export commonly used types
pub use batch::{run_batch, BatchError, PersistenceSink, ReconciledBatch, StoreSummary};
pub use db::{
    count_name_changes, count_results, count_stations, get_all_stations, get_result_uuids,
    setup_database, SqliteSink, StoredStation,
};
pub use model::{NameChange, Station, SurveyResult};
pub use parser::{load_name_changes_dir, load_results_dir, parse_results_csv};
pub use period::{end_of_month, next_quarter_end, period_end_from_yyyymm, previous_quarter_end};
pub use reconcile::{reconcile, ConsistencyViolation};
pub use validation::{validate_name_changes, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! `SQLite` schema definitions for revline.

/// Vehicle catalog. Model names are unique regardless of case.
pub const CREATE_VEHICLES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS vehicles (
    model TEXT PRIMARY KEY COLLATE NOCASE,
    displacement_cc INTEGER NOT NULL,
    fuel TEXT NOT NULL,
    weight_kg INTEGER NOT NULL,
    drag_coefficient REAL NOT NULL
)
";

/// Key-value settings, including the active vehicle.
pub const CREATE_SETTINGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Completed 0-100 km/h runs.
pub const CREATE_RUNS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    seconds REAL NOT NULL,
    vehicle TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// Leaderboard lookups sort by time.
pub const CREATE_RUNS_SECONDS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_runs_seconds ON runs(seconds ASC)
";

/// Per-vehicle leaderboards.
pub const CREATE_RUNS_VEHICLE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_runs_vehicle ON runs(vehicle)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_VEHICLES_TABLE,
    CREATE_SETTINGS_TABLE,
    CREATE_RUNS_TABLE,
    CREATE_RUNS_SECONDS_INDEX,
    CREATE_RUNS_VEHICLE_INDEX,
    CREATE_METADATA_TABLE,
];

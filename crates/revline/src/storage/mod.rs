//! Storage layer for revline.
//!
//! `SQLite` holds the vehicle catalog, the active vehicle selection and the
//! history of timed runs.

pub mod catalog;
pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub use catalog::VehicleSpec;

/// Model used before anything is selected.
pub const DEFAULT_MODEL: &str = "Default";

/// Displacement used before anything is selected, cc.
pub const DEFAULT_DISPLACEMENT_CC: u32 = 2000;

const ACTIVE_MODEL_KEY: &str = "last_model";
const ACTIVE_CC_KEY: &str = "last_cc";

/// The persisted calibration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveVehicle {
    /// Selected model name.
    pub model: String,
    /// Calibrated displacement, cc.
    pub displacement_cc: u32,
}

impl Default for ActiveVehicle {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            displacement_cc: DEFAULT_DISPLACEMENT_CC,
        }
    }
}

/// A stored 0-100 km/h run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Row id.
    pub id: i64,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Elapsed time, seconds.
    pub seconds: f64,
    /// Vehicle model active during the run.
    pub vehicle: String,
}

/// Database statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    /// Catalog entries.
    pub vehicles: i64,
    /// Stored runs.
    pub runs: i64,
    /// Fastest stored run, seconds.
    pub best_run: Option<f64>,
    /// Most recent run.
    pub last_run: Option<DateTime<Utc>>,
    /// Database file size in bytes.
    pub db_size_bytes: u64,
}

/// Storage engine for vehicles, settings and runs.
#[derive(Debug)]
pub struct Storage {
    path: PathBuf,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`.
    ///
    /// Creates parent directories, initializes the schema and seeds an empty
    /// catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        let storage = Self { path, conn };
        storage.seed_catalog()?;
        info!("Database opened at {}", storage.path.display());
        Ok(storage)
    }

    /// Create an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        let storage = Self {
            path: PathBuf::from(":memory:"),
            conn,
        };
        storage.seed_catalog()?;
        Ok(storage)
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seed_catalog(&self) -> Result<()> {
        if self.vehicle_count()? > 0 {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        for entry in catalog::seed_entries() {
            Self::write_vehicle(&tx, &entry)?;
        }
        tx.commit()?;
        info!(vehicles = catalog::SEED_CATALOG.len(), "Seeded vehicle catalog");
        Ok(())
    }

    // === Vehicles ===

    /// Case-insensitive substring search on model names.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<VehicleSpec>> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = self.conn.prepare(
            r"
            SELECT model, displacement_cc, fuel, weight_kg, drag_coefficient
            FROM vehicles WHERE model LIKE ?1
            ORDER BY model LIMIT ?2
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let vehicles = stmt
            .query_map(params![pattern, limit_i64], Self::row_to_vehicle)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(vehicles)
    }

    /// Look up one model, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn vehicle(&self, model: &str) -> Result<Option<VehicleSpec>> {
        let vehicle = self
            .conn
            .query_row(
                r"
                SELECT model, displacement_cc, fuel, weight_kg, drag_coefficient
                FROM vehicles WHERE model = ?1
                ",
                [model.trim()],
                Self::row_to_vehicle,
            )
            .optional()?;
        Ok(vehicle)
    }

    /// All model names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn models(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT model FROM vehicles ORDER BY model")?;
        let models = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(models)
    }

    /// Number of catalog entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn vehicle_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert an entry, replacing one with the same model name.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is invalid or the write fails.
    pub fn upsert_vehicle(&self, spec: &VehicleSpec) -> Result<()> {
        spec.validate()?;
        Self::write_vehicle(&self.conn, spec)?;
        debug!(model = %spec.model, "Vehicle saved");
        Ok(())
    }

    /// Merge a catalog JSON file into the database.
    ///
    /// Every entry is validated before anything is written. Returns the number
    /// of entries imported.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or holds an
    /// invalid entry.
    pub fn import_catalog(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let entries = catalog::parse_catalog(&json)?;

        let tx = self.conn.unchecked_transaction()?;
        for entry in &entries {
            Self::write_vehicle(&tx, entry)?;
        }
        tx.commit()?;

        info!(path = %path.display(), imported = entries.len(), "Catalog imported");
        Ok(entries.len())
    }

    fn write_vehicle(conn: &Connection, spec: &VehicleSpec) -> Result<()> {
        conn.execute(
            r"
            INSERT INTO vehicles (model, displacement_cc, fuel, weight_kg, drag_coefficient)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(model) DO UPDATE SET
                displacement_cc = excluded.displacement_cc,
                fuel = excluded.fuel,
                weight_kg = excluded.weight_kg,
                drag_coefficient = excluded.drag_coefficient
            ",
            params![
                spec.model.trim(),
                spec.displacement_cc,
                spec.fuel,
                spec.weight_kg,
                spec.drag_coefficient,
            ],
        )?;
        Ok(())
    }

    fn row_to_vehicle(row: &rusqlite::Row) -> rusqlite::Result<VehicleSpec> {
        Ok(VehicleSpec {
            model: row.get(0)?,
            displacement_cc: row.get(1)?,
            fuel: row.get(2)?,
            weight_kg: row.get(3)?,
            drag_coefficient: row.get(4)?,
        })
    }

    // === Settings ===

    /// Remember the selected vehicle and displacement.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn save_active_vehicle(&self, model: &str, displacement_cc: u32) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            (ACTIVE_MODEL_KEY, model),
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            (ACTIVE_CC_KEY, displacement_cc.to_string()),
        )?;
        tx.commit()?;
        debug!(model, displacement_cc, "Active vehicle saved");
        Ok(())
    }

    /// The remembered selection, or `("Default", 2000)` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn active_vehicle(&self) -> Result<ActiveVehicle> {
        let model = self.setting(ACTIVE_MODEL_KEY)?;
        let cc = self.setting(ACTIVE_CC_KEY)?;

        let (Some(model), Some(cc)) = (model, cc) else {
            return Ok(ActiveVehicle::default());
        };
        match parse_displacement(&cc) {
            Some(displacement_cc) => Ok(ActiveVehicle {
                model,
                displacement_cc,
            }),
            None => {
                warn!(value = %cc, "Stored displacement is unusable, using default vehicle");
                Ok(ActiveVehicle::default())
            }
        }
    }

    fn setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    // === Runs ===

    /// Store a completed run, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_run(&self, finished: DateTime<Utc>, seconds: f64, vehicle: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO runs (timestamp, seconds, vehicle) VALUES (?1, ?2, ?3)",
            params![finished.to_rfc3339(), seconds, vehicle],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, seconds, vehicle, "Run stored");
        Ok(id)
    }

    /// Fastest runs, optionally for one vehicle.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn best_runs(&self, limit: usize, vehicle: Option<&str>) -> Result<Vec<RunRecord>> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let runs = match vehicle {
            Some(vehicle) => {
                let mut stmt = self.conn.prepare(
                    r"
                    SELECT id, timestamp, seconds, vehicle FROM runs
                    WHERE vehicle = ?1 ORDER BY seconds ASC, id ASC LIMIT ?2
                    ",
                )?;
                let rows = stmt
                    .query_map(params![vehicle, limit_i64], Self::row_to_run)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(
                    r"
                    SELECT id, timestamp, seconds, vehicle FROM runs
                    ORDER BY seconds ASC, id ASC LIMIT ?1
                    ",
                )?;
                let rows = stmt
                    .query_map([limit_i64], Self::row_to_run)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(runs)
    }

    /// Number of stored runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn run_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
        let timestamp: String = row.get(1)?;
        Ok(RunRecord {
            id: row.get(0)?,
            timestamp: parse_timestamp(&timestamp),
            seconds: row.get(2)?,
            vehicle: row.get(3)?,
        })
    }

    /// Database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let best_run: Option<f64> = self
            .conn
            .query_row("SELECT MIN(seconds) FROM runs", [], |row| row.get(0))?;
        let last_run: Option<String> = self
            .conn
            .query_row("SELECT MAX(timestamp) FROM runs", [], |row| row.get(0))?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            vehicles: self.vehicle_count()?,
            runs: self.run_count()?,
            best_run,
            last_run: last_run.as_deref().map(parse_timestamp),
            db_size_bytes,
        })
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(|_| DateTime::default(), |dt| dt.with_timezone(&Utc))
}

/// Stored displacements may be written as `2000` or `2000.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_displacement(value: &str) -> Option<u32> {
    let cc: f64 = value.trim().parse().ok()?;
    if cc.is_finite() && cc >= 1.0 && cc <= f64::from(u32::MAX) {
        Some(cc.round() as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_catalog_seeded() {
        let storage = create_test_storage();
        let count = usize::try_from(storage.vehicle_count().unwrap()).unwrap();
        assert_eq!(count, catalog::SEED_CATALOG.len());
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let storage = create_test_storage();
        let results = storage.search("wrx", 10).unwrap();
        let models: Vec<_> = results.iter().map(|v| v.model.as_str()).collect();
        assert_eq!(models, vec!["Subaru WRX", "Subaru WRX STi"]);
    }

    #[test]
    fn test_search_limit_and_no_match() {
        let storage = create_test_storage();
        assert_eq!(storage.search("subaru", 2).unwrap().len(), 2);
        assert!(storage.search("Trabant", 10).unwrap().is_empty());
    }

    #[test]
    fn test_vehicle_lookup() {
        let storage = create_test_storage();
        let golf = storage.vehicle("volkswagen golf r").unwrap().unwrap();
        assert_eq!(golf.model, "Volkswagen Golf R");
        assert_eq!(golf.displacement_cc, 1984);
        assert_eq!(golf.weight_kg, 1483);
        assert!(storage.vehicle("Nope").unwrap().is_none());
    }

    #[test]
    fn test_models_sorted() {
        let storage = create_test_storage();
        let models = storage.models().unwrap();
        let mut sorted = models.clone();
        sorted.sort();
        assert_eq!(models, sorted);
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let storage = create_test_storage();
        let before = storage.vehicle_count().unwrap();

        storage
            .upsert_vehicle(&VehicleSpec::new("Nissan GT-R", 3800, "Petrol", 1752, 0.26))
            .unwrap();
        assert_eq!(storage.vehicle_count().unwrap(), before);
        assert_eq!(
            storage.vehicle("Nissan GT-R").unwrap().unwrap().displacement_cc,
            3800
        );

        storage
            .upsert_vehicle(&VehicleSpec::new("Lotus Elise", 1796, "Petrol", 876, 0.34))
            .unwrap();
        assert_eq!(storage.vehicle_count().unwrap(), before + 1);
    }

    #[test]
    fn test_upsert_rejects_invalid() {
        let storage = create_test_storage();
        let result = storage.upsert_vehicle(&VehicleSpec::new("Zero", 0, "Petrol", 900, 0.3));
        assert!(matches!(result, Err(Error::InvalidDisplacement { .. })));
        assert!(storage.vehicle("Zero").unwrap().is_none());
    }

    #[test]
    fn test_import_catalog() {
        let storage = create_test_storage();
        let path = std::env::temp_dir().join(format!("revline_catalog_{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"[
                {"model": "Mazda MX-5", "cc": 1998, "fuel": "Petrol", "weight": 1060, "drag": 0.38},
                {"model": "Honda Fit RS", "cc": 1497, "fuel": "Petrol", "weight": 1080, "drag": 0.31}
            ]"#,
        )
        .unwrap();

        assert_eq!(storage.import_catalog(&path).unwrap(), 2);
        assert!(storage.vehicle("Mazda MX-5").unwrap().is_some());
        assert_eq!(
            storage.vehicle("Honda Fit RS").unwrap().unwrap().displacement_cc,
            1497
        );
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let storage = create_test_storage();
        let path = std::env::temp_dir().join(format!(
            "revline_catalog_bad_{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"[{"model": "Good", "cc": 1600, "weight": 1100}, {"model": "Bad", "cc": 0, "weight": 1}]"#,
        )
        .unwrap();

        assert!(storage.import_catalog(&path).is_err());
        assert!(storage.vehicle("Good").unwrap().is_none());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_import_missing_file() {
        let storage = create_test_storage();
        assert!(matches!(
            storage.import_catalog("/nonexistent/catalog.json"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_active_vehicle_defaults() {
        let storage = create_test_storage();
        assert_eq!(storage.active_vehicle().unwrap(), ActiveVehicle::default());
        assert_eq!(ActiveVehicle::default().model, "Default");
        assert_eq!(ActiveVehicle::default().displacement_cc, 2000);
    }

    #[test]
    fn test_active_vehicle_roundtrip() {
        let storage = create_test_storage();
        storage.save_active_vehicle("Nissan GT-R", 3799).unwrap();
        storage.save_active_vehicle("Honda Fit RS", 1496).unwrap();

        let active = storage.active_vehicle().unwrap();
        assert_eq!(active.model, "Honda Fit RS");
        assert_eq!(active.displacement_cc, 1496);
    }

    #[test]
    fn test_active_vehicle_reads_float_cc() {
        let storage = create_test_storage();
        storage.save_active_vehicle("Legacy", 1).unwrap();
        storage
            .conn
            .execute("UPDATE settings SET value = '1998.0' WHERE key = 'last_cc'", [])
            .unwrap();
        assert_eq!(storage.active_vehicle().unwrap().displacement_cc, 1998);
    }

    #[test]
    fn test_parse_displacement() {
        assert_eq!(parse_displacement("2000"), Some(2000));
        assert_eq!(parse_displacement(" 1496.4 "), Some(1496));
        assert_eq!(parse_displacement("0"), None);
        assert_eq!(parse_displacement("-5"), None);
        assert_eq!(parse_displacement("lots"), None);
    }

    #[test]
    fn test_best_runs_ordering() {
        let storage = create_test_storage();
        storage.record_run(t(0), 7.4, "Subaru WRX").unwrap();
        storage.record_run(t(60), 6.1, "Subaru WRX").unwrap();
        storage.record_run(t(120), 5.2, "Nissan GT-R").unwrap();
        storage.record_run(t(180), 6.8, "Subaru WRX").unwrap();

        let all: Vec<f64> = storage
            .best_runs(3, None)
            .unwrap()
            .iter()
            .map(|r| r.seconds)
            .collect();
        assert_eq!(all, vec![5.2, 6.1, 6.8]);

        let wrx = storage.best_runs(10, Some("Subaru WRX")).unwrap();
        assert_eq!(wrx.len(), 3);
        assert!((wrx[0].seconds - 6.1).abs() < f64::EPSILON);
        assert_eq!(wrx[0].timestamp, t(60));
    }

    #[test]
    fn test_stats() {
        let storage = create_test_storage();
        let empty = storage.stats().unwrap();
        assert_eq!(empty.runs, 0);
        assert!(empty.best_run.is_none());
        assert!(empty.last_run.is_none());
        assert_eq!(empty.db_size_bytes, 0);

        storage.record_run(t(0), 7.0, "Default").unwrap();
        storage.record_run(t(30), 6.5, "Default").unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.best_run, Some(6.5));
        assert_eq!(stats.last_run, Some(t(30)));
    }

    #[test]
    fn test_open_file_based_persists() {
        let db_path = std::env::temp_dir().join(format!("revline_test_{}.db", std::process::id()));

        {
            let storage = Storage::open(&db_path).unwrap();
            storage.save_active_vehicle("Subaru WRX", 2499).unwrap();
            assert_eq!(storage.path(), db_path);
            assert!(storage.stats().unwrap().db_size_bytes > 0);
        }

        let reopened = Storage::open(&db_path).unwrap();
        assert_eq!(reopened.active_vehicle().unwrap().model, "Subaru WRX");
        let count = usize::try_from(reopened.vehicle_count().unwrap()).unwrap();
        assert_eq!(count, catalog::SEED_CATALOG.len());

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let nested_path = std::env::temp_dir().join(format!(
            "revline_test_{}/nested/vehicles.db",
            std::process::id()
        ));
        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        if let Some(root) = nested_path.parent().and_then(Path::parent) {
            let _ = std::fs::remove_dir_all(root);
        }
    }
}

//! SQLite program database
//!
//! The program database is the authoritative store for every FMEA row. FMEA
//! trees are built from it on demand and are never persisted themselves.
//!
//! Unlike a cache, the program database is never dropped and rebuilt: the
//! schema is created on first open and a newer schema version is refused.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Connection to an RTK program database
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open or create a program database file
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(|source| DatabaseError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let db = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        db.init()?;
        debug!(path = %path.display(), "opened program database");
        Ok(db)
    }

    /// Open a throwaway database held in memory
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        let db = Self { conn, path: None };
        db.init()?;
        Ok(db)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Location of the database file (`None` when in memory)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(DatabaseError::Schema)?;

        self.init_schema()?;

        let version: Option<i32> = self
            .conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .optional()
            .map_err(DatabaseError::Schema)?
            .flatten();

        match version {
            None => {
                self.conn
                    .execute(
                        "INSERT INTO schema_version (version) VALUES (?1)",
                        params![SCHEMA_VERSION],
                    )
                    .map_err(DatabaseError::Schema)?;
            }
            Some(found) if found > SCHEMA_VERSION => {
                return Err(DatabaseError::UnsupportedVersion {
                    found,
                    expected: SCHEMA_VERSION,
                });
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Create all tables that do not exist yet
    fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Failure modes, owned by a function or a hardware item
            CREATE TABLE IF NOT EXISTS rtk_mode (
                mode_id INTEGER PRIMARY KEY AUTOINCREMENT,
                function_id INTEGER NOT NULL DEFAULT -1,
                hardware_id INTEGER NOT NULL DEFAULT -1,
                description TEXT DEFAULT '',
                mission TEXT DEFAULT '',
                mission_phase TEXT DEFAULT '',
                effect_local TEXT DEFAULT '',
                effect_next TEXT DEFAULT '',
                effect_end TEXT DEFAULT '',
                detection_method TEXT DEFAULT '',
                other_indications TEXT DEFAULT '',
                isolation_method TEXT DEFAULT '',
                design_provisions TEXT DEFAULT '',
                operator_actions TEXT DEFAULT '',
                severity_class TEXT DEFAULT '',
                hazard_rate_source TEXT DEFAULT '',
                mode_probability TEXT DEFAULT '',
                mode_ratio REAL DEFAULT 0.0,
                mode_op_time REAL DEFAULT 0.0,
                effect_probability REAL DEFAULT 0.0,
                mode_hazard_rate REAL DEFAULT 0.0,
                mode_criticality REAL DEFAULT 0.0,
                rpn_severity INTEGER DEFAULT 1,
                rpn_severity_new INTEGER DEFAULT 1,
                critical_item INTEGER DEFAULT 0,
                single_point INTEGER DEFAULT 0,
                remarks TEXT DEFAULT '',
                CHECK ((function_id = -1) <> (hardware_id = -1))
            );
            CREATE INDEX IF NOT EXISTS idx_mode_function ON rtk_mode(function_id);
            CREATE INDEX IF NOT EXISTS idx_mode_hardware ON rtk_mode(hardware_id);

            -- Failure mechanisms
            CREATE TABLE IF NOT EXISTS rtk_mechanism (
                mechanism_id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode_id INTEGER NOT NULL,
                description TEXT DEFAULT '',
                pof_include INTEGER DEFAULT 1,
                rpn INTEGER DEFAULT 0,
                rpn_new INTEGER DEFAULT 0,
                rpn_occurrence INTEGER DEFAULT 10,
                rpn_occurrence_new INTEGER DEFAULT 10,
                rpn_detection INTEGER DEFAULT 10,
                rpn_detection_new INTEGER DEFAULT 10,
                FOREIGN KEY (mode_id) REFERENCES rtk_mode(mode_id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_mechanism_mode ON rtk_mechanism(mode_id);

            -- Failure causes
            CREATE TABLE IF NOT EXISTS rtk_cause (
                cause_id INTEGER PRIMARY KEY AUTOINCREMENT,
                mechanism_id INTEGER NOT NULL,
                description TEXT DEFAULT '',
                rpn INTEGER DEFAULT 0,
                rpn_new INTEGER DEFAULT 0,
                rpn_occurrence INTEGER DEFAULT 10,
                rpn_occurrence_new INTEGER DEFAULT 10,
                rpn_detection INTEGER DEFAULT 10,
                rpn_detection_new INTEGER DEFAULT 10,
                FOREIGN KEY (mechanism_id) REFERENCES rtk_mechanism(mechanism_id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_cause_mechanism ON rtk_cause(mechanism_id);

            -- Design controls, under a mode (functional) or a cause (hardware)
            CREATE TABLE IF NOT EXISTS rtk_control (
                control_id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode_id INTEGER NOT NULL DEFAULT -1,
                cause_id INTEGER NOT NULL DEFAULT -1,
                description TEXT DEFAULT '',
                type_id TEXT DEFAULT '',
                CHECK ((mode_id = -1) <> (cause_id = -1))
            );
            CREATE INDEX IF NOT EXISTS idx_control_mode ON rtk_control(mode_id);
            CREATE INDEX IF NOT EXISTS idx_control_cause ON rtk_control(cause_id);

            -- Recommended actions, same parent rule as controls
            CREATE TABLE IF NOT EXISTS rtk_action (
                action_id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode_id INTEGER NOT NULL DEFAULT -1,
                cause_id INTEGER NOT NULL DEFAULT -1,
                action_recommended TEXT DEFAULT '',
                action_category TEXT DEFAULT '',
                action_owner TEXT DEFAULT '',
                action_due_date TEXT,
                action_status TEXT DEFAULT '',
                action_taken TEXT DEFAULT '',
                action_approved INTEGER DEFAULT 0,
                action_approve_date TEXT,
                action_closed INTEGER DEFAULT 0,
                action_close_date TEXT,
                CHECK ((mode_id = -1) <> (cause_id = -1))
            );
            CREATE INDEX IF NOT EXISTS idx_action_mode ON rtk_action(mode_id);
            CREATE INDEX IF NOT EXISTS idx_action_cause ON rtk_action(cause_id);
            "#,
            )
            .map_err(DatabaseError::Schema)?;

        Ok(())
    }
}

/// Errors opening or initializing a program database
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("failed to open program database {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to initialize program database schema: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("program database schema version {found} is newer than supported version {expected}")]
    UnsupportedVersion { found: i32, expected: i32 },

    #[error("IO error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_file_and_schema() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join(".rtk/program.db");

        let db = Database::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
        let tables: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE 'rtk_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("program.db");

        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute("INSERT INTO rtk_mode (function_id) VALUES (1)", [])
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM rtk_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_refuses_newer_schema() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("program.db");

        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute("INSERT INTO schema_version (version) VALUES (99)", [])
                .unwrap();
        }

        let err = Database::open(&path).err().unwrap();
        assert!(matches!(
            err,
            DatabaseError::UnsupportedVersion { found: 99, .. }
        ));
    }

    #[test]
    fn test_exclusive_parent_check() {
        let db = Database::open_in_memory().unwrap();

        let both = db.conn().execute(
            "INSERT INTO rtk_control (mode_id, cause_id) VALUES (1, 2)",
            [],
        );
        assert!(both.is_err());

        let neither = db
            .conn()
            .execute("INSERT INTO rtk_mode (description) VALUES ('x')", []);
        assert!(neither.is_err());
    }
}

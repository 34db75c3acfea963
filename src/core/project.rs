//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::database::{Database, DatabaseError};

/// Name of the per-project directory
pub const RTK_DIR: &str = ".rtk";

/// Default program database file inside `.rtk/`
pub const DATABASE_FILE: &str = "program.db";

/// Represents an RTK project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .rtk/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(RTK_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project at the given path
    ///
    /// Writes `.rtk/config.yaml` and creates an empty program database.
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        if root.join(RTK_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::init_force(&root)
    }

    /// Initialize even if .rtk/ exists
    ///
    /// The config file is rewritten; an existing program database is kept.
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        let project = Self { root };
        std::fs::create_dir_all(project.rtk_dir())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(project.config_path(), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        project.open_database(None)?;
        Ok(project)
    }

    fn default_config() -> &'static str {
        r#"# RTK Project Configuration

# Program database, relative to the project root (default: .rtk/program.db)
# database: .rtk/program.db

# Default FMEA kind for `rtk fmea` commands (true = functional, false = hardware)
# functional: false

# Log filter and format (pretty, json); RTK_LOG and RTK_LOG_FORMAT override these
# log_level: warn
# log_format: pretty

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .rtk configuration directory
    pub fn rtk_dir(&self) -> PathBuf {
        self.root.join(RTK_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.rtk_dir().join("config.yaml")
    }

    /// Program database location, honoring an override relative to the root
    pub fn database_path(&self, configured: Option<&Path>) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.root.join(path),
            None => self.rtk_dir().join(DATABASE_FILE),
        }
    }

    /// Open (creating if needed) the project's program database
    pub fn open_database(&self, configured: Option<&Path>) -> Result<Database, ProjectError> {
        Ok(Database::open(&self.database_path(configured))?)
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not an RTK project (searched from {searched_from:?}). Run 'rtk init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("RTK project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.rtk_dir().is_dir());
        assert!(project.config_path().exists());
        assert!(project.rtk_dir().join("program.db").exists());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_project_init_force_keeps_database() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        project
            .open_database(None)
            .unwrap()
            .conn()
            .execute("INSERT INTO rtk_mode (hardware_id) VALUES (1)", [])
            .unwrap();

        let project = Project::init_force(tmp.path()).unwrap();
        let count: i64 = project
            .open_database(None)
            .unwrap()
            .conn()
            .query_row("SELECT COUNT(*) FROM rtk_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_project_discover_finds_rtk_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_rtk_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_database_path_override() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert_eq!(
            project.database_path(None),
            project.rtk_dir().join("program.db")
        );
        assert_eq!(
            project.database_path(Some(Path::new("data/other.db"))),
            project.root().join("data/other.db")
        );
    }
}

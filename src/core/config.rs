//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::Project;

/// Log output format for the binary's subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("unknown log format '{}' (expected pretty or json)", s)),
        }
    }
}

/// RTK configuration with layered hierarchy
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program database path, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Log filter directive (e.g. "warn", "rtk=debug")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<LogFormat>,

    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,

    /// Default FMEA kind (true = functional, false = hardware)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functional: Option<bool>,
}

impl Config {
    /// Load configuration from all sources, discovering the project from the
    /// current directory
    pub fn load() -> Self {
        Self::load_for(Project::discover().ok().as_ref())
    }

    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/rtk/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.rtk/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(database) = std::env::var("RTK_DATABASE") {
            config.database = Some(PathBuf::from(database));
        }
        if let Ok(level) = std::env::var("RTK_LOG") {
            config.log_level = Some(level);
        }
        if let Ok(format) = std::env::var("RTK_LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                config.log_format = Some(format);
            }
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        let contents = std::fs::read_to_string(path).ok()?;
        serde_yml::from_str::<Config>(&contents).ok()
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rtk")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.log_format.is_some() {
            self.log_format = other.log_format;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.functional.is_some() {
            self.functional = other.functional;
        }
    }

    /// Log filter directive, "warn" unless configured
    pub fn log_filter(&self) -> String {
        self.log_level.clone().unwrap_or_else(|| "warn".to_string())
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_default()
    }

    /// True if `rtk fmea` commands default to a functional FMEA
    pub fn functional(&self) -> bool {
        self.functional.unwrap_or(false)
    }
}

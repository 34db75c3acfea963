//! Core module - fundamental types and utilities

pub mod config;
pub mod database;
pub mod path;
pub mod project;
pub mod record;

pub use config::{Config, LogFormat};
pub use database::{Database, DatabaseError};
pub use path::{Level, NodeKey, PathError, Segment};
pub use project::{Project, ProjectError};
pub use record::{AttributeError, Attributes, Record};

//! FMEA error taxonomy
//!
//! Every error carries the numeric code reported to callers alongside its
//! message. Several distinct failures deliberately share a code (2005 covers
//! every "could not add or remove" case) and are told apart by variant.

use miette::Diagnostic;
use thiserror::Error;

use crate::core::path::{Level, PathError};
use crate::core::record::AttributeError;
use crate::entities::{CriticalityError, RatingError};
use crate::fmea::model::FmeaKind;
use crate::fmea::repository::RepositoryError;
use crate::fmea::tree::TreeError;

/// Code for failures adding, removing or locating FMEA items
pub const CODE_NOT_FOUND: i32 = 2005;
/// Code for failures saving FMEA items
pub const CODE_SAVE_FAILED: i32 = 2006;
/// Code for invalid criticality inputs
pub const CODE_CRITICALITY: i32 = 2010;
/// Code for invalid RPN ratings
pub const CODE_RATING: i32 = 2020;
/// Code for rows rejected by the program database
pub const CODE_CONSTRAINT: i32 = 3;
/// Code for any other program database failure
pub const CODE_STORE: i32 = 1;

#[derive(Debug, Error, Diagnostic)]
pub enum FmeaError {
    #[error(
        "Attempted to add an item to the FMEA with an undefined indenture level.  \
         Level {0} was requested.  Must be one of mode, mechanism, cause, control, or action."
    )]
    #[diagnostic(code(rtk::fmea::invalid_level))]
    InvalidLevel(String),

    #[error("Attempted to add an item under non-existent Node ID: {0}.")]
    #[diagnostic(code(rtk::fmea::parent_not_found))]
    ParentNotFound(String),

    #[error("Attempted to add a {level} under Node ID {parent}, which a {kind} FMEA does not allow.")]
    #[diagnostic(
        code(rtk::fmea::level_not_allowed),
        help("mechanisms go under modes, causes under mechanisms; controls and actions go under modes (functional) or causes (hardware)")
    )]
    LevelNotAllowed {
        level: Level,
        parent: String,
        kind: FmeaKind,
    },

    #[error("Attempted to add an item under Node ID {parent} for parent ID {given}, but that node belongs to ID {expected}.")]
    #[diagnostic(code(rtk::fmea::parent_mismatch))]
    ParentMismatch {
        parent: String,
        given: i64,
        expected: i64,
    },

    #[error("No FMEA has been selected.")]
    #[diagnostic(code(rtk::fmea::not_selected), help("select an FMEA before changing it"))]
    NotSelected,

    #[error("Attempted to delete non-existent entity with Node ID {0} from the FMEA.")]
    #[diagnostic(code(rtk::fmea::delete_not_found))]
    DeleteNotFound(String),

    #[error("Attempted to save non-existent entity with Node ID {0}.")]
    #[diagnostic(code(rtk::fmea::update_not_found))]
    UpdateNotFound(String),

    #[error("No entity with Node ID {0} exists in the FMEA.")]
    #[diagnostic(code(rtk::fmea::node_not_found))]
    NodeNotFound(String),

    #[error("Failed to calculate criticality for failure mode {mode_id}: {source}")]
    #[diagnostic(code(rtk::fmea::criticality))]
    InvalidCriticalityInput {
        mode_id: i64,
        #[source]
        source: CriticalityError,
    },

    #[error("Failed to calculate RPN for Node ID {node}: {source}")]
    #[diagnostic(code(rtk::fmea::rating))]
    InvalidRating {
        node: String,
        #[source]
        source: RatingError,
    },

    #[error("{}", partial_failure_message(.saved, .failures))]
    #[diagnostic(code(rtk::fmea::partial_failure))]
    PartialFailure {
        saved: usize,
        failures: Vec<FmeaError>,
    },

    #[error("{source}")]
    #[diagnostic(code(rtk::fmea::attribute))]
    Attribute {
        #[from]
        source: AttributeError,
    },

    #[error(transparent)]
    #[diagnostic(code(rtk::fmea::invalid_path))]
    InvalidPath(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(code(rtk::fmea::tree))]
    Tree(#[from] TreeError),

    #[error("The program database rejected the {table} row: {source}")]
    #[diagnostic(code(rtk::fmea::constraint))]
    ConstraintViolation {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Program database error: {0}")]
    #[diagnostic(code(rtk::fmea::store))]
    Store(#[source] rusqlite::Error),
}

impl FmeaError {
    /// Numeric error code reported to callers
    pub fn code(&self) -> i32 {
        match self {
            FmeaError::InvalidLevel(_)
            | FmeaError::ParentNotFound(_)
            | FmeaError::LevelNotAllowed { .. }
            | FmeaError::ParentMismatch { .. }
            | FmeaError::NotSelected
            | FmeaError::DeleteNotFound(_)
            | FmeaError::NodeNotFound(_)
            | FmeaError::InvalidPath(_)
            | FmeaError::Tree(_) => CODE_NOT_FOUND,
            FmeaError::UpdateNotFound(_) => CODE_SAVE_FAILED,
            FmeaError::InvalidCriticalityInput { .. } => CODE_CRITICALITY,
            FmeaError::InvalidRating { .. } => CODE_RATING,
            FmeaError::PartialFailure { failures, .. } => failures
                .last()
                .map(FmeaError::code)
                .unwrap_or(CODE_SAVE_FAILED),
            FmeaError::Attribute { source } => source.code(),
            FmeaError::ConstraintViolation { .. } => CODE_CONSTRAINT,
            FmeaError::Store(_) => CODE_STORE,
        }
    }
}

fn partial_failure_message(saved: &usize, failures: &[FmeaError]) -> String {
    let last = failures.last().map(|e| e.to_string()).unwrap_or_default();
    format!(
        "{} of {} FMEA items could not be saved; last error: {}",
        failures.len(),
        failures.len() + saved,
        last
    )
}

impl From<RepositoryError> for FmeaError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { table, id } => {
                FmeaError::NodeNotFound(format!("{} {}", table, id))
            }
            RepositoryError::Constraint { table, source } => {
                FmeaError::ConstraintViolation { table, source }
            }
            RepositoryError::Store(source) => FmeaError::Store(source),
        }
    }
}

impl From<rusqlite::Error> for FmeaError {
    fn from(err: rusqlite::Error) -> Self {
        FmeaError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_message() {
        let err = FmeaError::InvalidLevel("juice".to_string());
        assert_eq!(err.code(), 2005);
        assert_eq!(
            err.to_string(),
            "Attempted to add an item to the FMEA with an undefined indenture level.  \
             Level juice was requested.  Must be one of mode, mechanism, cause, control, or action."
        );
    }

    #[test]
    fn test_unknown_level_and_parent_share_code() {
        let level = FmeaError::InvalidLevel("scadamoosh".to_string());
        let parent = FmeaError::ParentNotFound("mode_1".to_string());
        assert_eq!(level.code(), parent.code());
        assert_eq!(
            parent.to_string(),
            "Attempted to add an item under non-existent Node ID: mode_1."
        );
    }

    #[test]
    fn test_partial_failure_reports_last_code() {
        let err = FmeaError::PartialFailure {
            saved: 3,
            failures: vec![
                FmeaError::UpdateNotFound("0.1".to_string()),
                FmeaError::UpdateNotFound("0.2".to_string()),
            ],
        };
        assert_eq!(err.code(), 2006);
        assert!(err.to_string().starts_with("2 of 5 FMEA items"));
        assert!(err.to_string().contains("Node ID 0.2"));
    }

    #[test]
    fn test_attribute_codes_pass_through() {
        let err = FmeaError::from(AttributeError::Missing {
            record: "Control",
            name: "type_id".to_string(),
        });
        assert_eq!(err.code(), 40);
    }
}

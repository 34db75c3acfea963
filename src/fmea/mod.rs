//! FMEA hierarchy engine
//!
//! Repositories persist the five entity kinds, the model assembles them into
//! one tree per analysis subject, and the controller fronts the model for
//! callers that want notifications.

pub mod controller;
pub mod error;
pub mod model;
pub mod notify;
pub mod repository;
pub mod tree;

pub use controller::FmeaController;
pub use error::FmeaError;
pub use model::{FmeaKind, FmeaModel, Scope};
pub use notify::{FmeaEvent, NotificationBus};
pub use repository::{Repository, RepositoryError};
pub use tree::{FmeaTree, Node, TreeError, ROOT_TAG};

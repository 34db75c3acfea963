//! FMEA recommended action entity

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::path::Level;
use crate::core::record::Record;
use crate::entities::mode::NO_PARENT;

/// A recommended corrective action
///
/// Same parent rule as controls: a mode in a functional FMEA, a cause in a
/// hardware FMEA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Action {
    pub action_id: i64,
    pub mode_id: i64,
    pub cause_id: i64,

    pub action_recommended: String,
    pub action_category: String,
    pub action_owner: String,
    pub action_due_date: Option<NaiveDate>,
    pub action_status: String,
    pub action_taken: String,

    pub action_approved: i32,
    pub action_approve_date: Option<NaiveDate>,
    pub action_closed: i32,
    pub action_close_date: Option<NaiveDate>,
}

impl Default for Action {
    fn default() -> Self {
        Self {
            action_id: 0,
            mode_id: NO_PARENT,
            cause_id: NO_PARENT,
            action_recommended: String::new(),
            action_category: String::new(),
            action_owner: String::new(),
            action_due_date: None,
            action_status: String::new(),
            action_taken: String::new(),
            action_approved: 0,
            action_approve_date: None,
            action_closed: 0,
            action_close_date: None,
        }
    }
}

impl Record for Action {
    const NAME: &'static str = "Action";
    const TABLE: &'static str = "rtk_action";
    const KEY: &'static str = "action_id";
    const COLUMNS: &'static [&'static str] = &[
        "mode_id",
        "cause_id",
        "action_recommended",
        "action_category",
        "action_owner",
        "action_due_date",
        "action_status",
        "action_taken",
        "action_approved",
        "action_approve_date",
        "action_closed",
        "action_close_date",
    ];
    const PARENT_COLUMNS: &'static [&'static str] = &["mode_id", "cause_id"];
    const LEVEL: Level = Level::Action;
    const FLAGS: &'static [&'static str] = &["action_approved", "action_closed"];

    fn id(&self) -> i64 {
        self.action_id
    }

    fn set_id(&mut self, id: i64) {
        self.action_id = id;
    }

    fn description(&self) -> &str {
        &self.action_recommended
    }
}

impl Action {
    /// Create an unsaved action under a mode (functional FMEA)
    pub fn for_mode(mode_id: i64) -> Self {
        Self {
            mode_id,
            ..Self::default()
        }
    }

    /// Create an unsaved action under a cause (hardware FMEA)
    pub fn for_cause(cause_id: i64) -> Self {
        Self {
            cause_id,
            ..Self::default()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.action_closed != 0
    }
}

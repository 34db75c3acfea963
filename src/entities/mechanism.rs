//! Failure mechanism entity (child of a failure mode)

use serde::{Deserialize, Serialize};

use crate::core::path::Level;
use crate::core::record::Record;
use crate::entities::mode::NO_PARENT;
use crate::entities::rpn::{RpnInputs, MAX_RATING};

/// A physical or chemical process leading to a failure mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mechanism {
    pub mechanism_id: i64,
    pub mode_id: i64,
    pub description: String,

    /// Include in physics of failure analysis
    pub pof_include: i32,

    pub rpn: i32,
    pub rpn_new: i32,
    pub rpn_occurrence: i32,
    pub rpn_occurrence_new: i32,
    pub rpn_detection: i32,
    pub rpn_detection_new: i32,
}

impl Default for Mechanism {
    fn default() -> Self {
        Self {
            mechanism_id: 0,
            mode_id: NO_PARENT,
            description: String::new(),
            pof_include: 1,
            rpn: 0,
            rpn_new: 0,
            rpn_occurrence: MAX_RATING,
            rpn_occurrence_new: MAX_RATING,
            rpn_detection: MAX_RATING,
            rpn_detection_new: MAX_RATING,
        }
    }
}

impl Record for Mechanism {
    const NAME: &'static str = "Mechanism";
    const TABLE: &'static str = "rtk_mechanism";
    const KEY: &'static str = "mechanism_id";
    const COLUMNS: &'static [&'static str] = &[
        "mode_id",
        "description",
        "pof_include",
        "rpn",
        "rpn_new",
        "rpn_occurrence",
        "rpn_occurrence_new",
        "rpn_detection",
        "rpn_detection_new",
    ];
    const PARENT_COLUMNS: &'static [&'static str] = &["mode_id"];
    const LEVEL: Level = Level::Mechanism;
    const FLAGS: &'static [&'static str] = &["pof_include"];

    fn id(&self) -> i64 {
        self.mechanism_id
    }

    fn set_id(&mut self, id: i64) {
        self.mechanism_id = id;
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl RpnInputs for Mechanism {
    fn occurrence(&self) -> (i32, i32) {
        (self.rpn_occurrence, self.rpn_occurrence_new)
    }

    fn detection(&self) -> (i32, i32) {
        (self.rpn_detection, self.rpn_detection_new)
    }

    fn store_rpn(&mut self, rpn: i32, rpn_new: i32) {
        self.rpn = rpn;
        self.rpn_new = rpn_new;
    }
}

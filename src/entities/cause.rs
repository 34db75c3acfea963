//! Failure cause entity (child of a failure mechanism)

use serde::{Deserialize, Serialize};

use crate::core::path::Level;
use crate::core::record::Record;
use crate::entities::mode::NO_PARENT;
use crate::entities::rpn::{RpnInputs, MAX_RATING};

/// A root cause of a failure mechanism
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cause {
    pub cause_id: i64,
    pub mechanism_id: i64,
    pub description: String,

    pub rpn: i32,
    pub rpn_new: i32,
    pub rpn_occurrence: i32,
    pub rpn_occurrence_new: i32,
    pub rpn_detection: i32,
    pub rpn_detection_new: i32,
}

impl Default for Cause {
    fn default() -> Self {
        Self {
            cause_id: 0,
            mechanism_id: NO_PARENT,
            description: String::new(),
            rpn: 0,
            rpn_new: 0,
            rpn_occurrence: MAX_RATING,
            rpn_occurrence_new: MAX_RATING,
            rpn_detection: MAX_RATING,
            rpn_detection_new: MAX_RATING,
        }
    }
}

impl Record for Cause {
    const NAME: &'static str = "Cause";
    const TABLE: &'static str = "rtk_cause";
    const KEY: &'static str = "cause_id";
    const COLUMNS: &'static [&'static str] = &[
        "mechanism_id",
        "description",
        "rpn",
        "rpn_new",
        "rpn_occurrence",
        "rpn_occurrence_new",
        "rpn_detection",
        "rpn_detection_new",
    ];
    const PARENT_COLUMNS: &'static [&'static str] = &["mechanism_id"];
    const LEVEL: Level = Level::Cause;

    fn id(&self) -> i64 {
        self.cause_id
    }

    fn set_id(&mut self, id: i64) {
        self.cause_id = id;
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl RpnInputs for Cause {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_rpn() {
        let mut cause = Cause {
            rpn_occurrence: 7,
            rpn_detection: 4,
            rpn_occurrence_new: 5,
            rpn_detection_new: 3,
            ..Cause::default()
        };

        assert_eq!(cause.calculate_rpn(7, 4).unwrap(), (196, 60));
        assert_eq!(cause.rpn, 196);
        assert_eq!(cause.rpn_new, 60);
    }

    #[test]
    fn test_attribute_roundtrip_through_map() {
        let mut cause = Cause {
            cause_id: 3,
            mechanism_id: 1,
            ..Cause::default()
        };
        let mut attributes = cause.get_attributes();
        attributes.insert("rpn_occurrence".to_string(), serde_json::json!(2));
        attributes.insert("description".to_string(), serde_json::json!("Corrosion"));

        cause.set_attributes(&attributes).unwrap();

        assert_eq!(cause.rpn_occurrence, 2);
        assert_eq!(cause.description, "Corrosion");
        assert_eq!(cause.mechanism_id, 1);
    }

    #[test]
    fn test_set_attributes_wrong_type() {
        let mut cause = Cause::default();
        let mut attributes = cause.get_attributes();
        attributes.insert("rpn_detection".to_string(), serde_json::json!("often"));

        let err = cause.set_attributes(&attributes).unwrap_err();
        assert_eq!(err.code(), 10);
        assert_eq!(cause.rpn_detection, 10);
    }
}

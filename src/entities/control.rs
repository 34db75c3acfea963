//! FMEA control entity (design control attached to a mode or cause)

use serde::{Deserialize, Serialize};

use crate::core::path::Level;
use crate::core::record::Record;
use crate::entities::mode::NO_PARENT;

/// Control classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    /// Not yet classified
    #[default]
    #[serde(rename = "")]
    Unset,
    /// Prevents the cause or mode from occurring
    #[serde(alias = "Prevention")]
    Prevention,
    /// Detects the cause or mode before it reaches the user
    #[serde(alias = "Detection")]
    Detection,
}

impl std::fmt::Display for ControlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlType::Unset => write!(f, "-"),
            ControlType::Prevention => write!(f, "prevention"),
            ControlType::Detection => write!(f, "detection"),
        }
    }
}

/// A design control
///
/// Functional FMEAs attach controls to modes, hardware FMEAs attach them to
/// causes. Exactly one of `mode_id` and `cause_id` is a real identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Control {
    pub control_id: i64,
    pub mode_id: i64,
    pub cause_id: i64,
    pub description: String,
    pub type_id: ControlType,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            control_id: 0,
            mode_id: NO_PARENT,
            cause_id: NO_PARENT,
            description: String::new(),
            type_id: ControlType::Unset,
        }
    }
}

impl Record for Control {
    const NAME: &'static str = "Control";
    const TABLE: &'static str = "rtk_control";
    const KEY: &'static str = "control_id";
    const COLUMNS: &'static [&'static str] = &["mode_id", "cause_id", "description", "type_id"];
    const PARENT_COLUMNS: &'static [&'static str] = &["mode_id", "cause_id"];
    const LEVEL: Level = Level::Control;

    fn id(&self) -> i64 {
        self.control_id
    }

    fn set_id(&mut self, id: i64) {
        self.control_id = id;
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl Control {
    /// Create an unsaved control under a mode (functional FMEA)
    pub fn for_mode(mode_id: i64) -> Self {
        Self {
            mode_id,
            ..Self::default()
        }
    }

    /// Create an unsaved control under a cause (hardware FMEA)
    pub fn for_cause(cause_id: i64) -> Self {
        Self {
            cause_id,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_references_are_exclusive() {
        let functional = Control::for_mode(1);
        assert_eq!(functional.mode_id, 1);
        assert_eq!(functional.cause_id, NO_PARENT);

        let hardware = Control::for_cause(2);
        assert_eq!(hardware.mode_id, NO_PARENT);
        assert_eq!(hardware.cause_id, 2);
    }

    #[test]
    fn test_control_type_serialization() {
        let mut control = Control::for_cause(1);
        control.type_id = ControlType::Detection;

        let attributes = control.get_attributes();
        assert_eq!(attributes["type_id"], serde_json::json!("detection"));

        let unset = Control::default().get_attributes();
        assert_eq!(unset["type_id"], serde_json::json!(""));
    }

    #[test]
    fn test_control_type_accepts_capitalized_values() {
        let mut control = Control::for_cause(1);
        control.set_attribute("type_id", "Prevention").unwrap();
        assert_eq!(control.type_id, ControlType::Prevention);

        assert!(control.set_attribute("type_id", "sometimes").is_err());
    }
}

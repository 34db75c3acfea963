//! Failure mode entity (top level of an FMEA)

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::path::Level;
use crate::core::record::Record;

/// Sentinel stored in an unused parent-reference column
pub const NO_PARENT: i64 = -1;

/// A failure mode of a function or hardware item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mode {
    pub mode_id: i64,

    /// Owning function (functional FMEA) or -1
    pub function_id: i64,

    /// Owning hardware item (hardware FMEA) or -1
    pub hardware_id: i64,

    pub description: String,
    pub mission: String,
    pub mission_phase: String,

    /// Effect on the item itself
    pub effect_local: String,
    /// Effect on the next higher assembly
    pub effect_next: String,
    /// Effect on the end item / system
    pub effect_end: String,

    pub detection_method: String,
    pub other_indications: String,
    pub isolation_method: String,
    pub design_provisions: String,
    pub operator_actions: String,

    /// MIL-STD-1629A severity classification (I-IV)
    pub severity_class: String,
    pub hazard_rate_source: String,
    /// Qualitative probability level (A-E)
    pub mode_probability: String,

    /// Fraction of the item hazard rate attributable to this mode (alpha)
    pub mode_ratio: f64,
    /// Operating time of the item during the mission
    pub mode_op_time: f64,
    /// Conditional probability of the failure effect (beta)
    pub effect_probability: f64,
    pub mode_hazard_rate: f64,
    pub mode_criticality: f64,

    /// Severity rating 1-10 used for RPN
    pub rpn_severity: i32,
    /// Severity rating after recommended actions
    pub rpn_severity_new: i32,

    pub critical_item: i32,
    pub single_point: i32,
    pub remarks: String,
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            mode_id: 0,
            function_id: NO_PARENT,
            hardware_id: NO_PARENT,
            description: String::new(),
            mission: String::new(),
            mission_phase: String::new(),
            effect_local: String::new(),
            effect_next: String::new(),
            effect_end: String::new(),
            detection_method: String::new(),
            other_indications: String::new(),
            isolation_method: String::new(),
            design_provisions: String::new(),
            operator_actions: String::new(),
            severity_class: String::new(),
            hazard_rate_source: String::new(),
            mode_probability: String::new(),
            mode_ratio: 0.0,
            mode_op_time: 0.0,
            effect_probability: 0.0,
            mode_hazard_rate: 0.0,
            mode_criticality: 0.0,
            rpn_severity: 1,
            rpn_severity_new: 1,
            critical_item: 0,
            single_point: 0,
            remarks: String::new(),
        }
    }
}

impl Record for Mode {
    const NAME: &'static str = "Mode";
    const TABLE: &'static str = "rtk_mode";
    const KEY: &'static str = "mode_id";
    const COLUMNS: &'static [&'static str] = &[
        "function_id",
        "hardware_id",
        "description",
        "mission",
        "mission_phase",
        "effect_local",
        "effect_next",
        "effect_end",
        "detection_method",
        "other_indications",
        "isolation_method",
        "design_provisions",
        "operator_actions",
        "severity_class",
        "hazard_rate_source",
        "mode_probability",
        "mode_ratio",
        "mode_op_time",
        "effect_probability",
        "mode_hazard_rate",
        "mode_criticality",
        "rpn_severity",
        "rpn_severity_new",
        "critical_item",
        "single_point",
        "remarks",
    ];
    const PARENT_COLUMNS: &'static [&'static str] = &["function_id", "hardware_id"];
    const LEVEL: Level = Level::Mode;
    const FLAGS: &'static [&'static str] = &["critical_item", "single_point"];

    fn id(&self) -> i64 {
        self.mode_id
    }

    fn set_id(&mut self, id: i64) {
        self.mode_id = id;
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl Mode {
    /// Check the criticality inputs without changing anything
    pub fn check_criticality_inputs(&self, item_hazard_rate: f64) -> Result<(), CriticalityError> {
        if !item_hazard_rate.is_finite() || item_hazard_rate < 0.0 {
            return Err(CriticalityError::HazardRate(item_hazard_rate));
        }
        if !(0.0..=1.0).contains(&self.mode_ratio) {
            return Err(CriticalityError::ModeRatio(self.mode_ratio));
        }
        if !self.mode_op_time.is_finite() || self.mode_op_time < 0.0 {
            return Err(CriticalityError::OperatingTime(self.mode_op_time));
        }
        if !(0.0..=1.0).contains(&self.effect_probability) {
            return Err(CriticalityError::EffectProbability(self.effect_probability));
        }
        Ok(())
    }

    /// Calculate the MIL-STD-1629A failure mode criticality
    ///
    /// mode hazard rate = item hazard rate x alpha;
    /// criticality = mode hazard rate x operating time x beta.
    pub fn calculate_criticality(&mut self, item_hazard_rate: f64) -> Result<f64, CriticalityError> {
        self.check_criticality_inputs(item_hazard_rate)?;
        self.mode_hazard_rate = item_hazard_rate * self.mode_ratio;
        self.mode_criticality = self.mode_hazard_rate * self.mode_op_time * self.effect_probability;
        Ok(self.mode_criticality)
    }

    /// True if this mode belongs to a functional FMEA
    pub fn is_functional(&self) -> bool {
        self.function_id != NO_PARENT
    }
}

/// Invalid inputs to a criticality calculation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CriticalityError {
    #[error("item hazard rate must be a non-negative number, got {0}")]
    HazardRate(f64),

    #[error("failure mode ratio must be between 0 and 1, got {0}")]
    ModeRatio(f64),

    #[error("failure mode operating time must be non-negative, got {0}")]
    OperatingTime(f64),

    #[error("failure effect probability must be between 0 and 1, got {0}")]
    EffectProbability(f64),
}

//! FMEA entity types
//!
//! An FMEA is a hierarchy of five record kinds:
//!
//! - [`Mode`] - failure mode of a function or hardware item
//! - [`Mechanism`] - failure mechanism under a mode
//! - [`Cause`] - failure cause under a mechanism
//! - [`Control`] - design control under a mode (functional) or cause (hardware)
//! - [`Action`] - recommended action, same parent rule as controls

pub mod action;
pub mod cause;
pub mod control;
pub mod mechanism;
pub mod mode;
pub mod rpn;

pub use action::Action;
pub use cause::Cause;
pub use control::{Control, ControlType};
pub use mechanism::Mechanism;
pub use mode::{CriticalityError, Mode, NO_PARENT};
pub use rpn::{RatingError, RpnInputs};

use serde::Serialize;

use crate::core::path::Level;
use crate::core::record::{AttributeError, Attributes, Record};

/// The data carried by a non-root FMEA tree node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "level", rename_all = "lowercase")]
pub enum FmeaEntity {
    Mode(Mode),
    Mechanism(Mechanism),
    Cause(Cause),
    Control(Control),
    Action(Action),
}

impl FmeaEntity {
    pub fn level(&self) -> Level {
        match self {
            FmeaEntity::Mode(_) => Level::Mode,
            FmeaEntity::Mechanism(_) => Level::Mechanism,
            FmeaEntity::Cause(_) => Level::Cause,
            FmeaEntity::Control(_) => Level::Control,
            FmeaEntity::Action(_) => Level::Action,
        }
    }

    /// Identity within the entity's own kind
    pub fn id(&self) -> i64 {
        match self {
            FmeaEntity::Mode(m) => m.id(),
            FmeaEntity::Mechanism(m) => m.id(),
            FmeaEntity::Cause(c) => c.id(),
            FmeaEntity::Control(c) => c.id(),
            FmeaEntity::Action(a) => a.id(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            FmeaEntity::Mode(m) => m.description(),
            FmeaEntity::Mechanism(m) => m.description(),
            FmeaEntity::Cause(c) => c.description(),
            FmeaEntity::Control(c) => c.description(),
            FmeaEntity::Action(a) => a.description(),
        }
    }

    pub fn get_attributes(&self) -> Attributes {
        match self {
            FmeaEntity::Mode(m) => m.get_attributes(),
            FmeaEntity::Mechanism(m) => m.get_attributes(),
            FmeaEntity::Cause(c) => c.get_attributes(),
            FmeaEntity::Control(c) => c.get_attributes(),
            FmeaEntity::Action(a) => a.get_attributes(),
        }
    }

    pub fn set_attributes(&mut self, attributes: &Attributes) -> Result<(), AttributeError> {
        match self {
            FmeaEntity::Mode(m) => m.set_attributes(attributes),
            FmeaEntity::Mechanism(m) => m.set_attributes(attributes),
            FmeaEntity::Cause(c) => c.set_attributes(attributes),
            FmeaEntity::Control(c) => c.set_attributes(attributes),
            FmeaEntity::Action(a) => a.set_attributes(attributes),
        }
    }

    pub fn set_attribute(&mut self, name: &str, raw: &str) -> Result<(), AttributeError> {
        match self {
            FmeaEntity::Mode(m) => m.set_attribute(name, raw),
            FmeaEntity::Mechanism(m) => m.set_attribute(name, raw),
            FmeaEntity::Cause(c) => c.set_attribute(name, raw),
            FmeaEntity::Control(c) => c.set_attribute(name, raw),
            FmeaEntity::Action(a) => a.set_attribute(name, raw),
        }
    }

    /// RPN inputs for the two kinds that carry them
    pub fn as_rpn_inputs_mut(&mut self) -> Option<&mut dyn RpnInputs> {
        match self {
            FmeaEntity::Mechanism(m) => Some(m),
            FmeaEntity::Cause(c) => Some(c),
            FmeaEntity::Mode(_) | FmeaEntity::Control(_) | FmeaEntity::Action(_) => None,
        }
    }

    /// (RPN, RPN new) for the two kinds that carry them
    pub fn rpn(&self) -> Option<(i32, i32)> {
        match self {
            FmeaEntity::Mechanism(m) => Some((m.rpn, m.rpn_new)),
            FmeaEntity::Cause(c) => Some((c.rpn, c.rpn_new)),
            FmeaEntity::Mode(_) | FmeaEntity::Control(_) | FmeaEntity::Action(_) => None,
        }
    }

    pub fn as_mode(&self) -> Option<&Mode> {
        match self {
            FmeaEntity::Mode(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mode_mut(&mut self) -> Option<&mut Mode> {
        match self {
            FmeaEntity::Mode(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mechanism(&self) -> Option<&Mechanism> {
        match self {
            FmeaEntity::Mechanism(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_cause(&self) -> Option<&Cause> {
        match self {
            FmeaEntity::Cause(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_control(&self) -> Option<&Control> {
        match self {
            FmeaEntity::Control(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&Action> {
        match self {
            FmeaEntity::Action(a) => Some(a),
            _ => None,
        }
    }
}

impl From<Mode> for FmeaEntity {
    fn from(value: Mode) -> Self {
        FmeaEntity::Mode(value)
    }
}

impl From<Mechanism> for FmeaEntity {
    fn from(value: Mechanism) -> Self {
        FmeaEntity::Mechanism(value)
    }
}

impl From<Cause> for FmeaEntity {
    fn from(value: Cause) -> Self {
        FmeaEntity::Cause(value)
    }
}

impl From<Control> for FmeaEntity {
    fn from(value: Control) -> Self {
        FmeaEntity::Control(value)
    }
}

impl From<Action> for FmeaEntity {
    fn from(value: Action) -> Self {
        FmeaEntity::Action(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_dispatch() {
        let entity = FmeaEntity::from(Mechanism {
            mechanism_id: 3,
            description: "Fatigue".to_string(),
            ..Mechanism::default()
        });

        assert_eq!(entity.level(), Level::Mechanism);
        assert_eq!(entity.id(), 3);
        assert_eq!(entity.description(), "Fatigue");
        assert!(entity.as_mechanism().is_some());
        assert!(entity.as_mode().is_none());
        assert_eq!(entity.rpn(), Some((0, 0)));
    }

    #[test]
    fn test_entity_serializes_with_level_tag() {
        let entity = FmeaEntity::from(Control::for_mode(1));
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["level"], "control");
        assert_eq!(json["mode_id"], 1);
        assert_eq!(json["cause_id"], -1);
    }

    #[test]
    fn test_rpn_inputs_only_for_mechanism_and_cause() {
        let mut cause = FmeaEntity::from(Cause::default());
        let mut action = FmeaEntity::from(Action::default());
        assert!(cause.as_rpn_inputs_mut().is_some());
        assert!(action.as_rpn_inputs_mut().is_none());
    }
}

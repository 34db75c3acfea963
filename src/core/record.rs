//! Record trait - common interface for all FMEA row types
//!
//! A record is one row of a program database table. Besides identity and
//! table metadata, every record can be marshaled to and from a name→value
//! attribute map, which is how callers edit a node without knowing its
//! concrete type.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::path::Level;

/// Attribute map keyed by column name
pub type Attributes = Map<String, Value>;

/// Common trait for all FMEA row types
pub trait Record: Serialize + DeserializeOwned + Default + Clone {
    /// Human-readable record name used in messages (e.g., "Mode")
    const NAME: &'static str;

    /// Backing table name
    const TABLE: &'static str;

    /// Primary key column
    const KEY: &'static str;

    /// Non-key columns in schema order
    const COLUMNS: &'static [&'static str];

    /// Columns referencing a parent entity or analysis subject
    const PARENT_COLUMNS: &'static [&'static str];

    /// The indenture level this record occupies in an FMEA tree
    const LEVEL: Level;

    /// Integer columns holding 0/1 flags
    const FLAGS: &'static [&'static str] = &[];

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Text shown as the node tag
    fn description(&self) -> &str;

    /// All fields by column name
    fn get_attributes(&self) -> Attributes {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Attributes::new(),
        }
    }

    /// Replace every editable field from `attributes`
    ///
    /// Identity and parent-reference fields are left untouched. Every other
    /// field must be present in the map.
    fn set_attributes(&mut self, attributes: &Attributes) -> Result<(), AttributeError> {
        let mut current = self.get_attributes();
        for (name, slot) in current.iter_mut() {
            if name == Self::KEY || Self::PARENT_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            let value = attributes.get(name).ok_or_else(|| AttributeError::Missing {
                record: Self::NAME,
                name: name.clone(),
            })?;
            *slot = value.clone();
        }

        *self = serde_json::from_value(Value::Object(current)).map_err(|e| {
            AttributeError::WrongType {
                record: Self::NAME,
                message: e.to_string(),
            }
        })?;
        Ok(())
    }

    /// Set a single editable attribute from its text form
    ///
    /// The text is coerced to the type of the field's current value.
    fn set_attribute(&mut self, name: &str, raw: &str) -> Result<(), AttributeError> {
        if name == Self::KEY || Self::PARENT_COLUMNS.contains(&name) {
            return Err(AttributeError::ReadOnly {
                record: Self::NAME,
                name: name.to_string(),
            });
        }

        let mut attributes = self.get_attributes();
        let current = attributes.get(name).ok_or_else(|| AttributeError::Unknown {
            record: Self::NAME,
            name: name.to_string(),
        })?;
        let value = if Self::FLAGS.contains(&name) {
            flag(raw)
        } else {
            coerce(current, raw)
        };
        let value = value.ok_or_else(|| AttributeError::WrongType {
            record: Self::NAME,
            message: format!("cannot use '{}' as the value of '{}'", raw, name),
        })?;
        attributes.insert(name.to_string(), value);

        match self.set_attributes(&attributes) {
            // Empty text clears optional fields such as dates
            Err(AttributeError::WrongType { .. }) if raw.trim().is_empty() => {
                attributes.insert(name.to_string(), Value::Null);
                self.set_attributes(&attributes)
            }
            other => other,
        }
    }
}

fn flag(raw: &str) -> Option<Value> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(Value::from(1)),
        "false" | "no" | "0" => Some(Value::from(0)),
        _ => None,
    }
}

fn coerce(current: &Value, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    match current {
        Value::Number(n) if n.is_f64() => raw.parse::<f64>().ok().map(Value::from),
        Value::Number(_) => raw.parse::<i64>().ok().map(Value::from),
        Value::Bool(_) => match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(Value::Bool(true)),
            "false" | "no" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Null if raw.is_empty() => Some(Value::Null),
        Value::String(_) | Value::Null => Some(Value::String(raw.to_string())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Errors marshaling attribute maps
#[derive(Debug, Error)]
pub enum AttributeError {
    #[error("Missing attribute '{name}' in attribute dictionary passed to {record}.set_attributes().")]
    Missing { record: &'static str, name: String },

    #[error("{record} has no attribute '{name}'.")]
    Unknown { record: &'static str, name: String },

    #[error("Attribute '{name}' of {record} cannot be changed.")]
    ReadOnly { record: &'static str, name: String },

    #[error("Wrong data type in attributes passed to {record}: {message}")]
    WrongType { record: &'static str, message: String },
}

impl AttributeError {
    /// Numeric error code reported to callers
    pub fn code(&self) -> i32 {
        match self {
            AttributeError::WrongType { .. } => 10,
            AttributeError::Missing { .. }
            | AttributeError::Unknown { .. }
            | AttributeError::ReadOnly { .. } => 40,
        }
    }
}

//! FMEA node keys
//!
//! Every node in an FMEA tree is addressed by the chain of entity identities
//! from the root down to the node. The canonical display form starts with `0`
//! for the root and joins one segment per level with `.`:
//!
//! - Mode, Mechanism and Cause segments are the bare identity (`0.2.1.1`)
//! - Control segments carry a `c` suffix (`0.2.1.1.3c`)
//! - Action segments carry an `a` suffix (`0.1.4a`)
//!
//! The older leading-zero Control form (`0.1.01`) is still accepted on input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The five FMEA indenture levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Mode,
    Mechanism,
    Cause,
    Control,
    Action,
}

impl Level {
    /// Get the string representation of the level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Mode => "mode",
            Level::Mechanism => "mechanism",
            Level::Cause => "cause",
            Level::Control => "control",
            Level::Action => "action",
        }
    }

    /// Get all levels in indenture order
    pub fn all() -> &'static [Level] {
        &[
            Level::Mode,
            Level::Mechanism,
            Level::Cause,
            Level::Control,
            Level::Action,
        ]
    }

    /// Levels a node of this level may have as children, regardless of FMEA kind
    pub fn allowed_children(&self) -> &'static [Level] {
        match self {
            Level::Mode => &[Level::Mechanism, Level::Control, Level::Action],
            Level::Mechanism => &[Level::Cause],
            Level::Cause => &[Level::Control, Level::Action],
            Level::Control | Level::Action => &[],
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Level::Control => "c",
            Level::Action => "a",
            _ => "",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mode" => Ok(Level::Mode),
            "mechanism" => Ok(Level::Mechanism),
            "cause" => Ok(Level::Cause),
            "control" => Ok(Level::Control),
            "action" => Ok(Level::Action),
            _ => Err(PathError::UnknownLevel(s.to_string())),
        }
    }
}

/// One step of a node key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment {
    pub level: Level,
    pub id: i64,
}

impl Segment {
    pub fn new(level: Level, id: i64) -> Self {
        Self { level, id }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.id, self.level.suffix())
    }
}

/// Structured identifier of a node in an FMEA tree
///
/// Keys order depth-first: a parent sorts before all of its descendants and
/// siblings sort by level, then identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    segments: Vec<Segment>,
}

impl NodeKey {
    /// The key of the synthetic root node
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Level of the node this key addresses (`None` for the root)
    pub fn level(&self) -> Option<Level> {
        self.segments.last().map(|s| s.level)
    }

    /// Identity of the entity this key addresses (`None` for the root)
    pub fn entity_id(&self) -> Option<i64> {
        self.segments.last().map(|s| s.id)
    }

    pub fn parent(&self) -> Option<NodeKey> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Build the key of a child, checking that the level may appear there
    pub fn child(&self, level: Level, id: i64) -> Result<NodeKey, PathError> {
        check_placement(self.level(), level, &self.to_string())?;
        let mut segments = self.segments.clone();
        segments.push(Segment::new(level, id));
        Ok(Self { segments })
    }

    /// True if `self` equals `ancestor` or lies beneath it
    pub fn starts_with(&self, ancestor: &NodeKey) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    /// Nearest segment at `level` on the path, if any
    pub fn find(&self, level: Level) -> Option<Segment> {
        self.segments.iter().rev().find(|s| s.level == level).copied()
    }
}

fn check_placement(parent: Option<Level>, level: Level, parent_text: &str) -> Result<(), PathError> {
    let allowed = match parent {
        None => level == Level::Mode,
        Some(p) => p.allowed_children().contains(&level),
    };
    if allowed {
        Ok(())
    } else {
        Err(PathError::Misplaced {
            level,
            parent: parent_text.to_string(),
        })
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0")?;
        for segment in &self.segments {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for NodeKey {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut parts = s.split('.');
        if parts.next() != Some("0") {
            return Err(PathError::Malformed(s.to_string()));
        }

        let mut key = NodeKey::root();
        for part in parts {
            let (level, digits) = if let Some(digits) = part.strip_suffix('c') {
                (Level::Control, digits)
            } else if let Some(digits) = part.strip_suffix('a') {
                (Level::Action, digits)
            } else if part.len() > 1 && part.starts_with('0') {
                (Level::Control, &part[1..])
            } else {
                let level = match key.level() {
                    None => Level::Mode,
                    Some(Level::Mode) => Level::Mechanism,
                    Some(Level::Mechanism) => Level::Cause,
                    Some(_) => return Err(PathError::Malformed(s.to_string())),
                };
                (level, part)
            };

            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PathError::Malformed(s.to_string()));
            }
            let id: i64 = digits
                .parse()
                .map_err(|_| PathError::Malformed(s.to_string()))?;

            key = key.child(level, id)?;
        }

        Ok(key)
    }
}

impl Serialize for NodeKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing levels and node keys
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("unknown FMEA level '{0}' (expected mode, mechanism, cause, control or action)")]
    UnknownLevel(String),

    #[error("malformed FMEA node id '{0}'")]
    Malformed(String),

    #[error("a {level} cannot be placed under node {parent}")]
    Misplaced { level: Level, parent: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> NodeKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_root_display_and_parse() {
        assert_eq!(NodeKey::root().to_string(), "0");
        assert!(key("0").is_root());
    }

    #[test]
    fn test_hardware_path_levels() {
        let k = key("0.2.1.1.3c");
        let levels: Vec<Level> = k.segments().iter().map(|s| s.level).collect();
        assert_eq!(
            levels,
            vec![Level::Mode, Level::Mechanism, Level::Cause, Level::Control]
        );
        assert_eq!(k.entity_id(), Some(3));
        assert_eq!(k.to_string(), "0.2.1.1.3c");
    }

    #[test]
    fn test_functional_action_path() {
        let k = key("0.1.4a");
        assert_eq!(k.level(), Some(Level::Action));
        assert_eq!(k.find(Level::Mode).map(|s| s.id), Some(1));
    }

    #[test]
    fn test_legacy_control_form_is_canonicalized() {
        let k = key("0.1.01");
        assert_eq!(k.level(), Some(Level::Control));
        assert_eq!(k.entity_id(), Some(1));
        assert_eq!(k.to_string(), "0.1.1c");
    }

    #[test]
    fn test_rejects_malformed_keys() {
        assert!(matches!("mode_1".parse::<NodeKey>(), Err(PathError::Malformed(_))));
        assert!(matches!("1.2".parse::<NodeKey>(), Err(PathError::Malformed(_))));
        assert!(matches!("0.x".parse::<NodeKey>(), Err(PathError::Malformed(_))));
        assert!(matches!("0.1.c".parse::<NodeKey>(), Err(PathError::Malformed(_))));
        // Nothing plain may follow a cause
        assert!("0.1.1.1.1".parse::<NodeKey>().is_err());
    }

    #[test]
    fn test_rejects_misplaced_levels() {
        assert!(matches!(
            "0.1c".parse::<NodeKey>(),
            Err(PathError::Misplaced { level: Level::Control, .. })
        ));
        assert!(matches!(
            "0.1.3c.4a".parse::<NodeKey>(),
            Err(PathError::Misplaced { level: Level::Action, .. })
        ));
    }

    #[test]
    fn test_ordering_is_depth_first() {
        let mut keys = vec![key("0.2"), key("0.1.1.1"), key("0.1.2"), key("0.1"), key("0.1.1")];
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, vec!["0.1", "0.1.1", "0.1.1.1", "0.1.2", "0.2"]);
    }

    #[test]
    fn test_parent_and_starts_with() {
        let k = key("0.2.1.1");
        assert_eq!(k.parent(), Some(key("0.2.1")));
        assert!(k.starts_with(&key("0.2")));
        assert!(!k.starts_with(&key("0.1")));
        assert!(NodeKey::root().parent().is_none());
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("Mechanism".parse::<Level>().unwrap(), Level::Mechanism);
        assert_eq!(
            "juice".parse::<Level>(),
            Err(PathError::UnknownLevel("juice".to_string()))
        );
    }
}

//! FMEA aggregator
//!
//! [`FmeaModel`] builds one FMEA tree for an analysis subject from the five
//! repositories, and keeps tree and store in step as nodes are inserted,
//! deleted and saved. It also runs the RPN and criticality calculations.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::database::Database;
use crate::core::path::{Level, NodeKey};
use crate::entities::rpn::{check_rating, RatingError};
use crate::entities::{Action, Cause, Control, FmeaEntity, Mechanism, Mode, RpnInputs};
use crate::fmea::error::FmeaError;
use crate::fmea::repository::{
    ActionRepository, CauseRepository, ControlRepository, MechanismRepository, ModeRepository,
    RepositoryError,
};
use crate::fmea::tree::FmeaTree;

/// Which hierarchy an FMEA is performed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FmeaKind {
    Functional,
    Hardware,
}

impl FmeaKind {
    pub fn from_functional(functional: bool) -> Self {
        if functional {
            FmeaKind::Functional
        } else {
            FmeaKind::Hardware
        }
    }

    /// Mode column holding the analysis subject
    pub fn mode_column(&self) -> &'static str {
        match self {
            FmeaKind::Functional => "function_id",
            FmeaKind::Hardware => "hardware_id",
        }
    }

    /// Level that controls and actions hang from
    pub fn attachment_level(&self) -> Level {
        match self {
            FmeaKind::Functional => Level::Mode,
            FmeaKind::Hardware => Level::Cause,
        }
    }

    /// Control/action column referencing the attachment level
    fn attachment_column(&self) -> &'static str {
        match self {
            FmeaKind::Functional => "mode_id",
            FmeaKind::Hardware => "cause_id",
        }
    }

    /// True if `level` may be placed under a node at `parent` (`None` = root)
    pub fn allows(&self, parent: Option<Level>, level: Level) -> bool {
        match level {
            Level::Mode => parent.is_none(),
            Level::Mechanism => parent == Some(Level::Mode),
            Level::Cause => parent == Some(Level::Mechanism),
            Level::Control | Level::Action => parent == Some(self.attachment_level()),
        }
    }
}

impl fmt::Display for FmeaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmeaKind::Functional => write!(f, "functional"),
            FmeaKind::Hardware => write!(f, "hardware"),
        }
    }
}

/// The analysis subject a tree was selected for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub subject_id: i64,
    pub kind: FmeaKind,
}

#[derive(Debug, Default)]
struct Repositories {
    modes: ModeRepository,
    mechanisms: MechanismRepository,
    causes: CauseRepository,
    controls: ControlRepository,
    actions: ActionRepository,
}

impl Repositories {
    fn update(&self, conn: &rusqlite::Connection, entity: &FmeaEntity) -> Result<(), RepositoryError> {
        match entity {
            FmeaEntity::Mode(m) => self.modes.update(conn, m),
            FmeaEntity::Mechanism(m) => self.mechanisms.update(conn, m),
            FmeaEntity::Cause(c) => self.causes.update(conn, c),
            FmeaEntity::Control(c) => self.controls.update(conn, c),
            FmeaEntity::Action(a) => self.actions.update(conn, a),
        }
    }

    fn delete(&self, conn: &rusqlite::Connection, level: Level, id: i64) -> Result<(), RepositoryError> {
        match level {
            Level::Mode => self.modes.delete(conn, id),
            Level::Mechanism => self.mechanisms.delete(conn, id),
            Level::Cause => self.causes.delete(conn, id),
            Level::Control => self.controls.delete(conn, id),
            Level::Action => self.actions.delete(conn, id),
        }
    }
}

/// One FMEA tree plus the repositories backing it
pub struct FmeaModel {
    db: Database,
    repos: Repositories,
    tree: FmeaTree,
    scope: Option<Scope>,
}

impl FmeaModel {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            repos: Repositories::default(),
            tree: FmeaTree::new(),
            scope: None,
        }
    }

    pub fn tree(&self) -> &FmeaTree {
        &self.tree
    }

    /// Subject of the currently selected FMEA
    pub fn scope(&self) -> Option<Scope> {
        self.scope
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Rebuild the tree for one analysis subject from the store
    ///
    /// A subject with no failure modes yields a tree holding only the root.
    /// Negative ids name no subject: the tree holds only the root and
    /// nothing is selected.
    pub fn select_all(&mut self, subject_id: i64, functional: bool) -> Result<&FmeaTree, FmeaError> {
        let kind = FmeaKind::from_functional(functional);
        self.tree.clear();
        if subject_id < 0 {
            self.scope = None;
            debug!(subject = subject_id, kind = %kind, "No FMEA subject");
            return Ok(&self.tree);
        }
        self.scope = Some(Scope { subject_id, kind });

        let conn = self.db.conn();
        let root = NodeKey::root();

        for mode in self.repos.modes.select_all(conn, kind.mode_column(), subject_id)? {
            let mode_id = mode.mode_id;
            let mode_key = root.child(Level::Mode, mode_id)?;
            self.tree.create_node(mode_key.clone(), mode.into())?;

            for mechanism in self.repos.mechanisms.select_all(conn, "mode_id", mode_id)? {
                let mechanism_id = mechanism.mechanism_id;
                let mechanism_key = mode_key.child(Level::Mechanism, mechanism_id)?;
                self.tree.create_node(mechanism_key.clone(), mechanism.into())?;

                for cause in self.repos.causes.select_all(conn, "mechanism_id", mechanism_id)? {
                    let cause_id = cause.cause_id;
                    let cause_key = mechanism_key.child(Level::Cause, cause_id)?;
                    self.tree.create_node(cause_key.clone(), cause.into())?;

                    if kind == FmeaKind::Hardware {
                        load_attachments(&mut self.repos, &mut self.tree, conn, kind, &cause_key, cause_id)?;
                    }
                }
            }

            if kind == FmeaKind::Functional {
                load_attachments(&mut self.repos, &mut self.tree, conn, kind, &mode_key, mode_id)?;
            }
        }

        info!(
            subject = subject_id,
            kind = %kind,
            nodes = self.tree.len() - 1,
            "Selected FMEA"
        );
        Ok(&self.tree)
    }

    /// Data of the node at `key`, if any
    pub fn select(&self, key: &NodeKey) -> Option<&FmeaEntity> {
        self.tree.get_node(key).and_then(|node| node.data.as_ref())
    }

    /// Mutable data of the node at `key`; call [`FmeaModel::update`] to persist
    pub fn select_mut(&mut self, key: &NodeKey) -> Option<&mut FmeaEntity> {
        self.tree.get_node_mut(key).and_then(|node| node.data.as_mut())
    }

    /// Add a new entity at `level` under `parent`
    ///
    /// `entity_id` is the identity of the parent entity, or the analysis
    /// subject when adding a failure mode. Returns the new node's key.
    pub fn insert(&mut self, entity_id: i64, parent: &NodeKey, level: &str) -> Result<NodeKey, FmeaError> {
        let level: Level = level
            .parse()
            .map_err(|_| FmeaError::InvalidLevel(level.to_string()))?;
        let scope = self.scope.ok_or(FmeaError::NotSelected)?;

        if !self.tree.contains(parent) {
            return Err(FmeaError::ParentNotFound(parent.to_string()));
        }
        if !scope.kind.allows(parent.level(), level) {
            return Err(FmeaError::LevelNotAllowed {
                level,
                parent: parent.to_string(),
                kind: scope.kind,
            });
        }

        let expected = parent.entity_id().unwrap_or(scope.subject_id);
        if entity_id != expected {
            return Err(FmeaError::ParentMismatch {
                parent: parent.to_string(),
                given: entity_id,
                expected,
            });
        }

        let conn = self.db.conn();
        let entity: FmeaEntity = match level {
            Level::Mode => {
                let mut mode = Mode::default();
                match scope.kind {
                    FmeaKind::Functional => mode.function_id = entity_id,
                    FmeaKind::Hardware => mode.hardware_id = entity_id,
                }
                self.repos.modes.insert(conn, mode)?.into()
            }
            Level::Mechanism => {
                let mechanism = Mechanism {
                    mode_id: entity_id,
                    ..Mechanism::default()
                };
                self.repos.mechanisms.insert(conn, mechanism)?.into()
            }
            Level::Cause => {
                let cause = Cause {
                    mechanism_id: entity_id,
                    ..Cause::default()
                };
                self.repos.causes.insert(conn, cause)?.into()
            }
            Level::Control => {
                let control = match scope.kind {
                    FmeaKind::Functional => Control::for_mode(entity_id),
                    FmeaKind::Hardware => Control::for_cause(entity_id),
                };
                self.repos.controls.insert(conn, control)?.into()
            }
            Level::Action => {
                let action = match scope.kind {
                    FmeaKind::Functional => Action::for_mode(entity_id),
                    FmeaKind::Hardware => Action::for_cause(entity_id),
                };
                self.repos.actions.insert(conn, action)?.into()
            }
        };

        let key = parent.child(level, entity.id())?;
        self.tree.create_node(key.clone(), entity)?;
        info!(node = %key, level = %level, "Inserted FMEA item");
        Ok(key)
    }

    /// Remove the node at `key` and everything beneath it, store first
    pub fn delete(&mut self, key: &NodeKey) -> Result<(), FmeaError> {
        if key.is_root() || !self.tree.contains(key) {
            return Err(FmeaError::DeleteNotFound(key.to_string()));
        }

        let mut doomed: Vec<(NodeKey, Level, i64)> = self
            .tree
            .subtree(key)
            .filter_map(|node| node.data.as_ref().map(|d| (node.key.clone(), d.level(), d.id())))
            .collect();
        // Children before parents
        doomed.reverse();

        let tx = self.db.conn().unchecked_transaction()?;
        for (node_key, level, id) in &doomed {
            match self.repos.delete(&tx, *level, *id) {
                Ok(()) => {}
                Err(RepositoryError::NotFound { .. }) if node_key != key => {
                    debug!(node = %node_key, "Row already gone");
                }
                Err(RepositoryError::NotFound { .. }) => {
                    return Err(FmeaError::DeleteNotFound(key.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }
        tx.commit()?;

        let removed = self.tree.remove_subtree(key);
        info!(node = %key, removed = removed.len(), "Deleted FMEA item");
        Ok(())
    }

    /// Persist the node at `key`
    pub fn update(&mut self, key: &NodeKey) -> Result<(), FmeaError> {
        let entity = self
            .select(key)
            .ok_or_else(|| FmeaError::UpdateNotFound(key.to_string()))?;

        match self.repos.update(self.db.conn(), entity) {
            Ok(()) => {
                debug!(node = %key, "Saved FMEA item");
                Ok(())
            }
            Err(RepositoryError::NotFound { .. }) => Err(FmeaError::UpdateNotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist every node, returning how many were saved
    ///
    /// Every node is attempted; if any fail the result is a
    /// [`FmeaError::PartialFailure`] listing each failure in tree order.
    pub fn update_all(&mut self) -> Result<usize, FmeaError> {
        let keys: Vec<NodeKey> = self
            .tree
            .nodes()
            .filter(|node| node.data.is_some())
            .map(|node| node.key.clone())
            .collect();

        let mut saved = 0;
        let mut failures = Vec::new();
        for key in keys {
            match self.update(&key) {
                Ok(()) => saved += 1,
                Err(e) => {
                    warn!(node = %key, code = e.code(), error = %e, "Failed to save FMEA item");
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            info!(saved, "Saved all FMEA items");
            Ok(saved)
        } else {
            Err(FmeaError::PartialFailure { saved, failures })
        }
    }

    /// Calculate MIL-STD-1629A criticality for every failure mode in the tree
    ///
    /// All modes are checked before any is changed. Results stay in memory
    /// until saved. Returns the number of modes calculated.
    pub fn calculate_criticality(&mut self, item_hazard_rate: f64) -> Result<usize, FmeaError> {
        for mode in self.tree.nodes().filter_map(|n| n.data.as_ref()?.as_mode()) {
            mode.check_criticality_inputs(item_hazard_rate)
                .map_err(|source| FmeaError::InvalidCriticalityInput {
                    mode_id: mode.mode_id,
                    source,
                })?;
        }

        let mut count = 0;
        for node in self.tree.nodes_mut() {
            if let Some(mode) = node.data.as_mut().and_then(FmeaEntity::as_mode_mut) {
                mode.calculate_criticality(item_hazard_rate)
                    .map_err(|source| FmeaError::InvalidCriticalityInput {
                        mode_id: mode.mode_id,
                        source,
                    })?;
                count += 1;
            }
        }

        info!(item_hazard_rate, modes = count, "Calculated criticality");
        Ok(count)
    }

    /// Calculate RPN and RPN new for every mechanism and cause at or below `key`
    ///
    /// Every rating is checked before anything changes. When `key` names a
    /// failure mode, the severities are also stored on that mode. Results stay
    /// in memory until saved.
    pub fn calculate_rpn(&mut self, key: &NodeKey, severity: i32, severity_new: i32) -> Result<(), FmeaError> {
        if !self.tree.contains(key) {
            return Err(FmeaError::NodeNotFound(key.to_string()));
        }

        check_rating("severity", severity).map_err(rating_error(key))?;
        check_rating("new severity", severity_new).map_err(rating_error(key))?;

        let mut results = Vec::new();
        for node in self.tree.subtree(key) {
            let computed = match &node.data {
                Some(FmeaEntity::Mechanism(m)) => m.compute_rpn(severity, severity_new),
                Some(FmeaEntity::Cause(c)) => c.compute_rpn(severity, severity_new),
                _ => continue,
            };
            results.push((node.key.clone(), computed.map_err(rating_error(&node.key))?));
        }

        for (node_key, (rpn, rpn_new)) in &results {
            if let Some(inputs) = self.select_mut(node_key).and_then(FmeaEntity::as_rpn_inputs_mut) {
                inputs.store_rpn(*rpn, *rpn_new);
            }
        }
        if let Some(mode) = self.select_mut(key).and_then(FmeaEntity::as_mode_mut) {
            mode.rpn_severity = severity;
            mode.rpn_severity_new = severity_new;
        }

        info!(node = %key, items = results.len(), "Calculated RPN");
        Ok(())
    }
}

fn rating_error(node: &NodeKey) -> impl FnOnce(RatingError) -> FmeaError {
    let node = node.to_string();
    move |source| FmeaError::InvalidRating { node, source }
}

fn load_attachments(
    repos: &mut Repositories,
    tree: &mut FmeaTree,
    conn: &rusqlite::Connection,
    kind: FmeaKind,
    parent: &NodeKey,
    parent_id: i64,
) -> Result<(), FmeaError> {
    let column = kind.attachment_column();
    for control in repos.controls.select_all(conn, column, parent_id)? {
        let key = parent.child(Level::Control, control.control_id)?;
        tree.create_node(key, control.into())?;
    }
    for action in repos.actions.select_all(conn, column, parent_id)? {
        let key = parent.child(Level::Action, action.action_id)?;
        tree.create_node(key, action.into())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ControlType;
    use crate::fmea::tree::ROOT_TAG;

    fn key(s: &str) -> NodeKey {
        s.parse().unwrap()
    }

    fn model() -> FmeaModel {
        FmeaModel::new(Database::open_in_memory().unwrap())
    }

    /// Hardware FMEA for item 1 with mode → mechanism → cause → control + action
    fn hardware_model() -> FmeaModel {
        let mut model = model();
        model.select_all(1, false).unwrap();
        let mode = model.insert(1, &NodeKey::root(), "mode").unwrap();
        let mechanism = model.insert(1, &mode, "mechanism").unwrap();
        let cause = model.insert(1, &mechanism, "cause").unwrap();
        model.insert(1, &cause, "control").unwrap();
        model.insert(1, &cause, "action").unwrap();
        model
    }

    #[test]
    fn test_unknown_subject_has_only_root() {
        let mut model = model();
        let tree = model.select_all(42, true).unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().map(|n| n.tag()), Some(ROOT_TAG));
        assert_eq!(
            model.scope(),
            Some(Scope {
                subject_id: 42,
                kind: FmeaKind::Functional
            })
        );
    }

    #[test]
    fn test_negative_subject_selects_nothing() {
        let mut model = hardware_model();

        let tree = model.select_all(-1, true).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(model.scope(), None);

        let err = model.insert(1, &key("0.1"), "control").unwrap_err();
        assert!(matches!(err, FmeaError::NotSelected));

        model.select_all(1, false).unwrap();
        assert_eq!(model.tree().len(), 6);
        let orphans: i64 = model
            .database()
            .conn()
            .query_row("SELECT COUNT(*) FROM rtk_control WHERE mode_id <> -1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_hardware_insert_wires_parent_references() {
        let model = hardware_model();

        let mode = model.select(&key("0.1")).and_then(FmeaEntity::as_mode).unwrap();
        assert_eq!(mode.hardware_id, 1);
        assert_eq!(mode.function_id, -1);

        let cause = model.select(&key("0.1.1.1")).and_then(FmeaEntity::as_cause).unwrap();
        assert_eq!(cause.mechanism_id, 1);

        let control = model.select(&key("0.1.1.1.1c")).and_then(FmeaEntity::as_control).unwrap();
        assert_eq!(control.cause_id, 1);
        assert_eq!(control.mode_id, -1);

        let action = model.select(&key("0.1.1.1.1a")).and_then(FmeaEntity::as_action).unwrap();
        assert_eq!(action.cause_id, 1);
        assert_eq!(action.mode_id, -1);
    }

    #[test]
    fn test_functional_insert_wires_parent_references() {
        let mut model = model();
        model.select_all(3, true).unwrap();
        let mode = model.insert(3, &NodeKey::root(), "mode").unwrap();
        let control = model.insert(1, &mode, "control").unwrap();
        let action = model.insert(1, &mode, "Action").unwrap();

        assert_eq!(control.to_string(), "0.1.1c");
        assert_eq!(action.to_string(), "0.1.1a");

        let mode = model.select(&mode).and_then(FmeaEntity::as_mode).unwrap();
        assert_eq!(mode.function_id, 3);
        assert_eq!(mode.hardware_id, -1);

        let control = model.select(&control).and_then(FmeaEntity::as_control).unwrap();
        assert_eq!(control.mode_id, 1);
        assert_eq!(control.cause_id, -1);
    }

    #[test]
    fn test_select_all_rebuilds_same_tree() {
        let model = hardware_model();
        let before: Vec<String> = model.tree().nodes().map(|n| n.key.to_string()).collect();

        let mut model = model;
        model.select_all(1, false).unwrap();
        let after: Vec<String> = model.tree().nodes().map(|n| n.key.to_string()).collect();

        assert_eq!(before, after);
        assert_eq!(
            after,
            vec!["0", "0.1", "0.1.1", "0.1.1.1", "0.1.1.1.1c", "0.1.1.1.1a"]
        );

        // The same rows are not part of the functional FMEA for id 1
        assert_eq!(model.select_all(1, true).unwrap().len(), 1);
    }

    #[test]
    fn test_select_all_normalizes_null_columns() {
        let mut model = model();
        model
            .database()
            .conn()
            .execute_batch(
                "INSERT INTO rtk_mode (function_id, description, mode_ratio) VALUES (7, NULL, NULL);
                 INSERT INTO rtk_control (mode_id, description, type_id) VALUES (1, NULL, NULL);",
            )
            .unwrap();

        model.select_all(7, true).unwrap();

        let mode = model.select(&key("0.1")).and_then(FmeaEntity::as_mode).unwrap();
        assert_eq!(mode.description, "");
        assert_eq!(mode.mode_ratio, 0.0);
        let control = model.select(&key("0.1.1c")).and_then(FmeaEntity::as_control).unwrap();
        assert_eq!(control.description, "");
    }

    #[test]
    fn test_select_all_defaults_unreadable_values() {
        let mut model = model();
        model
            .database()
            .conn()
            .execute_batch(
                "INSERT INTO rtk_mode (function_id, description) VALUES (7, 'Leak');
                 INSERT INTO rtk_control (mode_id, description, type_id)
                     VALUES (1, 'Visual check', 'Inspection');",
            )
            .unwrap();

        let tree = model.select_all(7, true).unwrap();
        assert_eq!(tree.len(), 3);

        let control = model.select(&key("0.1.1c")).and_then(FmeaEntity::as_control).unwrap();
        assert_eq!(control.type_id, ControlType::Unset);
        assert_eq!(control.description, "Visual check");
        assert_eq!(control.mode_id, 1);
    }

    #[test]
    fn test_insert_unknown_level() {
        let mut model = hardware_model();
        let before = model.tree().len();

        let err = model.insert(1, &NodeKey::root(), "juice").unwrap_err();

        assert_eq!(err.code(), 2005);
        assert!(matches!(err, FmeaError::InvalidLevel(_)));
        assert_eq!(model.tree().len(), before);
    }

    #[test]
    fn test_insert_unknown_parent_allocates_nothing() {
        let mut model = hardware_model();

        let err = model.insert(9, &key("0.9"), "mechanism").unwrap_err();
        assert_eq!(err.code(), 2005);
        assert!(matches!(err, FmeaError::ParentNotFound(_)));

        // The next mechanism still receives identity 2
        let next = model.insert(1, &key("0.1"), "mechanism").unwrap();
        assert_eq!(next.to_string(), "0.1.2");
    }

    #[test]
    fn test_insert_level_not_allowed_for_kind() {
        let mut model = hardware_model();
        // Controls hang from causes in a hardware FMEA
        let err = model.insert(1, &key("0.1"), "control").unwrap_err();
        assert!(matches!(err, FmeaError::LevelNotAllowed { .. }));
        assert_eq!(err.code(), 2005);

        let err = model.insert(1, &key("0.1.1"), "mode").unwrap_err();
        assert!(matches!(err, FmeaError::LevelNotAllowed { .. }));
    }

    #[test]
    fn test_insert_parent_mismatch() {
        let mut model = hardware_model();
        let err = model.insert(5, &key("0.1.1"), "cause").unwrap_err();
        assert!(matches!(
            err,
            FmeaError::ParentMismatch {
                given: 5,
                expected: 1,
                ..
            }
        ));

        let err = model.insert(2, &NodeKey::root(), "mode").unwrap_err();
        assert!(matches!(err, FmeaError::ParentMismatch { expected: 1, .. }));
    }

    #[test]
    fn test_insert_requires_selection() {
        let mut model = model();
        let err = model.insert(1, &NodeKey::root(), "mode").unwrap_err();
        assert!(matches!(err, FmeaError::NotSelected));
    }

    #[test]
    fn test_delete_absent_node() {
        let mut model = hardware_model();
        let before = model.tree().len();

        let err = model.delete(&key("0.5")).unwrap_err();
        assert_eq!(err.code(), 2005);
        assert_eq!(model.tree().len(), before);

        assert!(matches!(
            model.delete(&NodeKey::root()),
            Err(FmeaError::DeleteNotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_subtree_from_tree_and_store() {
        let mut model = hardware_model();

        model.delete(&key("0.1.1")).unwrap();

        assert_eq!(model.tree().len(), 2);
        assert!(model.select(&key("0.1.1.1.1c")).is_none());

        let controls: i64 = model
            .database()
            .conn()
            .query_row("SELECT COUNT(*) FROM rtk_control", [], |row| row.get(0))
            .unwrap();
        assert_eq!(controls, 0);

        model.select_all(1, false).unwrap();
        assert_eq!(model.tree().len(), 2);
    }

    #[test]
    fn test_delete_row_removed_externally() {
        let mut model = hardware_model();
        model
            .database()
            .conn()
            .execute("DELETE FROM rtk_action", [])
            .unwrap();

        // Descendant already gone: still deleted
        model.delete(&key("0.1.1.1")).unwrap();
        assert!(!model.tree().contains(&key("0.1.1.1")));

        model
            .database()
            .conn()
            .execute("DELETE FROM rtk_mechanism", [])
            .unwrap();
        let err = model.delete(&key("0.1.1")).unwrap_err();
        assert!(matches!(err, FmeaError::DeleteNotFound(_)));
        assert!(model.tree().contains(&key("0.1.1")));
    }

    #[test]
    fn test_update_persists_edits() {
        let mut model = hardware_model();
        let node = key("0.1.1.1.1c");
        model
            .select_mut(&node)
            .unwrap()
            .set_attribute("description", "Derating")
            .unwrap();

        model.update(&node).unwrap();
        model.select_all(1, false).unwrap();

        assert_eq!(model.select(&node).map(FmeaEntity::description), Some("Derating"));
    }

    #[test]
    fn test_update_absent_node() {
        let mut model = hardware_model();
        let err = model.update(&key("0.4")).unwrap_err();
        assert_eq!(err.code(), 2006);
        assert!(matches!(err, FmeaError::UpdateNotFound(_)));
    }

    #[test]
    fn test_update_all_reports_every_failure() {
        let mut model = hardware_model();
        model
            .select_mut(&key("0.1"))
            .unwrap()
            .set_attribute("description", "edited")
            .unwrap();
        model
            .select_mut(&key("0.1.1.1.1a"))
            .unwrap()
            .set_attribute("action_recommended", "edited")
            .unwrap();
        model
            .database()
            .conn()
            .execute("DELETE FROM rtk_control", [])
            .unwrap();

        let err = model.update_all().unwrap_err();

        match &err {
            FmeaError::PartialFailure { saved, failures } => {
                assert_eq!(*saved, 4);
                assert_eq!(failures.len(), 1);
                assert!(matches!(&failures[0], FmeaError::UpdateNotFound(k) if k == "0.1.1.1.1c"));
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert_eq!(err.code(), 2006);

        // Nodes after the failed one were still saved
        model.select_all(1, false).unwrap();
        assert_eq!(model.select(&key("0.1")).map(FmeaEntity::description), Some("edited"));
        assert_eq!(
            model.select(&key("0.1.1.1.1a")).map(FmeaEntity::description),
            Some("edited")
        );
    }

    #[test]
    fn test_update_all_succeeds() {
        let mut model = hardware_model();
        assert_eq!(model.update_all().unwrap(), 5);
    }

    #[test]
    fn test_calculate_rpn() {
        let mut model = hardware_model();
        if let Some(FmeaEntity::Mechanism(m)) = model.select_mut(&key("0.1.1")) {
            m.rpn_occurrence = 7;
            m.rpn_detection = 4;
            m.rpn_occurrence_new = 5;
            m.rpn_detection_new = 3;
        }
        if let Some(FmeaEntity::Cause(c)) = model.select_mut(&key("0.1.1.1")) {
            c.rpn_occurrence = 2;
            c.rpn_detection = 2;
            c.rpn_occurrence_new = 1;
            c.rpn_detection_new = 1;
        }

        model.calculate_rpn(&key("0.1"), 7, 4).unwrap();

        assert_eq!(model.select(&key("0.1.1")).and_then(FmeaEntity::rpn), Some((196, 60)));
        assert_eq!(model.select(&key("0.1.1.1")).and_then(FmeaEntity::rpn), Some((28, 4)));
        let mode = model.select(&key("0.1")).and_then(FmeaEntity::as_mode).unwrap();
        assert_eq!((mode.rpn_severity, mode.rpn_severity_new), (7, 4));
    }

    #[test]
    fn test_calculate_rpn_rejects_bad_rating() {
        let mut model = hardware_model();
        if let Some(FmeaEntity::Cause(c)) = model.select_mut(&key("0.1.1.1")) {
            c.rpn_detection = 11;
        }

        let err = model.calculate_rpn(&key("0.1"), 7, 4).unwrap_err();

        assert_eq!(err.code(), 2020);
        assert!(matches!(&err, FmeaError::InvalidRating { node, .. } if node == "0.1.1.1"));
        // Nothing changed, including the mechanism checked before the cause
        assert_eq!(model.select(&key("0.1.1")).and_then(FmeaEntity::rpn), Some((0, 0)));
        let mode = model.select(&key("0.1")).and_then(FmeaEntity::as_mode).unwrap();
        assert_eq!(mode.rpn_severity, 1);

        let err = model.calculate_rpn(&key("0.1"), 0, 4).unwrap_err();
        assert_eq!(err.code(), 2020);
    }

    #[test]
    fn test_calculate_rpn_unknown_node() {
        let mut model = hardware_model();
        let err = model.calculate_rpn(&key("0.3"), 5, 5).unwrap_err();
        assert_eq!(err.code(), 2005);
    }

    #[test]
    fn test_calculate_criticality() {
        let mut model = hardware_model();
        if let Some(mode) = model.select_mut(&key("0.1")).and_then(FmeaEntity::as_mode_mut) {
            mode.mode_ratio = 0.4;
            mode.mode_op_time = 100.0;
            mode.effect_probability = 1.0;
        }

        assert_eq!(model.calculate_criticality(0.00001).unwrap(), 1);

        let mode = model.select(&key("0.1")).and_then(FmeaEntity::as_mode).unwrap();
        assert!((mode.mode_hazard_rate - 0.000004).abs() < 1e-12);
        assert!((mode.mode_criticality - 0.0004).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_criticality_checks_all_modes_first() {
        let mut model = hardware_model();
        model.insert(1, &NodeKey::root(), "mode").unwrap();
        if let Some(mode) = model.select_mut(&key("0.1")).and_then(FmeaEntity::as_mode_mut) {
            mode.mode_ratio = 0.5;
            mode.mode_op_time = 10.0;
            mode.effect_probability = 1.0;
        }
        if let Some(mode) = model.select_mut(&key("0.2")).and_then(FmeaEntity::as_mode_mut) {
            mode.mode_ratio = 1.5;
        }

        let err = model.calculate_criticality(0.001).unwrap_err();

        assert_eq!(err.code(), 2010);
        assert!(matches!(err, FmeaError::InvalidCriticalityInput { mode_id: 2, .. }));
        let first = model.select(&key("0.1")).and_then(FmeaEntity::as_mode).unwrap();
        assert_eq!(first.mode_criticality, 0.0);

        assert!(model.calculate_criticality(-1.0).is_err());
    }
}

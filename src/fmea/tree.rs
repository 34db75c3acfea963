//! In-memory FMEA tree
//!
//! Nodes live in an ordered map keyed by [`NodeKey`], so iteration is
//! depth-first and a subtree is a contiguous key range. The root node carries
//! no data and is tagged `FMEA`.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::core::path::NodeKey;
use crate::entities::FmeaEntity;

/// Tag shown for the root node
pub const ROOT_TAG: &str = "FMEA";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub key: NodeKey,
    pub data: Option<FmeaEntity>,
}

impl Node {
    /// Display tag: `FMEA` for the root, otherwise the entity description
    pub fn tag(&self) -> &str {
        match &self.data {
            Some(entity) => entity.description(),
            None => ROOT_TAG,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FmeaTree {
    nodes: BTreeMap<NodeKey, Node>,
}

impl Default for FmeaTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FmeaTree {
    /// A tree holding only the root node
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            NodeKey::root(),
            Node {
                key: NodeKey::root(),
                data: None,
            },
        );
        Self { nodes }
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&NodeKey::root())
    }

    pub fn get_node(&self, key: &NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn get_node_mut(&mut self, key: &NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root is present
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Add a node under its parent
    pub fn create_node(&mut self, key: NodeKey, data: FmeaEntity) -> Result<&Node, TreeError> {
        let parent = key
            .parent()
            .ok_or_else(|| TreeError::Duplicate(key.to_string()))?;
        if !self.nodes.contains_key(&parent) {
            return Err(TreeError::MissingParent {
                node: key.to_string(),
                parent: parent.to_string(),
            });
        }
        if self.nodes.contains_key(&key) {
            return Err(TreeError::Duplicate(key.to_string()));
        }

        let node = Node {
            key: key.clone(),
            data: Some(data),
        };
        Ok(self.nodes.entry(key).or_insert(node))
    }

    /// Direct children of a node
    pub fn children<'a>(&'a self, key: &'a NodeKey) -> Vec<&'a Node> {
        let depth = key.depth() + 1;
        self.subtree(key)
            .filter(|node| node.key.depth() == depth)
            .collect()
    }

    /// A node and all of its descendants, depth-first
    pub fn subtree<'a>(&'a self, key: &'a NodeKey) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .range(key.clone()..)
            .take_while(move |(k, _)| k.starts_with(key))
            .map(|(_, node)| node)
    }

    pub fn subtree_keys(&self, key: &NodeKey) -> Vec<NodeKey> {
        self.subtree(key).map(|node| node.key.clone()).collect()
    }

    /// Remove a node and its descendants, returning them depth-first
    ///
    /// The root itself is never removed; removing it clears every other node.
    pub fn remove_subtree(&mut self, key: &NodeKey) -> Vec<Node> {
        let keys = self.subtree_keys(key);
        keys.iter()
            .filter(|k| !k.is_root())
            .filter_map(|k| self.nodes.remove(k))
            .collect()
    }

    /// All nodes, depth-first starting at the root
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Drop everything except the root
    pub fn clear(&mut self) {
        self.nodes.retain(|key, _| key.is_root());
    }
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("cannot create node {node}: parent {parent} is not in the tree")]
    MissingParent { node: String, parent: String },

    #[error("node {0} is already in the tree")]
    Duplicate(String),
}

//! Tree persistence.
//!
//! A saved tree is a flat node table encoded as MessagePack with named fields.
//! Loading realigns it to a game's move history so a controller can resume
//! from any position the saved tree has seen.

use crate::error::{MctsError, Result};
use crate::node::{Node, NodeId};
use crate::tree::Tree;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;

/// Version written into every blob. Blobs with another version are rejected.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a, M, P> {
    schema_version: u32,
    prefix: &'a [M],
    origin_mover: &'a P,
    nodes: &'a [Node<M, P>],
}

#[derive(Deserialize)]
struct Snapshot<M, P> {
    schema_version: u32,
    prefix: Vec<M>,
    origin_mover: P,
    nodes: Vec<Node<M, P>>,
}

/// Save and load search trees.
pub struct TreeStore;

impl TreeStore {
    /// Serialize the whole arena from its origin, with the moves leading to it.
    ///
    /// A controller retaining its history saves the tree grown from the very
    /// first root, so the blob can be realigned to any point of a matching game.
    pub fn save<M, P>(tree: &Tree<M, P>) -> Result<Vec<u8>>
    where
        M: Serialize + Clone + Eq + Debug,
        P: Serialize + Clone + Eq + Debug,
    {
        let snapshot = SnapshotRef {
            schema_version: SCHEMA_VERSION,
            prefix: tree.prefix(),
            origin_mover: tree.origin_mover(),
            nodes: tree.nodes(),
        };
        Ok(rmp_serde::to_vec_named(&snapshot)?)
    }

    /// Decode a tree and move its root to the position reached by `history`.
    ///
    /// The saved prefix must start `history`. The rest of the history is
    /// followed child by child; moves past the saved depth are grafted as fresh
    /// unexplored nodes whose players come from `next_player`.
    ///
    /// # Errors
    /// - `MctsError::LoadMismatch` if the tree belongs to another game
    /// - `MctsError::CorruptTree` if the node table is inconsistent
    /// - `MctsError::Decode` if the bytes are not a saved tree
    pub fn load<M, P, F>(bytes: &[u8], history: &[M], next_player: F) -> Result<Tree<M, P>>
    where
        M: DeserializeOwned + Clone + Eq + Debug,
        P: DeserializeOwned + Clone + Eq + Debug,
        F: Fn(&P) -> P,
    {
        let snapshot: Snapshot<M, P> = rmp_serde::from_slice(bytes)?;
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(MctsError::CorruptTree(format!(
                "unsupported schema version {}",
                snapshot.schema_version
            )));
        }
        validate(&snapshot.nodes)?;

        let remaining = history
            .strip_prefix(snapshot.prefix.as_slice())
            .ok_or(MctsError::LoadMismatch)?;
        let mut tree = Tree::from_parts(snapshot.nodes, snapshot.prefix, snapshot.origin_mover);

        let mut node = NodeId::ORIGIN;
        let mut matched = 0;
        for mv in remaining {
            match tree.find_child(node, mv) {
                Some(child) => {
                    node = child;
                    matched += 1;
                }
                None => break,
            }
        }
        if matched == 0 && !remaining.is_empty() && tree.prefix().is_empty() {
            return Err(MctsError::LoadMismatch);
        }

        for mv in &remaining[matched..] {
            let player = next_player(tree.get(node).player());
            node = tree.add_child(node, mv.clone(), player);
        }
        tree.set_root(node);
        Ok(tree)
    }
}

/// Check that a decoded node table is a tree rooted at the origin.
fn validate<M, P>(nodes: &[Node<M, P>]) -> Result<()> {
    let corrupt = |msg: String| Err(MctsError::CorruptTree(msg));

    let Some(origin) = nodes.first() else {
        return corrupt("empty node table".to_string());
    };
    if origin.parent.is_some() {
        return corrupt("origin has a parent".to_string());
    }

    let mut seen = vec![false; nodes.len()];
    seen[0] = true;
    let mut queue = vec![NodeId::ORIGIN];
    while let Some(id) = queue.pop() {
        let node = &nodes[id.index()];
        let stats = &node.stats;
        if !stats.score_sum.is_finite() || stats.score_sum < 0.0 {
            return corrupt(format!("node {}: invalid score sum {}", id.index(), stats.score_sum));
        }
        if stats.visit_count == 0 && stats.score_sum != 0.0 {
            return corrupt(format!("node {}: score without visits", id.index()));
        }

        for &child in &node.children {
            let index = child.index();
            if index >= nodes.len() {
                return corrupt(format!("node {}: child {index} out of range", id.index()));
            }
            if seen[index] {
                return corrupt(format!("node {index} reached twice"));
            }
            let child_node = &nodes[index];
            if child_node.parent != Some(id) {
                return corrupt(format!("node {index}: parent does not list it"));
            }
            if child_node.mv.is_none() {
                return corrupt(format!("node {index}: missing move"));
            }
            seen[index] = true;
            queue.push(child);
        }
    }

    match seen.iter().position(|&reached| !reached) {
        Some(index) => corrupt(format!("node {index} unreachable from the origin")),
        None => Ok(()),
    }
}

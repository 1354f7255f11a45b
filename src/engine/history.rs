//! Reconstruction of what the opponent did last round.
//!
//! The orchestrator only tells us which terminal node each of our two games
//! ended in. Walking from those terminals back to the root recovers the
//! realized paths; every branch taken from a node the opponent controlled
//! is one of the opponent's moves.

use rustc_hash::FxHashSet;

use crate::engine::error::Mismatch;
use crate::engine::game::{GameTree, NodeIndex, PerRole, Role};

/// Root-to-leaf path ending at `terminal`.
///
/// Built iteratively, so deep trees cannot exhaust the stack. The walk is
/// bounded by the node count of the tree; running past it means the
/// ancestry has a cycle.
pub fn path_to_root<T: GameTree>(tree: &T, terminal: NodeIndex) -> Result<Vec<NodeIndex>, Mismatch> {
    if !tree.contains(terminal) {
        return Err(Mismatch::UnknownNode { index: terminal });
    }

    let limit = tree.node_count();
    let mut path = vec![terminal];
    let mut current = terminal;

    while !tree.is_root(current) {
        let parent = tree
            .parent(current)
            .ok_or(Mismatch::MissingAncestor { node: current })?;
        if path.len() >= limit {
            return Err(Mismatch::CyclicAncestry {
                node: terminal,
                steps: path.len(),
            });
        }
        path.push(parent);
        current = parent;
    }

    path.reverse();
    Ok(path)
}

/// Labels of the branches the opponent took along `path`, when we played
/// `own_role` in that game.
pub fn opponent_labels<T: GameTree>(
    tree: &T,
    path: &[NodeIndex],
    own_role: Role,
) -> Result<Vec<String>, Mismatch> {
    let opponent = own_role.other();
    let mut labels = Vec::new();

    for &node in path {
        if tree.is_chance(node) || tree.is_root(node) {
            continue;
        }
        if tree.parent(node).is_none() {
            return Err(Mismatch::MissingAncestor { node });
        }
        if tree.parent_controller(node) == Some(opponent) {
            if let Some(label) = tree.label(node) {
                labels.push(label.to_string());
            }
        }
    }

    Ok(labels)
}

/// Set of labels the opponent played in the most recent round.
///
/// `terminals[role]` is the terminal reached while we played `role`; an
/// unknown terminal contributes nothing.
pub fn opponent_moves<T: GameTree>(
    tree: &T,
    terminals: &PerRole<Option<NodeIndex>>,
) -> Result<FxHashSet<String>, Mismatch> {
    let mut moves = FxHashSet::default();

    for (role, terminal) in terminals.iter() {
        let Some(terminal) = *terminal else {
            continue;
        };
        let path = path_to_root(tree, terminal)?;
        moves.extend(opponent_labels(tree, &path, role)?);
    }

    Ok(moves)
}

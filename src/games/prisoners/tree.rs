//! Arena-backed extensive-form trees.

use serde::{Deserialize, Serialize};

use crate::engine::game::{ChoiceLabel, GameTree, Move, NodeIndex, PerRole, Role};
use crate::games::prisoners::request::PrisonersRequest;

/// One node of an [`ArenaTree`].
#[derive(Debug, Clone)]
struct ArenaNode {
    label: Option<String>,
    parent: Option<NodeIndex>,
    controller: Option<Role>,
    chance: bool,
    root: bool,
    children: Vec<NodeIndex>,
}

/// Extensive-form tree stored in a flat vector.
///
/// Nodes are addressed by their insertion index. Parents are set at insertion
/// time; [`ArenaTree::add_detached`] and [`ArenaTree::set_parent`] exist to
/// build malformed trees for tests.
#[derive(Debug, Clone, Default)]
pub struct ArenaTree {
    nodes: Vec<ArenaNode>,
    info_sets: Vec<usize>,
}

impl ArenaTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: ArenaNode) -> NodeIndex {
        let index = self.nodes.len();
        if let Some(parent) = node.parent {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.push(index);
            }
        }
        self.nodes.push(node);
        index
    }

    /// Add the root, acting as `controller`.
    pub fn add_root(&mut self, controller: Option<Role>) -> NodeIndex {
        self.push(ArenaNode {
            label: None,
            parent: None,
            controller,
            chance: false,
            root: true,
            children: Vec::new(),
        })
    }

    /// Add a chance node below `parent`.
    pub fn add_chance(&mut self, parent: NodeIndex, label: &str) -> NodeIndex {
        self.push(ArenaNode {
            label: Some(label.to_string()),
            parent: Some(parent),
            controller: None,
            chance: true,
            root: false,
            children: Vec::new(),
        })
    }

    /// Add a decision or terminal node reached from `parent` through `label`.
    pub fn add_node(&mut self, parent: NodeIndex, label: &str, controller: Option<Role>) -> NodeIndex {
        self.push(ArenaNode {
            label: Some(label.to_string()),
            parent: Some(parent),
            controller,
            chance: false,
            root: false,
            children: Vec::new(),
        })
    }

    /// Add a node with no parent that is not the root.
    pub fn add_detached(&mut self, label: &str, controller: Option<Role>) -> NodeIndex {
        self.push(ArenaNode {
            label: Some(label.to_string()),
            parent: None,
            controller,
            chance: false,
            root: false,
            children: Vec::new(),
        })
    }

    /// Overwrite the parent link of `node`.
    pub fn set_parent(&mut self, node: NodeIndex, parent: NodeIndex) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = Some(parent);
        }
    }

    /// Set the information set layout.
    pub fn set_info_sets(&mut self, sizes: Vec<usize>) {
        self.info_sets = sizes;
    }

    /// Children of `node`, in insertion order.
    pub fn children(&self, node: NodeIndex) -> &[NodeIndex] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Child of `node` reached through `label`.
    pub fn child_with_label(&self, node: NodeIndex, label: &str) -> Option<NodeIndex> {
        self.children(node)
            .iter()
            .copied()
            .find(|&c| self.label(c) == Some(label))
    }

    /// Child of `node` reached by playing `action`.
    pub fn child_with_move(&self, node: NodeIndex, action: Move) -> Option<NodeIndex> {
        self.children(node).iter().copied().find(|&c| {
            self.label(c)
                .and_then(|l| ChoiceLabel::parse(l).ok())
                .and_then(|l| l.action)
                == Some(action)
        })
    }

    /// Index of the root node.
    pub fn root(&self) -> Option<NodeIndex> {
        self.nodes.iter().position(|n| n.root)
    }
}

impl GameTree for ArenaTree {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn contains(&self, index: NodeIndex) -> bool {
        index < self.nodes.len()
    }

    fn label(&self, node: NodeIndex) -> Option<&str> {
        self.nodes.get(node).and_then(|n| n.label.as_deref())
    }

    fn is_root(&self, node: NodeIndex) -> bool {
        self.nodes.get(node).is_some_and(|n| n.root)
    }

    fn is_chance(&self, node: NodeIndex) -> bool {
        self.nodes.get(node).is_some_and(|n| n.chance)
    }

    fn controller(&self, node: NodeIndex) -> Option<Role> {
        self.nodes.get(node).and_then(|n| n.controller)
    }

    fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    fn info_set_sizes(&self) -> &[usize] {
        &self.info_sets
    }
}

/// Layout of the stage game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeShape {
    /// P2 does not see P1's move: one P2 information set.
    #[default]
    Simultaneous,
    /// P2 sees P1's move: one P2 information set per P1 move.
    Sequential,
}

/// The Prisoners' Dilemma stage game as an extensive-form tree.
///
/// ```text
/// P1
/// ├── 1:1:Cooperate ── P2 ── 2:2:Cooperate | 2:2:Defect
/// └── 1:1:Defect ───── P2 ── 2:2:Cooperate | 2:2:Defect   (simultaneous)
///                             2:3:Cooperate | 2:3:Defect   (sequential)
/// ```
#[derive(Debug, Clone)]
pub struct PrisonersTree {
    arena: ArenaTree,
    shape: TreeShape,
    labels: Vec<String>,
}

impl PrisonersTree {
    /// Build the tree for `shape`.
    pub fn new(shape: TreeShape) -> Self {
        let mut arena = ArenaTree::new();
        let root = arena.add_root(Some(Role::One));
        let mut labels = vec!["1:1:Cooperate".to_string(), "1:1:Defect".to_string()];

        for (i, first) in [Move::Cooperate, Move::Defect].into_iter().enumerate() {
            let after = arena.add_node(root, &format!("1:1:{first}"), Some(Role::Two));
            let position = match shape {
                TreeShape::Simultaneous => 2,
                TreeShape::Sequential => 2 + i,
            };
            for second in [Move::Cooperate, Move::Defect] {
                let label = format!("2:{position}:{second}");
                arena.add_node(after, &label, None);
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }

        let sizes = match shape {
            TreeShape::Simultaneous => vec![2, 2],
            TreeShape::Sequential => vec![2, 2, 2],
        };
        arena.set_info_sets(sizes);

        Self {
            arena,
            shape,
            labels,
        }
    }

    /// P2 moves without seeing P1.
    pub fn simultaneous() -> Self {
        Self::new(TreeShape::Simultaneous)
    }

    /// P2 moves after seeing P1.
    pub fn sequential() -> Self {
        Self::new(TreeShape::Sequential)
    }

    /// Layout of this tree.
    pub fn shape(&self) -> TreeShape {
        self.shape
    }

    /// Every open choice label, aligned with the information sets.
    pub fn strategy_labels(&self) -> &[String] {
        &self.labels
    }

    /// The underlying arena.
    pub fn arena(&self) -> &ArenaTree {
        &self.arena
    }

    /// Terminal reached through the two given labels.
    pub fn terminal_after(&self, first: &str, second: &str) -> Option<NodeIndex> {
        let root = self.arena.root()?;
        let after = self.arena.child_with_label(root, first)?;
        self.arena.child_with_label(after, second)
    }

    /// P2 decision node reached when P1 plays `first`.
    pub fn node_after(&self, first: Move) -> Option<NodeIndex> {
        let root = self.arena.root()?;
        self.arena.child_with_move(root, first)
    }

    /// Terminal reached when P1 plays `first` and P2 plays `second`.
    pub fn terminal_for(&self, first: Move, second: Move) -> Option<NodeIndex> {
        let after = self.node_after(first)?;
        self.arena.child_with_move(after, second)
    }

    /// Empty request for the first round.
    pub fn request(&self) -> PrisonersRequest {
        PrisonersRequest::new(self.labels.clone())
    }

    /// Request carrying last round's terminals.
    pub fn request_after(&self, terminals: PerRole<Option<NodeIndex>>) -> PrisonersRequest {
        self.request().with_final_nodes(terminals)
    }
}

impl GameTree for PrisonersTree {
    fn node_count(&self) -> usize {
        self.arena.node_count()
    }

    fn contains(&self, index: NodeIndex) -> bool {
        self.arena.contains(index)
    }

    fn label(&self, node: NodeIndex) -> Option<&str> {
        self.arena.label(node)
    }

    fn is_root(&self, node: NodeIndex) -> bool {
        self.arena.is_root(node)
    }

    fn is_chance(&self, node: NodeIndex) -> bool {
        self.arena.is_chance(node)
    }

    fn controller(&self, node: NodeIndex) -> Option<Role> {
        self.arena.controller(node)
    }

    fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.arena.parent(node)
    }

    fn info_set_sizes(&self) -> &[usize] {
        self.arena.info_set_sizes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simultaneous_layout() {
        let tree = PrisonersTree::simultaneous();
        assert_eq!(tree.node_count(), 7);
        assert_eq!(tree.info_set_sizes(), &[2, 2]);
        assert_eq!(
            tree.strategy_labels(),
            &["1:1:Cooperate", "1:1:Defect", "2:2:Cooperate", "2:2:Defect"]
        );
    }

    #[test]
    fn test_sequential_layout() {
        let tree = PrisonersTree::sequential();
        assert_eq!(tree.info_set_sizes(), &[2, 2, 2]);
        assert_eq!(tree.strategy_labels().len(), 6);
        let terminal = tree.terminal_for(Move::Defect, Move::Cooperate).unwrap();
        assert_eq!(tree.label(terminal), Some("2:3:Cooperate"));
        assert_eq!(tree.parent_controller(terminal), Some(Role::Two));
    }

    #[test]
    fn test_terminals_are_distinct() {
        let tree = PrisonersTree::simultaneous();
        let mut seen = Vec::new();
        for first in [Move::Cooperate, Move::Defect] {
            for second in [Move::Cooperate, Move::Defect] {
                let t = tree.terminal_for(first, second).unwrap();
                assert_eq!(tree.controller(t), None);
                assert!(!seen.contains(&t));
                seen.push(t);
            }
        }
        assert_eq!(
            tree.terminal_after("1:1:Defect", "2:2:Defect"),
            tree.terminal_for(Move::Defect, Move::Defect)
        );
        assert_eq!(tree.terminal_after("1:1:Defect", "2:9:Defect"), None);
    }

    #[test]
    fn test_arena_children() {
        let mut arena = ArenaTree::new();
        let root = arena.add_root(Some(Role::One));
        let a = arena.add_node(root, "1:1:Cooperate", Some(Role::Two));
        let b = arena.add_node(root, "1:1:Defect", Some(Role::Two));
        assert_eq!(arena.children(root), &[a, b]);
        assert_eq!(arena.child_with_move(root, Move::Defect), Some(b));
        assert!(arena.children(99).is_empty());
        assert!(arena.is_root(root));
        assert!(!arena.is_root(a));
    }
}

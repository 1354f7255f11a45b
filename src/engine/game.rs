//! Collaborator interfaces consumed by the engine.
//!
//! The engine never builds or owns the game tree, nor does it decide how
//! strategies travel to the rest of the match. It only needs the narrow
//! capability set described by the traits in this module:
//!
//! - [`GameTree`]: node lookup, ancestry and information set layout
//! - [`StrategyRequest`]: the open choice labels and their probabilities
//! - [`Orchestrator`]: hands out requests and accepts completed ones
//!
//! It also defines the small vocabulary shared by every other module:
//! player roles, the two-action alphabet and parsed choice labels.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::engine::error::Mismatch;

/// Index of a node inside a [`GameTree`].
pub type NodeIndex = usize;

/// One of the two player roles of the stage game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Player no. 1 (moves first).
    One,
    /// Player no. 2.
    Two,
}

impl Role {
    /// Both roles, in player-number order.
    pub const ALL: [Role; 2] = [Role::One, Role::Two];

    /// Map a player number (1 or 2) to a role.
    pub fn from_number(number: u8) -> Option<Role> {
        match number {
            1 => Some(Role::One),
            2 => Some(Role::Two),
            _ => None,
        }
    }

    /// The player number of this role.
    pub fn number(self) -> u8 {
        match self {
            Role::One => 1,
            Role::Two => 2,
        }
    }

    /// The other role.
    pub fn other(self) -> Role {
        match self {
            Role::One => Role::Two,
            Role::Two => Role::One,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.number())
    }
}

/// A pair of values, one per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerRole<T> {
    /// Value for [`Role::One`].
    pub one: T,
    /// Value for [`Role::Two`].
    pub two: T,
}

impl<T> PerRole<T> {
    /// Build a pair from two values.
    pub fn new(one: T, two: T) -> Self {
        Self { one, two }
    }

    /// Iterate `(role, value)` pairs in role order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &T)> {
        [(Role::One, &self.one), (Role::Two, &self.two)].into_iter()
    }
}

impl<T> Index<Role> for PerRole<T> {
    type Output = T;

    fn index(&self, role: Role) -> &T {
        match role {
            Role::One => &self.one,
            Role::Two => &self.two,
        }
    }
}

impl<T> IndexMut<Role> for PerRole<T> {
    fn index_mut(&mut self, role: Role) -> &mut T {
        match role {
            Role::One => &mut self.one,
            Role::Two => &mut self.two,
        }
    }
}

/// The action alphabet of the stage game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    /// Cooperate with the opponent.
    Cooperate,
    /// Defect against the opponent.
    Defect,
}

impl Move {
    /// Parse an action name, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Move> {
        if name.eq_ignore_ascii_case("cooperate") {
            Some(Move::Cooperate)
        } else if name.eq_ignore_ascii_case("defect") {
            Some(Move::Defect)
        } else {
            None
        }
    }

    /// The other action.
    pub fn opposite(self) -> Move {
        match self {
            Move::Cooperate => Move::Defect,
            Move::Defect => Move::Cooperate,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Cooperate => write!(f, "Cooperate"),
            Move::Defect => write!(f, "Defect"),
        }
    }
}

/// A parsed choice label of the form `role:position:action`.
///
/// The role field names the player who takes this branch. Seen from the
/// engine it is the role the opponent occupied when it was observed, and
/// the role we mirror into when we answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChoiceLabel {
    /// Role taking this branch.
    pub role: Role,
    /// Positional component (decision point identifier).
    pub position: String,
    /// Action name, `None` when outside the Cooperate/Defect alphabet.
    pub action: Option<Move>,
    /// The label exactly as the collaborator spelled it.
    pub raw: String,
}

impl ChoiceLabel {
    /// Decompose a raw label.
    ///
    /// Fails with [`Mismatch::MalformedLabel`] when the label has fewer
    /// than three fields or names a role other than 1 or 2.
    pub fn parse(raw: &str) -> Result<Self, Mismatch> {
        let malformed = || Mismatch::MalformedLabel {
            label: raw.to_string(),
        };

        let mut fields = raw.split(':');
        let role = fields
            .next()
            .and_then(|f| f.trim().parse::<u8>().ok())
            .and_then(Role::from_number)
            .ok_or_else(malformed)?;
        let position = fields.next().ok_or_else(malformed)?;
        let action = fields.next().ok_or_else(malformed)?;

        Ok(Self {
            role,
            position: position.to_string(),
            action: Move::parse(action.trim()),
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for ChoiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Read access to the extensive-form tree shared by both agents.
pub trait GameTree {
    /// Total number of nodes.
    fn node_count(&self) -> usize;

    /// Whether `index` names a node of this tree.
    fn contains(&self, index: NodeIndex) -> bool;

    /// Choice label of the branch leading into `node` (root has none).
    fn label(&self, node: NodeIndex) -> Option<&str>;

    /// Whether `node` is the root.
    fn is_root(&self, node: NodeIndex) -> bool;

    /// Whether `node` is a chance (nature) node.
    fn is_chance(&self, node: NodeIndex) -> bool;

    /// Role acting at `node`, `None` for chance and terminal nodes.
    fn controller(&self, node: NodeIndex) -> Option<Role>;

    /// Parent of `node`, `None` when it has no ancestor.
    fn parent(&self, node: NodeIndex) -> Option<NodeIndex>;

    /// Sizes of the information sets, in the same order the strategy
    /// request lists its labels.
    fn info_set_sizes(&self) -> &[usize];

    /// Role acting at the parent of `node`.
    fn parent_controller(&self, node: NodeIndex) -> Option<Role> {
        self.parent(node).and_then(|p| self.controller(p))
    }
}

/// One round's strategy request, filled in by the engine.
pub trait StrategyRequest: Clone {
    /// Open choice labels, in the order aligned with
    /// [`GameTree::info_set_sizes`].
    fn labels(&self) -> Vec<String>;

    /// Probability currently assigned to `label`.
    fn probability(&self, label: &str) -> Option<f64>;

    /// Assign a probability to `label`.
    fn set_probability(&mut self, label: &str, probability: f64);

    /// Terminal node reached last round while we played `role`.
    fn final_node(&self, role: Role) -> Option<NodeIndex>;

    /// Rounds left in the match, this one included.
    fn remaining_iterations(&self) -> u32;

    /// Probability that the match continues past this round.
    fn continuation_probability(&self) -> f64;
}

/// Refusal of a submitted strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Why the orchestrator refused the strategy.
    pub reason: String,
}

impl Rejection {
    /// Create a rejection with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// The outside party running the match.
pub trait Orchestrator {
    /// Tree type shared with the engine.
    type Tree: GameTree;

    /// Request type handed out every round.
    type Request: StrategyRequest;

    /// The game tree, `None` while it is not yet available.
    fn tree(&self) -> Option<&Self::Tree>;

    /// Next strategy request, `None` once the match has been terminated.
    fn next_request(&mut self) -> Option<Self::Request>;

    /// Deliver a completed request.
    fn submit(&mut self, request: &Self::Request) -> Result<(), Rejection>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_numbers() {
        assert_eq!(Role::from_number(1), Some(Role::One));
        assert_eq!(Role::from_number(2), Some(Role::Two));
        assert_eq!(Role::from_number(3), None);
        assert_eq!(Role::One.other(), Role::Two);
        assert_eq!(Role::Two.number(), 2);
    }

    #[test]
    fn test_per_role_indexing() {
        let mut pair = PerRole::new(1, 2);
        pair[Role::Two] += 10;
        assert_eq!(pair[Role::One], 1);
        assert_eq!(pair[Role::Two], 12);
        let roles: Vec<Role> = pair.iter().map(|(r, _)| r).collect();
        assert_eq!(roles, vec![Role::One, Role::Two]);
    }

    #[test]
    fn test_parse_label() {
        let label = ChoiceLabel::parse("2:3:defect").unwrap();
        assert_eq!(label.role, Role::Two);
        assert_eq!(label.position, "3");
        assert_eq!(label.action, Some(Move::Defect));
        assert_eq!(label.to_string(), "2:3:defect");
    }

    #[test]
    fn test_parse_label_outside_alphabet() {
        let label = ChoiceLabel::parse("1:1:Abstain").unwrap();
        assert_eq!(label.action, None);
    }

    #[test]
    fn test_parse_malformed_labels() {
        for raw in ["", "1:Cooperate", "3:1:Cooperate", "x:1:Defect"] {
            assert!(
                matches!(ChoiceLabel::parse(raw), Err(Mismatch::MalformedLabel { .. })),
                "{raw:?} should be malformed"
            );
        }
    }
}

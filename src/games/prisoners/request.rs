//! In-memory strategy request.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::engine::game::{NodeIndex, PerRole, Role, StrategyRequest};

/// Wire value for "no terminal known".
pub const NO_NODE: i64 = -1;

/// Strategy request with labels kept in their collaborator-given order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrisonersRequest {
    labels: Vec<String>,
    probabilities: FxHashMap<String, f64>,
    final_nodes: PerRole<Option<NodeIndex>>,
    remaining_iterations: u32,
    continuation_probability: f64,
}

impl PrisonersRequest {
    /// Request over `labels` with every probability at zero, no known
    /// terminals, an open-ended match and certain continuation.
    pub fn new(labels: Vec<String>) -> Self {
        let probabilities = labels.iter().map(|l| (l.clone(), 0.0)).collect();
        Self {
            labels,
            probabilities,
            final_nodes: PerRole::default(),
            remaining_iterations: u32::MAX,
            continuation_probability: 1.0,
        }
    }

    /// Set last round's terminals.
    pub fn with_final_nodes(mut self, final_nodes: PerRole<Option<NodeIndex>>) -> Self {
        self.final_nodes = final_nodes;
        self
    }

    /// Set last round's terminals from wire indices, where any negative
    /// value (normally [`NO_NODE`]) means unknown.
    pub fn with_wire_final_nodes(self, one: i64, two: i64) -> Self {
        let decode = |index: i64| usize::try_from(index).ok();
        self.with_final_nodes(PerRole::new(decode(one), decode(two)))
    }

    /// Set the number of rounds left, this one included.
    pub fn with_remaining_iterations(mut self, remaining: u32) -> Self {
        self.remaining_iterations = remaining;
        self
    }

    /// Set the probability that the match goes on.
    pub fn with_continuation_probability(mut self, probability: f64) -> Self {
        self.continuation_probability = probability;
        self
    }

    /// `(label, probability)` pairs in label order.
    pub fn assignments(&self) -> Vec<(String, f64)> {
        self.labels
            .iter()
            .map(|l| (l.clone(), self.probabilities.get(l).copied().unwrap_or(0.0)))
            .collect()
    }

    /// Probability sum of each consecutive group of the given sizes.
    ///
    /// Labels beyond the last group are ignored.
    pub fn group_sums(&self, sizes: &[usize]) -> Vec<f64> {
        let assignments = self.assignments();
        let mut rest = assignments.as_slice();
        let mut sums = Vec::with_capacity(sizes.len());
        for &size in sizes {
            let take = size.min(rest.len());
            let (head, tail) = rest.split_at(take);
            sums.push(head.iter().map(|(_, p)| p).sum());
            rest = tail;
        }
        sums
    }
}

impl StrategyRequest for PrisonersRequest {
    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn probability(&self, label: &str) -> Option<f64> {
        self.probabilities.get(label).copied()
    }

    fn set_probability(&mut self, label: &str, probability: f64) {
        if let Some(p) = self.probabilities.get_mut(label) {
            *p = probability;
        }
    }

    fn final_node(&self, role: Role) -> Option<NodeIndex> {
        self.final_nodes[role]
    }

    fn remaining_iterations(&self) -> u32 {
        self.remaining_iterations
    }

    fn continuation_probability(&self) -> f64 {
        self.continuation_probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["1:1:Cooperate".to_string(), "1:1:Defect".to_string()]
    }

    #[test]
    fn test_new_request_is_blank() {
        let request = PrisonersRequest::new(labels());
        assert_eq!(request.probability("1:1:Defect"), Some(0.0));
        assert_eq!(request.final_node(Role::One), None);
        assert_eq!(request.group_sums(&[2]), vec![0.0]);
    }

    #[test]
    fn test_unknown_labels_are_ignored() {
        let mut request = PrisonersRequest::new(labels());
        request.set_probability("9:9:Cooperate", 1.0);
        assert_eq!(request.probability("9:9:Cooperate"), None);
        assert_eq!(request.labels(), labels());
    }

    #[test]
    fn test_wire_sentinel_means_unknown() {
        let request = PrisonersRequest::new(labels()).with_wire_final_nodes(NO_NODE, 4);
        assert_eq!(request.final_node(Role::One), None);
        assert_eq!(request.final_node(Role::Two), Some(4));
    }

    #[test]
    fn test_assignments_keep_label_order() {
        let mut request = PrisonersRequest::new(labels());
        request.set_probability("1:1:Defect", 0.25);
        request.set_probability("1:1:Cooperate", 0.75);
        assert_eq!(
            request.assignments(),
            vec![
                ("1:1:Cooperate".to_string(), 0.75),
                ("1:1:Defect".to_string(), 0.25)
            ]
        );
        assert_eq!(request.group_sums(&[2]), vec![1.0]);
    }
}

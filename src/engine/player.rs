//! The round loop of one match.
//!
//! [`ReactivePlayer`] owns everything that persists between rounds of a
//! match: the per-role punishment state, the last terminal node seen for
//! each role and the random source of the repair pass. A round is computed
//! by [`ReactivePlayer::respond`] against a scratch copy of the state and
//! only becomes permanent through [`ReactivePlayer::commit`], which
//! [`ReactivePlayer::play`] calls once the orchestrator has accepted the
//! strategy. A rejected strategy is therefore recomputed from the same
//! committed state, never from a half-updated one.
//!
//! Every label of a role is fed to the decision rule in request order,
//! including labels of information sets the opponent's path never reached.
//! A label the opponent did not take is read as the opposite move, so an
//! unvisited information set still consumes forced moves and can start a
//! pending punishment. On trees with several information sets per role the
//! forced defections are therefore spread over visited and unvisited sets.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::engine::config::{EngineConfig, EngineStats};
use crate::engine::decision::{decide, Outlook};
use crate::engine::error::{EngineError, Mismatch, Result};
use crate::engine::game::{
    ChoiceLabel, GameTree, NodeIndex, Orchestrator, PerRole, Role, StrategyRequest,
};
use crate::engine::history::opponent_moves;
use crate::engine::punishment::RoleState;
use crate::engine::repair::{group_labels, repair};

/// State of both opponent roles at a round boundary.
pub type RoleSnapshot = PerRole<RoleState>;

/// Result of computing one round, not yet committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundPlan {
    /// Per-role state after this round.
    pub roles: RoleSnapshot,
    /// Terminal nodes known after this round.
    pub terminals: PerRole<Option<NodeIndex>>,
    /// The first-round policy was used.
    pub opening: bool,
    /// Opponent labels recovered from last round's paths.
    pub opponent_moves: Vec<String>,
    /// Information sets regenerated by the repair pass.
    pub repaired_groups: usize,
    /// Labels forced to defect by an end-game override.
    pub end_game_overrides: usize,
    /// Punishments started this round.
    pub punishments_started: usize,
}

/// Adaptive gradual-punishment player for one match.
///
/// # Example
/// ```
/// use reactive_strategy::engine::{EngineConfig, ReactivePlayer};
/// use reactive_strategy::games::prisoners::PrisonersTree;
///
/// let tree = PrisonersTree::simultaneous();
/// let mut player = ReactivePlayer::new(EngineConfig::default().with_seed(1)).unwrap();
///
/// let mut request = tree.request();
/// let plan = player.respond(&tree, &mut request).unwrap();
/// assert!(plan.opening);
/// player.commit(plan);
/// ```
#[derive(Debug)]
pub struct ReactivePlayer {
    /// Configuration for the player.
    config: EngineConfig,

    /// Committed per-role state, keyed by the opponent's role.
    roles: RoleSnapshot,

    /// Committed terminal nodes of the last completed round.
    terminals: PerRole<Option<NodeIndex>>,

    /// Statistics tracking.
    stats: EngineStats,

    /// Random number generator for the repair pass.
    rng: StdRng,
}

impl ReactivePlayer {
    /// Create a player with fresh, neutral state.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            roles: PerRole::default(),
            terminals: PerRole::default(),
            stats: EngineStats::new(),
            rng,
        })
    }

    /// Compute this round's strategy into `request`.
    ///
    /// The committed state is only read. On error nothing but the random
    /// source has moved, and `request` may hold partial assignments.
    pub fn respond<T, S>(&mut self, tree: &T, request: &mut S) -> Result<RoundPlan>
    where
        T: GameTree,
        S: StrategyRequest,
    {
        let mut terminals = self.terminals;
        for role in Role::ALL {
            if let Some(index) = request.final_node(role) {
                if !tree.contains(index) {
                    return Err(Mismatch::UnknownNode { index }.into());
                }
                terminals[role] = Some(index);
            }
        }

        let labels = request.labels();
        let sizes = tree.info_set_sizes();
        group_labels(&labels, sizes)?;
        let parsed = labels
            .iter()
            .map(|raw| ChoiceLabel::parse(raw))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for label in &labels {
            request.set_probability(label, 0.0);
        }

        let outlook = Outlook {
            remaining_iterations: request.remaining_iterations(),
            continuation_probability: request.continuation_probability(),
        };
        let policy = &self.config.policy;
        let mut plan = RoundPlan {
            roles: self.roles,
            terminals,
            opening: terminals.one.is_none() && terminals.two.is_none(),
            opponent_moves: Vec::new(),
            repaired_groups: 0,
            end_game_overrides: 0,
            punishments_started: 0,
        };

        if plan.opening {
            let (opening, reason) = policy.opening_move(&outlook);
            log::debug!("first round: playing {opening} ({reason:?}) everywhere");
            for label in &parsed {
                let probability = if label.action == Some(opening) { 1.0 } else { 0.0 };
                request.set_probability(&label.raw, probability);
                if reason.is_end_game() && label.action == Some(opening) {
                    plan.end_game_overrides += 1;
                }
            }
        } else {
            let moves = opponent_moves(tree, &terminals)?;
            let mut observed: Vec<String> = moves.iter().cloned().collect();
            observed.sort();
            log::debug!("opponent plays last round: {observed:?}");
            plan.opponent_moves = observed;

            for label in &parsed {
                let Some(candidate) = label.action else {
                    log::debug!("{label}: action outside the alphabet, left to repair");
                    continue;
                };
                let observed = if moves.contains(&label.raw) {
                    candidate
                } else {
                    candidate.opposite()
                };

                let (next, decision) =
                    decide(policy, &plan.roles[label.role], observed, candidate, &outlook);
                plan.roles[label.role] = next;
                request.set_probability(&label.raw, decision.probability);

                log::debug!(
                    "{label}: opponent {} played {observed}, {:?} -> {:.1}",
                    label.role,
                    decision.reason,
                    decision.probability
                );
                if decision.reason.is_end_game() && decision.probability == 1.0 {
                    plan.end_game_overrides += 1;
                }
                if decision.started_punishment {
                    plan.punishments_started += 1;
                }
            }
        }

        plan.repaired_groups = repair(request, sizes, self.config.tolerance, &mut self.rng)?;
        Ok(plan)
    }

    /// Make a computed round permanent.
    pub fn commit(&mut self, plan: RoundPlan) {
        self.stats.rounds += 1;
        if plan.opening {
            self.stats.opening_rounds += 1;
        }
        self.stats.repaired_groups += plan.repaired_groups as u64;
        self.stats.end_game_overrides += plan.end_game_overrides as u64;
        self.stats.punishments_started += plan.punishments_started as u64;

        for (role, state) in plan.roles.iter() {
            log::info!(
                "round {}: opponent {role} {:?}, defects {}, cooperates {}, streak {}",
                self.stats.rounds,
                state.stance,
                state.opponent_defects,
                state.opponent_cooperates,
                state.cooperate_streak
            );
        }

        self.roles = plan.roles;
        self.terminals = plan.terminals;
    }

    /// Play a whole match against `orchestrator`.
    ///
    /// Waits for the game tree, then answers requests until the
    /// orchestrator stops handing them out. Each rejected submission is
    /// recomputed from the committed state, up to
    /// [`EngineConfig::max_submission_attempts`] times.
    pub fn play<O: Orchestrator>(&mut self, orchestrator: &mut O) -> Result<EngineStats> {
        self.await_tree(orchestrator)?;

        while let Some(request) = orchestrator.next_request() {
            let mut attempts = 0;
            loop {
                attempts += 1;
                let mut draft = request.clone();
                let plan = {
                    let tree = self.await_tree(orchestrator)?;
                    self.respond(tree, &mut draft)?
                };

                match orchestrator.submit(&draft) {
                    Ok(()) => {
                        self.commit(plan);
                        break;
                    }
                    Err(rejection) => {
                        self.stats.rejected_submissions += 1;
                        log::warn!("invalid strategy (attempt {attempts}): {rejection}");
                        if attempts >= self.config.max_submission_attempts {
                            return Err(EngineError::SubmissionRejected {
                                attempts,
                                reason: rejection.reason,
                            });
                        }
                    }
                }
            }
        }

        Ok(self.stats.clone())
    }

    /// Poll until the orchestrator exposes the game tree.
    fn await_tree<'o, O: Orchestrator>(&self, orchestrator: &'o O) -> Result<&'o O::Tree> {
        let interval = Duration::from_millis(self.config.tree_poll_interval_ms);
        let mut polls = 0;

        loop {
            if let Some(tree) = orchestrator.tree() {
                return Ok(tree);
            }
            polls += 1;
            if let Some(max) = self.config.max_tree_polls {
                if polls >= max {
                    return Err(EngineError::TreeUnavailable { polls });
                }
            }
            log::warn!("waiting for the game tree to become available ({polls})");
            thread::sleep(interval);
        }
    }

    /// Committed state for the opponent in `role`.
    pub fn role_state(&self, role: Role) -> &RoleState {
        &self.roles[role]
    }

    /// Committed state of both roles.
    pub fn snapshot(&self) -> RoleSnapshot {
        self.roles
    }

    /// Committed terminal nodes.
    pub fn terminals(&self) -> PerRole<Option<NodeIndex>> {
        self.terminals
    }

    /// Get current statistics.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::Policy;
    use crate::engine::game::Move;
    use crate::engine::punishment::Stance;
    use crate::games::prisoners::{PrisonersRequest, PrisonersTree, ReplayHarness, Scenario};

    fn player(policy: Policy) -> ReactivePlayer {
        let config = EngineConfig::default()
            .with_policy(policy)
            .with_seed(42)
            .with_tree_polling(1, Some(10));
        ReactivePlayer::new(config).unwrap()
    }

    fn probabilities(request: &PrisonersRequest) -> Vec<f64> {
        request
            .labels()
            .iter()
            .map(|l| request.probability(l).unwrap())
            .collect()
    }

    /// Terminals for a round where we played `ours` and the opponent played
    /// `theirs` in both games.
    fn round(tree: &PrisonersTree, ours: Move, theirs: Move) -> PerRole<Option<NodeIndex>> {
        let one = tree.terminal_for(ours, theirs).unwrap();
        let two = tree.terminal_for(theirs, ours).unwrap();
        PerRole::new(Some(one), Some(two))
    }

    #[test]
    fn test_first_round_cooperates() {
        let tree = PrisonersTree::simultaneous();
        let mut p = player(Policy::gradual());
        let mut request = tree.request().with_continuation_probability(0.1);

        let plan = p.respond(&tree, &mut request).unwrap();
        assert!(plan.opening);
        assert_eq!(plan.repaired_groups, 0);
        assert_eq!(probabilities(&request), vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_first_round_hybrid_follows_continuation() {
        let tree = PrisonersTree::simultaneous();

        let mut p = player(Policy::hybrid());
        let mut request = tree
            .request()
            .with_remaining_iterations(10)
            .with_continuation_probability(0.5);
        p.respond(&tree, &mut request).unwrap();
        assert_eq!(probabilities(&request), vec![1.0, 0.0, 1.0, 0.0]);

        let mut request = tree
            .request()
            .with_remaining_iterations(10)
            .with_continuation_probability(0.2);
        p.respond(&tree, &mut request).unwrap();
        assert_eq!(probabilities(&request), vec![0.0, 1.0, 0.0, 1.0]);

        let mut request = tree
            .request()
            .with_remaining_iterations(1)
            .with_continuation_probability(0.9);
        p.respond(&tree, &mut request).unwrap();
        assert_eq!(probabilities(&request), vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_mirrors_cooperation() {
        let tree = PrisonersTree::simultaneous();
        let mut p = player(Policy::gradual());
        let mut request = tree
            .request()
            .with_final_nodes(round(&tree, Move::Cooperate, Move::Cooperate));

        let plan = p.respond(&tree, &mut request).unwrap();
        assert!(!plan.opening);
        assert_eq!(probabilities(&request), vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_punishment_length_matches_defections() {
        // Opponent defects once, then cooperates: exactly one forced
        // defection, then two forced cooperations.
        let tree = PrisonersTree::simultaneous();
        let mut p = player(Policy::gradual());
        let mut defections = 0;

        let defected = round(&tree, Move::Cooperate, Move::Defect);
        let mut request = tree.request().with_final_nodes(defected);
        let plan = p.respond(&tree, &mut request).unwrap();
        p.commit(plan);
        if request.probability("1:1:Defect") == Some(1.0) {
            defections += 1;
        }
        assert_eq!(p.role_state(Role::One).stance, Stance::Forgiving { cooperates: 2 });

        let calm = round(&tree, Move::Defect, Move::Cooperate);
        for _ in 0..2 {
            let mut request = tree.request().with_final_nodes(calm);
            let plan = p.respond(&tree, &mut request).unwrap();
            p.commit(plan);
            assert_eq!(request.probability("1:1:Cooperate"), Some(1.0));
        }
        assert_eq!(defections, 1);
        assert_eq!(p.role_state(Role::One).stance, Stance::Neutral);
    }

    #[test]
    fn test_punishment_grows_with_defections() {
        let tree = PrisonersTree::simultaneous();
        let mut p = player(Policy::gradual());

        // Three defections in a row. The first is answered at once and the
        // forgiveness it queued absorbs the next two.
        let defected = round(&tree, Move::Cooperate, Move::Defect);
        let mut answers = Vec::new();
        for _ in 0..3 {
            let mut request = tree.request().with_final_nodes(defected);
            let plan = p.respond(&tree, &mut request).unwrap();
            p.commit(plan);
            answers.push(request.probability("2:2:Defect").unwrap());
        }
        assert_eq!(answers, vec![1.0, 0.0, 0.0]);
        assert_eq!(p.role_state(Role::Two).opponent_defects, 3);
        assert!(p.role_state(Role::Two).pending_punishment);

        // Once the opponent settles down the pending punishment plays out
        // in full: three defections, two cooperations, then mirroring.
        let calm = round(&tree, Move::Defect, Move::Cooperate);
        let mut sequence = Vec::new();
        for _ in 0..6 {
            let mut request = tree.request().with_final_nodes(calm);
            let plan = p.respond(&tree, &mut request).unwrap();
            p.commit(plan);
            sequence.push(request.probability("2:2:Defect").unwrap());
        }
        assert_eq!(sequence, vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        // Both roles saw the same history.
        assert_eq!(p.stats().punishments_started, 4);
    }

    #[test]
    fn test_unvisited_branch_is_repaired() {
        let tree = PrisonersTree::sequential();
        let mut p = player(Policy::gradual());
        let mut request = tree
            .request()
            .with_final_nodes(round(&tree, Move::Cooperate, Move::Cooperate));

        let plan = p.respond(&tree, &mut request).unwrap();
        assert_eq!(plan.repaired_groups, 1);
        assert_eq!(request.probability("2:2:Cooperate"), Some(1.0));
        let unvisited = request.probability("2:3:Cooperate").unwrap()
            + request.probability("2:3:Defect").unwrap();
        assert!((unvisited - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unvisited_information_set_consumes_forced_moves() {
        let tree = PrisonersTree::sequential();
        let mut p = player(Policy::gradual());

        // The opponent defects as P2 after our cooperation.
        let defected = PerRole::new(
            tree.terminal_for(Move::Cooperate, Move::Defect),
            tree.terminal_for(Move::Cooperate, Move::Cooperate),
        );
        let mut request = tree.request().with_final_nodes(defected);
        let plan = p.respond(&tree, &mut request).unwrap();
        p.commit(plan);
        assert_eq!(request.probability("2:2:Defect"), Some(1.0));
        assert_eq!(request.probability("2:3:Cooperate"), Some(1.0));
        // The unvisited set already spent one forgiveness step.
        assert_eq!(p.role_state(Role::Two).stance, Stance::Forgiving { cooperates: 1 });

        // The opponent cooperates again. The pending punishment starts and
        // its only defection lands in the unvisited set.
        let calm = PerRole::new(
            tree.terminal_for(Move::Cooperate, Move::Cooperate),
            tree.terminal_for(Move::Cooperate, Move::Cooperate),
        );
        let mut request = tree.request().with_final_nodes(calm);
        let plan = p.respond(&tree, &mut request).unwrap();
        assert_eq!(plan.punishments_started, 1);
        assert_eq!(plan.repaired_groups, 0);
        p.commit(plan);
        assert_eq!(
            probabilities(&request),
            vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(p.role_state(Role::Two).stance, Stance::Forgiving { cooperates: 2 });
    }

    #[test]
    fn test_last_round_defects_regardless_of_state() {
        let tree = PrisonersTree::simultaneous();
        let mut p = player(Policy::hybrid());
        let mut request = tree
            .request()
            .with_final_nodes(round(&tree, Move::Cooperate, Move::Cooperate))
            .with_remaining_iterations(1);

        let plan = p.respond(&tree, &mut request).unwrap();
        assert_eq!(probabilities(&request), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(plan.end_game_overrides, 2);
    }

    #[test]
    fn test_mismatched_request_leaves_state_untouched() {
        let tree = PrisonersTree::simultaneous();
        let mut p = player(Policy::gradual());
        let before = p.snapshot();

        let mut short = PrisonersRequest::new(vec!["1:1:Cooperate".to_string()])
            .with_final_nodes(round(&tree, Move::Cooperate, Move::Defect));
        let err = p.respond(&tree, &mut short).unwrap_err();
        assert!(matches!(
            err,
            EngineError::StructuralMismatch(Mismatch::LabelsExhausted { .. })
        ));

        let mut unknown = tree.request().with_final_nodes(PerRole::new(Some(400), None));
        let err = p.respond(&tree, &mut unknown).unwrap_err();
        assert!(matches!(
            err,
            EngineError::StructuralMismatch(Mismatch::UnknownNode { index: 400 })
        ));
        assert_eq!(p.snapshot(), before);
        assert_eq!(p.stats().rounds, 0);
    }

    #[test]
    fn test_uncommitted_round_does_not_mutate() {
        let tree = PrisonersTree::simultaneous();
        let mut p = player(Policy::gradual());
        let defected = round(&tree, Move::Cooperate, Move::Defect);

        let mut first = tree.request().with_final_nodes(defected);
        let plan_a = p.respond(&tree, &mut first).unwrap();
        let mut second = tree.request().with_final_nodes(defected);
        let plan_b = p.respond(&tree, &mut second).unwrap();

        assert_eq!(plan_a.roles, plan_b.roles);
        assert_eq!(plan_a.roles.one.opponent_defects, 1);
        assert_eq!(p.role_state(Role::One).opponent_defects, 0);
    }

    #[test]
    fn test_rejected_submission_is_recomputed_once() {
        let scenario = Scenario::new("retry", 3)
            .with_opponent(vec![Move::Defect])
            .with_rejections(2);
        let mut harness = ReplayHarness::new(&scenario);
        let mut p = player(Policy::gradual());

        let stats = p.play(&mut harness).unwrap();
        assert_eq!(stats.rounds, 3);
        assert_eq!(stats.rejected_submissions, 2);
        // Two observed rounds of defection, each counted once.
        assert_eq!(p.role_state(Role::One).opponent_defects, 2);
        assert_eq!(p.role_state(Role::Two).opponent_defects, 2);
    }

    #[test]
    fn test_persistent_rejection_is_surfaced() {
        let scenario = Scenario::new("stubborn", 2).with_rejections(100);
        let mut harness = ReplayHarness::new(&scenario);
        let mut p = player(Policy::gradual());

        let err = p.play(&mut harness).unwrap_err();
        assert!(matches!(err, EngineError::SubmissionRejected { attempts: 5, .. }));
        assert_eq!(p.stats().rounds, 0);
    }

    #[test]
    fn test_waits_for_tree() {
        let scenario = Scenario::new("late tree", 2);
        let mut harness = ReplayHarness::new(&scenario).with_tree_delay(3);
        let mut p = player(Policy::gradual());
        assert_eq!(p.play(&mut harness).unwrap().rounds, 2);

        let mut harness = ReplayHarness::new(&scenario).with_tree_delay(50);
        let mut p = player(Policy::gradual());
        assert!(matches!(
            p.play(&mut harness),
            Err(EngineError::TreeUnavailable { polls: 10 })
        ));
    }

    #[test]
    fn test_simplex_holds_over_long_match() {
        let scenario = Scenario::new("mixed", 40)
            .with_shape(crate::games::prisoners::TreeShape::Sequential)
            .with_opponent(vec![Move::Cooperate, Move::Defect, Move::Defect, Move::Cooperate]);
        for policy in [Policy::gradual(), Policy::hybrid()] {
            let mut harness = ReplayHarness::new(&scenario);
            let mut p = player(policy);
            p.play(&mut harness).unwrap();

            for record in harness.transcript() {
                for sum in record.group_sums() {
                    assert!((sum - 1.0).abs() < 1e-9, "round {} sums to {sum}", record.round);
                }
            }
        }
    }
}

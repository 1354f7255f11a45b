//! The decision rule: one probability for one choice label.
//!
//! [`decide`] is a pure transition function. Given the opponent role's
//! current [`RoleState`], the move that opponent made last round and the
//! candidate move carried by the label under analysis, it returns the next
//! state and the probability to assign. It performs no I/O; the round
//! layer turns the returned [`Reason`] into log events.
//!
//! Each label is classified by the pair (observed, candidate):
//!
//! | observed  | candidate | neutral behaviour                              |
//! |-----------|-----------|------------------------------------------------|
//! | Cooperate | Cooperate | mirror, or start a pending punishment          |
//! | Cooperate | Defect    | mirror, or start a pending punishment + advance|
//! | Defect    | Cooperate | defect                                         |
//! | Defect    | Defect    | count the defection, punish, advance           |
//!
//! While punishing the rule always defects, while forgiving it always
//! cooperates. The hybrid policy adds end-game overrides and a leeway
//! comparison for opponents on a cooperation streak.

use serde::{Deserialize, Serialize};

use crate::engine::config::{LeewayParams, Policy};
use crate::engine::game::Move;
use crate::engine::punishment::RoleState;

/// What the match looks like from the current round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outlook {
    /// Rounds left, this one included.
    pub remaining_iterations: u32,
    /// Probability that another round follows this one.
    pub continuation_probability: f64,
}

/// Why a label received its probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    /// First round, nothing observed yet.
    Opening,
    /// Copy the opponent's cooperation.
    Mirror,
    /// Answer a defection with a defection.
    Retaliate,
    /// A punishment left pending starts now.
    PendingPunishment,
    /// Forced defection.
    Punishing,
    /// Forced cooperation.
    Forgiving,
    /// Cooperation streak: weigh cooperations against defections.
    Leeway,
    /// Nothing left to protect in the last round.
    LastRound,
    /// The match is unlikely to continue.
    UnlikelyContinuation,
}

impl Reason {
    /// Reasons that force a defection regardless of the opponent.
    pub fn is_end_game(self) -> bool {
        matches!(self, Reason::LastRound | Reason::UnlikelyContinuation)
    }
}

/// Outcome of [`decide`] for one label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Move the rule wants to play at this decision point.
    pub intended: Move,
    /// Probability assigned to the candidate label (0.0 or 1.0).
    pub probability: f64,
    /// Which branch of the rule fired.
    pub reason: Reason,
    /// A new punishment was started by this label.
    pub started_punishment: bool,
}

impl Decision {
    fn new(candidate: Move, intended: Move, reason: Reason, started_punishment: bool) -> Self {
        Self {
            intended,
            probability: if candidate == intended { 1.0 } else { 0.0 },
            reason,
            started_punishment,
        }
    }
}

impl Policy {
    /// Forced cooperations queued behind a punishment of an opponent with
    /// `defects` cumulative defections and a cooperation `streak`.
    pub fn forgiveness_length(&self, defects: u32, streak: u32) -> u32 {
        match self {
            Policy::Gradual { forgiveness } => *forgiveness,
            Policy::HybridLeeway(p) => {
                if defects < p.hard_forgiveness_defects || streak >= p.soft_reset_streak {
                    p.soft_forgiveness
                } else {
                    p.hard_forgiveness
                }
            }
        }
    }

    /// Move for every label of the first round, before anything was seen.
    pub fn opening_move(&self, outlook: &Outlook) -> (Move, Reason) {
        match self {
            Policy::Gradual { .. } => (Move::Cooperate, Reason::Opening),
            Policy::HybridLeeway(p) => {
                if outlook.remaining_iterations <= 1 {
                    (Move::Defect, Reason::LastRound)
                } else if outlook.continuation_probability < p.safe_continuation {
                    (Move::Defect, Reason::UnlikelyContinuation)
                } else {
                    (Move::Cooperate, Reason::Opening)
                }
            }
        }
    }
}

/// Decide the probability of `candidate` for an opponent that played
/// `observed` last round.
pub fn decide(
    policy: &Policy,
    state: &RoleState,
    observed: Move,
    candidate: Move,
    outlook: &Outlook,
) -> (RoleState, Decision) {
    match policy {
        Policy::Gradual { forgiveness } => gradual(*forgiveness, state, observed, candidate),
        Policy::HybridLeeway(params) => hybrid(policy, params, state, observed, candidate, outlook),
    }
}

/// Move forced by an active stance, `None` when neutral.
fn forced_move(state: &RoleState) -> Option<(Move, Reason)> {
    if state.is_punishing() {
        Some((Move::Defect, Reason::Punishing))
    } else if state.is_forgiving() {
        Some((Move::Cooperate, Reason::Forgiving))
    } else {
        None
    }
}

fn gradual(
    forgiveness: u32,
    state: &RoleState,
    observed: Move,
    candidate: Move,
) -> (RoleState, Decision) {
    let mut next = *state;
    let mut started = false;

    let (intended, reason) = match (observed, candidate) {
        (Move::Cooperate, Move::Cooperate) => match forced_move(&next) {
            Some(forced) => forced,
            None if next.pending_punishment => {
                next.start_punishment(next.opponent_defects, forgiveness);
                next.pending_punishment = false;
                started = true;
                (Move::Defect, Reason::PendingPunishment)
            }
            None => (Move::Cooperate, Reason::Mirror),
        },
        (Move::Defect, Move::Cooperate) => {
            forced_move(&next).unwrap_or((Move::Defect, Reason::Retaliate))
        }
        (Move::Cooperate, Move::Defect) => match forced_move(&next) {
            Some(forced) => {
                next.advance();
                forced
            }
            None if next.pending_punishment => {
                next.start_punishment(next.opponent_defects, forgiveness);
                next.pending_punishment = false;
                next.advance();
                started = true;
                (Move::Defect, Reason::PendingPunishment)
            }
            None => (Move::Cooperate, Reason::Mirror),
        },
        (Move::Defect, Move::Defect) => {
            next.opponent_defects += 1;
            next.pending_punishment = true;
            let chosen = match forced_move(&next) {
                Some(forced) => forced,
                None => {
                    next.start_punishment(next.opponent_defects, forgiveness);
                    started = true;
                    (Move::Defect, Reason::Retaliate)
                }
            };
            next.advance();
            chosen
        }
    };

    (next, Decision::new(candidate, intended, reason, started))
}

fn hybrid(
    policy: &Policy,
    p: &LeewayParams,
    state: &RoleState,
    observed: Move,
    candidate: Move,
    outlook: &Outlook,
) -> (RoleState, Decision) {
    let mut next = *state;
    let streak_before = next.cooperate_streak;

    // Observations are tallied on the label the opponent actually took,
    // before any override can short-circuit the rule.
    match (observed, candidate) {
        (Move::Cooperate, Move::Cooperate) => {
            next.opponent_cooperates += 1;
            next.cooperate_streak += 1;
        }
        (Move::Defect, Move::Defect) => {
            next.opponent_defects += 1;
            next.cooperate_streak = 0;
            next.pending_punishment = true;
        }
        _ => {}
    }

    if outlook.remaining_iterations == 1 {
        return (next, Decision::new(candidate, Move::Defect, Reason::LastRound, false));
    }
    if outlook.continuation_probability < p.safe_continuation {
        return (
            next,
            Decision::new(candidate, Move::Defect, Reason::UnlikelyContinuation, false),
        );
    }

    let mut started = false;
    let streak = next.cooperate_streak;
    // A zero factor grants no leeway.
    let leeway = |state: &RoleState| match state.opponent_defects.checked_div(p.leeway_factor) {
        Some(threshold) if state.opponent_cooperates >= threshold => {
            (Move::Cooperate, Reason::Leeway)
        }
        _ => (Move::Defect, Reason::Leeway),
    };
    let advance = |state: &mut RoleState, streak: u32| {
        if streak >= p.soft_reset_streak {
            state.advance_soft();
        } else {
            state.advance();
        }
    };

    let (intended, reason) = match (observed, candidate) {
        (Move::Cooperate, Move::Cooperate) => match forced_move(&next) {
            Some(forced) => forced,
            None if streak >= p.leeway_streak => leeway(&next),
            None if next.pending_punishment => {
                let forgiveness = policy.forgiveness_length(next.opponent_defects, streak);
                next.start_punishment(next.opponent_defects, forgiveness);
                next.pending_punishment = false;
                started = true;
                (Move::Defect, Reason::PendingPunishment)
            }
            None => (Move::Cooperate, Reason::Mirror),
        },
        (Move::Defect, Move::Cooperate) => {
            forced_move(&next).unwrap_or((Move::Defect, Reason::Retaliate))
        }
        (Move::Cooperate, Move::Defect) => match forced_move(&next) {
            Some(forced) => {
                advance(&mut next, streak);
                forced
            }
            None if streak >= p.leeway_streak => leeway(&next),
            None if next.pending_punishment => {
                let forgiveness = policy.forgiveness_length(next.opponent_defects, streak);
                next.start_punishment(next.opponent_defects, forgiveness);
                next.pending_punishment = false;
                advance(&mut next, streak);
                started = true;
                (Move::Defect, Reason::PendingPunishment)
            }
            None => (Move::Cooperate, Reason::Mirror),
        },
        (Move::Defect, Move::Defect) => {
            let chosen = match forced_move(&next) {
                Some(forced) => forced,
                None => {
                    let forgiveness =
                        policy.forgiveness_length(next.opponent_defects, streak_before);
                    next.start_punishment(next.opponent_defects, forgiveness);
                    started = true;
                    (Move::Defect, Reason::Retaliate)
                }
            };
            advance(&mut next, streak_before);
            chosen
        }
    };

    let decision = Decision::new(candidate, intended, reason, started);
    if decision.probability == 1.0 && reason != Reason::Leeway {
        match candidate {
            Move::Cooperate => next.self_cooperates += 1,
            Move::Defect => next.self_defects += 1,
        }
    }
    (next, decision)
}

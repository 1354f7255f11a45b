//! Scripted matches against a fixed opponent.
//!
//! [`ReplayHarness`] plays the orchestrator: it hands out one request per
//! round, checks every submitted strategy, samples the engine's moves from
//! it and plays the scripted opponent's move in both games. The resulting
//! terminals feed the next request.

use std::cell::Cell;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::engine::config::{ConfigError, EngineConfig, EngineStats};
use crate::engine::error::Result;
use crate::engine::game::{
    ChoiceLabel, GameTree, Move, NodeIndex, Orchestrator, PerRole, Rejection, StrategyRequest,
};
use crate::engine::player::ReactivePlayer;
use crate::games::prisoners::request::PrisonersRequest;
use crate::games::prisoners::tree::{PrisonersTree, TreeShape};

/// Tolerance used when checking submitted strategies.
const SUBMISSION_TOLERANCE: f64 = 1e-6;

/// One scripted match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Name used in logs and transcripts.
    pub name: String,
    /// Stage game layout.
    #[serde(default)]
    pub shape: TreeShape,
    /// Number of rounds.
    pub rounds: u32,
    /// Continuation probability reported every round.
    #[serde(default = "default_continuation")]
    pub continuation_probability: f64,
    /// Opponent moves, cycled. Empty means always cooperate.
    #[serde(default)]
    pub opponent: Vec<Move>,
    /// Submissions to reject before accepting any.
    #[serde(default)]
    pub rejections: u32,
    /// Seed for sampling the engine's moves.
    #[serde(default)]
    pub seed: u64,
}

fn default_continuation() -> f64 {
    1.0
}

impl Scenario {
    /// Scenario of `rounds` rounds against an always-cooperating opponent.
    pub fn new(name: impl Into<String>, rounds: u32) -> Self {
        Self {
            name: name.into(),
            shape: TreeShape::default(),
            rounds,
            continuation_probability: default_continuation(),
            opponent: Vec::new(),
            rejections: 0,
            seed: 0,
        }
    }

    /// Set the tree layout.
    pub fn with_shape(mut self, shape: TreeShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set the opponent script.
    pub fn with_opponent(mut self, moves: Vec<Move>) -> Self {
        self.opponent = moves;
        self
    }

    /// Set the continuation probability.
    pub fn with_continuation_probability(mut self, probability: f64) -> Self {
        self.continuation_probability = probability;
        self
    }

    /// Reject the first `count` submissions.
    pub fn with_rejections(mut self, count: u32) -> Self {
        self.rejections = count;
        self
    }

    /// Opponent move in `round`.
    pub fn opponent_move(&self, round: u32) -> Move {
        if self.opponent.is_empty() {
            return Move::Cooperate;
        }
        self.opponent[round as usize % self.opponent.len()]
    }
}

/// What happened in one accepted round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Zero-based round number.
    pub round: u32,
    /// Submitted strategy, one inner vector per information set.
    pub strategy: Vec<Vec<(String, f64)>>,
    /// Moves sampled for the engine, by the role it played.
    pub engine_moves: PerRole<Move>,
    /// Scripted opponent move.
    pub opponent_move: Move,
    /// Terminal reached in each game.
    pub terminals: PerRole<NodeIndex>,
}

impl RoundRecord {
    /// Probability sum of every information set.
    pub fn group_sums(&self) -> Vec<f64> {
        self.strategy
            .iter()
            .map(|group| group.iter().map(|(_, p)| p).sum())
            .collect()
    }
}

/// Orchestrator replaying a [`Scenario`].
#[derive(Debug)]
pub struct ReplayHarness {
    tree: PrisonersTree,
    scenario: Scenario,
    round: u32,
    terminals: PerRole<Option<NodeIndex>>,
    rejections_left: u32,
    tree_delay: Cell<u32>,
    rng: StdRng,
    transcript: Vec<RoundRecord>,
}

impl ReplayHarness {
    /// Harness for `scenario`, starting before the first round.
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            tree: PrisonersTree::new(scenario.shape),
            scenario: scenario.clone(),
            round: 0,
            terminals: PerRole::default(),
            rejections_left: scenario.rejections,
            tree_delay: Cell::new(0),
            rng: StdRng::seed_from_u64(scenario.seed),
            transcript: Vec::new(),
        }
    }

    /// Hide the tree for the first `polls` lookups.
    pub fn with_tree_delay(self, polls: u32) -> Self {
        self.tree_delay.set(polls);
        self
    }

    /// Accepted rounds so far.
    pub fn transcript(&self) -> &[RoundRecord] {
        &self.transcript
    }

    /// Consume the harness, keeping its transcript.
    pub fn into_transcript(self) -> Vec<RoundRecord> {
        self.transcript
    }

    /// Split the request's assignments by information set.
    fn grouped(&self, request: &PrisonersRequest) -> std::result::Result<Vec<Vec<(String, f64)>>, Rejection> {
        let mut assignments = request.assignments().into_iter();
        let mut groups = Vec::new();
        for (index, &size) in self.tree.info_set_sizes().iter().enumerate() {
            let group: Vec<(String, f64)> = assignments.by_ref().take(size).collect();
            if group.len() != size {
                return Err(Rejection::new(format!("information set {index} is incomplete")));
            }
            if let Some((label, p)) = group.iter().find(|(_, p)| !(0.0..=1.0).contains(p)) {
                return Err(Rejection::new(format!("{label} has probability {p}")));
            }
            let sum: f64 = group.iter().map(|(_, p)| p).sum();
            if (sum - 1.0).abs() > SUBMISSION_TOLERANCE {
                return Err(Rejection::new(format!(
                    "information set {index} sums to {sum}"
                )));
            }
            groups.push(group);
        }
        Ok(groups)
    }

    /// Sample a move among the labels leaving `node`.
    fn sample_at(&mut self, request: &PrisonersRequest, node: NodeIndex) -> Move {
        let options: Vec<(Move, f64)> = self
            .tree
            .arena()
            .children(node)
            .iter()
            .filter_map(|&child| {
                let raw = self.tree.label(child)?;
                let action = ChoiceLabel::parse(raw).ok()?.action?;
                Some((action, request.probability(raw).unwrap_or(0.0)))
            })
            .collect();

        let r: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        for &(action, p) in &options {
            cumulative += p;
            if r < cumulative {
                return action;
            }
        }
        options.last().map(|&(a, _)| a).unwrap_or(Move::Cooperate)
    }
}

impl Orchestrator for ReplayHarness {
    type Tree = PrisonersTree;
    type Request = PrisonersRequest;

    fn tree(&self) -> Option<&PrisonersTree> {
        let delay = self.tree_delay.get();
        if delay > 0 {
            self.tree_delay.set(delay - 1);
            return None;
        }
        Some(&self.tree)
    }

    fn next_request(&mut self) -> Option<PrisonersRequest> {
        if self.round >= self.scenario.rounds {
            return None;
        }
        Some(
            self.tree
                .request_after(self.terminals)
                .with_remaining_iterations(self.scenario.rounds - self.round)
                .with_continuation_probability(self.scenario.continuation_probability),
        )
    }

    fn submit(&mut self, request: &PrisonersRequest) -> std::result::Result<(), Rejection> {
        if self.rejections_left > 0 {
            self.rejections_left -= 1;
            return Err(Rejection::new("submission window closed"));
        }
        let strategy = self.grouped(request)?;

        let opponent = self.scenario.opponent_move(self.round);
        let root = self
            .tree
            .arena()
            .root()
            .ok_or_else(|| Rejection::new("tree has no root"))?;

        // Game one: the engine is P1.
        let first = self.sample_at(request, root);
        let one = self
            .tree
            .terminal_for(first, opponent)
            .ok_or_else(|| Rejection::new("no terminal for game one"))?;

        // Game two: the engine is P2 and sees the opponent's P1 move.
        let after = self
            .tree
            .node_after(opponent)
            .ok_or_else(|| Rejection::new("no P2 node for game two"))?;
        let second = self.sample_at(request, after);
        let two = self
            .tree
            .terminal_for(opponent, second)
            .ok_or_else(|| Rejection::new("no terminal for game two"))?;

        log::trace!(
            "{} round {}: engine {first}/{second}, opponent {opponent}",
            self.scenario.name,
            self.round
        );
        self.transcript.push(RoundRecord {
            round: self.round,
            strategy,
            engine_moves: PerRole::new(first, second),
            opponent_move: opponent,
            terminals: PerRole::new(one, two),
        });
        self.terminals = PerRole::new(Some(one), Some(two));
        self.round += 1;
        Ok(())
    }
}

/// Full record of one replayed match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchTranscript {
    /// Scenario name.
    pub scenario: String,
    /// Policy the engine ran.
    pub policy: String,
    /// Engine statistics at the end of the match.
    pub stats: EngineStats,
    /// Accepted rounds.
    pub rounds: Vec<RoundRecord>,
}

impl MatchTranscript {
    /// Rounds in which the engine defected in at least one game.
    pub fn defecting_rounds(&self) -> usize {
        self.rounds
            .iter()
            .filter(|r| r.engine_moves.iter().any(|(_, &m)| m == Move::Defect))
            .count()
    }
}

/// Replay a scenario with a fresh engine.
pub fn run_scenario(config: &EngineConfig, scenario: &Scenario) -> Result<MatchTranscript> {
    let mut player = ReactivePlayer::new(config.clone())?;
    let mut harness = ReplayHarness::new(scenario);
    log::info!(
        "replaying {} ({} rounds, {})",
        scenario.name,
        scenario.rounds,
        config.policy.name()
    );

    let stats = player.play(&mut harness)?;
    Ok(MatchTranscript {
        scenario: scenario.name.clone(),
        policy: config.policy.name().to_string(),
        stats,
        rounds: harness.into_transcript(),
    })
}

/// Configuration file of the replay tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Engine configuration shared by every scenario.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Matches to replay.
    pub scenarios: Vec<Scenario>,
}

impl ReplayConfig {
    /// Load and validate a replay configuration.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&contents)
    }

    /// Parse and validate a replay configuration.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.engine.validate()?;
        for scenario in &config.scenarios {
            if !(0.0..=1.0).contains(&scenario.continuation_probability) {
                return Err(ConfigError::InvalidContinuation(
                    scenario.continuation_probability,
                ));
            }
        }
        Ok(config)
    }
}

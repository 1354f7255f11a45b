//! Configuration options for the strategy engine.
//!
//! This module provides the configuration structs that select the decision
//! policy (plain gradual punishment or the hybrid variant with cooperation
//! leeway), plus the knobs of the round loop itself.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tuning of the hybrid gradual policy with cooperation leeway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeewayParams {
    /// Forgiveness length while the opponent has few defects, or after a
    /// long cooperation streak.
    pub soft_forgiveness: u32,

    /// Forgiveness length once the opponent has defected often.
    pub hard_forgiveness: u32,

    /// Cumulative opponent defects from which forgiveness turns hard.
    pub hard_forgiveness_defects: u32,

    /// Consecutive opponent cooperations that earn soft forgiveness and
    /// the halving (soft) punishment advance.
    pub soft_reset_streak: u32,

    /// Consecutive opponent cooperations that open the leeway comparison.
    pub leeway_streak: u32,

    /// Divisor applied to the opponent's defect count in the leeway
    /// comparison (`cooperates >= defects / leeway_factor`).
    pub leeway_factor: u32,

    /// Continuation probability below which the match is treated as if
    /// this were its last round.
    pub safe_continuation: f64,
}

impl Default for LeewayParams {
    fn default() -> Self {
        Self {
            soft_forgiveness: 1,
            hard_forgiveness: 0,
            hard_forgiveness_defects: 8,
            soft_reset_streak: 6,
            leeway_streak: 2,
            leeway_factor: 2,
            safe_continuation: 1.0 / 3.0,
        }
    }
}

/// Which decision policy the engine plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Policy {
    /// Gradual: punish with as many defections as the opponent has made,
    /// then cooperate `forgiveness` times.
    Gradual {
        /// Forced cooperations after every punishment.
        forgiveness: u32,
    },

    /// Gradual with shrinking forgiveness, end-game defection and a
    /// cooperation leeway.
    HybridLeeway(LeewayParams),
}

impl Policy {
    /// The base gradual policy.
    pub fn gradual() -> Self {
        Policy::Gradual { forgiveness: 2 }
    }

    /// The extended policy with default tuning.
    pub fn hybrid() -> Self {
        Policy::HybridLeeway(LeewayParams::default())
    }

    /// Short name for logs and transcripts.
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Gradual { .. } => "gradual",
            Policy::HybridLeeway(_) => "hybrid_leeway",
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::gradual()
    }
}

/// Configuration for the strategy engine.
///
/// # Example
/// ```
/// use reactive_strategy::engine::{EngineConfig, Policy};
///
/// let config = EngineConfig::default().with_policy(Policy::hybrid()).with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Decision policy.
    pub policy: Policy,

    /// Tolerance of the "group sums to one" check in the repair pass.
    pub tolerance: f64,

    /// Random seed for the repair pass. If `None`, entropy is used.
    pub seed: Option<u64>,

    /// Delay between two checks for the game tree, in milliseconds.
    pub tree_poll_interval_ms: u64,

    /// Give up waiting for the tree after this many checks.
    /// `None` waits forever.
    pub max_tree_polls: Option<u32>,

    /// Submissions of one round before a rejection becomes fatal.
    pub max_submission_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            tolerance: 1e-9,
            seed: None,
            tree_poll_interval_ms: 1000,
            max_tree_polls: Some(300),
            max_submission_attempts: 5,
        }
    }
}

impl EngineConfig {
    /// Create a new EngineConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&text)
    }

    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method: set the decision policy.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set the simplex tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder method: set tree polling.
    pub fn with_tree_polling(mut self, interval_ms: u64, max_polls: Option<u32>) -> Self {
        self.tree_poll_interval_ms = interval_ms;
        self.max_tree_polls = max_polls;
        self
    }

    /// Builder method: set the submission attempt bound.
    pub fn with_max_submission_attempts(mut self, attempts: u32) -> Self {
        self.max_submission_attempts = attempts;
        self
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance > 0.0 && self.tolerance < 0.1) {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if self.max_submission_attempts == 0 {
            return Err(ConfigError::NoSubmissionAttempts);
        }
        if self.tree_poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if let Policy::HybridLeeway(params) = &self.policy {
            if !(0.0..=1.0).contains(&params.safe_continuation) {
                return Err(ConfigError::InvalidContinuation(params.safe_continuation));
            }
            if params.leeway_factor == 0 {
                return Err(ConfigError::ZeroLeewayFactor);
            }
        }
        Ok(())
    }
}

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("tolerance {0} is out of range (0, 0.1)")]
    InvalidTolerance(f64),

    #[error("continuation threshold {0} is out of range [0, 1]")]
    InvalidContinuation(f64),

    #[error("leeway factor must be positive")]
    ZeroLeewayFactor,

    #[error("at least one submission attempt is required")]
    NoSubmissionAttempts,

    #[error("tree poll interval must be positive")]
    ZeroPollInterval,
}

/// Statistics tracked across the rounds of one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Rounds whose strategy was accepted.
    pub rounds: u64,

    /// Rounds played with the first-round policy.
    pub opening_rounds: u64,

    /// Information sets regenerated by the repair pass.
    pub repaired_groups: u64,

    /// Submissions refused by the orchestrator.
    pub rejected_submissions: u64,

    /// Labels forced to defection by an end-game override.
    pub end_game_overrides: u64,

    /// Punishments started.
    pub punishments_started: u64,
}

impl EngineStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }
}

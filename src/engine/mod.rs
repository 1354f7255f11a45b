//! Reactive gradual-punishment strategy engine.
//!
//! This module answers, round after round, the strategy requests of a
//! repeated two-player stage game played on an extensive-form tree. Both
//! player roles are played at once, and the engine only ever learns what the
//! opponent did through the terminal nodes of the previous round.
//!
//! # Overview
//!
//! One round runs through the following steps:
//! 1. Recover the opponent's moves from last round's terminals ([`history`])
//! 2. Classify every open choice label against those moves
//! 3. Feed each label to the decision rule ([`decision`]), which drives the
//!    per-role punishment state machine ([`punishment`])
//! 4. Give every information set the rule left incomplete a random point of
//!    the simplex ([`repair`])
//! 5. Submit, and commit the new state once the strategy is accepted
//!    ([`player`])
//!
//! # Policies
//!
//! - **Gradual**: answer the n-th defection with n defections, then forgive
//!   with a fixed number of cooperations
//! - **HybridLeeway**: Gradual plus end-game defection, cooperation-streak
//!   leeway and streak-dependent forgiveness
//!
//! # Example
//!
//! ```
//! use reactive_strategy::engine::{EngineConfig, Policy, ReactivePlayer};
//! use reactive_strategy::games::prisoners::{ReplayHarness, Scenario};
//!
//! let config = EngineConfig::default().with_policy(Policy::hybrid()).with_seed(1);
//! let mut player = ReactivePlayer::new(config).unwrap();
//! let mut harness = ReplayHarness::new(&Scenario::new("demo", 10));
//!
//! let stats = player.play(&mut harness).unwrap();
//! assert_eq!(stats.rounds, 10);
//! ```

pub mod config;
pub mod decision;
pub mod error;
pub mod game;
pub mod history;
pub mod player;
pub mod punishment;
pub mod repair;

// Re-export main types for convenient access
pub use config::{ConfigError, EngineConfig, EngineStats, LeewayParams, Policy};
pub use decision::{decide, Decision, Outlook, Reason};
pub use error::{EngineError, Mismatch};
pub use game::{
    ChoiceLabel, GameTree, Move, NodeIndex, Orchestrator, PerRole, Rejection, Role,
    StrategyRequest,
};
pub use player::{ReactivePlayer, RoleSnapshot, RoundPlan};
pub use punishment::{RoleState, Stance};

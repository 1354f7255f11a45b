//! # Reactive Strategy
//!
//! An adaptive gradual-punishment strategy engine for repeated two-player
//! games played on an extensive-form tree.
//!
//! ## Features
//!
//! - **Gradual punishment**: the n-th defection is answered with n
//!   defections, followed by forgiveness
//! - **Hybrid leeway policy**: end-game defection and tolerance for
//!   opponents on a cooperation streak
//! - **Simplex repair**: unvisited information sets always receive a valid
//!   probability distribution
//! - **Scenario replay**: scripted opponents for testing policies
//!
//! ## Quick Start
//!
//! ```ignore
//! use reactive_strategy::engine::{EngineConfig, ReactivePlayer};
//!
//! // 1. Implement GameTree, StrategyRequest and Orchestrator for your match
//! // 2. Create a player
//! let mut player = ReactivePlayer::new(EngineConfig::default())?;
//!
//! // 3. Play until the orchestrator ends the match
//! let stats = player.play(&mut orchestrator)?;
//! ```
//!
//! ## Modules
//!
//! - [`engine`]: history extraction, decision rule and round loop
//! - [`games`]: concrete stage games (Prisoners' Dilemma)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      ReactivePlayer (Generic)                   │
//! │  - History extraction     - Punishment state per role           │
//! │  - Decision rule          - Simplex repair                      │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ GameTree / StrategyRequest / Orchestrator
//!                               ▼
//!                     ┌───────────────────┐
//!                     │ Prisoners' Dilemma│
//!                     │  + ReplayHarness  │
//!                     └───────────────────┘
//! ```

#![warn(missing_docs)]

/// Strategy engine module.
///
/// This is the core module containing the decision rule and round loop.
pub mod engine;

/// Game implementations module.
///
/// Contains the Prisoners' Dilemma trees and the scripted replay harness.
pub mod games;

// Re-export commonly used types at crate root for convenience
pub use engine::{EngineConfig, EngineError, EngineStats, Policy, ReactivePlayer};

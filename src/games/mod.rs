//! Stage games the engine can be played on.
//!
//! The engine only talks to the [`GameTree`](crate::engine::GameTree),
//! [`StrategyRequest`](crate::engine::StrategyRequest) and
//! [`Orchestrator`](crate::engine::Orchestrator) traits. This module holds
//! concrete implementations of them.
//!
//! ## Available Games
//!
//! - [`prisoners`]: the Prisoners' Dilemma, simultaneous or sequential,
//!   with a scripted replay orchestrator

pub mod prisoners;

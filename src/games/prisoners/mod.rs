//! The Prisoners' Dilemma stage game.
//!
//! ## Game Tree
//!
//! ```text
//! P1
//! ├── Cooperate
//! │   └── P2
//! │       ├── Cooperate → (3, 3)
//! │       └── Defect    → (0, 5)
//! └── Defect
//!     └── P2
//!         ├── Cooperate → (5, 0)
//!         └── Defect    → (1, 1)
//! ```
//!
//! Labels follow the `role:position:action` convention. In the simultaneous
//! layout both P2 nodes share position 2 and form one information set; in
//! the sequential layout the node after a P1 defection is position 3.
//!
//! Payoffs are shown for orientation only; the engine never reads them.

pub mod replay;
pub mod request;
pub mod tree;

pub use replay::{run_scenario, MatchTranscript, ReplayConfig, ReplayHarness, RoundRecord, Scenario};
pub use request::{PrisonersRequest, NO_NODE};
pub use tree::{ArenaTree, PrisonersTree, TreeShape};

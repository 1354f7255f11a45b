//! Per-opponent punishment and forgiveness state machine.
//!
//! Every opponent role is in exactly one [`Stance`]:
//!
//! ```text
//!            start_punishment(n)
//!   Neutral ─────────────────────▶ Punishing { defects, forgiveness }
//!      ▲                                 │ advance (defects reach 0)
//!      │  advance (cooperates reach 0)   ▼
//!      └─────────────────────────── Forgiving { cooperates }
//! ```
//!
//! The counters only record how much punishment or forgiveness is left;
//! the stance alone decides behaviour.

use serde::{Deserialize, Serialize};

/// Where a role stands in its punish-then-forgive cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stance {
    /// Mirroring the opponent.
    #[default]
    Neutral,
    /// Forced defections left, followed by `forgiveness` forced cooperations.
    Punishing { defects: u32, forgiveness: u32 },
    /// Forced cooperations left.
    Forgiving { cooperates: u32 },
}

impl Stance {
    /// Build the stance for the given counters.
    pub fn from_counters(defects: u32, cooperates: u32) -> Self {
        match (defects, cooperates) {
            (0, 0) => Stance::Neutral,
            (0, cooperates) => Stance::Forgiving { cooperates },
            (defects, forgiveness) => Stance::Punishing {
                defects,
                forgiveness,
            },
        }
    }

    /// Forced defections left.
    pub fn defects_remaining(&self) -> u32 {
        match *self {
            Stance::Punishing { defects, .. } => defects,
            _ => 0,
        }
    }

    /// Forced cooperations left, including those queued behind a punishment.
    pub fn cooperates_remaining(&self) -> u32 {
        match *self {
            Stance::Punishing { forgiveness, .. } => forgiveness,
            Stance::Forgiving { cooperates } => cooperates,
            Stance::Neutral => 0,
        }
    }
}

/// Everything the engine remembers about one opponent role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleState {
    /// Punish/forgive cycle.
    pub stance: Stance,
    /// A punishment should begin the next time the role is neutral.
    pub pending_punishment: bool,
    /// Cumulative defections observed from this opponent.
    pub opponent_defects: u32,
    /// Cumulative cooperations observed from this opponent.
    pub opponent_cooperates: u32,
    /// Current run of consecutive cooperations from this opponent.
    pub cooperate_streak: u32,
    /// Defections we assigned while facing this opponent.
    pub self_defects: u32,
    /// Cooperations we assigned while facing this opponent.
    pub self_cooperates: u32,
}

impl RoleState {
    /// Forced defections remain.
    pub fn is_punishing(&self) -> bool {
        self.stance.defects_remaining() > 0
    }

    /// Forced cooperations remain and no defection is due first.
    pub fn is_forgiving(&self) -> bool {
        !self.is_punishing() && self.stance.cooperates_remaining() > 0
    }

    /// Punishing or forgiving.
    pub fn is_active(&self) -> bool {
        self.is_punishing() || self.is_forgiving()
    }

    /// Begin a punishment of `defects` forced defections followed by
    /// `forgiveness` forced cooperations, replacing whatever was left.
    pub fn start_punishment(&mut self, defects: u32, forgiveness: u32) {
        self.stance = Stance::from_counters(defects, forgiveness);
    }

    /// Consume one forced move: a defection while punishing, otherwise a
    /// cooperation while forgiving. Neutral stays neutral. Exhausted
    /// counters collapse to the next stance instead of wrapping.
    pub fn advance(&mut self) {
        self.stance = match self.stance {
            Stance::Punishing {
                defects,
                forgiveness,
            } => Stance::from_counters(defects.saturating_sub(1), forgiveness),
            Stance::Forgiving { cooperates } => Stance::from_counters(0, cooperates.saturating_sub(1)),
            Stance::Neutral => Stance::Neutral,
        };
    }

    /// Halving advance: two defections are consumed at once, but only when
    /// an even number remains. An odd remainder is left as it is.
    pub fn advance_soft(&mut self) {
        self.stance = match self.stance {
            Stance::Punishing {
                defects,
                forgiveness,
            } if defects % 2 == 0 => Stance::from_counters(defects.saturating_sub(2), forgiveness),
            Stance::Forgiving { cooperates } => Stance::from_counters(0, cooperates.saturating_sub(1)),
            other => other,
        };
    }
}

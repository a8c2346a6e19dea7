//! Registry of hostile mob kinds referenced by level files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Kinds of hostiles that waves may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobKind {
    /// Slow creature with low health that kills on contact.
    Zombie,
}

/// What a hostile does when its attack cooldown elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttackBehavior {
    /// Walk toward the player; damage is dealt on contact.
    ApproachPlayer,
}

impl MobKind {
    /// Every registered mob kind.
    pub const ALL: [MobKind; 1] = [MobKind::Zombie];

    /// Resolves the identifier used in level files.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Identifier used in level files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Zombie => "zombie",
        }
    }

    /// Health a freshly spawned hostile starts with.
    #[must_use]
    pub const fn base_hp(self) -> u32 {
        match self {
            Self::Zombie => 1,
        }
    }

    /// Movement speed in model units; see [`crate::speed_to_units`].
    #[must_use]
    pub const fn base_speed(self) -> f32 {
        match self {
            Self::Zombie => 0.5,
        }
    }

    /// Minimum time between two attacks.
    #[must_use]
    pub const fn attack_cooldown(self) -> Duration {
        match self {
            Self::Zombie => Duration::from_millis(600),
        }
    }

    /// Effect triggered whenever the attack cooldown elapses.
    #[must_use]
    pub const fn attack(self) -> AttackBehavior {
        match self {
            Self::Zombie => AttackBehavior::ApproachPlayer,
        }
    }
}

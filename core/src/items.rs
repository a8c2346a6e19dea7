//! Closed catalogue of the temporary items the player can hold and activate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fire rate, in shots per second, forced while [`ItemKind::SemiAutomatic`] is active.
pub const SEMI_AUTOMATIC_FIRE_RATE: f32 = 10.0;
/// Bullet speed multiplier applied by [`ItemKind::Pressurer`].
pub const PRESSURER_BULLET_SPEED_MOD: f32 = 1.5;
/// Damage multiplier applied by [`ItemKind::Pressurer`].
pub const PRESSURER_DAMAGE_MOD: f32 = 2.0;
/// Extra penetration granted by [`ItemKind::Scope`].
pub const SCOPE_EXTRA_PENETRATION: u32 = 1;
/// Fire rate multiplier applied by [`ItemKind::Scope`].
pub const SCOPE_FIRE_RATE_MOD: f32 = 0.8;
/// Movement speed multiplier applied by [`ItemKind::BlueCow`].
pub const BLUE_COW_SPEED_MOD: f32 = 1.35;
/// Interval between two [`ItemKind::LaserBeam`] pulses.
pub const LASER_BEAM_CYCLE: Duration = Duration::from_millis(1_500);
/// Reach of a [`ItemKind::LaserBeam`] pulse measured in tiles.
pub const LASER_BEAM_RANGE_TILES: f32 = 3.0;
/// Damage dealt by a single [`ItemKind::LaserBeam`] pulse.
pub const LASER_BEAM_DAMAGE: u32 = 8;

/// How likely an item is to be found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rarity {
    /// Regular drop.
    Common,
    /// Powerful drop that the loot roll biases against.
    Rare,
}

/// Every item variant the player can pick up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Fixes the fire rate at a high value.
    SemiAutomatic,
    /// Faster bullets with doubled damage.
    Pressurer,
    /// Extra penetration at a slightly reduced fire rate.
    Scope,
    /// Faster movement.
    BlueCow,
    /// Two extra bullets fanned around the aim direction.
    Spray,
    /// Extra bullets in every direction.
    ThreeSixty,
    /// Immunity to lethal contact.
    HolyGuard,
    /// Hides the player from hostiles so they stop re-routing.
    SmokeBomb,
    /// Periodic damage pulse around the player.
    LaserBeam,
}

impl ItemKind {
    /// All item variants in catalogue order.
    pub const ALL: [ItemKind; 9] = [
        ItemKind::SemiAutomatic,
        ItemKind::Pressurer,
        ItemKind::Scope,
        ItemKind::BlueCow,
        ItemKind::Spray,
        ItemKind::ThreeSixty,
        ItemKind::HolyGuard,
        ItemKind::SmokeBomb,
        ItemKind::LaserBeam,
    ];

    /// Rarity tier of the item.
    #[must_use]
    pub const fn rarity(self) -> Rarity {
        match self {
            Self::Pressurer | Self::HolyGuard | Self::SmokeBomb | Self::LaserBeam => Rarity::Rare,
            Self::SemiAutomatic | Self::Scope | Self::BlueCow | Self::Spray | Self::ThreeSixty => {
                Rarity::Common
            }
        }
    }

    /// How long the item stays active once used.
    #[must_use]
    pub const fn duration(self) -> Duration {
        let seconds = match self {
            Self::SemiAutomatic => 12,
            Self::Pressurer => 12,
            Self::Scope => 18,
            Self::BlueCow => 15,
            Self::Spray => 13,
            Self::ThreeSixty => 12,
            Self::HolyGuard => 8,
            Self::SmokeBomb => 7,
            Self::LaserBeam => 15,
        };
        Duration::from_secs(seconds)
    }

    /// Iterator over the common items in catalogue order.
    pub fn commons() -> impl Iterator<Item = ItemKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.rarity() == Rarity::Common)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_splits_into_five_commons_and_four_rares() {
        assert_eq!(ItemKind::commons().count(), 5);
        assert_eq!(
            ItemKind::ALL
                .iter()
                .filter(|kind| kind.rarity() == Rarity::Rare)
                .count(),
            4
        );
    }
}

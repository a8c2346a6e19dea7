//! Loot rolls and the pickups they leave on the floor.

use std::time::Duration;

use deltaworld_core::{
    Bounds, Difficulty, ItemKind, Loot, PickupId, PickupSnapshot, Point, Rarity,
};
use rand::{
    seq::{IteratorRandom, SliceRandom},
    Rng,
};

/// Probability that a dying hostile drops anything.
pub(crate) const DROP_PROBABILITY: f64 = 0.1;
/// Probability that a rare pick is replaced by a common one.
pub(crate) const RARE_REROLL_PROBABILITY: f64 = 0.6;
/// Probability that a drop becomes a resurrection coin in normal mode.
pub(crate) const COIN_PROBABILITY: f64 = 0.05;

const PICKUP_LIFETIME: Duration = Duration::from_secs(10);
const BLINK_WINDOW: Duration = Duration::from_secs(3);
const BLINK_PERIOD: Duration = Duration::from_millis(200);
const PICKUP_HALF_EXTENT: f32 = 12.0;

/// Rolls the reward dropped by a dying hostile.
pub(crate) fn roll_loot<R: Rng>(rng: &mut R, difficulty: Difficulty) -> Option<Loot> {
    if !rng.gen_bool(DROP_PROBABILITY) {
        return None;
    }

    let mut kind = *ItemKind::ALL.choose(rng)?;
    if kind.rarity() == Rarity::Rare && rng.gen_bool(RARE_REROLL_PROBABILITY) {
        kind = ItemKind::commons().choose(rng)?;
    }

    if difficulty == Difficulty::Normal && rng.gen_bool(COIN_PROBABILITY) {
        return Some(Loot::ResurrectionCoin);
    }
    Some(Loot::Item(kind))
}

#[derive(Clone, Debug)]
pub(crate) struct Pickup {
    pub(crate) id: PickupId,
    pub(crate) loot: Loot,
    pub(crate) position: Point,
    dropped_at: Duration,
}

impl Pickup {
    pub(crate) fn new(id: PickupId, loot: Loot, position: Point, dropped_at: Duration) -> Self {
        Self {
            id,
            loot,
            position,
            dropped_at,
        }
    }

    pub(crate) fn bounds(&self) -> Bounds {
        Bounds::centered(self.position, PICKUP_HALF_EXTENT)
    }

    pub(crate) fn remaining(&self, now: Duration) -> Duration {
        PICKUP_LIFETIME.saturating_sub(now.saturating_sub(self.dropped_at))
    }

    pub(crate) fn is_expired(&self, now: Duration) -> bool {
        self.remaining(now).is_zero()
    }

    /// Visibility toggles every blink period during the final seconds.
    pub(crate) fn is_visible(&self, now: Duration) -> bool {
        let remaining = self.remaining(now);
        if remaining > BLINK_WINDOW {
            return true;
        }
        let blinking_for = BLINK_WINDOW - remaining;
        (blinking_for.as_millis() / BLINK_PERIOD.as_millis()) % 2 == 1
    }

    pub(crate) fn snapshot(&self, now: Duration) -> PickupSnapshot {
        PickupSnapshot {
            id: self.id,
            loot: self.loot,
            position: self.position,
            visible: self.is_visible(now),
            remaining: self.remaining(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn roughly_one_in_ten_deaths_drops_loot() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let drops = (0..10_000)
            .filter(|_| roll_loot(&mut rng, Difficulty::Normal).is_some())
            .count();
        assert!((800..1_200).contains(&drops), "drops = {drops}");
    }

    #[test]
    fn hard_mode_never_drops_coins() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..20_000 {
            assert_ne!(
                roll_loot(&mut rng, Difficulty::Hard),
                Some(Loot::ResurrectionCoin)
            );
        }
    }

    #[test]
    fn rerolls_bias_drops_toward_commons() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (mut commons, mut rares) = (0_u32, 0_u32);
        for _ in 0..50_000 {
            if let Some(Loot::Item(kind)) = roll_loot(&mut rng, Difficulty::Hard) {
                match kind.rarity() {
                    Rarity::Common => commons += 1,
                    Rarity::Rare => rares += 1,
                }
            }
        }
        // 4/9 rare picks, 40% of which survive the reroll.
        let rare_share = f64::from(rares) / f64::from(commons + rares);
        assert!((0.13..0.23).contains(&rare_share), "rare share = {rare_share}");
    }

    #[test]
    fn pickups_blink_before_expiring() {
        let pickup = Pickup::new(
            PickupId::new(0),
            Loot::ResurrectionCoin,
            Point::new(100.0, 100.0),
            Duration::from_secs(1),
        );

        assert!(pickup.is_visible(Duration::from_secs(7)));
        assert!(!pickup.is_visible(Duration::from_millis(8_100)));
        assert!(pickup.is_visible(Duration::from_millis(8_300)));
        assert!(!pickup.is_expired(Duration::from_millis(10_900)));
        assert!(pickup.is_expired(Duration::from_secs(11)));
    }
}

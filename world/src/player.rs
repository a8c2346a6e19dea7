//! Player state, derived stats and the shooting pattern.

use std::{collections::BTreeMap, time::Duration};

use deltaworld_core::{
    items::{
        BLUE_COW_SPEED_MOD, PRESSURER_BULLET_SPEED_MOD, PRESSURER_DAMAGE_MOD,
        SCOPE_EXTRA_PENETRATION, SCOPE_FIRE_RATE_MOD, SEMI_AUTOMATIC_FIRE_RATE,
    },
    Bounds, DirectionalIntent, ItemKind, Point, PlayerSnapshot, UpgradeSlot, Velocity, MAP_SIZE,
};

/// Half extent of the player's square hitbox.
pub(crate) const PLAYER_HALF_EXTENT: f32 = 14.0;

const BASE_FIRE_RATE: f32 = 3.0;
const FIRE_RATE_PER_GUN_LEVEL: f32 = 0.6;
const DAMAGE_PER_AMMO_LEVEL: f32 = 0.5;
const SPEED_PER_ARMOR_LEVEL: f32 = 0.2;
const BASE_BULLET_SPEED: f32 = 2.0;
const SPRAY_SPREAD_DEGREES: f32 = 22.5;
const FULL_CIRCLE_STEP_DEGREES: f32 = 45.0;

/// Combat and movement values derived from upgrades and active items.
///
/// Speeds are expressed in model units; multiply through
/// [`deltaworld_core::speed_to_units`] to obtain world units per second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerStats {
    /// Damage dealt by each bullet.
    pub damage: u32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Number of hostiles each bullet may damage.
    pub penetration: u32,
    /// Movement speed in model units.
    pub movement_speed: f32,
    /// Bullet speed in model units.
    pub bullet_speed: f32,
}

impl PlayerStats {
    /// Derives the stats for the given upgrade levels and active items.
    #[must_use]
    pub fn derive(armor: u32, gun: u32, ammo: u32, is_active: impl Fn(ItemKind) -> bool) -> Self {
        let pressurer = is_active(ItemKind::Pressurer);
        let scope = is_active(ItemKind::Scope);

        let damage_mod = if pressurer { PRESSURER_DAMAGE_MOD } else { 1.0 };
        let damage = ((1.0 + DAMAGE_PER_AMMO_LEVEL * ammo as f32) * damage_mod).floor() as u32;

        let mut fire_rate = if is_active(ItemKind::SemiAutomatic) {
            SEMI_AUTOMATIC_FIRE_RATE
        } else {
            BASE_FIRE_RATE + FIRE_RATE_PER_GUN_LEVEL * gun as f32
        };
        if scope {
            fire_rate *= SCOPE_FIRE_RATE_MOD;
        }

        let mut penetration = (gun / 2).max(1);
        if scope {
            penetration += SCOPE_EXTRA_PENETRATION;
        }

        let mut movement_speed = 1.0 + SPEED_PER_ARMOR_LEVEL * armor as f32;
        if is_active(ItemKind::BlueCow) {
            movement_speed *= BLUE_COW_SPEED_MOD;
        }

        let bullet_speed = if pressurer {
            BASE_BULLET_SPEED * PRESSURER_BULLET_SPEED_MOD
        } else {
            BASE_BULLET_SPEED
        };

        Self {
            damage,
            fire_rate,
            penetration,
            movement_speed,
            bullet_speed,
        }
    }

    /// Minimum time between two consecutive shots.
    #[must_use]
    pub fn shot_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.fire_rate.max(f32::EPSILON))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Player {
    pub(crate) position: Point,
    pub(crate) velocity: Velocity,
    pub(crate) movement: DirectionalIntent,
    pub(crate) aim: DirectionalIntent,
    pub(crate) armor: u32,
    pub(crate) gun: u32,
    pub(crate) ammo: u32,
    pub(crate) stored_item: Option<ItemKind>,
    active_items: BTreeMap<ItemKind, Duration>,
    pub(crate) resurrection_coins: u32,
    pub(crate) can_move: bool,
    pub(crate) invulnerable_until: Option<Duration>,
    pub(crate) last_shot: Option<Duration>,
    pub(crate) last_laser_pulse: Option<Duration>,
}

impl Player {
    pub(crate) fn new() -> Self {
        Self {
            position: spawn_point(),
            velocity: Velocity::ZERO,
            movement: DirectionalIntent::default(),
            aim: DirectionalIntent::default(),
            armor: 0,
            gun: 0,
            ammo: 0,
            stored_item: None,
            active_items: BTreeMap::new(),
            resurrection_coins: 0,
            can_move: true,
            invulnerable_until: None,
            last_shot: None,
            last_laser_pulse: None,
        }
    }

    pub(crate) fn bounds(&self) -> Bounds {
        Bounds::centered(self.position, PLAYER_HALF_EXTENT)
    }

    pub(crate) fn stats(&self) -> PlayerStats {
        PlayerStats::derive(self.armor, self.gun, self.ammo, |kind| self.is_active(kind))
    }

    pub(crate) fn is_active(&self, kind: ItemKind) -> bool {
        self.active_items.contains_key(&kind)
    }

    /// Activates the item, restarting its timer if it is already active.
    pub(crate) fn activate(&mut self, kind: ItemKind, now: Duration) {
        let _ = self.active_items.insert(kind, now);
        if kind == ItemKind::LaserBeam {
            self.last_laser_pulse = Some(now);
        }
    }

    /// Removes and returns every item whose duration elapsed at `now`.
    pub(crate) fn expire_items(&mut self, now: Duration) -> Vec<ItemKind> {
        let expired: Vec<ItemKind> = self
            .active_items
            .iter()
            .filter(|(kind, activated_at)| now.saturating_sub(**activated_at) >= kind.duration())
            .map(|(kind, _)| *kind)
            .collect();
        for kind in &expired {
            let _ = self.active_items.remove(kind);
        }
        expired
    }

    /// Stores a collected item; a held item is activated to make room.
    ///
    /// Returns the item that was activated, if any.
    pub(crate) fn collect_item(&mut self, kind: ItemKind, now: Duration) -> Option<ItemKind> {
        let previous = self.stored_item.replace(kind);
        if let Some(held) = previous {
            self.activate(held, now);
        }
        previous
    }

    pub(crate) fn upgrade(&mut self, slot: UpgradeSlot) -> u32 {
        let level = match slot {
            UpgradeSlot::Armor => &mut self.armor,
            UpgradeSlot::Gun => &mut self.gun,
            UpgradeSlot::Ammo => &mut self.ammo,
        };
        *level = level.saturating_add(1);
        *level
    }

    pub(crate) fn is_invulnerable(&self, now: Duration) -> bool {
        self.invulnerable_until.map_or(false, |until| now < until)
            || self.is_active(ItemKind::HolyGuard)
    }

    pub(crate) fn is_hidden(&self) -> bool {
        !self.can_move || self.is_active(ItemKind::SmokeBomb)
    }

    pub(crate) fn shot_ready(&self, now: Duration) -> bool {
        self.last_shot.map_or(true, |last| {
            now.saturating_sub(last) >= self.stats().shot_interval()
        })
    }

    pub(crate) fn snapshot(&self, now: Duration) -> PlayerSnapshot {
        PlayerSnapshot {
            position: self.position,
            velocity: self.velocity,
            hidden: self.is_hidden(),
            can_move: self.can_move,
            invulnerable: self.is_invulnerable(now),
            armor: self.armor,
            gun: self.gun,
            ammo: self.ammo,
            stored_item: self.stored_item,
            active_items: self.active_items.keys().copied().collect(),
            resurrection_coins: self.resurrection_coins,
        }
    }
}

/// Position the player occupies when a room starts.
pub(crate) fn spawn_point() -> Point {
    Point::new(MAP_SIZE / 2.0, MAP_SIZE / 2.0)
}

/// Angles, in degrees, of the bullets fired for one shot toward `aim`.
pub(crate) fn shot_angles(aim: f32, spray: bool, three_sixty: bool) -> Vec<f32> {
    if three_sixty {
        let step = if spray {
            SPRAY_SPREAD_DEGREES
        } else {
            FULL_CIRCLE_STEP_DEGREES
        };
        let count = (360.0 / step) as u32;
        return (0..count).map(|index| aim + step * index as f32).collect();
    }
    if spray {
        return vec![aim, aim + SPRAY_SPREAD_DEGREES, aim - SPRAY_SPREAD_DEGREES];
    }
    vec![aim]
}

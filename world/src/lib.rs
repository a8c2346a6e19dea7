#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative room state for Deltaworld.
//!
//! The room owns every hostile, projectile, pickup and the player. It is only
//! mutated through [`apply`]; systems observe it through the [`query`] module.

mod combat;
mod hostile;
mod loot;
mod player;
mod timers;

use std::{sync::Arc, time::Duration};

use deltaworld_core::{
    filter_border_walls, speed_to_units, Bounds, Command, Difficulty, EncounterOutcome, Event,
    HostileId, ItemKind, Loot, PickupId, Point, ProjectileId, ProjectileOwner,
    RunRecord, TileGrid, Velocity, WallDescriptor, MAP_SIZE, TILE_SIZE,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::{
    combat::Projectile,
    hostile::Hostile,
    loot::Pickup,
    player::{shot_angles, Player, PLAYER_HALF_EXTENT},
    timers::{TimerKind, TimerQueue},
};

pub use player::PlayerStats;

const DEFAULT_RNG_SEED: u64 = 0x5eed_d317_a0f1_d002;

/// Parameters fixed for the lifetime of a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomConfig {
    /// Identifier of the map the room belongs to.
    pub map_id: String,
    /// Difficulty of the run.
    pub difficulty: Difficulty,
    /// Seed driving loot rolls.
    pub rng_seed: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            map_id: "d1r1".to_owned(),
            difficulty: Difficulty::Normal,
            rng_seed: DEFAULT_RNG_SEED,
        }
    }
}

/// Represents one active room of a Deltaworld run.
#[derive(Debug)]
pub struct Room {
    config: RoomConfig,
    now: Duration,
    grid: TileGrid,
    obstacles: Arc<[WallDescriptor]>,
    hostiles: Vec<Hostile>,
    projectiles: Vec<Projectile>,
    pickups: Vec<Pickup>,
    player: Player,
    timers: TimerQueue,
    next_hostile_id: u32,
    next_projectile_id: u32,
    next_pickup_id: u32,
    rng: ChaCha8Rng,
    waves_exhausted: bool,
    outcome: Option<EncounterOutcome>,
}

impl Room {
    /// Creates an empty, open room with a fresh player.
    #[must_use]
    pub fn new(config: RoomConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Self {
            config,
            now: Duration::ZERO,
            grid: TileGrid::open(),
            obstacles: Arc::from(Vec::new()),
            hostiles: Vec::new(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
            player: Player::new(),
            timers: TimerQueue::default(),
            next_hostile_id: 0,
            next_projectile_id: 0,
            next_pickup_id: 0,
            rng,
            waves_exhausted: false,
            outcome: None,
        }
    }

    /// Reconstructs a room from a suspended run.
    #[must_use]
    pub fn resume(record: &RunRecord, rng_seed: u64) -> Self {
        let mut room = Self::new(RoomConfig {
            map_id: record.map_id.clone(),
            difficulty: record.difficulty,
            rng_seed,
        });
        room.player.armor = record.armor;
        room.player.gun = record.gun;
        room.player.ammo = record.ammo;
        room.player.stored_item = record.stored_item;
        room.player.resurrection_coins = record.resurrection_coins;
        room
    }

    fn hostile_mut(&mut self, hostile: HostileId) -> Option<&mut Hostile> {
        self.hostiles
            .binary_search_by_key(&hostile, |candidate| candidate.id)
            .ok()
            .map(|index| &mut self.hostiles[index])
    }

    fn spawn_projectile(
        &mut self,
        projectile: ProjectileTemplate,
        out_events: &mut Vec<Event>,
    ) -> ProjectileId {
        let id = ProjectileId::new(self.next_projectile_id);
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
        self.projectiles.push(Projectile::new(
            id,
            projectile.owner,
            projectile.position,
            projectile.velocity,
            projectile.damage,
            projectile.penetration,
        ));
        out_events.push(Event::ProjectileFired {
            projectile: id,
            owner: projectile.owner,
        });
        id
    }

    fn drop_loot(&mut self, loot: Loot, position: Point) -> PickupId {
        let id = PickupId::new(self.next_pickup_id);
        self.next_pickup_id = self.next_pickup_id.wrapping_add(1);
        self.pickups.push(Pickup::new(id, loot, position, self.now));
        id
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.outcome.is_some() {
            return;
        }

        self.now = self.now.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        for timer in self.timers.drain_due(self.now) {
            match timer {
                TimerKind::ResumePlayer => {
                    self.player.can_move = true;
                    out_events.push(Event::PlayerResumed);
                }
            }
        }

        for kind in self.player.expire_items(self.now) {
            debug!(?kind, "item_expired");
            out_events.push(Event::ItemExpired { kind });
        }

        self.move_player(dt);
        self.fire_player_weapon(out_events);

        for hostile in self.hostiles.iter_mut() {
            hostile.integrate(dt);
        }
        for projectile in self.projectiles.iter_mut() {
            projectile.integrate(dt);
        }

        self.resolve_combat(out_events);
        if self.outcome.is_some() {
            return;
        }

        self.update_pickups(out_events);
        self.check_cleared(out_events);
    }

    fn player_fits(&self, position: Point) -> bool {
        let bounds = Bounds::centered(position, PLAYER_HALF_EXTENT);
        bounds.inside_map() && !self.grid.collides(&bounds)
    }

    fn move_player(&mut self, dt: Duration) {
        let heading = if self.player.can_move {
            self.player.movement.angle()
        } else {
            None
        };
        let Some(angle) = heading else {
            self.player.velocity = Velocity::ZERO;
            return;
        };

        let speed = speed_to_units(self.player.stats().movement_speed);
        let velocity = Velocity::from_angle(speed, angle);
        self.player.velocity = velocity;

        let seconds = dt.as_secs_f32();
        let horizontal = self.player.position.offset(velocity.dx * seconds, 0.0);
        if self.player_fits(horizontal) {
            self.player.position = horizontal;
        }
        let vertical = self.player.position.offset(0.0, velocity.dy * seconds);
        if self.player_fits(vertical) {
            self.player.position = vertical;
        }
    }

    fn fire_player_weapon(&mut self, out_events: &mut Vec<Event>) {
        if !self.player.can_move {
            return;
        }
        let Some(aim) = self.player.aim.angle() else {
            return;
        };
        if !self.player.shot_ready(self.now) {
            return;
        }
        self.player.last_shot = Some(self.now);

        let stats = self.player.stats();
        let speed = speed_to_units(stats.bullet_speed);
        let angles = shot_angles(
            aim,
            self.player.is_active(ItemKind::Spray),
            self.player.is_active(ItemKind::ThreeSixty),
        );
        for angle in angles {
            let _ = self.spawn_projectile(
                ProjectileTemplate {
                    owner: ProjectileOwner::Player,
                    position: self.player.position,
                    velocity: Velocity::from_angle(speed, angle),
                    damage: stats.damage,
                    penetration: stats.penetration,
                },
                out_events,
            );
        }
    }

    fn update_pickups(&mut self, out_events: &mut Vec<Event>) {
        let now = self.now;
        let player_bounds = self.player.bounds();
        let reachable = self.player.can_move;
        let mut collected = Vec::new();

        self.pickups.retain(|pickup| {
            if pickup.is_expired(now) {
                out_events.push(Event::LootExpired { pickup: pickup.id });
                return false;
            }
            if reachable && pickup.bounds().overlaps(&player_bounds) {
                collected.push((pickup.id, pickup.loot));
                return false;
            }
            true
        });

        for (pickup, loot) in collected {
            out_events.push(Event::LootCollected { pickup, loot });
            match loot {
                Loot::Item(kind) => {
                    if let Some(activated) = self.player.collect_item(kind, now) {
                        info!(item = ?activated, "item_activated");
                        out_events.push(Event::ItemActivated { kind: activated });
                    }
                }
                Loot::ResurrectionCoin => {
                    self.player.resurrection_coins = self.player.resurrection_coins.saturating_add(1);
                }
            }
        }
    }

    fn check_cleared(&mut self, out_events: &mut Vec<Event>) {
        if !self.waves_exhausted || self.outcome.is_some() || !self.hostiles.is_empty() {
            return;
        }
        info!(time = ?self.now, "encounter_cleared");
        self.outcome = Some(EncounterOutcome::Cleared);
        out_events.push(Event::EncounterEnded {
            outcome: EncounterOutcome::Cleared,
        });
    }
}

#[derive(Clone, Copy, Debug)]
struct ProjectileTemplate {
    owner: ProjectileOwner,
    position: Point,
    velocity: Velocity,
    damage: u32,
    penetration: u32,
}

/// Applies the provided command to the room, mutating state deterministically.
pub fn apply(room: &mut Room, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureRoom { walls } => {
            room.grid = TileGrid::from_walls(&walls);
            room.obstacles = Arc::from(filter_border_walls(
                &walls, TILE_SIZE, TILE_SIZE, MAP_SIZE, MAP_SIZE,
            ));
            room.hostiles.clear();
            room.projectiles.clear();
            room.pickups.clear();
            room.player.position = player::spawn_point();
            room.player.velocity = Velocity::ZERO;
            room.waves_exhausted = false;
            room.outcome = None;
            info!(
                map = %room.config.map_id,
                walls = walls.len(),
                obstacles = room.obstacles.len(),
                "room_configured"
            );
            out_events.push(Event::RoomConfigured);
        }
        Command::Tick { dt } => room.tick(dt, out_events),
        Command::SetMovementIntent { intent } => room.player.movement = intent,
        Command::SetAimIntent { intent } => room.player.aim = intent,
        Command::UseStoredItem => {
            if let Some(kind) = room.player.stored_item.take() {
                room.player.activate(kind, room.now);
                info!(item = ?kind, "item_activated");
                out_events.push(Event::ItemActivated { kind });
            }
        }
        Command::ApplyUpgrade { slot } => {
            let level = room.player.upgrade(slot);
            out_events.push(Event::UpgradeApplied { slot, level });
        }
        Command::SpawnHostile { kind, position, hp } => {
            if room.outcome.is_some() {
                return;
            }
            let id = HostileId::new(room.next_hostile_id);
            room.next_hostile_id = room.next_hostile_id.wrapping_add(1);
            room.hostiles.push(Hostile::new(id, kind, position, hp));
            debug!(hostile = id.get(), kind = kind.name(), "hostile_spawned");
            out_events.push(Event::HostileSpawned {
                hostile: id,
                kind,
                position,
            });
        }
        Command::SpawnProjectile {
            owner,
            position,
            velocity,
            damage,
            penetration,
        } => {
            let _ = room.spawn_projectile(
                ProjectileTemplate {
                    owner,
                    position,
                    velocity,
                    damage,
                    penetration,
                },
                out_events,
            );
        }
        Command::MarkPathPending {
            hostile,
            ticket,
            target,
        } => {
            let now = room.now;
            if let Some(entry) = room.hostile_mut(hostile) {
                if !entry.mark_path_pending(ticket, target, now) {
                    warn!(
                        hostile = hostile.get(),
                        ticket = ticket.get(),
                        "duplicate_path_request"
                    );
                }
            }
        }
        Command::InstallPath { hostile, path } => match room.hostile_mut(hostile) {
            Some(entry) => entry.install_path(path),
            None => debug!(hostile = hostile.get(), "stale_path_discarded"),
        },
        Command::SteerHostile {
            hostile,
            waypoint,
            velocity,
        } => {
            if let Some(entry) = room.hostile_mut(hostile) {
                let _ = entry.steer(waypoint, velocity);
            }
        }
        Command::RecordAttack { hostile } => {
            let now = room.now;
            if let Some(entry) = room.hostile_mut(hostile) {
                entry.record_attack(now);
            }
        }
        Command::CompleteEncounter => {
            room.waves_exhausted = true;
            room.check_cleared(out_events);
        }
    }
}

/// Query functions that provide read-only access to the room state.
pub mod query {
    use std::{sync::Arc, time::Duration};

    use deltaworld_core::{
        Difficulty, EncounterOutcome, HostileView, PickupSnapshot, PlayerSnapshot, Point,
        ProjectileId, ProjectileOwner, RunRecord, TileGrid, Velocity, WallDescriptor,
    };

    use super::{PlayerStats, Room};

    /// Simulation time elapsed since the room was created.
    #[must_use]
    pub fn clock(room: &Room) -> Duration {
        room.now
    }

    /// Difficulty the room runs at.
    #[must_use]
    pub fn difficulty(room: &Room) -> Difficulty {
        room.config.difficulty
    }

    /// Captures a read-only view of the hostiles inside the room.
    #[must_use]
    pub fn hostile_view(room: &Room) -> HostileView {
        HostileView::from_snapshots(room.hostiles.iter().map(|hostile| hostile.snapshot()).collect())
    }

    /// Captures the player's current state.
    #[must_use]
    pub fn player(room: &Room) -> PlayerSnapshot {
        room.player.snapshot(room.now)
    }

    /// Derived stats currently in effect for the player.
    #[must_use]
    pub fn player_stats(room: &Room) -> PlayerStats {
        room.player.stats()
    }

    /// Provides read-only access to the traversability grid.
    #[must_use]
    pub fn tile_grid(room: &Room) -> &TileGrid {
        &room.grid
    }

    /// Shared snapshot of the interior walls handed to route searches.
    #[must_use]
    pub fn obstacle_snapshot(room: &Room) -> Arc<[WallDescriptor]> {
        Arc::clone(&room.obstacles)
    }

    /// Captures the projectiles currently in flight in identifier order.
    #[must_use]
    pub fn projectiles(room: &Room) -> Vec<ProjectileSnapshot> {
        room.projectiles
            .iter()
            .map(|projectile| ProjectileSnapshot {
                id: projectile.id,
                owner: projectile.owner,
                position: projectile.position,
                velocity: projectile.velocity,
                damage: projectile.damage,
                penetration: projectile.penetration,
            })
            .collect()
    }

    /// Captures the pickups lying in the room.
    #[must_use]
    pub fn pickups(room: &Room) -> Vec<PickupSnapshot> {
        room.pickups
            .iter()
            .map(|pickup| pickup.snapshot(room.now))
            .collect()
    }

    /// Outcome of the encounter once it ended.
    #[must_use]
    pub fn outcome(room: &Room) -> Option<EncounterOutcome> {
        room.outcome
    }

    /// Packages the persistent part of the run for the save layer.
    #[must_use]
    pub fn run_record(room: &Room) -> RunRecord {
        RunRecord {
            map_id: room.config.map_id.clone(),
            armor: room.player.armor,
            gun: room.player.gun,
            ammo: room.player.ammo,
            stored_item: room.player.stored_item,
            resurrection_coins: room.player.resurrection_coins,
            difficulty: room.config.difficulty,
        }
    }

    /// Immutable representation of a projectile in flight.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ProjectileSnapshot {
        /// Identifier of the projectile.
        pub id: ProjectileId,
        /// Party that fired the projectile.
        pub owner: ProjectileOwner,
        /// Current position.
        pub position: Point,
        /// Travel velocity.
        pub velocity: Velocity,
        /// Damage dealt per hit.
        pub damage: u32,
        /// Number of hostiles the projectile may still damage.
        pub penetration: u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltaworld_core::{DirectionalIntent, MobKind, TileCoord, UpgradeSlot};

    fn configured_room() -> Room {
        let mut room = Room::new(RoomConfig::default());
        let mut events = Vec::new();
        apply(&mut room, Command::ConfigureRoom { walls: Vec::new() }, &mut events);
        room
    }

    fn tick(room: &mut Room, millis: u64) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            room,
            Command::Tick {
                dt: Duration::from_millis(millis),
            },
            &mut events,
        );
        events
    }

    #[test]
    fn configure_room_filters_border_walls_from_obstacles() {
        let mut room = Room::new(RoomConfig::default());
        let mut events = Vec::new();
        let walls = vec![
            WallDescriptor::new("wall", TileCoord::new(0, 3).center()),
            WallDescriptor::new("wall", TileCoord::new(4, 4).center()),
        ];

        apply(&mut room, Command::ConfigureRoom { walls }, &mut events);

        assert_eq!(events, vec![Event::RoomConfigured]);
        assert_eq!(query::obstacle_snapshot(&room).len(), 1);
        assert!(!query::tile_grid(&room).is_traversable(TileCoord::new(0, 3)));
        assert!(!query::tile_grid(&room).is_traversable(TileCoord::new(4, 4)));
    }

    #[test]
    fn upgrades_only_increase() {
        let mut room = configured_room();
        let mut events = Vec::new();
        apply(
            &mut room,
            Command::ApplyUpgrade {
                slot: UpgradeSlot::Gun,
            },
            &mut events,
        );
        apply(
            &mut room,
            Command::ApplyUpgrade {
                slot: UpgradeSlot::Gun,
            },
            &mut events,
        );

        assert_eq!(
            events.last(),
            Some(&Event::UpgradeApplied {
                slot: UpgradeSlot::Gun,
                level: 2
            })
        );
        assert_eq!(query::player_stats(&room).penetration, 1);
        assert_eq!(query::player(&room).gun, 2);
    }

    #[test]
    fn player_movement_stops_at_walls() {
        let mut room = Room::new(RoomConfig::default());
        let mut events = Vec::new();
        let wall = WallDescriptor::new("wall", TileCoord::new(9, 7).center());
        apply(&mut room, Command::ConfigureRoom { walls: vec![wall] }, &mut events);
        apply(
            &mut room,
            Command::SetMovementIntent {
                intent: DirectionalIntent {
                    right: true,
                    ..DirectionalIntent::default()
                },
            },
            &mut events,
        );

        for _ in 0..60 {
            let _ = tick(&mut room, 16);
        }

        let player = query::player(&room);
        assert!(player.position.x + PLAYER_HALF_EXTENT <= 342.0);
        assert!(player.position.x > 320.0);
    }

    #[test]
    fn aiming_fires_at_the_derived_rate() {
        let mut room = configured_room();
        let mut events = Vec::new();
        apply(
            &mut room,
            Command::SetAimIntent {
                intent: DirectionalIntent {
                    up: true,
                    ..DirectionalIntent::default()
                },
            },
            &mut events,
        );

        let mut fired = 0;
        for _ in 0..10 {
            fired += tick(&mut room, 100)
                .iter()
                .filter(|event| matches!(event, Event::ProjectileFired { .. }))
                .count();
        }

        // Three shots per second: at 0.1 s, 0.5 s and 0.9 s.
        assert_eq!(fired, 3);
    }

    #[test]
    fn laser_beam_pulses_nearby_hostiles() {
        let mut room = configured_room();
        let mut events = Vec::new();
        room.player.stored_item = Some(ItemKind::LaserBeam);
        apply(&mut room, Command::UseStoredItem, &mut events);
        apply(
            &mut room,
            Command::SpawnHostile {
                kind: MobKind::Zombie,
                position: Point::new(304.0, 400.0),
                hp: 20,
            },
            &mut events,
        );
        apply(
            &mut room,
            Command::SpawnHostile {
                kind: MobKind::Zombie,
                position: Point::new(304.0, 500.0),
                hp: 20,
            },
            &mut events,
        );

        let events: Vec<Event> = (0..16).flat_map(|_| tick(&mut room, 100)).collect();

        let damaged: Vec<HostileId> = events
            .iter()
            .filter_map(|event| match event {
                Event::HostileDamaged { hostile, .. } => Some(*hostile),
                _ => None,
            })
            .collect();
        assert_eq!(damaged, vec![HostileId::new(0)]);
        assert_eq!(query::hostile_view(&room).get(HostileId::new(0)).map(|h| h.hp), Some(12));
    }

    #[test]
    fn encounter_clears_once_waves_and_hostiles_are_gone() {
        let mut room = configured_room();
        let mut events = Vec::new();
        apply(&mut room, Command::CompleteEncounter, &mut events);

        assert_eq!(
            events,
            vec![Event::EncounterEnded {
                outcome: EncounterOutcome::Cleared
            }]
        );
        assert!(tick(&mut room, 16).is_empty());
    }

    #[test]
    fn run_record_restores_the_player() {
        let record = RunRecord {
            map_id: "d2r1".to_owned(),
            armor: 1,
            gun: 2,
            ammo: 3,
            stored_item: Some(ItemKind::BlueCow),
            resurrection_coins: 2,
            difficulty: Difficulty::Hard,
        };
        let room = Room::resume(&record, 9);

        assert_eq!(query::run_record(&room), record);
        assert_eq!(query::difficulty(&room), Difficulty::Hard);
    }
}

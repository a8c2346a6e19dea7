#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave spawning system driven by a [`Level`] definition.
//!
//! The first wave starts on the first tick. Each later wave starts once the
//! time elapsed since the previous wave began reaches that wave's duration.
//! Hostiles enter from one of four lanes on a random edge of the map.

mod level;

use std::time::Duration;

use deltaworld_core::{Command, Event, Point, MAP_SIZE, TILE_SIZE};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

pub use level::{Level, LevelError, WaveEntry, WaveExhausted, WaveSelector};

/// Tile indices along an edge through which hostiles enter.
pub const ENTRANCE_LANES: [u32; 4] = [6, 7, 8, 9];

/// Waves the cursor moves back when the player is resurrected.
pub const RESURRECTION_ROLLBACK: usize = 2;

/// Side of the map a hostile enters from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// West side.
    Left,
    /// East side.
    Right,
    /// South side.
    Bottom,
    /// North side.
    Top,
}

impl Edge {
    /// Every edge.
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];
}

/// Spawn position one tile outside `edge`, centered on lane tile `lane`.
#[must_use]
pub fn entrance_point(edge: Edge, lane: u32) -> Point {
    let along = lane as f32 * TILE_SIZE + TILE_SIZE / 2.0;
    match edge {
        Edge::Left => Point::new(-TILE_SIZE, along),
        Edge::Right => Point::new(MAP_SIZE + TILE_SIZE, along),
        Edge::Bottom => Point::new(along, -TILE_SIZE),
        Edge::Top => Point::new(along, MAP_SIZE + TILE_SIZE),
    }
}

/// Configuration parameters required to construct the wave spawner.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided seed.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Pure system that turns the level schedule into spawn commands.
#[derive(Debug)]
pub struct WaveSpawner {
    level: Level,
    rng: ChaCha8Rng,
    since_wave_start: Duration,
    wave_duration: Option<Duration>,
    exhausted: bool,
    finished: bool,
}

impl WaveSpawner {
    /// Creates a spawner that plays `level` from its first wave.
    #[must_use]
    pub fn new(level: Level, config: Config) -> Self {
        Self {
            level,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            since_wave_start: Duration::ZERO,
            wave_duration: None,
            exhausted: false,
            finished: false,
        }
    }

    /// Level being played, including its wave cursor.
    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Reports whether every wave has been spawned.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Consumes room events and emits spawn commands for due waves.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        let mut elapsed = Duration::ZERO;
        let mut restarted = false;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => elapsed = elapsed.saturating_add(*dt),
                Event::PlayerDied {
                    resurrected: true, ..
                } => {
                    self.level.rewind(RESURRECTION_ROLLBACK);
                    self.since_wave_start = Duration::ZERO;
                    self.wave_duration = None;
                    self.exhausted = false;
                    restarted = true;
                    info!(wave = self.level.current_wave(), "waves_rolled_back");
                }
                Event::EncounterEnded { .. } => self.finished = true,
                _ => {}
            }
        }

        if self.finished || self.exhausted || restarted || elapsed.is_zero() {
            return;
        }

        self.since_wave_start = self.since_wave_start.saturating_add(elapsed);
        let due = self
            .wave_duration
            .map_or(true, |duration| self.since_wave_start >= duration);
        if !due {
            return;
        }

        let index = self.level.current_wave();
        match self.level.next_wave(&mut self.rng) {
            Ok(mobs) => {
                self.since_wave_start = Duration::ZERO;
                self.wave_duration = self.level.wave(index).map(|wave| wave.duration);
                info!(wave = index, hostiles = mobs.len(), "wave_started");
                for kind in mobs {
                    let position = self.pick_entrance();
                    out.push(Command::SpawnHostile {
                        kind,
                        position,
                        hp: self.level.hp_for(kind),
                    });
                }
            }
            Err(exhausted) => {
                self.exhausted = true;
                info!(waves = exhausted.waves, "waves_exhausted");
                out.push(Command::CompleteEncounter);
            }
        }
    }

    fn pick_entrance(&mut self) -> Point {
        let edge = Edge::ALL[self.rng.gen_range(0..Edge::ALL.len())];
        let lane = ENTRANCE_LANES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(ENTRANCE_LANES[0]);
        entrance_point(edge, lane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltaworld_core::{tile_of_point, MobKind};

    const SCENARIO: &str = r#"
        waves = [[3, 5.0], ["boss_intro", 10.0]]

        [mob_probabilities]
        zombie = 1.0

        [special_waves.boss_intro]
        zombie = 2
    "#;

    fn tick(spawner: &mut WaveSpawner, millis: u64) -> Vec<Command> {
        let mut out = Vec::new();
        spawner.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_millis(millis),
            }],
            &mut out,
        );
        out
    }

    fn spawned(commands: &[Command]) -> usize {
        commands
            .iter()
            .filter(|command| matches!(command, Command::SpawnHostile { .. }))
            .count()
    }

    #[test]
    fn entrances_lie_one_tile_outside_the_map() {
        for edge in Edge::ALL {
            for lane in ENTRANCE_LANES {
                let point = entrance_point(edge, lane);
                assert_eq!(tile_of_point(point), None);
            }
        }
        assert_eq!(entrance_point(Edge::Left, 6), Point::new(-38.0, 247.0));
        assert_eq!(entrance_point(Edge::Top, 9), Point::new(361.0, 646.0));
    }

    #[test]
    fn waves_follow_the_schedule_and_then_complete() {
        let level = Level::from_toml_str(SCENARIO).expect("level is valid");
        let mut spawner = WaveSpawner::new(level, Config::new(11));

        let first = tick(&mut spawner, 16);
        assert_eq!(spawned(&first), 3);
        assert!(first.iter().all(|command| matches!(
            command,
            Command::SpawnHostile {
                kind: MobKind::Zombie,
                hp: 1,
                ..
            }
        )));

        assert_eq!(spawned(&tick(&mut spawner, 4_000)), 0);
        assert_eq!(spawned(&tick(&mut spawner, 1_000)), 2);

        assert!(tick(&mut spawner, 9_999).is_empty());
        assert_eq!(tick(&mut spawner, 1), vec![Command::CompleteEncounter]);
        assert!(spawner.is_exhausted());
        assert!(tick(&mut spawner, 20_000).is_empty());
    }

    #[test]
    fn nothing_spawns_without_time_passing() {
        let level = Level::from_toml_str(SCENARIO).expect("level is valid");
        let mut spawner = WaveSpawner::new(level, Config::new(3));
        let mut out = Vec::new();
        spawner.handle(&[Event::RoomConfigured], &mut out);
        assert!(out.is_empty());
        assert_eq!(spawner.level().current_wave(), 0);
    }
}

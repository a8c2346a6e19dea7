#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless driver that plays a Deltaworld encounter from a level file.

mod autopilot;
mod layout;

use std::{fs, path::PathBuf, thread, time::Duration};

use anyhow::{Context, Result};
use autopilot::Autopilot;
use clap::Parser;
use deltaworld_core::{Command, Difficulty, EncounterOutcome, Event, RunRecord};
use deltaworld_system_hostile_ai::{HostileAi, HostileAiConfig};
use deltaworld_system_pathfinding::{Pathfinder, PathfinderConfig};
use deltaworld_system_wave_spawner::{Config as SpawnerConfig, Level, WaveSpawner};
use deltaworld_world::{apply, query, Room};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments accepted by the headless driver.
#[derive(Debug, Parser)]
#[command(name = "deltaworld", about = "Plays a Deltaworld encounter without a window")]
struct CliArgs {
    /// Level definition in TOML.
    #[arg(long, value_name = "PATH")]
    level: PathBuf,
    /// ASCII wall layout; a ring with open entrances is used when omitted.
    #[arg(long, value_name = "PATH")]
    layout: Option<PathBuf>,
    /// Seed shared by loot rolls and wave composition.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Upper bound on simulated ticks.
    #[arg(long, default_value_t = 36_000)]
    ticks: u32,
    /// Simulation steps per second.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    tick_rate: u32,
    /// Plays in hard mode; resurrection coins never drop.
    #[arg(long)]
    hard: bool,
    /// Resurrection coins the player starts with.
    #[arg(long, default_value_t = 0)]
    coins: u32,
    /// Paces the loop to wall-clock time.
    #[arg(long)]
    realtime: bool,
    /// Number of pathfinding worker threads.
    #[arg(long, default_value_t = 3)]
    workers: usize,
}

#[derive(Debug, Default)]
struct Tally {
    ticks: u32,
    kills: u32,
    deaths: u32,
    loot: u32,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::HostileDied { .. } => self.kills += 1,
                Event::PlayerDied { .. } => self.deaths += 1,
                Event::LootCollected { .. } => self.loot += 1,
                _ => {}
            }
        }
    }
}

/// Entry point for the Deltaworld command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    let level = Level::load(&args.level)
        .with_context(|| format!("failed to load level {}", args.level.display()))?;
    let walls = match &args.layout {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read layout {}", path.display()))?;
            layout::parse_layout(&text)
                .with_context(|| format!("invalid layout {}", path.display()))?
        }
        None => layout::default_layout(),
    };

    let record = RunRecord {
        map_id: "d1r1".to_owned(),
        armor: 0,
        gun: 0,
        ammo: 0,
        stored_item: None,
        resurrection_coins: args.coins,
        difficulty: if args.hard {
            Difficulty::Hard
        } else {
            Difficulty::Normal
        },
    };
    let mut room = Room::resume(&record, args.seed);
    let pathfinder = Pathfinder::new(PathfinderConfig {
        workers: args.workers,
        ..PathfinderConfig::default()
    })
    .context("failed to start the pathfinder")?;
    let mut spawner = WaveSpawner::new(level, SpawnerConfig::new(args.seed));
    let mut ai = HostileAi::new(HostileAiConfig::default());
    let mut autopilot = Autopilot::default();

    let mut events = Vec::new();
    apply(&mut room, Command::ConfigureRoom { walls }, &mut events);

    let dt = Duration::from_secs(1) / args.tick_rate;
    let mut tally = Tally::default();
    while tally.ticks < args.ticks && query::outcome(&room).is_none() {
        events.clear();
        apply(&mut room, Command::Tick { dt }, &mut events);
        tally.ticks += 1;

        let mut commands = Vec::new();
        autopilot.handle(
            &query::player(&room),
            &query::hostile_view(&room),
            &mut commands,
        );
        spawner.handle(&events, &mut commands);
        ai.handle(
            &events,
            &query::hostile_view(&room),
            &query::player(&room),
            query::clock(&room),
            &query::obstacle_snapshot(&room),
            &pathfinder,
            &mut commands,
        );

        for command in commands {
            apply(&mut room, command, &mut events);
        }
        tally.record(&events);

        if args.realtime {
            thread::sleep(dt);
        }
    }
    pathfinder.shutdown();

    let outcome = query::outcome(&room);
    match outcome {
        Some(outcome) => info!(?outcome, ticks = tally.ticks, "encounter_finished"),
        None => warn!(ticks = tally.ticks, "tick_limit_reached"),
    }

    let stats = query::player_stats(&room);
    println!("outcome: {}", describe(outcome));
    println!("time: {:.2}s", query::clock(&room).as_secs_f64());
    println!(
        "waves: {}/{}",
        spawner.level().current_wave(),
        spawner.level().wave_count()
    );
    println!("kills: {}", tally.kills);
    println!("deaths: {}", tally.deaths);
    println!("loot collected: {}", tally.loot);
    println!(
        "player: damage {} fire rate {:.1} penetration {}",
        stats.damage, stats.fire_rate, stats.penetration
    );
    Ok(())
}

fn describe(outcome: Option<EncounterOutcome>) -> &'static str {
    match outcome {
        Some(EncounterOutcome::Cleared) => "cleared",
        Some(EncounterOutcome::Defeated) => "defeated",
        None => "unfinished",
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

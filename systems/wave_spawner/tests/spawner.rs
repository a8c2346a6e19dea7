use std::{collections::BTreeMap, time::Duration};

use deltaworld_core::{Command, Difficulty, EncounterOutcome, Event, MobKind, RunRecord};
use deltaworld_system_wave_spawner::{Config, Level, LevelError, WaveSpawner};
use deltaworld_world::{apply, query, Room};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const DT: Duration = Duration::from_millis(16);

fn level(text: &str) -> Level {
    Level::from_toml_str(text).expect("level is valid")
}

fn run(room: &mut Room, commands: Vec<Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        apply(room, command, &mut events);
    }
    events
}

/// Ticks the room once and lets the spawner react.
fn step(room: &mut Room, spawner: &mut WaveSpawner) -> Vec<Command> {
    let events = run(room, vec![Command::Tick { dt: DT }]);
    let mut commands = Vec::new();
    spawner.handle(&events, &mut commands);
    let _ = run(room, commands.clone());
    commands
}

#[test]
fn scenario_level_produces_three_zombies_then_the_special_wave() {
    let mut level = level(
        r#"
        waves = [[3, 5.0], ["boss_intro", 10.0]]

        [mob_probabilities]
        zombie = 1.0

        [special_waves.boss_intro]
        zombie = 2
        "#,
    );
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    assert_eq!(level.next_wave(&mut rng), Ok(vec![MobKind::Zombie; 3]));
    assert_eq!(level.next_wave(&mut rng), Ok(vec![MobKind::Zombie; 2]));
    assert!(level.next_wave(&mut rng).is_err());
    assert_eq!(level.current_wave(), 2);
}

#[test]
fn special_waves_keep_their_composition() {
    let text = r#"
        waves = [["mixed", 1.0]]

        [mob_probabilities]
        zombie = 1.0

        [special_waves.mixed]
        zombie = 7
    "#;

    for seed in 0..8 {
        let mut level = level(text);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let wave = level.next_wave(&mut rng).expect("one wave");
        let mut counts = BTreeMap::new();
        for mob in wave {
            *counts.entry(mob).or_insert(0) += 1;
        }
        assert_eq!(counts, BTreeMap::from([(MobKind::Zombie, 7)]));
    }
}

#[test]
fn random_waves_draw_exactly_the_requested_count() {
    let mut level = level(
        r#"
        waves = [[0, 1.0], [25, 1.0]]

        [mob_probabilities]
        zombie = 0.4
        "#,
    );
    let mut rng = ChaCha8Rng::seed_from_u64(9);

    assert!(level.next_wave(&mut rng).expect("first").is_empty());
    assert_eq!(level.next_wave(&mut rng).expect("second").len(), 25);
}

#[test]
fn mismatched_definitions_are_rejected() {
    let missing = Level::from_toml_str(
        r#"
        waves = [[2, 1.0], ["boss", 3.0]]

        [mob_probabilities]
        zombie = 1.0
        "#,
    );
    assert!(matches!(
        missing,
        Err(LevelError::MissingSpecialWave { wave: 1, ref name }) if name == "boss"
    ));

    let unused = Level::from_toml_str(
        r#"
        waves = [[2, 1.0]]

        [mob_probabilities]
        zombie = 1.0

        [special_waves.boss]
        zombie = 1
        "#,
    );
    assert!(matches!(unused, Err(LevelError::UnusedSpecialWave(ref name)) if name == "boss"));

    let unknown = Level::from_toml_str(
        r#"
        waves = [[2, 1.0]]

        [mob_probabilities]
        dragon = 1.0
        "#,
    );
    assert!(matches!(unknown, Err(LevelError::UnknownMob(ref name)) if name == "dragon"));

    let weights = Level::from_toml_str(
        r#"
        waves = [[2, 1.0]]

        [mob_probabilities]
        zombie = 0.0
        "#,
    );
    assert!(matches!(weights, Err(LevelError::InvalidWeights(_))));

    let extra = Level::from_toml_str(
        r#"
        waves = [[2, 1.0]]

        [mob_probabilities]
        zombie = 1.0

        [mob_extras.zombie]
        speed = 4
        "#,
    );
    assert!(matches!(extra, Err(LevelError::UnknownExtra { .. })));
}

#[test]
fn resurrection_rolls_the_waves_back_by_two() {
    let record = RunRecord {
        map_id: "d1r1".to_owned(),
        armor: 0,
        gun: 0,
        ammo: 0,
        stored_item: None,
        resurrection_coins: 1,
        difficulty: Difficulty::Normal,
    };
    let mut room = Room::resume(&record, 4);
    let _ = run(&mut room, vec![Command::ConfigureRoom { walls: Vec::new() }]);
    let mut spawner = WaveSpawner::new(
        level(
            r#"
            waves = [[1, 1.0], [1, 1.0], [1, 1.0], [1, 1.0], [1, 1.0]]

            [mob_probabilities]
            zombie = 1.0
            "#,
        ),
        Config::new(21),
    );

    let mut steps = 0;
    while spawner.level().current_wave() < 3 && steps < 500 {
        let _ = step(&mut room, &mut spawner);
        steps += 1;
    }
    assert_eq!(spawner.level().current_wave(), 3);
    assert_eq!(query::hostile_view(&room).len(), 3);

    let player = query::player(&room).position;
    let _ = run(
        &mut room,
        vec![Command::SpawnHostile {
            kind: MobKind::Zombie,
            position: player,
            hp: 1,
        }],
    );
    let commands = step(&mut room, &mut spawner);

    assert!(commands.is_empty());
    assert_eq!(spawner.level().current_wave(), 1);
    assert!(query::hostile_view(&room).is_empty());
    assert_eq!(query::player(&room).resurrection_coins, 0);
    assert_eq!(query::outcome(&room), None);

    let commands = step(&mut room, &mut spawner);
    assert_eq!(commands.len(), 1);
    assert_eq!(spawner.level().current_wave(), 2);
}

#[test]
fn last_wave_cleared_completes_the_encounter() {
    let mut room = Room::resume(
        &RunRecord {
            map_id: "d1r1".to_owned(),
            armor: 0,
            gun: 0,
            ammo: 0,
            stored_item: None,
            resurrection_coins: 0,
            difficulty: Difficulty::Normal,
        },
        2,
    );
    let _ = run(&mut room, vec![Command::ConfigureRoom { walls: Vec::new() }]);
    let mut spawner = WaveSpawner::new(
        level(
            r#"
            waves = [[0, 0.5]]

            [mob_probabilities]
            zombie = 1.0
            "#,
        ),
        Config::new(1),
    );

    for _ in 0..40 {
        let _ = step(&mut room, &mut spawner);
    }

    assert!(spawner.is_exhausted());
    assert_eq!(query::outcome(&room), Some(EncounterOutcome::Cleared));
}

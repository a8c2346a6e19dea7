use std::time::Duration;

use deltaworld_core::{
    Command, Event, HostileId, MobKind, PathTicket, Point, ProjectileOwner, TileCoord, Velocity,
};
use deltaworld_world::{apply, query, Room, RoomConfig};

fn run(room: &mut Room, commands: Vec<Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        apply(room, command, &mut events);
    }
    events
}

fn configured_room() -> Room {
    let mut room = Room::new(RoomConfig::default());
    let _ = run(&mut room, vec![Command::ConfigureRoom { walls: Vec::new() }]);
    room
}

fn zombie_at(position: Point) -> Command {
    Command::SpawnHostile {
        kind: MobKind::Zombie,
        position,
        hp: 1,
    }
}

fn route_commands(hostile: HostileId) -> Vec<Command> {
    let waypoint = TileCoord::new(1, 13).center();
    vec![
        Command::MarkPathPending {
            hostile,
            ticket: PathTicket::new(9),
            target: waypoint,
        },
        Command::InstallPath {
            hostile,
            path: Some(vec![waypoint]),
        },
        Command::SteerHostile {
            hostile,
            waypoint,
            velocity: Velocity::new(0.0, 70.0),
        },
    ]
}

#[test]
fn routes_for_killed_hostiles_are_discarded() {
    let mut room = configured_room();
    let _ = run(
        &mut room,
        vec![
            zombie_at(Point::new(100.0, 500.0)),
            Command::SpawnProjectile {
                owner: ProjectileOwner::Player,
                position: Point::new(60.0, 500.0),
                velocity: Velocity::new(320.0, 0.0),
                damage: 1,
                penetration: 1,
            },
        ],
    );

    let events: Vec<Event> = (0..20)
        .flat_map(|_| run(&mut room, vec![Command::Tick { dt: Duration::from_millis(16) }]))
        .collect();
    let died = HostileId::new(0);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::HostileDied { hostile, .. } if *hostile == died)));

    let events = run(&mut room, route_commands(died));

    assert!(events.is_empty());
    assert!(query::hostile_view(&room).is_empty());
}

#[test]
fn routes_from_before_a_reconfiguration_do_not_reach_new_hostiles() {
    let mut room = configured_room();
    let _ = run(&mut room, vec![zombie_at(Point::new(57.0, 495.0))]);
    let _ = run(&mut room, vec![Command::ConfigureRoom { walls: Vec::new() }]);
    let _ = run(&mut room, vec![zombie_at(Point::new(57.0, 495.0))]);

    let events = run(&mut room, route_commands(HostileId::new(0)));

    assert!(events.is_empty());
    let fresh = query::hostile_view(&room)
        .get(HostileId::new(1))
        .cloned()
        .expect("new hostile is present");
    assert!(!fresh.path_pending);
    assert_eq!(fresh.next_waypoint, None);
    assert_eq!(fresh.queued_waypoints, 0);
}

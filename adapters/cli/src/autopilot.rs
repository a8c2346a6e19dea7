//! Stand-in for player input during headless runs.

use deltaworld_core::{Command, DirectionalIntent, HostileView, PlayerSnapshot, Point, TILE_SIZE};

/// Distance under which the stored item is used.
const PANIC_RANGE: f32 = 3.0 * TILE_SIZE;

/// Keeps the player still and shooting at the nearest hostile.
#[derive(Debug, Default)]
pub(crate) struct Autopilot {
    aim: DirectionalIntent,
}

impl Autopilot {
    /// Emits aim and item commands for the current tick.
    pub(crate) fn handle(
        &mut self,
        player: &PlayerSnapshot,
        hostiles: &HostileView,
        out: &mut Vec<Command>,
    ) {
        let nearest = hostiles
            .iter()
            .map(|hostile| hostile.position)
            .min_by(|a, b| {
                a.distance_to(player.position)
                    .total_cmp(&b.distance_to(player.position))
            });

        let aim = nearest.map_or_else(DirectionalIntent::default, |target| {
            aim_toward(player.position, target)
        });
        if aim != self.aim {
            self.aim = aim;
            out.push(Command::SetAimIntent { intent: aim });
        }

        let threatened = nearest.is_some_and(|target| {
            target.distance_to(player.position) <= PANIC_RANGE
        });
        if threatened && player.stored_item.is_some() {
            out.push(Command::UseStoredItem);
        }
    }
}

/// Closest of the eight aim directions from `from` toward `to`.
fn aim_toward(from: Point, to: Point) -> DirectionalIntent {
    let angle = from.angle_to(to).rem_euclid(360.0);
    let sector = (angle / 45.0).round() as u32 % 8;
    let (up, down, left, right) = match sector {
        0 => (false, false, false, true),
        1 => (true, false, false, true),
        2 => (true, false, false, false),
        3 => (true, false, true, false),
        4 => (false, false, true, false),
        5 => (false, true, true, false),
        6 => (false, true, false, false),
        _ => (false, true, false, true),
    };
    DirectionalIntent {
        up,
        down,
        left,
        right,
    }
}

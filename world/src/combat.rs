//! Projectile lifecycle, damage accounting and player death handling.

use std::time::Duration;

use deltaworld_core::{
    items::{LASER_BEAM_CYCLE, LASER_BEAM_DAMAGE, LASER_BEAM_RANGE_TILES},
    Bounds, EncounterOutcome, Event, HostileId, ItemKind, Point, ProjectileFate, ProjectileId,
    ProjectileOwner, TileGrid, Velocity, MAP_SIZE, TILE_SIZE,
};
use tracing::{debug, info};

use crate::{hostile::Hostile, loot, timers::TimerKind, Room};

/// Half extent of a projectile's square hitbox.
const PROJECTILE_HALF_EXTENT: f32 = 3.0;

/// How long the player stays frozen, hidden and invulnerable after a
/// resurrection.
pub(crate) const RESURRECTION_FREEZE: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) id: ProjectileId,
    pub(crate) owner: ProjectileOwner,
    pub(crate) position: Point,
    pub(crate) velocity: Velocity,
    pub(crate) damage: u32,
    pub(crate) penetration: u32,
    hit_set: Vec<HostileId>,
}

impl Projectile {
    pub(crate) fn new(
        id: ProjectileId,
        owner: ProjectileOwner,
        position: Point,
        velocity: Velocity,
        damage: u32,
        penetration: u32,
    ) -> Self {
        Self {
            id,
            owner,
            position,
            velocity,
            damage,
            penetration,
            hit_set: Vec::new(),
        }
    }

    pub(crate) fn integrate(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        self.position = self
            .position
            .offset(self.velocity.dx * seconds, self.velocity.dy * seconds);
    }

    fn bounds(&self) -> Bounds {
        Bounds::centered(self.position, PROJECTILE_HALF_EXTENT)
    }

    fn out_of_bounds(&self) -> bool {
        !(0.0..MAP_SIZE).contains(&self.position.x) || !(0.0..MAP_SIZE).contains(&self.position.y)
    }

    /// A projectile overlapping a wall survives only while its center is
    /// still above the lower edge of every wall tile it overlaps.
    fn stopped_by_wall(&self, grid: &TileGrid) -> bool {
        grid.blocked_tiles_overlapping(&self.bounds())
            .any(|tile| self.position.y <= tile.origin().y)
    }
}

impl Room {
    /// Runs every per-tick combat rule after entities moved.
    pub(crate) fn resolve_combat(&mut self, out_events: &mut Vec<Event>) {
        let player_hit = self.resolve_projectiles(out_events);
        self.pulse_laser(out_events);
        self.remove_dead_hostiles(out_events);

        if self.player.is_invulnerable(self.now) {
            return;
        }
        let player_bounds = self.player.bounds();
        let touched = self
            .hostiles
            .iter()
            .any(|hostile| hostile.bounds().overlaps(&player_bounds));
        if player_hit || touched {
            self.kill_player(out_events);
        }
    }

    /// Advances projectile collisions and reports whether a hostile
    /// projectile struck the player.
    fn resolve_projectiles(&mut self, out_events: &mut Vec<Event>) -> bool {
        let player_bounds = self.player.bounds();
        let player_invulnerable = self.player.is_invulnerable(self.now);
        let grid = &self.grid;
        let hostiles = &mut self.hostiles;
        let mut player_hit = false;

        self.projectiles.retain_mut(|projectile| {
            let fate = if projectile.out_of_bounds() {
                Some(ProjectileFate::OutOfBounds)
            } else if projectile.stopped_by_wall(grid) {
                Some(ProjectileFate::Wall)
            } else {
                match projectile.owner {
                    ProjectileOwner::Player => strike_hostiles(projectile, hostiles, out_events),
                    ProjectileOwner::Hostile(_) => {
                        if !player_invulnerable && projectile.bounds().overlaps(&player_bounds) {
                            player_hit = true;
                            Some(ProjectileFate::HitPlayer)
                        } else {
                            None
                        }
                    }
                }
            };

            let Some(fate) = fate else {
                return true;
            };
            out_events.push(Event::ProjectileDestroyed {
                projectile: projectile.id,
                fate,
            });
            false
        });

        player_hit
    }

    fn pulse_laser(&mut self, out_events: &mut Vec<Event>) {
        if !self.player.is_active(ItemKind::LaserBeam) {
            return;
        }
        let due = self
            .player
            .last_laser_pulse
            .map_or(true, |last| self.now.saturating_sub(last) >= LASER_BEAM_CYCLE);
        if !due {
            return;
        }
        self.player.last_laser_pulse = Some(self.now);

        let origin = self.player.position;
        let range = LASER_BEAM_RANGE_TILES * TILE_SIZE;
        for hostile in self.hostiles.iter_mut() {
            if hostile.is_dead() || hostile.position.distance_to(origin) > range {
                continue;
            }
            let _ = hostile.take_damage(LASER_BEAM_DAMAGE);
            out_events.push(Event::HostileDamaged {
                hostile: hostile.id,
                damage: LASER_BEAM_DAMAGE,
                remaining_hp: hostile.hp,
            });
        }
    }

    fn remove_dead_hostiles(&mut self, out_events: &mut Vec<Event>) {
        if !self.hostiles.iter().any(Hostile::is_dead) {
            return;
        }

        let (dead, alive): (Vec<Hostile>, Vec<Hostile>) =
            self.hostiles.drain(..).partition(Hostile::is_dead);
        self.hostiles = alive;

        for hostile in dead {
            debug!(hostile = hostile.id.get(), "hostile_died");
            out_events.push(Event::HostileDied {
                hostile: hostile.id,
                position: hostile.position,
            });

            let Some(loot) = loot::roll_loot(&mut self.rng, self.config.difficulty) else {
                continue;
            };
            let pickup = self.drop_loot(loot, hostile.position);
            debug!(pickup = pickup.get(), ?loot, "loot_dropped");
            out_events.push(Event::LootDropped {
                pickup,
                loot,
                position: hostile.position,
            });
        }
    }

    /// Consumes a resurrection coin or ends the encounter.
    fn kill_player(&mut self, out_events: &mut Vec<Event>) {
        if self.player.resurrection_coins == 0 {
            info!(time = ?self.now, "player_defeated");
            self.outcome = Some(EncounterOutcome::Defeated);
            out_events.push(Event::PlayerDied {
                resurrected: false,
                coins_left: 0,
            });
            out_events.push(Event::EncounterEnded {
                outcome: EncounterOutcome::Defeated,
            });
            return;
        }

        self.player.resurrection_coins -= 1;
        self.hostiles.clear();
        self.projectiles.clear();
        self.waves_exhausted = false;

        let resume_at = self.now.saturating_add(RESURRECTION_FREEZE);
        self.player.can_move = false;
        self.player.velocity = Velocity::ZERO;
        self.player.invulnerable_until = Some(resume_at);
        self.timers.schedule(resume_at, TimerKind::ResumePlayer);

        let coins_left = self.player.resurrection_coins;
        info!(coins_left, "player_resurrected");
        out_events.push(Event::PlayerDied {
            resurrected: true,
            coins_left,
        });
        out_events.push(Event::RoomCleared);
    }
}

/// Applies a player projectile to every hostile it newly overlaps.
fn strike_hostiles(
    projectile: &mut Projectile,
    hostiles: &mut [Hostile],
    out_events: &mut Vec<Event>,
) -> Option<ProjectileFate> {
    let bounds = projectile.bounds();
    for hostile in hostiles.iter_mut() {
        if hostile.is_dead() || projectile.hit_set.contains(&hostile.id) {
            continue;
        }
        if !hostile.bounds().overlaps(&bounds) {
            continue;
        }

        projectile.penetration = projectile.penetration.saturating_sub(1);
        projectile.hit_set.push(hostile.id);
        let _ = hostile.take_damage(projectile.damage);
        out_events.push(Event::HostileDamaged {
            hostile: hostile.id,
            damage: projectile.damage,
            remaining_hp: hostile.hp,
        });

        if projectile.penetration < 1 {
            return Some(ProjectileFate::Spent);
        }
    }
    None
}

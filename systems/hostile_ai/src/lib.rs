#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Hostile behaviour system.
//!
//! Each tick the system delivers finished routes, triggers attacks whose
//! cooldown elapsed, steers hostiles toward their next waypoint and submits
//! new route searches to the [`Pathfinder`]. Hostiles nearest to the player
//! are processed first so that, when the search queue fills up, distant
//! hostiles are the ones whose requests are deferred.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use deltaworld_core::{
    speed_to_units, tile_center_of_point, AttackBehavior, Command, Event, HostileId,
    HostilePhase, HostileSnapshot, HostileView, PlayerSnapshot, Point, Velocity, WallDescriptor,
};
use deltaworld_system_pathfinding::{
    PathPoll, PathRequest, Pathfinder, RequestHandle, SearchOptions, SubmitError,
};
use tracing::{debug, warn};

/// Tunables of the hostile behaviour system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostileAiConfig {
    /// Minimum time between two route searches for the same hostile.
    pub path_update_interval: Duration,
    /// Time after which an unanswered request is abandoned.
    pub request_timeout: Duration,
    /// Search parameters handed to the pathfinder.
    pub search: SearchOptions,
}

impl Default for HostileAiConfig {
    fn default() -> Self {
        Self {
            path_update_interval: Duration::from_millis(600),
            request_timeout: Duration::from_secs(5),
            search: SearchOptions::default(),
        }
    }
}

#[derive(Debug)]
struct PendingRoute {
    handle: RequestHandle,
    submitted_at: Duration,
}

/// Pure system that turns hostile snapshots into steering and routing
/// commands.
#[derive(Debug, Default)]
pub struct HostileAi {
    config: HostileAiConfig,
    pending: BTreeMap<HostileId, PendingRoute>,
}

impl HostileAi {
    /// Creates a new behaviour system.
    #[must_use]
    pub fn new(config: HostileAiConfig) -> Self {
        Self {
            config,
            pending: BTreeMap::new(),
        }
    }

    /// Number of route searches currently awaited.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Consumes room events and snapshots to emit hostile commands.
    #[allow(clippy::too_many_arguments)]
    pub fn handle(
        &mut self,
        events: &[Event],
        hostiles: &HostileView,
        player: &PlayerSnapshot,
        now: Duration,
        obstacles: &Arc<[WallDescriptor]>,
        pathfinder: &Pathfinder,
        out: &mut Vec<Command>,
    ) {
        let mut advanced = false;
        for event in events {
            match event {
                Event::TimeAdvanced { .. } => advanced = true,
                Event::HostileDied { hostile, .. } => {
                    let _ = self.pending.remove(hostile);
                }
                Event::RoomCleared | Event::RoomConfigured => self.pending.clear(),
                _ => {}
            }
        }
        if !advanced {
            return;
        }

        self.pending.retain(|id, _| hostiles.get(*id).is_some());

        let player_target = tile_center_of_point(player.position);
        let mut ordered: Vec<&HostileSnapshot> = hostiles
            .iter()
            .filter(|hostile| hostile.phase != HostilePhase::Dead)
            .collect();
        ordered.sort_by(|a, b| {
            let da = a.position.distance_to(player.position);
            let db = b.position.distance_to(player.position);
            da.total_cmp(&db).then(a.id.cmp(&b.id))
        });

        let mut queue_open = true;
        for hostile in ordered {
            let installed = self.deliver_route(hostile, now, out);

            let mut wants_route = false;
            if hostile.attack_ready(now) {
                out.push(Command::RecordAttack {
                    hostile: hostile.id,
                });
                match hostile.kind.attack() {
                    AttackBehavior::ApproachPlayer => wants_route = true,
                }
            }

            if !installed && hostile.next_waypoint.is_none() {
                if let Some(waypoint) = hostile.upcoming_waypoint {
                    let speed = speed_to_units(hostile.kind.base_speed());
                    out.push(Command::SteerHostile {
                        hostile: hostile.id,
                        waypoint,
                        velocity: steering_velocity(hostile.position, waypoint, speed),
                    });
                }
            }

            let Some(target) = player_target else {
                continue;
            };
            if !queue_open
                || !wants_route
                || hostile.path_pending
                || player.hidden
                || !self.interval_elapsed(hostile, now)
            {
                continue;
            }
            let player_moved = hostile.route_target != Some(target);
            if hostile.has_route() && !player_moved {
                continue;
            }

            queue_open = self.request_route(hostile, target, now, obstacles, pathfinder, out);
        }
    }

    /// Emits the outcome of a pending request once it is known. Returns
    /// whether a route was installed during this tick.
    fn deliver_route(
        &mut self,
        hostile: &HostileSnapshot,
        now: Duration,
        out: &mut Vec<Command>,
    ) -> bool {
        if !hostile.path_pending {
            return false;
        }

        let Some(route) = self.pending.get(&hostile.id) else {
            out.push(Command::InstallPath {
                hostile: hostile.id,
                path: None,
            });
            return true;
        };

        let path = match route.handle.poll() {
            PathPoll::Ready(result) => result.clone(),
            PathPoll::Pending => {
                if now.saturating_sub(route.submitted_at) < self.config.request_timeout {
                    return false;
                }
                warn!(
                    hostile = hostile.id.get(),
                    ticket = route.handle.ticket().get(),
                    "path_request_timed_out"
                );
                None
            }
        };

        let _ = self.pending.remove(&hostile.id);
        out.push(Command::InstallPath {
            hostile: hostile.id,
            path,
        });
        true
    }

    fn interval_elapsed(&self, hostile: &HostileSnapshot, now: Duration) -> bool {
        hostile.last_path_request.map_or(true, |last| {
            now.saturating_sub(last) >= self.config.path_update_interval
        })
    }

    /// Submits a route search. Returns `false` once the pathfinder stops
    /// accepting requests for the rest of the tick.
    fn request_route(
        &mut self,
        hostile: &HostileSnapshot,
        target: Point,
        now: Duration,
        obstacles: &Arc<[WallDescriptor]>,
        pathfinder: &Pathfinder,
        out: &mut Vec<Command>,
    ) -> bool {
        let request = PathRequest {
            entity: hostile.id,
            origin: hostile.position,
            destination: target,
            obstacles: Arc::clone(obstacles),
            options: self.config.search,
        };

        match pathfinder.submit(request) {
            Ok(handle) => {
                out.push(Command::MarkPathPending {
                    hostile: hostile.id,
                    ticket: handle.ticket(),
                    target,
                });
                let _ = self.pending.insert(
                    hostile.id,
                    PendingRoute {
                        handle,
                        submitted_at: now,
                    },
                );
                true
            }
            Err(SubmitError::QueueFull) => {
                debug!(hostile = hostile.id.get(), "path_request_deferred");
                false
            }
            Err(SubmitError::ShutDown) => {
                warn!(hostile = hostile.id.get(), "pathfinder_unavailable");
                false
            }
        }
    }
}

/// Velocity of the given magnitude pointing from `from` toward `to`.
fn steering_velocity(from: Point, to: Point, speed: f32) -> Velocity {
    let distance = from.distance_to(to);
    if distance <= f32::EPSILON {
        return Velocity::ZERO;
    }
    Velocity::new(
        (to.x - from.x) / distance * speed,
        (to.y - from.y) / distance * speed,
    )
}

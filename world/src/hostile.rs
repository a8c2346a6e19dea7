//! Hostile records owned by the room and their waypoint integration.

use std::{collections::VecDeque, time::Duration};

use deltaworld_core::{
    Bounds, HostileId, HostilePhase, HostileSnapshot, MobKind, PathTicket, Point, Velocity,
};

/// Half extent of a hostile's square hitbox.
pub(crate) const HOSTILE_HALF_EXTENT: f32 = 15.0;

#[derive(Clone, Debug)]
pub(crate) struct Hostile {
    pub(crate) id: HostileId,
    pub(crate) kind: MobKind,
    pub(crate) hp: u32,
    pub(crate) position: Point,
    velocity: Velocity,
    path_queue: VecDeque<Point>,
    next_waypoint: Option<Point>,
    phase: HostilePhase,
    path_pending: bool,
    pending_ticket: Option<PathTicket>,
    last_path_request: Option<Duration>,
    route_target: Option<Point>,
    last_attack: Option<Duration>,
}

impl Hostile {
    pub(crate) fn new(id: HostileId, kind: MobKind, position: Point, hp: u32) -> Self {
        Self {
            id,
            kind,
            hp,
            position,
            velocity: Velocity::ZERO,
            path_queue: VecDeque::new(),
            next_waypoint: None,
            phase: HostilePhase::Spawning,
            path_pending: false,
            pending_ticket: None,
            last_path_request: None,
            route_target: None,
            last_attack: None,
        }
    }

    pub(crate) fn bounds(&self) -> Bounds {
        Bounds::centered(self.position, HOSTILE_HALF_EXTENT)
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.phase == HostilePhase::Dead
    }

    /// Removes health and reports whether the hit was lethal.
    pub(crate) fn take_damage(&mut self, damage: u32) -> bool {
        self.hp = self.hp.saturating_sub(damage);
        if self.hp < 1 {
            self.phase = HostilePhase::Dead;
        }
        self.is_dead()
    }

    /// Records an outstanding route request. Returns `false` when one is
    /// already pending, in which case nothing changes.
    pub(crate) fn mark_path_pending(
        &mut self,
        ticket: PathTicket,
        target: Point,
        now: Duration,
    ) -> bool {
        if self.path_pending {
            return false;
        }
        self.path_pending = true;
        self.pending_ticket = Some(ticket);
        self.last_path_request = Some(now);
        self.route_target = Some(target);
        true
    }

    /// Installs a finished route.
    ///
    /// While the hostile is mid-step, the route resumes after the waypoint it
    /// is already walking toward. A route that does not pass through that
    /// waypoint was computed from the tile the hostile has already entered
    /// and is kept whole.
    pub(crate) fn install_path(&mut self, path: Option<Vec<Point>>) {
        self.path_pending = false;
        self.pending_ticket = None;

        if let Some(points) = path {
            let mut queue: VecDeque<Point> = points.into();
            if let Some(current) = self.next_waypoint {
                if let Some(reached) = queue.iter().position(|point| *point == current) {
                    let _ = queue.drain(..=reached);
                }
            }
            self.path_queue = queue;
        }
        self.refresh_phase();
    }

    /// Starts walking toward the head of the queue. Returns `false` when the
    /// queue head does not match the requested waypoint.
    pub(crate) fn steer(&mut self, waypoint: Point, velocity: Velocity) -> bool {
        if self.path_queue.front() != Some(&waypoint) {
            return false;
        }
        let _ = self.path_queue.pop_front();
        self.next_waypoint = Some(waypoint);
        self.velocity = velocity;
        self.phase = HostilePhase::Following;
        true
    }

    pub(crate) fn record_attack(&mut self, now: Duration) {
        self.last_attack = Some(now);
        self.phase = HostilePhase::Attacking;
    }

    /// Moves the hostile along its velocity and resolves waypoint arrival
    /// independently on each axis.
    pub(crate) fn integrate(&mut self, dt: Duration) {
        if self.is_dead() {
            return;
        }

        let seconds = dt.as_secs_f32();
        if let Some(waypoint) = self.next_waypoint {
            let step_x = self.velocity.dx * seconds;
            self.position.x += step_x;
            if (self.position.x - waypoint.x).abs() <= step_x.abs() {
                self.position.x = waypoint.x;
                self.velocity.dx = 0.0;
            }

            let step_y = self.velocity.dy * seconds;
            self.position.y += step_y;
            if (self.position.y - waypoint.y).abs() <= step_y.abs() {
                self.position.y = waypoint.y;
                self.velocity.dy = 0.0;
            }

            if self.position == waypoint {
                self.next_waypoint = None;
                self.velocity = Velocity::ZERO;
            }
        }
        self.refresh_phase();
    }

    fn refresh_phase(&mut self) {
        if self.is_dead() {
            return;
        }
        let routed = self.next_waypoint.is_some() || !self.path_queue.is_empty();
        self.phase = match self.phase {
            HostilePhase::Spawning if !routed && self.last_path_request.is_none() => {
                HostilePhase::Spawning
            }
            _ if routed => HostilePhase::Following,
            _ => HostilePhase::Seeking,
        };
    }

    pub(crate) fn snapshot(&self) -> HostileSnapshot {
        HostileSnapshot {
            id: self.id,
            kind: self.kind,
            phase: self.phase,
            position: self.position,
            velocity: self.velocity,
            hp: self.hp,
            next_waypoint: self.next_waypoint,
            upcoming_waypoint: self.path_queue.front().copied(),
            queued_waypoints: self.path_queue.len(),
            path_pending: self.path_pending,
            pending_ticket: self.pending_ticket,
            last_path_request: self.last_path_request,
            route_target: self.route_target,
            last_attack: self.last_attack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zombie_at(position: Point) -> Hostile {
        Hostile::new(HostileId::new(0), MobKind::Zombie, position, 1)
    }

    #[test]
    fn second_request_is_rejected_while_one_is_pending() {
        let mut hostile = zombie_at(Point::new(19.0, 19.0));
        let target = Point::new(57.0, 19.0);

        assert!(hostile.mark_path_pending(PathTicket::new(1), target, Duration::ZERO));
        assert!(!hostile.mark_path_pending(PathTicket::new(2), target, Duration::ZERO));
        assert_eq!(hostile.snapshot().pending_ticket, Some(PathTicket::new(1)));

        hostile.install_path(None);
        assert!(!hostile.snapshot().path_pending);
        assert_eq!(hostile.snapshot().phase, HostilePhase::Seeking);
    }

    #[test]
    fn mid_step_install_drops_the_first_waypoint() {
        let mut hostile = zombie_at(Point::new(19.0, 19.0));
        hostile.install_path(Some(vec![Point::new(57.0, 19.0)]));
        assert!(hostile.steer(Point::new(57.0, 19.0), Velocity::new(70.0, 0.0)));

        hostile.install_path(Some(vec![Point::new(57.0, 19.0), Point::new(57.0, 57.0)]));

        let snapshot = hostile.snapshot();
        assert_eq!(snapshot.upcoming_waypoint, Some(Point::new(57.0, 57.0)));
        assert_eq!(snapshot.queued_waypoints, 1);
    }

    #[test]
    fn route_from_the_entered_tile_is_kept_whole() {
        let mut hostile = zombie_at(Point::new(19.0, 19.0));
        hostile.install_path(Some(vec![Point::new(57.0, 19.0)]));
        assert!(hostile.steer(Point::new(57.0, 19.0), Velocity::new(70.0, 0.0)));
        for _ in 0..3 {
            hostile.integrate(Duration::from_millis(125));
        }
        assert_eq!(hostile.snapshot().position, Point::new(45.25, 19.0));
        assert_eq!(hostile.snapshot().next_waypoint, Some(Point::new(57.0, 19.0)));

        hostile.install_path(Some(vec![Point::new(57.0, 57.0), Point::new(57.0, 95.0)]));

        let snapshot = hostile.snapshot();
        assert_eq!(snapshot.upcoming_waypoint, Some(Point::new(57.0, 57.0)));
        assert_eq!(snapshot.queued_waypoints, 2);
    }

    #[test]
    fn arrival_snaps_each_axis_and_clears_the_waypoint() {
        let mut hostile = zombie_at(Point::new(19.0, 19.0));
        hostile.install_path(Some(vec![Point::new(57.0, 19.0)]));
        assert!(hostile.steer(Point::new(57.0, 19.0), Velocity::new(70.0, 0.0)));

        let dt = Duration::from_millis(100);
        for _ in 0..5 {
            hostile.integrate(dt);
        }
        let snapshot = hostile.snapshot();
        assert_eq!(snapshot.position, Point::new(57.0, 19.0));
        assert_eq!(snapshot.next_waypoint, None);
        assert_eq!(snapshot.velocity, Velocity::ZERO);
        assert_eq!(snapshot.phase, HostilePhase::Seeking);
    }

    #[test]
    fn lethal_damage_marks_the_hostile_dead() {
        let mut hostile = Hostile::new(HostileId::new(3), MobKind::Zombie, Point::default(), 3);
        assert!(!hostile.take_damage(2));
        assert!(hostile.take_damage(2));
        assert_eq!(hostile.snapshot().phase, HostilePhase::Dead);
    }
}

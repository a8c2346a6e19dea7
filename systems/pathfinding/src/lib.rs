#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Asynchronous route searches for hostiles.
//!
//! A [`Pathfinder`] owns a fixed pool of worker threads fed through a bounded
//! queue. Submitting a [`PathRequest`] never blocks: it either enqueues the
//! request and returns a [`RequestHandle`], or fails immediately with
//! [`SubmitError`]. Handles are polled each tick until their result lands.

mod astar;

use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use deltaworld_core::{tile_of_point, HostileId, PathTicket, Point, WallDescriptor};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use astar::{Connectivity, Heuristic, SearchOptions};

/// Waypoints from the step after the origin to the destination, or `None`
/// when no route exists.
pub type PathResult = Option<Vec<Point>>;

/// Immutable description of one route search.
#[derive(Clone, Debug)]
pub struct PathRequest {
    /// Entity the route is computed for.
    pub entity: HostileId,
    /// Where the route starts; may lie outside the map.
    pub origin: Point,
    /// Where the route should end.
    pub destination: Point,
    /// Walls in effect when the request was issued.
    pub obstacles: Arc<[WallDescriptor]>,
    /// Heuristic and connectivity of the search.
    pub options: SearchOptions,
}

/// Runs a route search on the calling thread.
///
/// An origin outside the map is clamped onto its nearest tile and that tile's
/// center becomes the first waypoint. A destination outside the map or on a
/// wall has no route.
#[must_use]
pub fn find_path(request: &PathRequest) -> PathResult {
    let obstacles = astar::ObstacleIndex::from_walls(&request.obstacles);
    let goal = tile_of_point(request.destination)?;
    let (start, entering) = match tile_of_point(request.origin) {
        Some(tile) => (tile, false),
        None => (astar::clamp_to_lattice(request.origin), true),
    };

    let nodes = astar::search(start, goal, &obstacles, request.options)?;
    let mut waypoints = Vec::with_capacity(nodes.len() + 1);
    if entering && start != goal {
        waypoints.push(astar::waypoint(start));
    }
    waypoints.extend(nodes.into_iter().map(astar::waypoint));
    Some(waypoints)
}

/// Sizing of the worker pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathfinderConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Requests that may wait in the queue before submissions are rejected.
    pub queue_capacity: usize,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            queue_capacity: 64,
        }
    }
}

/// Failures raised while starting the worker pool.
#[derive(Debug, Error)]
pub enum PathfinderError {
    /// The pool must have at least one worker.
    #[error("pathfinder requires at least one worker")]
    NoWorkers,
    /// The queue must hold at least one request.
    #[error("pathfinder queue capacity must be positive")]
    ZeroCapacity,
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn pathfinding worker {index}")]
    Spawn {
        /// Index of the worker that failed to start.
        index: usize,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Reasons a request was not accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The queue is at capacity; retry on a later tick.
    #[error("pathfinding queue is full")]
    QueueFull,
    /// Every worker has stopped.
    #[error("pathfinder has shut down")]
    ShutDown,
}

/// Outcome of polling a [`RequestHandle`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathPoll<'a> {
    /// The search has not finished yet.
    Pending,
    /// The search finished with the referenced result.
    Ready(&'a PathResult),
}

/// Receipt for a submitted request.
///
/// Polling is idempotent; the handle may be dropped at any time, in which
/// case the eventual result is discarded.
#[derive(Clone, Debug)]
pub struct RequestHandle {
    ticket: PathTicket,
    entity: HostileId,
    slot: Arc<OnceLock<PathResult>>,
}

impl RequestHandle {
    /// Ticket identifying the request.
    #[must_use]
    pub fn ticket(&self) -> PathTicket {
        self.ticket
    }

    /// Entity the request was issued for.
    #[must_use]
    pub fn entity(&self) -> HostileId {
        self.entity
    }

    /// Reports whether the result is available, without blocking.
    #[must_use]
    pub fn poll(&self) -> PathPoll<'_> {
        match self.slot.get() {
            Some(result) => PathPoll::Ready(result),
            None => PathPoll::Pending,
        }
    }
}

struct Job {
    ticket: PathTicket,
    request: PathRequest,
    slot: Arc<OnceLock<PathResult>>,
}

/// Owned pool of route-search workers.
#[derive(Debug)]
pub struct Pathfinder {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    next_ticket: AtomicU64,
}

impl Pathfinder {
    /// Starts the worker pool.
    pub fn new(config: PathfinderConfig) -> Result<Self, PathfinderError> {
        if config.workers == 0 {
            return Err(PathfinderError::NoWorkers);
        }
        if config.queue_capacity == 0 {
            return Err(PathfinderError::ZeroCapacity);
        }

        let (sender, receiver) = bounded::<Job>(config.queue_capacity);
        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let receiver = receiver.clone();
            let worker = thread::Builder::new()
                .name(format!("pathfinder-{index}"))
                .spawn(move || run_worker(index, receiver))
                .map_err(|source| PathfinderError::Spawn { index, source })?;
            workers.push(worker);
        }

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "pathfinder_started"
        );
        Ok(Self {
            sender: Some(sender),
            workers,
            next_ticket: AtomicU64::new(0),
        })
    }

    /// Enqueues a request without blocking.
    pub fn submit(&self, request: PathRequest) -> Result<RequestHandle, SubmitError> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(SubmitError::ShutDown);
        };

        let ticket = PathTicket::new(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        let entity = request.entity;
        let slot = Arc::new(OnceLock::new());
        let job = Job {
            ticket,
            request,
            slot: Arc::clone(&slot),
        };

        match sender.try_send(job) {
            Ok(()) => {
                debug!(ticket = ticket.get(), entity = entity.get(), "path_request_queued");
                Ok(RequestHandle {
                    ticket,
                    entity,
                    slot,
                })
            }
            Err(TrySendError::Full(_)) => Err(SubmitError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::ShutDown),
        }
    }

    /// Stops accepting requests and waits for the workers to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("pathfinding_worker_panicked");
            }
        }
    }
}

impl Drop for Pathfinder {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(index: usize, receiver: Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| find_path(&job.request)));
        let result = outcome.unwrap_or_else(|_| {
            warn!(
                worker = index,
                ticket = job.ticket.get(),
                "path_search_panicked"
            );
            None
        });
        if job.slot.set(result).is_err() {
            debug!(ticket = job.ticket.get(), "path_result_already_set");
        }
    }
    debug!(worker = index, "pathfinding_worker_stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use deltaworld_core::TileCoord;

    fn request(origin: Point, destination: Point) -> PathRequest {
        PathRequest {
            entity: HostileId::new(0),
            origin,
            destination,
            obstacles: Arc::from(Vec::new()),
            options: SearchOptions::default(),
        }
    }

    #[test]
    fn origins_outside_the_map_enter_through_the_nearest_tile() {
        let route = find_path(&request(
            Point::new(-38.0, 247.0),
            TileCoord::new(2, 6).center(),
        ))
        .expect("route exists");

        assert_eq!(
            route,
            vec![
                TileCoord::new(0, 6).center(),
                TileCoord::new(1, 6).center(),
                TileCoord::new(2, 6).center(),
            ]
        );
    }

    #[test]
    fn same_tile_route_is_the_destination_center() {
        let route = find_path(&request(Point::new(40.0, 40.0), Point::new(70.0, 50.0)));
        assert_eq!(route, Some(vec![Point::new(57.0, 57.0)]));
    }

    #[test]
    fn destinations_outside_the_map_have_no_route() {
        assert_eq!(
            find_path(&request(Point::new(40.0, 40.0), Point::new(-5.0, 50.0))),
            None
        );
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        assert!(matches!(
            Pathfinder::new(PathfinderConfig {
                workers: 0,
                queue_capacity: 4
            }),
            Err(PathfinderError::NoWorkers)
        ));
        assert!(matches!(
            Pathfinder::new(PathfinderConfig {
                workers: 1,
                queue_capacity: 0
            }),
            Err(PathfinderError::ZeroCapacity)
        ));
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Deltaworld simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative room, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the room executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

pub mod grid;
pub mod items;
pub mod mobs;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use grid::{
    filter_border_walls, tile_center_of_point, tile_of_point, Bounds, TileCoord, TileGrid,
    HALF_TILE, MAP_SIZE, TILES_PER_SIDE, TILE_SIZE,
};
pub use items::{ItemKind, Rarity};
pub use mobs::{AttackBehavior, MobKind};

/// Number of world units per second covered by one model speed unit.
pub const GLOBAL_SPEED_FACTOR: f32 = 140.0;

/// Converts a model speed into world units per second.
#[must_use]
pub fn speed_to_units(speed: f32) -> f32 {
    speed * GLOBAL_SPEED_FACTOR
}

/// Position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate, growing to the right.
    pub x: f32,
    /// Vertical coordinate, growing upward.
    pub y: f32,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the point displaced by the provided deltas.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Angle of the vector from `self` toward `other`, in degrees.
    ///
    /// 0° points along positive `x` and angles grow counterclockwise.
    #[must_use]
    pub fn angle_to(self, other: Point) -> f32 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }
}

/// Rate of change of a position, in world units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    /// Horizontal component.
    pub dx: f32,
    /// Vertical component.
    pub dy: f32,
}

impl Velocity {
    /// Velocity that keeps an entity in place.
    pub const ZERO: Velocity = Velocity { dx: 0.0, dy: 0.0 };

    /// Creates a new velocity from its components.
    #[must_use]
    pub const fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    /// Velocity of the given magnitude pointing at `angle_degrees`.
    #[must_use]
    pub fn from_angle(speed: f32, angle_degrees: f32) -> Self {
        let radians = angle_degrees.to_radians();
        Self::new(speed * radians.cos(), speed * radians.sin())
    }

    /// Reports whether both components are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Unique identifier assigned to a hostile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostileId(u32);

impl HostileId {
    /// Creates a new hostile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a loot pickup lying in the room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PickupId(u32);

impl PickupId {
    /// Creates a new pickup identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Ticket identifying one submitted pathfinding request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathTicket(u64);

impl PathTicket {
    /// Creates a new ticket with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the ticket.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Plain-data description of one wall segment taken from the tilemap.
///
/// Descriptors never reference renderable resources so they can be copied
/// freely into pathfinding workers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WallDescriptor {
    /// Identifier of the texture the segment is drawn with.
    pub texture: String,
    /// Scale applied to the tile-sized segment.
    pub scale: f32,
    /// Center of the segment in world units.
    pub position: Point,
    /// Rotation of the segment in degrees.
    pub rotation: f32,
}

impl WallDescriptor {
    /// Creates a tile-sized, unrotated wall segment centered at `position`.
    #[must_use]
    pub fn new(texture: impl Into<String>, position: Point) -> Self {
        Self {
            texture: texture.into(),
            scale: 1.0,
            position,
            rotation: 0.0,
        }
    }

    /// Overrides the scale of the segment.
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Square footprint covered by the segment.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::centered(self.position, TILE_SIZE * self.scale / 2.0)
    }

    /// Tiles whose centers lie inside the footprint of the segment.
    pub fn covered_tiles(&self) -> impl Iterator<Item = TileCoord> {
        let bounds = self.bounds();
        let span = |low: f32, high: f32| {
            let first = (low / TILE_SIZE - 0.5).ceil().max(0.0) as u32;
            let end = ((high / TILE_SIZE - 0.5).ceil().max(0.0) as u32).min(TILES_PER_SIDE);
            first..end
        };
        let columns = span(bounds.left, bounds.right());
        let rows = span(bounds.bottom, bounds.top());
        rows.flat_map(move |row| columns.clone().map(move |column| TileCoord::new(column, row)))
    }
}

/// Difficulty selected for the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Resurrection coins may drop as loot.
    #[default]
    Normal,
    /// Resurrection coins never drop.
    Hard,
}

/// Permanent upgrade tracks available to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeSlot {
    /// Raises movement speed.
    Armor,
    /// Raises fire rate and penetration.
    Gun,
    /// Raises damage.
    Ammo,
}

/// Four directional flags describing held movement or aim inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectionalIntent {
    /// Upward input held.
    pub up: bool,
    /// Downward input held.
    pub down: bool,
    /// Leftward input held.
    pub left: bool,
    /// Rightward input held.
    pub right: bool,
}

impl DirectionalIntent {
    /// Resolves the held inputs into one of eight angles in degrees.
    ///
    /// Opposing inputs cancel each other; no net input yields `None`.
    #[must_use]
    pub fn angle(&self) -> Option<f32> {
        let horizontal = i8::from(self.right) - i8::from(self.left);
        let vertical = i8::from(self.up) - i8::from(self.down);
        let angle = match (horizontal, vertical) {
            (0, 0) => return None,
            (1, 0) => 0.0,
            (1, 1) => 45.0,
            (0, 1) => 90.0,
            (-1, 1) => 135.0,
            (-1, 0) => 180.0,
            (-1, -1) => 225.0,
            (0, -1) => 270.0,
            _ => 315.0,
        };
        Some(angle)
    }
}

/// Party that fired a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectileOwner {
    /// Fired by the player; damages hostiles.
    Player,
    /// Fired by a hostile; lethal to the player.
    Hostile(HostileId),
}

/// Reason a projectile left the room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectileFate {
    /// Left the playfield bounds.
    OutOfBounds,
    /// Stopped by a wall tile.
    Wall,
    /// Ran out of penetration after hitting a hostile.
    Spent,
    /// Struck the player.
    HitPlayer,
    /// Removed while the room was cleared.
    Cleared,
}

/// Reward lying on the floor after a hostile died.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Loot {
    /// A temporary item.
    Item(ItemKind),
    /// One extra continue.
    ResurrectionCoin,
}

/// Lifecycle phase of a hostile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostilePhase {
    /// Entered the room and has not received its first route yet.
    Spawning,
    /// Has no waypoint to walk to.
    Seeking,
    /// Walking toward its next waypoint.
    Following,
    /// Triggered its attack during the current tick.
    Attacking,
    /// Health dropped below one; removed at the end of the tick.
    Dead,
}

/// How an encounter ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncounterOutcome {
    /// Every wave was spawned and every hostile defeated.
    Cleared,
    /// The player died without a resurrection coin.
    Defeated,
}

/// Commands that express all permissible room mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Installs the room's wall layout and clears every entity.
    ConfigureRoom {
        /// Wall segments taken from the tilemap, border included.
        walls: Vec<WallDescriptor>,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Replaces the player's held movement inputs.
    SetMovementIntent {
        /// Movement inputs currently held.
        intent: DirectionalIntent,
    },
    /// Replaces the player's held aim inputs.
    SetAimIntent {
        /// Aim inputs currently held.
        intent: DirectionalIntent,
    },
    /// Activates the item the player is holding, if any.
    UseStoredItem,
    /// Raises the level of one upgrade track by one.
    ApplyUpgrade {
        /// Track to raise.
        slot: UpgradeSlot,
    },
    /// Spawns a hostile at the provided position.
    SpawnHostile {
        /// Kind of hostile to create.
        kind: MobKind,
        /// Initial position, usually outside the playfield.
        position: Point,
        /// Starting health.
        hp: u32,
    },
    /// Launches a projectile.
    SpawnProjectile {
        /// Party the projectile belongs to.
        owner: ProjectileOwner,
        /// Starting position.
        position: Point,
        /// Travel velocity.
        velocity: Velocity,
        /// Damage dealt per hit.
        damage: u32,
        /// Number of hostiles the projectile may still damage.
        penetration: u32,
    },
    /// Records that a route was requested for the hostile.
    MarkPathPending {
        /// Hostile awaiting the route.
        hostile: HostileId,
        /// Ticket returned by the pathfinder.
        ticket: PathTicket,
        /// Tile center the route leads to.
        target: Point,
    },
    /// Delivers the outcome of the hostile's pending route request.
    InstallPath {
        /// Hostile that requested the route.
        hostile: HostileId,
        /// Waypoints after the origin, or `None` when no route exists.
        path: Option<Vec<Point>>,
    },
    /// Starts walking the hostile toward the head of its path queue.
    SteerHostile {
        /// Hostile to steer.
        hostile: HostileId,
        /// Waypoint taken from the head of the queue.
        waypoint: Point,
        /// Velocity toward the waypoint.
        velocity: Velocity,
    },
    /// Records that the hostile triggered its attack.
    RecordAttack {
        /// Hostile that attacked.
        hostile: HostileId,
    },
    /// Signals that no further waves will be spawned in this room.
    CompleteEncounter,
}

/// Events broadcast by the room after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a new wall layout was installed.
    RoomConfigured,
    /// Confirms that a hostile entered the room.
    HostileSpawned {
        /// Identifier assigned to the hostile.
        hostile: HostileId,
        /// Kind of the hostile.
        kind: MobKind,
        /// Position the hostile spawned at.
        position: Point,
    },
    /// Reports that a hostile lost health.
    HostileDamaged {
        /// Hostile that was hit.
        hostile: HostileId,
        /// Health removed by the hit.
        damage: u32,
        /// Health left after the hit.
        remaining_hp: u32,
    },
    /// Reports that a hostile died and was removed.
    HostileDied {
        /// Hostile that died.
        hostile: HostileId,
        /// Position the hostile died at.
        position: Point,
    },
    /// Confirms that a projectile was launched.
    ProjectileFired {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Party that fired it.
        owner: ProjectileOwner,
    },
    /// Reports that a projectile left the room.
    ProjectileDestroyed {
        /// Projectile that was removed.
        projectile: ProjectileId,
        /// Reason for the removal.
        fate: ProjectileFate,
    },
    /// Reports that a hostile dropped loot.
    LootDropped {
        /// Identifier assigned to the pickup.
        pickup: PickupId,
        /// Reward lying on the floor.
        loot: Loot,
        /// Position of the pickup.
        position: Point,
    },
    /// Reports that a pickup disappeared before being collected.
    LootExpired {
        /// Pickup that expired.
        pickup: PickupId,
    },
    /// Reports that the player collected a pickup.
    LootCollected {
        /// Pickup that was collected.
        pickup: PickupId,
        /// Reward granted.
        loot: Loot,
    },
    /// Reports that an item became active.
    ItemActivated {
        /// Item that was activated.
        kind: ItemKind,
    },
    /// Reports that an active item ran out.
    ItemExpired {
        /// Item that expired.
        kind: ItemKind,
    },
    /// Confirms that an upgrade track was raised.
    UpgradeApplied {
        /// Track that was raised.
        slot: UpgradeSlot,
        /// New level of the track.
        level: u32,
    },
    /// Reports that the player was killed.
    PlayerDied {
        /// Whether a resurrection coin was consumed to continue.
        resurrected: bool,
        /// Coins left after the death was handled.
        coins_left: u32,
    },
    /// Reports that every hostile and projectile was removed from the room.
    RoomCleared,
    /// Reports that the player regained control after a resurrection.
    PlayerResumed,
    /// Reports that the encounter is over.
    EncounterEnded {
        /// How the encounter ended.
        outcome: EncounterOutcome,
    },
}

/// Immutable representation of a single hostile's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct HostileSnapshot {
    /// Unique identifier assigned to the hostile.
    pub id: HostileId,
    /// Kind of the hostile.
    pub kind: MobKind,
    /// Current lifecycle phase.
    pub phase: HostilePhase,
    /// Current position.
    pub position: Point,
    /// Current velocity.
    pub velocity: Velocity,
    /// Health left.
    pub hp: u32,
    /// Waypoint currently walked toward.
    pub next_waypoint: Option<Point>,
    /// Head of the path queue, taken once the current waypoint is reached.
    pub upcoming_waypoint: Option<Point>,
    /// Number of waypoints left in the path queue.
    pub queued_waypoints: usize,
    /// Whether a route request is outstanding.
    pub path_pending: bool,
    /// Ticket of the outstanding route request.
    pub pending_ticket: Option<PathTicket>,
    /// Room time of the most recent route request.
    pub last_path_request: Option<Duration>,
    /// Tile center the most recent route request led to.
    pub route_target: Option<Point>,
    /// Room time of the most recent attack.
    pub last_attack: Option<Duration>,
}

impl HostileSnapshot {
    /// Reports whether the attack cooldown has elapsed at room time `now`.
    #[must_use]
    pub fn attack_ready(&self, now: Duration) -> bool {
        self.last_attack.map_or(true, |last| {
            now.saturating_sub(last) >= self.kind.attack_cooldown()
        })
    }

    /// Reports whether the hostile still has somewhere to walk.
    #[must_use]
    pub fn has_route(&self) -> bool {
        self.next_waypoint.is_some() || self.queued_waypoints > 0
    }
}

/// Read-only snapshot describing all hostiles within the room.
#[derive(Clone, Debug, Default)]
pub struct HostileView {
    snapshots: Vec<HostileSnapshot>,
}

impl HostileView {
    /// Creates a new hostile view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<HostileSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured hostile snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &HostileSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single hostile.
    #[must_use]
    pub fn get(&self, hostile: HostileId) -> Option<&HostileSnapshot> {
        self.snapshots
            .binary_search_by_key(&hostile, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of hostiles captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no hostile.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<HostileSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Current position.
    pub position: Point,
    /// Current velocity.
    pub velocity: Velocity,
    /// Whether hostiles currently lose track of the player.
    pub hidden: bool,
    /// Whether the player may move and shoot.
    pub can_move: bool,
    /// Whether lethal contact is currently ignored.
    pub invulnerable: bool,
    /// Armor upgrade level.
    pub armor: u32,
    /// Gun upgrade level.
    pub gun: u32,
    /// Ammo upgrade level.
    pub ammo: u32,
    /// Item held for later use.
    pub stored_item: Option<ItemKind>,
    /// Items currently in effect, in catalogue order.
    pub active_items: Vec<ItemKind>,
    /// Resurrection coins owned.
    pub resurrection_coins: u32,
}

/// Immutable representation of a loot pickup used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickupSnapshot {
    /// Identifier of the pickup.
    pub id: PickupId,
    /// Reward granted on collection.
    pub loot: Loot,
    /// Position of the pickup.
    pub position: Point,
    /// Whether the pickup is drawn this tick; toggles while about to expire.
    pub visible: bool,
    /// Time left before the pickup expires.
    pub remaining: Duration,
}

/// Resumable-run record handed to the save layer when a run is suspended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Identifier of the map the run continues on.
    pub map_id: String,
    /// Armor upgrade level.
    pub armor: u32,
    /// Gun upgrade level.
    pub gun: u32,
    /// Ammo upgrade level.
    pub ammo: u32,
    /// Item held for later use.
    pub stored_item: Option<ItemKind>,
    /// Resurrection coins owned.
    pub resurrection_coins: u32,
    /// Difficulty of the run.
    pub difficulty: Difficulty,
}

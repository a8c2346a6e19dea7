//! Tile grid model shared by the room, the pathfinder and the spawner.
//!
//! World coordinates grow to the right along `x` and upward along `y`. A tile
//! is identified by the floor-aligned origin of the square it covers, so a
//! point on a shared edge belongs to the tile on its right or above it.

use serde::{Deserialize, Serialize};

use crate::{Point, WallDescriptor};

/// Side length of a single square tile expressed in world units.
pub const TILE_SIZE: f32 = 38.0;

/// Side length of the square playfield expressed in world units.
pub const MAP_SIZE: f32 = 608.0;

/// Number of tiles laid out along each side of the playfield.
pub const TILES_PER_SIDE: u32 = 16;

/// Half of [`TILE_SIZE`], the distance between a tile origin and its center.
pub const HALF_TILE: f32 = TILE_SIZE / 2.0;

/// Location of a single tile expressed as column and row indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile, counted from the left edge.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile, counted from the bottom edge.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Lower-left corner of the tile in world units.
    #[must_use]
    pub fn origin(self) -> Point {
        Point::new(
            self.column as f32 * TILE_SIZE,
            self.row as f32 * TILE_SIZE,
        )
    }

    /// Center of the tile in world units.
    #[must_use]
    pub fn center(self) -> Point {
        self.origin().offset(HALF_TILE, HALF_TILE)
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }
}

/// Returns the tile containing the provided point, if it lies on the map.
#[must_use]
pub fn tile_of_point(point: Point) -> Option<TileCoord> {
    if !(0.0..MAP_SIZE).contains(&point.x) || !(0.0..MAP_SIZE).contains(&point.y) {
        return None;
    }

    let column = (point.x / TILE_SIZE).floor() as u32;
    let row = (point.y / TILE_SIZE).floor() as u32;
    Some(TileCoord::new(
        column.min(TILES_PER_SIDE - 1),
        row.min(TILES_PER_SIDE - 1),
    ))
}

/// Returns the center of the tile containing the provided point.
///
/// Points outside the playfield have no tile and yield `None`.
#[must_use]
pub fn tile_center_of_point(point: Point) -> Option<Point> {
    tile_of_point(point).map(TileCoord::center)
}

/// Axis-aligned rectangle described by its lower-left corner and size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// Leftmost `x` coordinate covered by the rectangle.
    pub left: f32,
    /// Lowest `y` coordinate covered by the rectangle.
    pub bottom: f32,
    /// Horizontal extent of the rectangle.
    pub width: f32,
    /// Vertical extent of the rectangle.
    pub height: f32,
}

impl Bounds {
    /// Creates a square rectangle centered on the provided point.
    #[must_use]
    pub fn centered(center: Point, half_extent: f32) -> Self {
        Self {
            left: center.x - half_extent,
            bottom: center.y - half_extent,
            width: half_extent * 2.0,
            height: half_extent * 2.0,
        }
    }

    /// Rightmost `x` coordinate covered by the rectangle.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    /// Highest `y` coordinate covered by the rectangle.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.bottom + self.height
    }

    /// Reports whether two rectangles share a region of positive area.
    #[must_use]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.bottom < other.top()
            && other.bottom < self.top()
    }

    /// Reports whether the rectangle lies entirely inside the playfield.
    #[must_use]
    pub fn inside_map(&self) -> bool {
        self.left >= 0.0 && self.bottom >= 0.0 && self.right() <= MAP_SIZE && self.top() <= MAP_SIZE
    }
}

/// Dense traversability grid covering the playfield.
#[derive(Clone, Debug, PartialEq)]
pub struct TileGrid {
    blocked: Vec<bool>,
}

impl TileGrid {
    /// Creates a grid in which every tile is traversable.
    #[must_use]
    pub fn open() -> Self {
        let side = TILES_PER_SIDE as usize;
        Self {
            blocked: vec![false; side * side],
        }
    }

    /// Builds a grid marking every tile covered by one of the provided walls.
    #[must_use]
    pub fn from_walls(walls: &[WallDescriptor]) -> Self {
        let mut grid = Self::open();
        for wall in walls {
            for tile in wall.covered_tiles() {
                grid.block(tile);
            }
        }
        grid
    }

    /// Marks the tile as impassable.
    pub fn block(&mut self, tile: TileCoord) {
        if let Some(index) = index(tile) {
            self.blocked[index] = true;
        }
    }

    /// Reports whether the tile may be walked on. Tiles off the map are not.
    #[must_use]
    pub fn is_traversable(&self, tile: TileCoord) -> bool {
        index(tile).map_or(false, |index| !self.blocked[index])
    }

    /// Enumerates the blocked tiles whose area overlaps the rectangle.
    pub fn blocked_tiles_overlapping(&self, bounds: &Bounds) -> impl Iterator<Item = TileCoord> + '_ {
        let range = |low: f32, high: f32| {
            let first = (low / TILE_SIZE).floor().max(0.0) as u32;
            let last = ((high / TILE_SIZE).ceil() as i64 - 1).clamp(-1, i64::from(TILES_PER_SIDE) - 1);
            (first, last)
        };
        let (first_column, last_column) = range(bounds.left, bounds.right());
        let (first_row, last_row) = range(bounds.bottom, bounds.top());

        (first_row..)
            .take_while(move |row| i64::from(*row) <= last_row)
            .flat_map(move |row| {
                (first_column..)
                    .take_while(move |column| i64::from(*column) <= last_column)
                    .map(move |column| TileCoord::new(column, row))
            })
            .filter(move |tile| !self.is_traversable(*tile))
    }

    /// Reports whether the rectangle overlaps any blocked tile.
    #[must_use]
    pub fn collides(&self, bounds: &Bounds) -> bool {
        self.blocked_tiles_overlapping(bounds).next().is_some()
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::open()
    }
}

/// Removes the wall segments that make up the playfield border.
///
/// A wall is considered part of the border when it lies entirely inside one of
/// the four margin strips of the given width and height. Interior walls are
/// returned in their original order.
#[must_use]
pub fn filter_border_walls(
    walls: &[WallDescriptor],
    border_width: f32,
    border_height: f32,
    map_width: f32,
    map_height: f32,
) -> Vec<WallDescriptor> {
    walls
        .iter()
        .filter(|wall| {
            let bounds = wall.bounds();
            let in_left = bounds.left >= 0.0 && bounds.right() <= border_width;
            let in_right = bounds.left >= map_width - border_width && bounds.right() <= map_width;
            let in_bottom = bounds.bottom >= 0.0 && bounds.top() <= border_height;
            let in_top = bounds.bottom >= map_height - border_height && bounds.top() <= map_height;
            !(in_left || in_right || in_bottom || in_top)
        })
        .cloned()
        .collect()
}

fn index(tile: TileCoord) -> Option<usize> {
    if tile.column() >= TILES_PER_SIDE || tile.row() >= TILES_PER_SIDE {
        return None;
    }
    let width = usize::try_from(TILES_PER_SIDE).ok()?;
    let row = usize::try_from(tile.row()).ok()?;
    let column = usize::try_from(tile.column()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}

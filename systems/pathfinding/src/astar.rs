//! A* over the tile lattice.
//!
//! The search runs on tile origins while walls are described by their
//! centers, so walls are indexed half a tile down and to the left of where
//! they are drawn. Finished routes are shifted back by half a tile so callers
//! receive tile-center waypoints.

use std::{cmp::Reverse, collections::BinaryHeap};

use deltaworld_core::{Point, TileCoord, WallDescriptor, HALF_TILE, TILES_PER_SIDE, TILE_SIZE};

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;
const NODE_COUNT: usize = (TILES_PER_SIDE * TILES_PER_SIDE) as usize;

/// Estimate used to order the open set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Heuristic {
    /// Sum of the axis distances.
    #[default]
    Manhattan,
    /// Largest axis distance.
    Chebyshev,
    /// Straight-line distance.
    Euclidean,
}

impl Heuristic {
    fn estimate(self, from: TileCoord, to: TileCoord) -> u32 {
        let dx = from.column().abs_diff(to.column());
        let dy = from.row().abs_diff(to.row());
        match self {
            Self::Manhattan => STRAIGHT_COST * (dx + dy),
            Self::Chebyshev => STRAIGHT_COST * dx.max(dy),
            Self::Euclidean => {
                let distance = f64::from(dx).hypot(f64::from(dy));
                let straight_line = (f64::from(STRAIGHT_COST) * distance).floor() as u32;
                straight_line.min(octile_cost(dx, dy))
            }
        }
    }
}

/// Cheapest 8-way cost between two nodes on an open grid. Integer step costs
/// make a diagonal slightly cheaper than `STRAIGHT_COST * sqrt(2)`, so the
/// straight-line estimate is capped by this value to stay a lower bound.
fn octile_cost(dx: u32, dy: u32) -> u32 {
    let diagonal = dx.min(dy);
    DIAGONAL_COST * diagonal + STRAIGHT_COST * (dx.max(dy) - diagonal)
}

/// Moves allowed between neighbouring tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connectivity {
    /// Horizontal and vertical steps only.
    #[default]
    Four,
    /// Diagonal steps as well, never cutting a blocked corner.
    Eight,
}

impl Connectivity {
    fn steps(self) -> &'static [(i32, i32)] {
        const FOUR: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
        const EIGHT: [(i32, i32); 8] = [
            (1, 0),
            (0, 1),
            (-1, 0),
            (0, -1),
            (1, 1),
            (-1, 1),
            (-1, -1),
            (1, -1),
        ];
        match self {
            Self::Four => &FOUR,
            Self::Eight => &EIGHT,
        }
    }
}

/// Tunables of a single route search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Estimate used to order the open set.
    pub heuristic: Heuristic,
    /// Moves allowed between neighbouring tiles.
    pub connectivity: Connectivity,
}

/// Blocked nodes of the search lattice, rebuilt for every request.
#[derive(Clone, Debug)]
pub(crate) struct ObstacleIndex {
    blocked: Vec<bool>,
}

impl ObstacleIndex {
    pub(crate) fn from_walls(walls: &[WallDescriptor]) -> Self {
        let mut blocked = vec![false; NODE_COUNT];
        for wall in walls {
            for tile in wall.covered_tiles() {
                let center = tile.center();
                let Some(node) = lattice_node(center.offset(-HALF_TILE, -HALF_TILE)) else {
                    continue;
                };
                if let Some(index) = node_index(node) {
                    blocked[index] = true;
                }
            }
        }
        Self { blocked }
    }

    pub(crate) fn is_open(&self, node: TileCoord) -> bool {
        node_index(node).map_or(false, |index| !self.blocked[index])
    }
}

/// Resolves a lattice point onto its node, rounding to absorb float error.
fn lattice_node(origin: Point) -> Option<TileCoord> {
    let column = (origin.x / TILE_SIZE).round();
    let row = (origin.y / TILE_SIZE).round();
    let limit = TILES_PER_SIDE as f32;
    if !(0.0..limit).contains(&column) || !(0.0..limit).contains(&row) {
        return None;
    }
    Some(TileCoord::new(column as u32, row as u32))
}

/// Nearest node to a point that may lie outside the map.
pub(crate) fn clamp_to_lattice(point: Point) -> TileCoord {
    let last = (TILES_PER_SIDE - 1) as f32;
    let column = (point.x / TILE_SIZE).floor().clamp(0.0, last);
    let row = (point.y / TILE_SIZE).floor().clamp(0.0, last);
    TileCoord::new(column as u32, row as u32)
}

/// Converts a lattice node back into the center of the tile it anchors.
pub(crate) fn waypoint(node: TileCoord) -> Point {
    node.origin().offset(HALF_TILE, HALF_TILE)
}

fn node_index(node: TileCoord) -> Option<usize> {
    if node.column() >= TILES_PER_SIDE || node.row() >= TILES_PER_SIDE {
        return None;
    }
    let width = usize::try_from(TILES_PER_SIDE).ok()?;
    let row = usize::try_from(node.row()).ok()?;
    let column = usize::try_from(node.column()).ok()?;
    Some(row * width + column)
}

fn neighbour(node: TileCoord, (dx, dy): (i32, i32)) -> Option<TileCoord> {
    let column = node.column().checked_add_signed(dx)?;
    let row = node.row().checked_add_signed(dy)?;
    let next = TileCoord::new(column, row);
    node_index(next).map(|_| next)
}

/// Searches for the cheapest node sequence from `start` to `goal`.
///
/// The returned nodes exclude `start` and end with `goal`. The start node is
/// expanded even when it is blocked so entities standing on a wall can leave.
pub(crate) fn search(
    start: TileCoord,
    goal: TileCoord,
    obstacles: &ObstacleIndex,
    options: SearchOptions,
) -> Option<Vec<TileCoord>> {
    let start_index = node_index(start)?;
    let goal_index = node_index(goal)?;
    if !obstacles.is_open(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![goal]);
    }

    let mut best_g = vec![u32::MAX; NODE_COUNT];
    let mut parent: Vec<Option<usize>> = vec![None; NODE_COUNT];
    let mut closed = vec![false; NODE_COUNT];
    let mut open = BinaryHeap::<(Reverse<u32>, Reverse<u32>, Reverse<TileCoord>)>::new();

    best_g[start_index] = 0;
    open.push((
        Reverse(options.heuristic.estimate(start, goal)),
        Reverse(0),
        Reverse(start),
    ));

    while let Some((_, Reverse(g_cost), Reverse(node))) = open.pop() {
        let Some(index) = node_index(node) else {
            continue;
        };
        if closed[index] {
            continue;
        }
        closed[index] = true;

        if index == goal_index {
            return Some(reconstruct(&parent, start_index, goal_index));
        }

        for &step in options.connectivity.steps() {
            let Some(next) = neighbour(node, step) else {
                continue;
            };
            if !obstacles.is_open(next) {
                continue;
            }
            let diagonal = step.0 != 0 && step.1 != 0;
            if diagonal {
                let side_a = neighbour(node, (step.0, 0));
                let side_b = neighbour(node, (0, step.1));
                let clear = |side: Option<TileCoord>| side.map_or(false, |tile| obstacles.is_open(tile));
                if !clear(side_a) || !clear(side_b) {
                    continue;
                }
            }

            let Some(next_index) = node_index(next) else {
                continue;
            };
            let step_cost = if diagonal { DIAGONAL_COST } else { STRAIGHT_COST };
            let tentative = g_cost.saturating_add(step_cost);
            if closed[next_index] || tentative >= best_g[next_index] {
                continue;
            }

            best_g[next_index] = tentative;
            parent[next_index] = Some(index);
            open.push((
                Reverse(tentative.saturating_add(options.heuristic.estimate(next, goal))),
                Reverse(tentative),
                Reverse(next),
            ));
        }
    }

    None
}

fn reconstruct(parent: &[Option<usize>], start_index: usize, goal_index: usize) -> Vec<TileCoord> {
    let width = TILES_PER_SIDE as usize;
    let mut nodes = Vec::new();
    let mut cursor = goal_index;
    while cursor != start_index {
        nodes.push(TileCoord::new((cursor % width) as u32, (cursor / width) as u32));
        let Some(previous) = parent[cursor] else {
            break;
        };
        cursor = previous;
    }
    nodes.reverse();
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walls_at(tiles: &[(u32, u32)]) -> ObstacleIndex {
        let walls: Vec<WallDescriptor> = tiles
            .iter()
            .map(|&(column, row)| WallDescriptor::new("wall", TileCoord::new(column, row).center()))
            .collect();
        ObstacleIndex::from_walls(&walls)
    }

    #[test]
    fn wall_centers_index_their_own_tile_origin() {
        let obstacles = walls_at(&[(3, 4)]);
        assert!(!obstacles.is_open(TileCoord::new(3, 4)));
        assert!(obstacles.is_open(TileCoord::new(4, 5)));
        assert_eq!(waypoint(TileCoord::new(3, 4)), Point::new(133.0, 171.0));
    }

    #[test]
    fn routes_detour_around_a_wall() {
        let obstacles = walls_at(&[(2, 0), (2, 1)]);
        let route = search(
            TileCoord::new(0, 0),
            TileCoord::new(4, 0),
            &obstacles,
            SearchOptions::default(),
        )
        .expect("route exists");

        assert_eq!(route.last(), Some(&TileCoord::new(4, 0)));
        assert!(route.iter().all(|node| obstacles.is_open(*node)));
        assert_eq!(route.len(), 8);
        for pair in route.windows(2) {
            assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
        }
    }

    #[test]
    fn diagonals_never_cut_blocked_corners() {
        let obstacles = walls_at(&[(1, 0)]);
        let options = SearchOptions {
            heuristic: Heuristic::Chebyshev,
            connectivity: Connectivity::Eight,
        };
        let route = search(TileCoord::new(0, 0), TileCoord::new(1, 1), &obstacles, options)
            .expect("route exists");

        assert_eq!(route, vec![TileCoord::new(0, 1), TileCoord::new(1, 1)]);
    }

    #[test]
    fn diagonal_moves_shorten_open_routes() {
        let options = SearchOptions {
            heuristic: Heuristic::Euclidean,
            connectivity: Connectivity::Eight,
        };
        let route = search(
            TileCoord::new(0, 0),
            TileCoord::new(3, 3),
            &walls_at(&[]),
            options,
        )
        .expect("route exists");

        assert_eq!(route.len(), 3);
    }

    #[test]
    fn euclidean_estimate_never_exceeds_the_octile_cost() {
        let origin = TileCoord::new(0, 0);
        for column in 0..TILES_PER_SIDE {
            for row in 0..TILES_PER_SIDE {
                let estimate = Heuristic::Euclidean.estimate(origin, TileCoord::new(column, row));
                assert!(estimate <= octile_cost(column, row), "({column}, {row})");
            }
        }
        assert_eq!(
            Heuristic::Euclidean.estimate(origin, TileCoord::new(5, 5)),
            70
        );
        assert_eq!(
            Heuristic::Euclidean.estimate(origin, TileCoord::new(3, 4)),
            50
        );
    }

    #[test]
    fn euclidean_search_finds_the_pure_diagonal_route() {
        let options = SearchOptions {
            heuristic: Heuristic::Euclidean,
            connectivity: Connectivity::Eight,
        };
        let route = search(
            TileCoord::new(0, 0),
            TileCoord::new(12, 12),
            &walls_at(&[]),
            options,
        )
        .expect("route exists");

        assert_eq!(route.len(), 12);
        for (step, node) in route.iter().enumerate() {
            let expected = step as u32 + 1;
            assert_eq!(*node, TileCoord::new(expected, expected));
        }
    }

    #[test]
    fn blocked_goal_has_no_route() {
        let obstacles = walls_at(&[(5, 5)]);
        assert_eq!(
            search(
                TileCoord::new(0, 0),
                TileCoord::new(5, 5),
                &obstacles,
                SearchOptions::default()
            ),
            None
        );
    }

    #[test]
    fn points_outside_the_map_clamp_to_the_nearest_node() {
        assert_eq!(clamp_to_lattice(Point::new(-38.0, 247.0)), TileCoord::new(0, 6));
        assert_eq!(clamp_to_lattice(Point::new(700.0, 700.0)), TileCoord::new(15, 15));
    }
}

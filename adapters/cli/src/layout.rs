//! ASCII wall layouts for headless runs.
//!
//! A layout is sixteen lines of sixteen characters. The first line is the
//! top row of the map; `#` marks a wall tile and `.` an open one.

use anyhow::{bail, ensure, Result};
use deltaworld_core::{TileCoord, WallDescriptor, TILES_PER_SIDE};
use deltaworld_system_wave_spawner::ENTRANCE_LANES;

const WALL_TEXTURE: &str = "wall";

/// Parses an ASCII layout into wall descriptors.
pub(crate) fn parse_layout(text: &str) -> Result<Vec<WallDescriptor>> {
    let rows: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();
    ensure!(
        rows.len() == TILES_PER_SIDE as usize,
        "layout must have {TILES_PER_SIDE} rows, found {}",
        rows.len()
    );

    let mut walls = Vec::new();
    for (line, row_text) in rows.iter().enumerate() {
        ensure!(
            row_text.chars().count() == TILES_PER_SIDE as usize,
            "layout row {} must have {TILES_PER_SIDE} columns",
            line + 1
        );
        let row = TILES_PER_SIDE - 1 - line as u32;
        for (column, symbol) in row_text.chars().enumerate() {
            match symbol {
                '#' => walls.push(wall_at(TileCoord::new(column as u32, row))),
                '.' => {}
                other => bail!("unexpected symbol `{other}` in layout row {}", line + 1),
            }
        }
    }
    Ok(walls)
}

/// Border ring open at the entrance lanes, with four pillars.
pub(crate) fn default_layout() -> Vec<WallDescriptor> {
    let last = TILES_PER_SIDE - 1;
    let mut walls = Vec::new();
    for index in 0..TILES_PER_SIDE {
        if ENTRANCE_LANES.contains(&index) {
            continue;
        }
        for tile in [
            TileCoord::new(index, 0),
            TileCoord::new(index, last),
            TileCoord::new(0, index),
            TileCoord::new(last, index),
        ] {
            if !walls.contains(&tile) {
                walls.push(tile);
            }
        }
    }
    walls.extend([
        TileCoord::new(4, 4),
        TileCoord::new(11, 4),
        TileCoord::new(4, 11),
        TileCoord::new(11, 11),
    ]);
    walls.into_iter().map(wall_at).collect()
}

fn wall_at(tile: TileCoord) -> WallDescriptor {
    WallDescriptor::new(WALL_TEXTURE, tile.center())
}

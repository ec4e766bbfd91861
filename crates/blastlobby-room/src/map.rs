//! Procedural arena generation.
//!
//! The arena is a 13 × 15 grid. The outer ring and every cell where both
//! row and column are even are permanent walls; the remaining cells are
//! destructible blocks with probability 0.6. The three cells at each
//! spawn corner are always cleared so nobody spawns boxed in.

use blastlobby_protocol::{GameMap, Tile};
use rand::Rng;

pub const MAP_ROWS: usize = 13;
pub const MAP_COLS: usize = 15;

/// Chance that an open interior cell becomes a destructible block.
pub const DESTRUCTIBLE_PROBABILITY: f64 = 0.6;

/// `(row, col)` cells forced empty: each spawn corner plus its two
/// orthogonal neighbours.
pub const SAFE_ZONE: [(usize, usize); 12] = [
    (1, 1),
    (1, 2),
    (2, 1),
    (1, MAP_COLS - 2),
    (1, MAP_COLS - 3),
    (2, MAP_COLS - 2),
    (MAP_ROWS - 2, 1),
    (MAP_ROWS - 2, 2),
    (MAP_ROWS - 3, 1),
    (MAP_ROWS - 2, MAP_COLS - 2),
    (MAP_ROWS - 2, MAP_COLS - 3),
    (MAP_ROWS - 3, MAP_COLS - 2),
];

/// Generates a fresh arena using the thread-local RNG.
pub fn generate_map() -> GameMap {
    generate_map_with(&mut rand::rng())
}

/// Generates an arena drawing randomness from `rng`.
pub fn generate_map_with<R: Rng>(rng: &mut R) -> GameMap {
    let mut map = GameMap::filled(MAP_ROWS, MAP_COLS, Tile::Empty);

    for row in 0..MAP_ROWS {
        for col in 0..MAP_COLS {
            if is_permanent_wall(row, col) {
                map.set(row, col, Tile::Wall);
            } else if rng.random_bool(DESTRUCTIBLE_PROBABILITY) {
                map.set(row, col, Tile::Destructible);
            }
        }
    }

    for (row, col) in SAFE_ZONE {
        map.set(row, col, Tile::Empty);
    }

    map
}

fn is_permanent_wall(row: usize, col: usize) -> bool {
    row == 0
        || row == MAP_ROWS - 1
        || col == 0
        || col == MAP_COLS - 1
        || (row % 2 == 0 && col % 2 == 0)
}

//! Room configuration and status.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Tunables shared by every room a manager creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum registered players per room.
    pub capacity: usize,

    /// Countdown length once the room is at capacity.
    pub full_room_countdown_secs: i32,

    /// Countdown length while the room has 1 to `capacity - 1` players.
    pub small_room_countdown_secs: i32,

    /// Time between countdown ticks.
    pub tick_interval: Duration,

    /// Pixel size of one map cell; spawn cells are scaled by this.
    pub cell_size: i32,

    /// Spawn cells as `(col, row)`, handed out in registration order.
    pub spawn_cells: Vec<(i32, i32)>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            full_room_countdown_secs: 10,
            small_room_countdown_secs: 0,
            tick_interval: Duration::from_secs(1),
            cell_size: 50,
            spawn_cells: vec![(1, 1), (13, 11), (13, 1), (1, 11)],
        }
    }
}

impl RoomConfig {
    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// - `capacity` is at least 1 and never exceeds the number of spawn cells.
    /// - `tick_interval` is never zero.
    pub fn validated(mut self) -> Self {
        if self.spawn_cells.is_empty() {
            tracing::warn!("no spawn cells configured, using defaults");
            self.spawn_cells = Self::default().spawn_cells;
        }
        if self.capacity > self.spawn_cells.len() {
            tracing::warn!(
                capacity = self.capacity,
                spawn_cells = self.spawn_cells.len(),
                "capacity exceeds spawn cells, clamping"
            );
            self.capacity = self.spawn_cells.len();
        }
        self.capacity = self.capacity.max(1);
        if self.tick_interval.is_zero() {
            self.tick_interval = Duration::from_millis(1);
        }
        self
    }

    /// Pixel coordinates of the `slot`-th spawn point.
    pub fn spawn_position(&self, slot: usize) -> (i32, i32) {
        let (col, row) = self.spawn_cells[slot % self.spawn_cells.len()];
        (col * self.cell_size, row * self.cell_size)
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lifecycle status of a room.
///
/// Only ever moves forward, and only when the countdown expires:
///
/// ```text
/// Waiting → InGame
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
}

impl RoomStatus {
    /// Returns `true` if the room may still admit players.
    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::Waiting)
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::InGame => write!(f, "InGame"),
        }
    }
}

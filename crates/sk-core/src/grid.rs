use std::fmt;

use serde::{Deserialize, Serialize};

/// Horizontal offsets of the 8 neighbors, row by row: NW, N, NE, W, E, SW, S, SE.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// An integer block position. `y` is the vertical axis; `z` grows southward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridPos {
    /// East-west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North-south coordinate.
    pub z: i32,
}

impl GridPos {
    /// Create a position from its three coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The position shifted by the given deltas.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The position directly underneath.
    pub const fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The 8 cells surrounding this one on the same layer, in NW..SE row order.
    pub fn horizontal_neighbors(self) -> impl Iterator<Item = GridPos> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |&(dx, dz)| self.offset(dx, 0, dz))
    }

    /// Squared Euclidean distance. Exact, and orders the same as [`GridPos::distance`].
    pub fn distance_squared(self, other: GridPos) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        let dz = i64::from(self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance.
    pub fn distance(self, other: GridPos) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }

    /// Chebyshev (king-move) distance across all three axes.
    pub fn chebyshev(self, other: GridPos) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let dz = self.z.abs_diff(other.z);
        dx.max(dy).max(dz)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

//! Tile edge directions and axes.

use crate::geom::Point;
use std::fmt;

/// One of the four tile edges, and the direction of travel through it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dir {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Dir {
    /// All directions, clockwise from north.
    pub const ALL: [Dir; 4] = [Dir::North, Dir::East, Dir::South, Dir::West];

    /// Index in 0..4, clockwise from north.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Direction for an index; wraps modulo 4.
    #[inline]
    pub const fn from_index(i: usize) -> Self {
        match i % 4 {
            0 => Dir::North,
            1 => Dir::East,
            2 => Dir::South,
            _ => Dir::West,
        }
    }

    /// Unit offset of the neighbouring tile in this direction.
    #[inline]
    pub const fn offset(self) -> Point {
        match self {
            Dir::North => Point::new(0, -1),
            Dir::East => Point::new(1, 0),
            Dir::South => Point::new(0, 1),
            Dir::West => Point::new(-1, 0),
        }
    }

    /// The opposite direction.
    #[inline]
    pub const fn reverse(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    /// Axis this direction travels along.
    #[inline]
    pub const fn axis(self) -> Axis {
        match self {
            Dir::East | Dir::West => Axis::X,
            Dir::North | Dir::South => Axis::Y,
        }
    }

    /// The neighbouring tile of `p` in this direction.
    #[inline]
    pub const fn step(self, p: Point) -> Point {
        let o = self.offset();
        p.shift(o.x, o.y)
    }

    /// Direction pointing from `from` to an orthogonally aligned `to`.
    ///
    /// Returns `None` when the points coincide or are not on a common row
    /// or column.
    pub fn between(from: Point, to: Point) -> Option<Self> {
        let d = to - from;
        match (d.x.signum(), d.y.signum()) {
            (0, -1) => Some(Dir::North),
            (1, 0) => Some(Dir::East),
            (0, 1) => Some(Dir::South),
            (-1, 0) => Some(Dir::West),
            _ => None,
        }
    }

    /// Parse a single-letter direction name (`N`, `E`, `S`, `W`).
    pub fn from_char(ch: char) -> Option<Self> {
        match ch.to_ascii_uppercase() {
            'N' => Some(Dir::North),
            'E' => Some(Dir::East),
            'S' => Some(Dir::South),
            'W' => Some(Dir::West),
            _ => None,
        }
    }
}

impl fmt::Display for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dir::North => "north",
            Dir::East => "east",
            Dir::South => "south",
            Dir::West => "west",
        };
        f.write_str(s)
    }
}

/// Horizontal (X, west–east) or vertical (Y, north–south) axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// The two directions along this axis, positive first.
    #[inline]
    pub const fn dirs(self) -> [Dir; 2] {
        match self {
            Axis::X => [Dir::East, Dir::West],
            Axis::Y => [Dir::South, Dir::North],
        }
    }

    /// The perpendicular axis.
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

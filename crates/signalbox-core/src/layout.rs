//! Railway maps drawn as ASCII art.
//!
//! A [`Layout`] holds a rectangular block of text, one character per tile.
//! A [`Legend`] maps characters to [`TileSpec`]s and [`Layout::build`]
//! turns the text into a [`RailMap`].
//!
//! The standard legend:
//!
//! | char | tile |
//! |---|---|
//! | `.` or space | clear |
//! | `-` `\|` | horizontal, vertical straight |
//! | `+` | both straights (diamond crossing) |
//! | `*` | all six tracks |
//! | `L` `J` `7` `r` | corner north–east, north–west, south–west, south–east |
//! | `=` `#` | level crossing with rail along X, along Y |
//! | `<` `>` `^` `v` | depot with entrance west, east, north, south |
//! | `0`–`9` except `7` | station platform (id = digit) along X |
//! | `(` `)` | tunnel portal leading east, west |
//! | `n` `u` | tunnel portal leading south, north |
//! | `[` `]` | bridge ramp leading east, west |

use crate::direction::{Axis, Dir};
use crate::geom::Point;
use crate::map::{MapError, RailMap};
use crate::tile::RailType;
use crate::track::TrackBits;
use std::collections::HashMap;

/// What a layout character stands for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TileSpec {
    Clear,
    Tracks(TrackBits),
    Crossing(Axis),
    /// Depot with its entrance on the given edge.
    Depot(Dir),
    Station { id: u16, axis: Axis },
    Waypoint { id: u16, axis: Axis },
    /// Tunnel portal or bridge ramp; `dir` points towards the other head.
    Head { dir: Dir, bridge: bool },
}

/// Character to [`TileSpec`] mapping.
#[derive(Clone, Debug)]
pub struct Legend {
    entries: HashMap<char, TileSpec>,
    rail_type: RailType,
}

impl Legend {
    /// A legend with no entries.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            rail_type: RailType::RAIL,
        }
    }

    /// The standard legend described in the module documentation.
    pub fn standard() -> Self {
        let mut l = Self::empty();
        let entries = [
            ('.', TileSpec::Clear),
            (' ', TileSpec::Clear),
            ('-', TileSpec::Tracks(TrackBits::HORIZONTAL)),
            ('|', TileSpec::Tracks(TrackBits::VERTICAL)),
            ('+', TileSpec::Tracks(TrackBits::CROSS)),
            ('*', TileSpec::Tracks(TrackBits::ALL)),
            ('L', TileSpec::Tracks(TrackBits::NORTH_EAST)),
            ('J', TileSpec::Tracks(TrackBits::NORTH_WEST)),
            ('7', TileSpec::Tracks(TrackBits::SOUTH_WEST)),
            ('r', TileSpec::Tracks(TrackBits::SOUTH_EAST)),
            ('=', TileSpec::Crossing(Axis::X)),
            ('#', TileSpec::Crossing(Axis::Y)),
            ('<', TileSpec::Depot(Dir::West)),
            ('>', TileSpec::Depot(Dir::East)),
            ('^', TileSpec::Depot(Dir::North)),
            ('v', TileSpec::Depot(Dir::South)),
            ('(', TileSpec::Head { dir: Dir::East, bridge: false }),
            (')', TileSpec::Head { dir: Dir::West, bridge: false }),
            ('n', TileSpec::Head { dir: Dir::South, bridge: false }),
            ('u', TileSpec::Head { dir: Dir::North, bridge: false }),
            ('[', TileSpec::Head { dir: Dir::East, bridge: true }),
            (']', TileSpec::Head { dir: Dir::West, bridge: true }),
        ];
        l.entries.extend(entries);
        // '7' is a corner; station digits take the remaining ones.
        for d in (0..=9u16).filter(|&d| d != 7) {
            if let Some(ch) = char::from_digit(d as u32, 10) {
                l.entries.insert(ch, TileSpec::Station { id: d, axis: Axis::X });
            }
        }
        l
    }

    /// Add or replace an entry.
    pub fn with(mut self, ch: char, spec: TileSpec) -> Self {
        self.entries.insert(ch, spec);
        self
    }

    /// Rail type given to every railway tile.
    pub fn rail_type(mut self, rail_type: RailType) -> Self {
        self.rail_type = rail_type;
        self
    }

    pub fn get(&self, ch: char) -> Option<TileSpec> {
        self.entries.get(&ch).copied()
    }
}

impl Default for Legend {
    fn default() -> Self {
        Self::standard()
    }
}

/// Errors from parsing or building a layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout line {line} has width {width}, expected {expected}")]
    InconsistentSize {
        line: usize,
        width: usize,
        expected: usize,
    },
    #[error("unknown layout character {ch:?} at {pos}")]
    UnknownChar { ch: char, pos: Point },
    #[error("tunnel or bridge head at {pos} has no matching head")]
    UnpairedHead { pos: Point },
    #[error(transparent)]
    Map(#[from] MapError),
}

/// A rectangular block of layout text.
#[derive(Clone, Debug)]
pub struct Layout {
    rows: Vec<Vec<char>>,
    size: Point,
}

impl Layout {
    /// Parse layout text. Blank leading and trailing lines are ignored;
    /// every other line must have the same width.
    pub fn new(s: &str) -> Result<Self, LayoutError> {
        let s = s.trim_matches(|c| c == '\n' || c == '\r');
        let rows: Vec<Vec<char>> = s
            .lines()
            .map(|l| l.trim_end_matches('\r').chars().collect())
            .collect();
        let expected = rows.first().map_or(0, |r| r.len());
        for (line, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(LayoutError::InconsistentSize {
                    line,
                    width: row.len(),
                    expected,
                });
            }
        }
        let size = Point::new(expected as i32, rows.len() as i32);
        Ok(Self { rows, size })
    }

    /// (width, height) in tiles.
    pub fn size(&self) -> Point {
        self.size
    }

    pub fn at(&self, p: Point) -> Option<char> {
        if p.x < 0 || p.y < 0 {
            return None;
        }
        self.rows
            .get(p.y as usize)
            .and_then(|r| r.get(p.x as usize))
            .copied()
    }

    /// Call `f` for every tile, row by row.
    pub fn iter(&self, mut f: impl FnMut(Point, char)) {
        for (y, row) in self.rows.iter().enumerate() {
            for (x, &ch) in row.iter().enumerate() {
                f(Point::new(x as i32, y as i32), ch);
            }
        }
    }

    /// Build a map from the layout.
    pub fn build(&self, legend: &Legend) -> Result<RailMap, LayoutError> {
        let mut specs = Vec::with_capacity((self.size.x * self.size.y).max(0) as usize);
        let mut unknown = None;
        self.iter(|pos, ch| match legend.get(ch) {
            Some(spec) => specs.push((pos, spec)),
            None => {
                unknown.get_or_insert(LayoutError::UnknownChar { ch, pos });
            }
        });
        if let Some(err) = unknown {
            return Err(err);
        }

        let rt = legend.rail_type;
        let mut map = RailMap::new(self.size.x, self.size.y);
        let mut heads = Vec::new();
        for &(p, spec) in &specs {
            match spec {
                TileSpec::Clear => {}
                TileSpec::Tracks(bits) => {
                    map.build_tracks(p, bits)?;
                    map.set_rail_type(p, rt)?;
                }
                TileSpec::Crossing(axis) => map.build_level_crossing(p, axis, rt)?,
                TileSpec::Depot(entrance) => map.build_depot(p, entrance, rt)?,
                TileSpec::Station { id, axis } => {
                    map.build_station(id, p, axis, 1, rt)?;
                }
                TileSpec::Waypoint { id, axis } => map.build_waypoint(p, id, axis, rt)?,
                TileSpec::Head { dir, bridge } => heads.push((p, dir, bridge)),
            }
        }

        // Pair each head with the nearest opposite head along its direction.
        let mut paired = vec![false; heads.len()];
        for i in 0..heads.len() {
            if paired[i] {
                continue;
            }
            let (p, dir, bridge) = heads[i];
            let mate = (0..heads.len())
                .filter(|&j| !paired[j] && j != i)
                .filter(|&j| {
                    let (q, qdir, qbridge) = heads[j];
                    qdir == dir.reverse() && qbridge == bridge && Dir::between(p, q) == Some(dir)
                })
                .min_by_key(|&j| {
                    let d = heads[j].0 - p;
                    d.x.abs() + d.y.abs()
                });
            let Some(j) = mate else {
                return Err(LayoutError::UnpairedHead { pos: p });
            };
            paired[i] = true;
            paired[j] = true;
            let q = heads[j].0;
            if bridge {
                map.build_bridge(p, q, rt)?;
            } else {
                map.build_tunnel(p, q, rt)?;
            }
        }
        Ok(map)
    }

    /// Parse and build with the standard legend.
    pub fn parse_map(s: &str) -> Result<RailMap, LayoutError> {
        Self::new(s)?.build(&Legend::standard())
    }
}

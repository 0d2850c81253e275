//! Per-tile railway data: [`Tile`], [`TileKind`], signals and rail types.

use crate::direction::{Axis, Dir};
use crate::geom::Point;
use crate::track::{Track, TrackBits, Trackdir};
use std::ops::{BitAnd, BitOr};

// ---------------------------------------------------------------------------
// RailType
// ---------------------------------------------------------------------------

/// Rail type of a tile (a small integer label).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RailType(pub u8);

impl RailType {
    pub const RAIL: Self = Self(0);
    pub const ELECTRIC: Self = Self(1);
    pub const MONORAIL: Self = Self(2);
    pub const MAGLEV: Self = Self(3);

    /// Single-bit set containing this type.
    #[inline]
    pub const fn mask(self) -> RailTypes {
        RailTypes(1 << (self.0 as u32 & 31))
    }
}

/// Set of rail types a vehicle may run on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RailTypes(pub u32);

impl RailTypes {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    #[inline]
    pub const fn has(self, rt: RailType) -> bool {
        self.0 & rt.mask().0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for RailTypes {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for RailTypes {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Slope
// ---------------------------------------------------------------------------

/// Inclination of a tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Slope {
    #[default]
    Flat,
    /// Rising towards the given edge.
    Up(Dir),
}

impl Slope {
    /// Whether running `td` over this slope climbs.
    #[inline]
    pub fn climbs(self, td: Trackdir) -> bool {
        match self {
            Slope::Flat => false,
            Slope::Up(dir) => td.is_straight() && td.exit() == dir,
        }
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Signal behaviour.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalType {
    /// Plain block signal.
    #[default]
    Block,
    /// Pre-signal entry.
    Entry,
    /// Pre-signal exit.
    Exit,
    /// Pre-signal combo (entry and exit).
    Combo,
    /// Two-way path signal; may be passed from the back.
    Pbs,
    /// One-way path signal.
    PbsOneWay,
}

impl SignalType {
    /// Path (reservation based) signal.
    #[inline]
    pub const fn is_pbs(self) -> bool {
        matches!(self, SignalType::Pbs | SignalType::PbsOneWay)
    }

    /// Whether the signal cannot be passed from its back.
    #[inline]
    pub const fn is_oneway(self) -> bool {
        !matches!(self, SignalType::Pbs)
    }
}

/// Aspect shown to a vehicle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalState {
    Red,
    Green,
}

/// Signals on one track of a tile.
///
/// Each of the track's two trackdirs may carry a signal facing vehicles
/// travelling that way; slots are indexed by [`Trackdir::is_reversed`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signal {
    pub kind: SignalType,
    pub present: [bool; 2],
    pub green: [bool; 2],
}

impl Signal {
    /// A signal facing `td` only, showing green.
    pub fn one_way(kind: SignalType, td: Trackdir) -> Self {
        let mut present = [false; 2];
        present[td.is_reversed() as usize] = true;
        Self {
            kind,
            present,
            green: [true; 2],
        }
    }

    /// Signals facing both directions, showing green.
    pub fn two_way(kind: SignalType) -> Self {
        Self {
            kind,
            present: [true; 2],
            green: [true; 2],
        }
    }

    /// Whether a signal faces vehicles travelling `td`.
    #[inline]
    pub fn faces(&self, td: Trackdir) -> bool {
        self.present[td.is_reversed() as usize]
    }

    /// Aspect shown to vehicles travelling `td`, if a signal faces them.
    #[inline]
    pub fn state(&self, td: Trackdir) -> Option<SignalState> {
        let i = td.is_reversed() as usize;
        if !self.present[i] {
            return None;
        }
        Some(if self.green[i] {
            SignalState::Green
        } else {
            SignalState::Red
        })
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// What occupies a tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TileKind {
    /// Outside the map.
    Void,
    /// No railway.
    #[default]
    Clear,
    /// Plain track.
    Rail,
    /// Level crossing with a road; the rail runs along `rail_axis`.
    Crossing { rail_axis: Axis },
    /// Rail depot; vehicles enter and leave through `entrance`.
    Depot { entrance: Dir },
    /// Station platform tile.
    Station { id: u16, axis: Axis },
    /// Waypoint tile.
    Waypoint { id: u16, axis: Axis },
    /// Tunnel portal or bridge ramp. `dir` points into the tunnel or onto
    /// the bridge, `far_end` is the other head.
    TunnelBridge { dir: Dir, far_end: Point, bridge: bool },
}

impl TileKind {
    /// Whether the tile carries rail at all.
    #[inline]
    pub const fn is_railway(self) -> bool {
        !matches!(self, TileKind::Void | TileKind::Clear)
    }

    #[inline]
    pub const fn is_depot(self) -> bool {
        matches!(self, TileKind::Depot { .. })
    }

    #[inline]
    pub const fn is_station(self) -> bool {
        matches!(self, TileKind::Station { .. })
    }

    #[inline]
    pub const fn is_waypoint(self) -> bool {
        matches!(self, TileKind::Waypoint { .. })
    }

    /// Station or waypoint id.
    #[inline]
    pub const fn station_id(self) -> Option<u16> {
        match self {
            TileKind::Station { id, .. } | TileKind::Waypoint { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Track implied by special tiles, or `None` for plain and empty tiles.
    pub const fn implicit_track(self) -> Option<Track> {
        match self {
            TileKind::Crossing { rail_axis } => Some(Track::along(rail_axis)),
            TileKind::Depot { entrance } => Some(Track::along(entrance.axis())),
            TileKind::Station { axis, .. } | TileKind::Waypoint { axis, .. } => {
                Some(Track::along(axis))
            }
            TileKind::TunnelBridge { dir, .. } => Some(Track::along(dir.axis())),
            _ => None,
        }
    }
}

/// Railway state of one tile.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub kind: TileKind,
    pub tracks: TrackBits,
    pub rail_type: RailType,
    pub slope: Slope,
    /// Signals per track, indexed by [`Track::index`].
    pub signals: [Option<Signal>; 6],
    /// Tracks currently reserved by a path.
    pub reserved: TrackBits,
    pub speed_limit: Option<u16>,
}

impl Tile {
    /// A tile of the given kind carrying its implicit track, if any.
    pub fn with_kind(kind: TileKind, rail_type: RailType) -> Self {
        Self {
            kind,
            tracks: kind
                .implicit_track()
                .map_or(TrackBits::NONE, |t| t.bits()),
            rail_type,
            ..Self::default()
        }
    }

    #[inline]
    pub fn signal(&self, track: Track) -> Option<&Signal> {
        self.signals[track.index()].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slope_climbs_only_straight_uphill() {
        let s = Slope::Up(Dir::East);
        assert!(s.climbs(Trackdir::WestToEast));
        assert!(!s.climbs(Trackdir::EastToWest));
        assert!(!s.climbs(Trackdir::NorthToEast));
        assert!(!Slope::Flat.climbs(Trackdir::WestToEast));
    }

    #[test]
    fn signal_faces_one_side() {
        let mut sig = Signal::one_way(SignalType::Block, Trackdir::WestToEast);
        assert!(sig.faces(Trackdir::WestToEast));
        assert!(!sig.faces(Trackdir::EastToWest));
        assert_eq!(sig.state(Trackdir::WestToEast), Some(SignalState::Green));
        sig.green[0] = false;
        assert_eq!(sig.state(Trackdir::WestToEast), Some(SignalState::Red));
        assert_eq!(sig.state(Trackdir::EastToWest), None);
    }

    #[test]
    fn signal_type_flags() {
        assert!(SignalType::Pbs.is_pbs());
        assert!(!SignalType::Pbs.is_oneway());
        assert!(SignalType::PbsOneWay.is_oneway());
        assert!(SignalType::Block.is_oneway());
        assert!(!SignalType::Exit.is_pbs());
    }

    #[test]
    fn implicit_tracks() {
        let depot = Tile::with_kind(TileKind::Depot { entrance: Dir::North }, RailType::RAIL);
        assert_eq!(depot.tracks, TrackBits::VERTICAL);
        let station = TileKind::Station { id: 3, axis: Axis::X };
        assert_eq!(station.implicit_track(), Some(Track::Horizontal));
        assert_eq!(station.station_id(), Some(3));
        assert_eq!(TileKind::Rail.implicit_track(), None);
    }

    #[test]
    fn rail_type_masks() {
        let set = RailType::RAIL.mask() | RailType::ELECTRIC.mask();
        assert!(set.has(RailType::ELECTRIC));
        assert!(!set.has(RailType::MONORAIL));
        assert!(RailTypes::ALL.has(RailType::MAGLEV));
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn tile_round_trip() {
        let mut tile = Tile::with_kind(
            TileKind::TunnelBridge {
                dir: Dir::South,
                far_end: Point::new(4, 9),
                bridge: true,
            },
            RailType::ELECTRIC,
        );
        tile.signals[Track::Vertical.index()] = Some(Signal::two_way(SignalType::Pbs));
        tile.slope = Slope::Up(Dir::North);
        let json = serde_json::to_string(&tile).unwrap();
        let back: Tile = serde_json::from_str(&json).unwrap();
        assert_eq!(tile, back);
    }
}

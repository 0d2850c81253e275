//! Track pieces, directed tracks and their bitsets.
//!
//! A tile holds up to six [`Track`] pieces: two full-length straights and
//! four corner pieces joining adjacent edge midpoints. A [`Trackdir`] is a
//! track travelled in one direction; trains enter through one edge and
//! leave through another.

use crate::direction::{Axis, Dir};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::str::FromStr;

/// Cost units of one straight tile.
pub const TILE_LENGTH: i32 = 100;
/// Cost units of one corner piece (a straight times 1/√2).
pub const TILE_CORNER_LENGTH: i32 = 71;
/// Vehicle length units per tile.
pub const TILE_SIZE: u32 = 16;

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// A piece of track inside one tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Track {
    /// West edge to east edge.
    Horizontal = 0,
    /// North edge to south edge.
    Vertical = 1,
    /// North edge to east edge.
    NorthEast = 2,
    /// South edge to east edge.
    SouthEast = 3,
    /// South edge to west edge.
    SouthWest = 4,
    /// North edge to west edge.
    NorthWest = 5,
}

impl Track {
    pub const ALL: [Track; 6] = [
        Track::Horizontal,
        Track::Vertical,
        Track::NorthEast,
        Track::SouthEast,
        Track::SouthWest,
        Track::NorthWest,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Track::Horizontal),
            1 => Some(Track::Vertical),
            2 => Some(Track::NorthEast),
            3 => Some(Track::SouthEast),
            4 => Some(Track::SouthWest),
            5 => Some(Track::NorthWest),
            _ => None,
        }
    }

    /// The straight track along an axis.
    #[inline]
    pub const fn along(axis: Axis) -> Self {
        match axis {
            Axis::X => Track::Horizontal,
            Axis::Y => Track::Vertical,
        }
    }

    /// Whether this is one of the two full-length straights.
    #[inline]
    pub const fn is_straight(self) -> bool {
        matches!(self, Track::Horizontal | Track::Vertical)
    }

    /// The two edges joined by this track, in forward travel order.
    #[inline]
    pub const fn ends(self) -> (Dir, Dir) {
        match self {
            Track::Horizontal => (Dir::West, Dir::East),
            Track::Vertical => (Dir::North, Dir::South),
            Track::NorthEast => (Dir::North, Dir::East),
            Track::SouthEast => (Dir::South, Dir::East),
            Track::SouthWest => (Dir::South, Dir::West),
            Track::NorthWest => (Dir::North, Dir::West),
        }
    }

    /// Directed track travelling this piece; `reversed` flips [`ends`](Self::ends).
    #[inline]
    pub const fn trackdir(self, reversed: bool) -> Trackdir {
        Trackdir::ALL[self.index() * 2 + reversed as usize]
    }

    #[inline]
    pub const fn bits(self) -> TrackBits {
        TrackBits(1 << self as u8)
    }

    /// Whether the two pieces share any point. Only the parallel corner
    /// pairs leave each other alone.
    pub const fn overlaps(self, other: Track) -> bool {
        !matches!(
            (self, other),
            (Track::NorthEast, Track::SouthWest)
                | (Track::SouthWest, Track::NorthEast)
                | (Track::NorthWest, Track::SouthEast)
                | (Track::SouthEast, Track::NorthWest)
        )
    }
}

// ---------------------------------------------------------------------------
// Trackdir
// ---------------------------------------------------------------------------

/// A track travelled in one direction, named entry edge to exit edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Trackdir {
    WestToEast = 0,
    EastToWest = 1,
    NorthToSouth = 2,
    SouthToNorth = 3,
    NorthToEast = 4,
    EastToNorth = 5,
    SouthToEast = 6,
    EastToSouth = 7,
    SouthToWest = 8,
    WestToSouth = 9,
    NorthToWest = 10,
    WestToNorth = 11,
}

/// Heading octant of each trackdir, clockwise from north (0 = N, 2 = E).
const HEADINGS: [u8; 12] = [2, 6, 4, 0, 3, 7, 1, 5, 7, 3, 5, 1];

const NAMES: [&str; 12] = [
    "WestToEast",
    "EastToWest",
    "NorthToSouth",
    "SouthToNorth",
    "NorthToEast",
    "EastToNorth",
    "SouthToEast",
    "EastToSouth",
    "SouthToWest",
    "WestToSouth",
    "NorthToWest",
    "WestToNorth",
];

impl Trackdir {
    pub const ALL: [Trackdir; 12] = [
        Trackdir::WestToEast,
        Trackdir::EastToWest,
        Trackdir::NorthToSouth,
        Trackdir::SouthToNorth,
        Trackdir::NorthToEast,
        Trackdir::EastToNorth,
        Trackdir::SouthToEast,
        Trackdir::EastToSouth,
        Trackdir::SouthToWest,
        Trackdir::WestToSouth,
        Trackdir::NorthToWest,
        Trackdir::WestToNorth,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn from_index(i: usize) -> Option<Self> {
        if i < 12 { Some(Self::ALL[i]) } else { None }
    }

    /// The trackdir entering through `entry` and leaving through `exit`.
    pub fn from_edges(entry: Dir, exit: Dir) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|td| td.entry() == entry && td.exit() == exit)
    }

    /// The straight trackdir travelling in `dir`.
    #[inline]
    pub const fn straight(dir: Dir) -> Self {
        match dir {
            Dir::East => Trackdir::WestToEast,
            Dir::West => Trackdir::EastToWest,
            Dir::South => Trackdir::NorthToSouth,
            Dir::North => Trackdir::SouthToNorth,
        }
    }

    #[inline]
    pub const fn track(self) -> Track {
        match Track::from_index(self.index() / 2) {
            Some(t) => t,
            None => Track::Horizontal,
        }
    }

    /// Whether this travels its track against the track's forward order.
    #[inline]
    pub const fn is_reversed(self) -> bool {
        self.index() & 1 == 1
    }

    /// Same track, opposite direction.
    #[inline]
    pub const fn reverse(self) -> Self {
        Self::ALL[self.index() ^ 1]
    }

    /// Edge the vehicle comes in through.
    #[inline]
    pub const fn entry(self) -> Dir {
        let (a, b) = self.track().ends();
        if self.is_reversed() { b } else { a }
    }

    /// Direction the vehicle leaves the tile in.
    #[inline]
    pub const fn exit(self) -> Dir {
        let (a, b) = self.track().ends();
        if self.is_reversed() { a } else { b }
    }

    /// Heading octant, clockwise from north.
    #[inline]
    pub const fn heading(self) -> u8 {
        HEADINGS[self.index()]
    }

    /// Turn between this trackdir and a following one, in eighths of a
    /// full circle: 0 straight on, 1 for 45°, 2 for 90°.
    #[inline]
    pub const fn turn(self, next: Trackdir) -> u8 {
        let d = (self.heading() + 8 - next.heading()) % 8;
        if d > 4 { 8 - d } else { d }
    }

    #[inline]
    pub const fn is_straight(self) -> bool {
        self.track().is_straight()
    }

    /// Base cost of running over this trackdir once.
    #[inline]
    pub const fn length(self) -> i32 {
        if self.is_straight() {
            TILE_LENGTH
        } else {
            TILE_CORNER_LENGTH
        }
    }

    #[inline]
    pub const fn bits(self) -> TrackdirBits {
        TrackdirBits(1 << self as u16)
    }

    /// Trackdirs that would make a 90° turn after this one.
    pub fn turn90_successors(self) -> TrackdirBits {
        Self::ALL
            .into_iter()
            .filter(|&next| self.turn(next) >= 2)
            .fold(TrackdirBits::NONE, |acc, td| acc | td.bits())
    }
}

impl fmt::Display for Trackdir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(NAMES[self.index()])
    }
}

/// Error parsing a [`Trackdir`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trackdir {0:?}")]
pub struct ParseTrackdirError(pub String);

impl FromStr for Trackdir {
    type Err = ParseTrackdirError;

    /// Accepts the full names (`WestToEast`) and the entry/exit letter
    /// pairs (`WE`, `ns`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(i) = NAMES.iter().position(|n| n.eq_ignore_ascii_case(s)) {
            return Ok(Self::ALL[i]);
        }
        let mut chars = s.chars();
        let pair = match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None) => Dir::from_char(a).zip(Dir::from_char(b)),
            _ => None,
        };
        pair.and_then(|(entry, exit)| Trackdir::from_edges(entry, exit))
            .ok_or_else(|| ParseTrackdirError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// TrackBits
// ---------------------------------------------------------------------------

/// Set of [`Track`] pieces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackBits(pub u8);

impl TrackBits {
    pub const NONE: Self = Self(0);
    pub const HORIZONTAL: Self = Self(1 << 0);
    pub const VERTICAL: Self = Self(1 << 1);
    pub const NORTH_EAST: Self = Self(1 << 2);
    pub const SOUTH_EAST: Self = Self(1 << 3);
    pub const SOUTH_WEST: Self = Self(1 << 4);
    pub const NORTH_WEST: Self = Self(1 << 5);
    pub const CROSS: Self = Self(0b11);
    pub const ALL: Self = Self(0x3F);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn has(self, track: Track) -> bool {
        self.0 & (1 << track as u8) != 0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// The only track in the set, if there is exactly one.
    #[inline]
    pub fn single(self) -> Option<Track> {
        if self.count() == 1 {
            Track::from_index(self.0.trailing_zeros() as usize)
        } else {
            None
        }
    }

    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Whether any two tracks of the set overlap.
    pub fn overlapping(self) -> bool {
        self.count() > 1
            && self != (TrackBits::NORTH_EAST | TrackBits::SOUTH_WEST)
            && self != (TrackBits::NORTH_WEST | TrackBits::SOUTH_EAST)
    }

    /// Whether `track` overlaps any track in the set.
    pub fn overlaps_track(self, track: Track) -> bool {
        self.iter().any(|t| t.overlaps(track))
    }

    /// Both directions of every track in the set.
    #[inline]
    pub fn trackdirs(self) -> TrackdirBits {
        self.iter().fold(TrackdirBits::NONE, |acc, t| {
            acc | t.trackdir(false).bits() | t.trackdir(true).bits()
        })
    }

    pub fn iter(self) -> impl Iterator<Item = Track> {
        Track::ALL.into_iter().filter(move |t| self.has(*t))
    }
}

impl BitOr for TrackBits {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TrackBits {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TrackBits {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for TrackBits {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

// ---------------------------------------------------------------------------
// TrackdirBits
// ---------------------------------------------------------------------------

/// Set of [`Trackdir`] values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackdirBits(pub u16);

impl TrackdirBits {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0x0FFF);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn has(self, td: Trackdir) -> bool {
        self.0 & (1 << td as u16) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Lowest trackdir in the set.
    #[inline]
    pub fn first(self) -> Option<Trackdir> {
        if self.is_empty() {
            None
        } else {
            Trackdir::from_index(self.0.trailing_zeros() as usize)
        }
    }

    /// The only trackdir in the set, if there is exactly one.
    #[inline]
    pub fn single(self) -> Option<Trackdir> {
        if self.count() == 1 { self.first() } else { None }
    }

    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Trackdirs a vehicle can take after leaving its previous tile in
    /// direction `travel`, i.e. those entering through the opposite edge.
    pub fn reachable_from(travel: Dir) -> Self {
        let entry = travel.reverse();
        Trackdir::ALL
            .into_iter()
            .filter(|td| td.entry() == entry)
            .fold(Self::NONE, |acc, td| acc | td.bits())
    }

    /// Tracks used by the set.
    pub fn tracks(self) -> TrackBits {
        self.iter().fold(TrackBits::NONE, |acc, td| acc | td.track().bits())
    }

    /// Iterate in ascending index order.
    pub fn iter(self) -> impl Iterator<Item = Trackdir> {
        Trackdir::ALL.into_iter().filter(move |td| self.has(*td))
    }
}

impl BitOr for TrackdirBits {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TrackdirBits {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TrackdirBits {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for TrackdirBits {
    type Output = Self;
    #[inline]
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl FromIterator<Trackdir> for TrackdirBits {
    fn from_iter<I: IntoIterator<Item = Trackdir>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, |acc, td| acc | td.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trackdir_edges_match_names() {
        assert_eq!(Trackdir::WestToEast.entry(), Dir::West);
        assert_eq!(Trackdir::WestToEast.exit(), Dir::East);
        assert_eq!(Trackdir::EastToNorth.entry(), Dir::East);
        assert_eq!(Trackdir::EastToNorth.exit(), Dir::North);
        assert_eq!(Trackdir::WestToSouth.track(), Track::SouthWest);
        for td in Trackdir::ALL {
            assert_eq!(td.reverse().reverse(), td);
            assert_eq!(td.reverse().entry(), td.exit());
            assert_eq!(td.to_string().parse::<Trackdir>(), Ok(td));
        }
    }

    #[test]
    fn headings_follow_edges() {
        // A straight heading points at the exit edge; a corner heading is
        // the diagonal between the entry's opposite and the exit.
        assert_eq!(Trackdir::SouthToNorth.heading(), 0);
        assert_eq!(Trackdir::NorthToEast.heading(), 3);
        assert_eq!(Trackdir::WestToNorth.heading(), 1);
    }

    #[test]
    fn turns_between_neighbours() {
        use Trackdir::*;
        assert_eq!(WestToEast.turn(WestToEast), 0);
        assert_eq!(WestToEast.turn(WestToSouth), 1);
        assert_eq!(WestToEast.turn(WestToNorth), 1);
        assert_eq!(NorthToEast.turn(WestToSouth), 0);
        assert_eq!(NorthToEast.turn(WestToNorth), 2);
        assert!(NorthToEast.turn90_successors().has(WestToNorth));
        assert!(!WestToEast.turn90_successors().has(WestToNorth));
    }

    #[test]
    fn reachable_from_enters_opposite_edge() {
        let tds = TrackdirBits::reachable_from(Dir::East);
        let expected: TrackdirBits = [Trackdir::WestToEast, Trackdir::WestToSouth, Trackdir::WestToNorth]
            .into_iter()
            .collect();
        assert_eq!(tds, expected);
        assert_eq!(tds.tracks().count(), 3);
    }

    #[test]
    fn overlap_rules() {
        assert!(Track::Horizontal.overlaps(Track::Vertical));
        assert!(Track::NorthEast.overlaps(Track::SouthEast));
        assert!(!Track::NorthEast.overlaps(Track::SouthWest));
        assert!((TrackBits::HORIZONTAL | TrackBits::NORTH_EAST).overlapping());
        assert!(!(TrackBits::NORTH_WEST | TrackBits::SOUTH_EAST).overlapping());
        assert!(!TrackBits::VERTICAL.overlapping());
    }

    #[test]
    fn bits_helpers() {
        let b = TrackBits::HORIZONTAL | TrackBits::SOUTH_WEST;
        assert_eq!(b.count(), 2);
        assert_eq!(b.single(), None);
        assert_eq!(TrackBits::VERTICAL.single(), Some(Track::Vertical));
        assert_eq!(b.trackdirs().count(), 4);
        assert_eq!((!b).count(), 4);
        assert_eq!(TrackdirBits::NONE.first(), None);
    }

    #[test]
    fn parse_letter_pairs() {
        assert_eq!("we".parse::<Trackdir>(), Ok(Trackdir::WestToEast));
        assert_eq!("NW".parse::<Trackdir>(), Ok(Trackdir::NorthToWest));
        assert!("NN".parse::<Trackdir>().is_err());
    }
}

//! Segments of track priced as a unit, and the cache sharing them between
//! searches.
//!
//! A segment starts at a node's key and runs along unambiguous track until
//! something ends it: a junction, a station, a depot, a dead end. Its cost
//! depends only on the layout and the settings once the vehicle is past its
//! signal look-ahead, so such segments are kept in a [`SegmentCache`] keyed
//! by the first tile and trackdir and reused by later searches. The cache
//! tracks the map's layout epoch and drops every segment whose tiles a
//! layout change touched.

use log::{debug, trace};
use signalbox_core::{Point, Range, RailTypes, TileMap};
use std::collections::HashMap;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::node::NodeKey;
use crate::settings::RailSettings;

// ---------------------------------------------------------------------------
// EndSegmentReasons
// ---------------------------------------------------------------------------

/// Why a segment ended, as a bit set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EndSegmentReasons(pub u16);

impl EndSegmentReasons {
    pub const NONE: Self = Self(0);
    /// Track ends, or a one-way signal faces the other way.
    pub const DEAD_END: Self = Self(1 << 0);
    /// The next tile has another rail type.
    pub const RAIL_TYPE: Self = Self(1 << 1);
    /// The walk came back to its first tile.
    pub const INFINITE_LOOP: Self = Self(1 << 2);
    /// Cut to keep segments short.
    pub const SEGMENT_TOO_LONG: Self = Self(1 << 3);
    /// More than one trackdir continues.
    pub const CHOICE_FOLLOWS: Self = Self(1 << 4);
    pub const DEPOT: Self = Self(1 << 5);
    pub const WAYPOINT: Self = Self(1 << 6);
    pub const STATION: Self = Self(1 << 7);
    /// A position where a train can wait clear of other paths.
    pub const SAFE_TILE: Self = Self(1 << 8);
    /// Cost bound exceeded.
    pub const PATH_TOO_LONG: Self = Self(1 << 9);
    /// First signal after a junction is a red two-way signal.
    pub const FIRST_TWO_WAY_RED: Self = Self(1 << 10);

    /// Reasons after which the segment's last tile may be a destination.
    pub const POSSIBLE_TARGET: Self =
        Self(Self::DEPOT.0 | Self::WAYPOINT.0 | Self::STATION.0 | Self::SAFE_TILE.0);
    /// Reasons that depend only on the layout and are kept in the cache.
    pub const CACHED: Self = Self(
        Self::DEAD_END.0
            | Self::RAIL_TYPE.0
            | Self::INFINITE_LOOP.0
            | Self::SEGMENT_TOO_LONG.0
            | Self::CHOICE_FOLLOWS.0
            | Self::DEPOT.0
            | Self::WAYPOINT.0
            | Self::STATION.0,
    );
    /// Reasons that prune the node unless it reached a destination.
    pub const ABORT: Self = Self(
        Self::DEAD_END.0
            | Self::PATH_TOO_LONG.0
            | Self::INFINITE_LOOP.0
            | Self::FIRST_TWO_WAY_RED.0,
    );

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EndSegmentReasons {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EndSegmentReasons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EndSegmentReasons {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

// ---------------------------------------------------------------------------
// CachedSegment
// ---------------------------------------------------------------------------

/// Cache key: a segment's first tile and trackdir, for one set of rail
/// types (the rail types decide where the walk stops).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentKey {
    pub start: NodeKey,
    pub rail_types: RailTypes,
}

/// How the vehicle got onto a segment's first tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Arrival {
    /// Tile the vehicle came from; the first tile itself after reversing in
    /// a depot.
    pub from: Point,
    pub tiles_skipped: u32,
    pub is_station: bool,
}

/// A priced run of track.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CachedSegment {
    pub key: SegmentKey,
    pub arrival: Arrival,
    /// Cost of the run, or `None` while not yet computed.
    pub cost: Option<i32>,
    pub end_reason: EndSegmentReasons,
    /// Last tile and trackdir of the run.
    pub last: NodeKey,
    /// Tile and trackdir of the last signal passed.
    pub last_signal: Option<NodeKey>,
    /// Platform tiles paid for when the run ends in a station.
    pub platform_tiles: u32,
    /// Penalty carried when the run ends before a one-way path signal.
    pub tail_penalty: i32,
    /// Tiles whose layout the cost depends on.
    pub bounds: Range,
}

impl CachedSegment {
    /// An uncomputed segment starting at `key`.
    pub fn new(key: SegmentKey, arrival: Arrival) -> Self {
        Self {
            key,
            arrival,
            cost: None,
            end_reason: EndSegmentReasons::NONE,
            last: key.start,
            last_signal: None,
            platform_tiles: 0,
            tail_penalty: 0,
            bounds: Range::tile(key.start.tile),
        }
    }

    #[inline]
    pub fn is_computed(&self) -> bool {
        self.cost.is_some()
    }
}

// ---------------------------------------------------------------------------
// SegmentCache
// ---------------------------------------------------------------------------

/// Handle to a segment in a [`SegmentCache`]. Stays valid until the cache
/// is next synchronised with the map.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SegmentId(usize);

/// Cumulative cache counters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserted: u64,
    pub invalidated: u64,
    pub flushes: u64,
}

/// Segments shared between searches on one map.
///
/// Call [`sync`](Self::sync) before each search: it drops segments made
/// stale by layout changes since the previous call, or everything when the
/// settings changed or the map's journal no longer reaches back. A cache
/// belongs to one map; [`flush`](Self::flush) it before using another.
#[derive(Debug, Default)]
pub struct SegmentCache {
    slots: Vec<Option<CachedSegment>>,
    free: Vec<usize>,
    index: HashMap<SegmentKey, usize>,
    epoch: Option<u64>,
    settings: Option<RailSettings>,
    stats: CacheStats,
}

impl SegmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached segments.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Bring the cache in step with the map's layout and `settings`.
    pub fn sync(&mut self, map: &dyn TileMap, settings: &RailSettings) {
        if self.settings.as_ref() != Some(settings) {
            if !self.is_empty() {
                debug!("settings changed, flushing {} segments", self.len());
            }
            self.flush();
            self.settings = Some(settings.clone());
        }
        let epoch = map.layout_epoch();
        match self.epoch {
            Some(seen) if seen == epoch => {}
            Some(seen) if seen > epoch => {
                debug!("layout epoch went back from {seen} to {epoch}, flushing");
                self.flush();
            }
            Some(seen) => match map.layout_changes_since(seen) {
                Some(changes) => {
                    let dropped: usize =
                        changes.iter().map(|c| self.invalidate_area(c.area)).sum();
                    trace!(
                        "{} layout changes since epoch {seen}, {dropped} segments dropped",
                        changes.len()
                    );
                }
                None => {
                    debug!("layout journal lost changes after epoch {seen}, flushing");
                    self.flush();
                }
            },
            None => {}
        }
        self.epoch = Some(epoch);
    }

    /// Drop every segment whose bounds overlap `area`. Returns how many
    /// were dropped.
    pub fn invalidate_area(&mut self, area: Range) -> usize {
        let stale: Vec<usize> = self
            .index
            .values()
            .copied()
            .filter(|&i| {
                self.slots[i]
                    .as_ref()
                    .is_some_and(|s| s.bounds.overlaps(area))
            })
            .collect();
        for &i in &stale {
            if let Some(seg) = self.slots[i].take() {
                self.index.remove(&seg.key);
                self.free.push(i);
            }
        }
        self.stats.invalidated += stale.len() as u64;
        stale.len()
    }

    /// Drop everything.
    pub fn flush(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.stats.flushes += 1;
    }

    /// The computed segment for `key`, if cached.
    pub fn get(&self, key: &SegmentKey) -> Option<&CachedSegment> {
        self.index.get(key).and_then(|&i| self.slots[i].as_ref())
    }

    pub fn segment(&self, id: SegmentId) -> Option<&CachedSegment> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Iterate over cached segments in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &CachedSegment> {
        self.slots.iter().flatten()
    }

    /// Look up a segment for a vehicle arriving by `arrival`, counting the
    /// hit or miss. A segment cached for another arrival is a miss.
    pub(crate) fn lookup(&mut self, key: &SegmentKey, arrival: &Arrival) -> Option<SegmentId> {
        let found = self
            .index
            .get(key)
            .copied()
            .filter(|&i| self.slots[i].as_ref().is_some_and(|s| s.arrival == *arrival));
        match found {
            Some(i) => {
                self.stats.hits += 1;
                Some(SegmentId(i))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a computed segment, replacing any other for the same key.
    pub(crate) fn insert(&mut self, seg: CachedSegment) -> SegmentId {
        debug_assert!(seg.is_computed());
        if let Some(i) = self.index.remove(&seg.key) {
            self.slots[i] = None;
            self.free.push(i);
        }
        let key = seg.key;
        let i = match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(seg);
                i
            }
            None => {
                self.slots.push(Some(seg));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, i);
        self.stats.inserted += 1;
        SegmentId(i)
    }
}

//! What a search is looking for.

use signalbox_core::{Point, Range, TileMap, Trackdir, TrackdirBits};

use crate::distance::rail_estimate;
use crate::follower::Follower;
use crate::pbs::{is_safe_waiting_position, is_waiting_position_free};
use crate::vehicle::Order;

/// A search destination.
///
/// Only the last tile of a segment that ended on a depot, station, waypoint
/// or safe tile is ever offered to [`accepts`](Self::accepts).
pub trait Destination {
    /// Whether a vehicle arriving on `tile` travelling `td` is done.
    fn accepts(&self, map: &dyn TileMap, tile: Point, td: Trackdir) -> bool;

    /// Lower bound on the remaining cost after leaving `tile` along `td`.
    /// Must never overestimate.
    fn estimate(&self, tile: Point, td: Trackdir) -> i32;

    /// Whether the search must avoid reserved track.
    fn masks_reserved_tracks(&self) -> bool {
        false
    }
}

/// Any platform tile of a station.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StationTarget {
    pub id: u16,
    pub area: Range,
}

impl StationTarget {
    /// The station `id` on `map`, or `None` if it has no tiles.
    pub fn new(map: &dyn TileMap, id: u16) -> Option<Self> {
        map.station_area(id).map(|area| Self { id, area })
    }
}

impl Destination for StationTarget {
    fn accepts(&self, map: &dyn TileMap, tile: Point, _td: Trackdir) -> bool {
        let kind = map.kind(tile);
        kind.is_station() && kind.station_id() == Some(self.id)
    }

    fn estimate(&self, tile: Point, td: Trackdir) -> i32 {
        rail_estimate(tile, td, self.area)
    }
}

/// Any tile of a waypoint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WaypointTarget {
    pub id: u16,
    pub area: Range,
}

impl WaypointTarget {
    pub fn new(map: &dyn TileMap, id: u16) -> Option<Self> {
        map.station_area(id).map(|area| Self { id, area })
    }
}

impl Destination for WaypointTarget {
    fn accepts(&self, map: &dyn TileMap, tile: Point, _td: Trackdir) -> bool {
        let kind = map.kind(tile);
        kind.is_waypoint() && kind.station_id() == Some(self.id)
    }

    fn estimate(&self, tile: Point, td: Trackdir) -> i32 {
        rail_estimate(tile, td, self.area)
    }
}

/// One tile, entered along one of the given trackdirs. The tile must be one
/// where segments end: a depot, platform end or waypoint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileTarget {
    pub tile: Point,
    pub trackdirs: TrackdirBits,
}

impl TileTarget {
    /// `tile` entered in any direction.
    pub fn new(tile: Point) -> Self {
        Self {
            tile,
            trackdirs: TrackdirBits::ALL,
        }
    }
}

impl Destination for TileTarget {
    fn accepts(&self, _map: &dyn TileMap, tile: Point, td: Trackdir) -> bool {
        tile == self.tile && self.trackdirs.has(td)
    }

    fn estimate(&self, tile: Point, td: Trackdir) -> i32 {
        rail_estimate(tile, td, Range::tile(self.tile))
    }
}

/// The nearest depot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct AnyDepot;

impl Destination for AnyDepot {
    fn accepts(&self, map: &dyn TileMap, tile: Point, _td: Trackdir) -> bool {
        map.kind(tile).is_depot()
    }

    fn estimate(&self, _tile: Point, _td: Trackdir) -> i32 {
        0
    }
}

/// The nearest place a train can wait without blocking other paths.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SafeTile {
    pub follower: Follower,
}

impl Destination for SafeTile {
    fn accepts(&self, map: &dyn TileMap, tile: Point, td: Trackdir) -> bool {
        is_safe_waiting_position(map, &self.follower, tile, td, true)
            && is_waiting_position_free(map, &self.follower, tile, td)
    }

    fn estimate(&self, _tile: Point, _td: Trackdir) -> i32 {
        0
    }

    fn masks_reserved_tracks(&self) -> bool {
        true
    }
}

/// The destination an order sends a vehicle to, or `None` when the order
/// has none or names a station or waypoint missing from `map`.
pub fn order_destination(map: &dyn TileMap, order: Order) -> Option<Box<dyn Destination>> {
    match order {
        Order::None => None,
        Order::Station(id) => {
            StationTarget::new(map, id).map(|d| Box::new(d) as Box<dyn Destination>)
        }
        Order::Waypoint(id) => {
            WaypointTarget::new(map, id).map(|d| Box::new(d) as Box<dyn Destination>)
        }
        Order::Depot(tile) => Some(Box::new(TileTarget::new(tile))),
    }
}

/// Wraps a destination with a zero heuristic, turning the search into
/// plain Dijkstra.
#[derive(Copy, Clone, Debug)]
pub struct NoHeuristic<D>(pub D);

impl<D: Destination> Destination for NoHeuristic<D> {
    fn accepts(&self, map: &dyn TileMap, tile: Point, td: Trackdir) -> bool {
        self.0.accepts(map, tile, td)
    }

    fn estimate(&self, _tile: Point, _td: Trackdir) -> i32 {
        0
    }

    fn masks_reserved_tracks(&self) -> bool {
        self.0.masks_reserved_tracks()
    }
}

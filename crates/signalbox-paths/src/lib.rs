//! Railway pathfinding with signal-aware costs and a shared segment cache.
//!
//! A search runs over *segments*: maximal runs of track between decision
//! points such as junctions, signals, platforms and rail-type changes. The
//! pieces:
//!
//! - **Track following** ([`Follower`]): which trackdirs a vehicle can take
//!   on the next tile, with tunnels, bridges and platforms as one jump.
//! - **Pricing** ([`CostEngine`]): per-tile costs, curves, slopes, signals
//!   and their look-ahead, reservations, speed limits and destination
//!   penalties.
//! - **Segment cache** ([`SegmentCache`]): segments beyond the signal
//!   look-ahead depend only on the layout and are shared across queries,
//!   invalidated from the map's layout journal.
//! - **Search** ([`Pathfinder`]): deterministic best-first search over
//!   segment nodes, driven through [`PathfinderPolicy`].
//!
//! # Destinations
//!
//! | Type | Accepts | Heuristic |
//! |---|---|---|
//! | [`StationTarget`] | any platform tile of a station | octile distance |
//! | [`WaypointTarget`] | any tile of a waypoint | octile distance |
//! | [`TileTarget`] | one tile and trackdir set | octile distance |
//! | [`AnyDepot`] | any depot | none |
//! | [`SafeTile`] | a free safe waiting position | none |

mod cost;
mod destination;
mod distance;
mod error;
mod follower;
mod node;
mod pathfinder;
mod pbs;
mod policy;
mod route;
mod search;
mod segment;
mod settings;
mod vehicle;

#[cfg(test)]
mod properties;
#[cfg(test)]
mod scenarios;
#[cfg(test)]
mod testutil;

pub use cost::{CostEngine, MAX_SEGMENT_COST};
pub use destination::{
    AnyDepot, Destination, NoHeuristic, SafeTile, StationTarget, TileTarget, WaypointTarget,
    order_destination,
};
pub use distance::{manhattan, rail_estimate};
pub use error::PathError;
pub use follower::{Follow, FollowError, Follower};
pub use node::{Node, NodeFlags, NodeId, NodeKey, NodeState, SegmentRef};
pub use pathfinder::{DepotMatch, Origin, PathQuery, Pathfinder, ReverseOrigin, TrackChoice};
pub use pbs::{is_safe_waiting_position, is_waiting_position_free};
pub use policy::{PathfinderPolicy, RailPolicy};
pub use route::{Route, RouteStep, SearchStats};
pub use segment::{
    Arrival, CacheStats, CachedSegment, EndSegmentReasons, SegmentCache, SegmentId, SegmentKey,
};
pub use settings::{MAX_LOOK_AHEAD_SIGNALS, MAX_PENALTY, RailSettings, SettingsError};
pub use vehicle::{Order, Train, Vehicle};

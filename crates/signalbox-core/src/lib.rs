//! **signalbox-core** — tile, track and signal model for railway pathfinding.
//!
//! This crate provides the map side of the *signalbox* workspace: geometry
//! primitives, directions, tracks and trackdirs with their bitsets, the
//! per-tile railway model, the read-only [`TileMap`] interface consumed by
//! the pathfinder, an in-memory [`RailMap`] with a layout-change journal, an
//! ASCII [`Layout`] parser and a seeded random network generator.

pub mod direction;
pub mod geom;
pub mod layout;
pub mod map;
pub mod mapgen;
pub mod tile;
pub mod track;

pub use direction::{Axis, Dir};
pub use geom::{Point, Range};
pub use layout::{Layout, LayoutError, Legend, TileSpec};
pub use map::{LayoutChange, MapError, RailMap, TileMap};
pub use mapgen::{Network, NetworkGen};
pub use tile::{RailType, RailTypes, Signal, SignalState, SignalType, Slope, Tile, TileKind};
pub use track::{
    ParseTrackdirError, TILE_CORNER_LENGTH, TILE_LENGTH, TILE_SIZE, Track, TrackBits, Trackdir,
    TrackdirBits,
};

//! The read-only [`TileMap`] interface and the in-memory [`RailMap`].
//!
//! Pathfinding only ever reads the map through [`TileMap`]. [`RailMap`] is a
//! plain grid implementation with mutation commands. Commands that change
//! the track layout bump the layout epoch and record the touched area in a
//! bounded journal, so caches derived from the layout can invalidate exactly
//! what changed. Signal aspects and reservations are state, not layout, and
//! are not journaled.

use crate::direction::{Axis, Dir};
use crate::geom::{Point, Range};
use crate::tile::{RailType, Signal, SignalState, SignalType, Slope, Tile, TileKind};
use crate::track::{Track, TrackBits, Trackdir};
use log::debug;
use std::collections::HashMap;

/// Number of layout changes kept before the oldest are dropped.
pub const JOURNAL_CAPACITY: usize = 1024;

/// One journaled layout change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutChange {
    /// Layout epoch after the change.
    pub epoch: u64,
    /// Tiles whose layout changed.
    pub area: Range,
}

// ---------------------------------------------------------------------------
// TileMap
// ---------------------------------------------------------------------------

/// Read access to railway tiles.
///
/// Out-of-bounds queries answer as for [`TileKind::Void`]: no track, no
/// signals, no reservations.
pub trait TileMap {
    /// The map's tile area.
    fn bounds(&self) -> Range;

    fn kind(&self, p: Point) -> TileKind;

    /// Track pieces on the tile, including the implicit track of depots,
    /// stations, waypoints, crossings and tunnel or bridge heads.
    fn track_bits(&self, p: Point) -> TrackBits;

    fn rail_type(&self, p: Point) -> RailType;

    fn slope(&self, p: Point) -> Slope;

    /// Signals on one track of the tile.
    fn signal(&self, p: Point, track: Track) -> Option<Signal>;

    /// Tracks reserved by vehicle paths.
    fn reserved_tracks(&self, p: Point) -> TrackBits;

    /// Speed limit applying to vehicles leaving the tile.
    fn speed_limit(&self, p: Point) -> Option<u16>;

    /// Bounding area of a station or waypoint.
    fn station_area(&self, id: u16) -> Option<Range>;

    /// Counter bumped by every layout change.
    fn layout_epoch(&self) -> u64;

    /// Layout changes made after `epoch`, oldest first, or `None` when the
    /// journal no longer reaches back that far.
    fn layout_changes_since(&self, epoch: u64) -> Option<&[LayoutChange]>;

    /// Whether a signal faces vehicles travelling `td`.
    fn has_signal_on(&self, p: Point, td: Trackdir) -> bool {
        self.signal(p, td.track()).is_some_and(|s| s.faces(td))
    }

    /// Aspect shown to vehicles travelling `td`.
    fn signal_state(&self, p: Point, td: Trackdir) -> Option<SignalState> {
        self.signal(p, td.track()).and_then(|s| s.state(td))
    }

    fn signal_type(&self, p: Point, track: Track) -> Option<SignalType> {
        self.signal(p, track).map(|s| s.kind)
    }

    /// Whether a path signal faces vehicles travelling `td`.
    fn is_pbs_signal(&self, p: Point, td: Trackdir) -> bool {
        self.signal(p, td.track())
            .is_some_and(|s| s.faces(td) && s.kind.is_pbs())
    }

    /// Whether a one-way signal stops vehicles travelling `td`: a signal
    /// faces the other way and none faces `td`.
    fn has_oneway_signal_blocking(&self, p: Point, td: Trackdir) -> bool {
        self.signal(p, td.track())
            .is_some_and(|s| s.faces(td.reverse()) && !s.faces(td) && s.kind.is_oneway())
    }

    /// Platform tiles from `p` to the platform end in direction `dir`,
    /// counting `p`. Zero when `p` is not a platform along `dir`.
    fn platform_length(&self, p: Point, dir: Dir) -> u32 {
        let TileKind::Station { id, axis } = self.kind(p) else {
            return 0;
        };
        if dir.axis() != axis {
            return 0;
        }
        let mut n = 1;
        let mut cur = dir.step(p);
        while self.kind(cur) == (TileKind::Station { id, axis }) {
            n += 1;
            cur = dir.step(cur);
        }
        n
    }

    /// Whether the platform or waypoint track of `p` is reserved.
    fn is_station_reserved(&self, p: Point) -> bool {
        match self.kind(p) {
            TileKind::Station { axis, .. } | TileKind::Waypoint { axis, .. } => {
                self.reserved_tracks(p).has(Track::along(axis))
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// RailMap
// ---------------------------------------------------------------------------

/// Errors returned by [`RailMap`] commands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("tile {0} is outside the map")]
    OutOfBounds(Point),
    #[error("tile {0} is already occupied")]
    Occupied(Point),
    #[error("tile {0} carries no plain track")]
    NotRail(Point),
    #[error("tile {0} has no {1:?} track")]
    NoTrack(Point, Track),
    #[error("tile {0} has no signal on its {1:?} track")]
    NoSignal(Point, Track),
    #[error("tunnel or bridge heads {0} and {1} are not aligned")]
    Misaligned(Point, Point),
}

/// A rectangular railway map held in memory.
#[derive(Debug, Clone)]
pub struct RailMap {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    stations: HashMap<u16, Range>,
    epoch: u64,
    journal: Vec<LayoutChange>,
    /// Highest epoch dropped from the journal.
    journal_floor: u64,
}

impl RailMap {
    /// A map of clear tiles.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            tiles: vec![Tile::default(); (width * height) as usize],
            stations: HashMap::new(),
            epoch: 0,
            journal: Vec::new(),
            journal_floor: 0,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    fn idx(&self, p: Point) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x >= self.width || p.y >= self.height {
            return None;
        }
        Some((p.y * self.width + p.x) as usize)
    }

    /// The tile at `p`, if inside the map.
    pub fn tile(&self, p: Point) -> Option<&Tile> {
        self.idx(p).map(|i| &self.tiles[i])
    }

    fn tile_mut(&mut self, p: Point) -> Result<&mut Tile, MapError> {
        let i = self.idx(p).ok_or(MapError::OutOfBounds(p))?;
        Ok(&mut self.tiles[i])
    }

    fn rail_tile_mut(&mut self, p: Point) -> Result<&mut Tile, MapError> {
        let t = self.tile_mut(p)?;
        if t.kind != TileKind::Rail {
            return Err(MapError::NotRail(p));
        }
        Ok(t)
    }

    /// Record a layout change covering `area`.
    fn touch(&mut self, area: Range) {
        self.epoch += 1;
        self.journal.push(LayoutChange {
            epoch: self.epoch,
            area,
        });
        if self.journal.len() > JOURNAL_CAPACITY {
            let drop = self.journal.len() - JOURNAL_CAPACITY / 2;
            self.journal_floor = self.journal[drop - 1].epoch;
            self.journal.drain(..drop);
            debug!(
                "layout journal truncated, changes up to epoch {} dropped",
                self.journal_floor
            );
        }
    }

    /// Replace a whole tile, keeping its slope, and keep station areas in
    /// step.
    fn replace(&mut self, p: Point, mut tile: Tile) -> Result<(), MapError> {
        let slot = self.tile_mut(p)?;
        tile.slope = slot.slope;
        let old_id = slot.kind.station_id();
        let new_id = tile.kind.station_id();
        *slot = tile;
        if let Some(id) = new_id {
            let area = self.stations.entry(id).or_default();
            *area = area.union(Range::tile(p));
        }
        if let Some(id) = old_id.filter(|&id| Some(id) != new_id) {
            self.recompute_station_area(id);
        }
        Ok(())
    }

    fn recompute_station_area(&mut self, id: u16) {
        let area = self
            .bounds()
            .iter()
            .filter(|&p| self.kind(p).station_id() == Some(id))
            .fold(Range::default(), |acc, p| acc.union(Range::tile(p)));
        if area.is_empty() {
            self.stations.remove(&id);
        } else {
            self.stations.insert(id, area);
        }
    }

    fn ensure_buildable(&self, p: Point) -> Result<(), MapError> {
        match self.tile(p).map(|t| t.kind) {
            None => Err(MapError::OutOfBounds(p)),
            Some(TileKind::Clear | TileKind::Rail) => Ok(()),
            Some(_) => Err(MapError::Occupied(p)),
        }
    }

    // -- layout commands ----------------------------------------------------

    /// Lay a piece of plain track.
    pub fn build_track(&mut self, p: Point, track: Track) -> Result<(), MapError> {
        let t = self.tile_mut(p)?;
        match t.kind {
            TileKind::Clear => t.kind = TileKind::Rail,
            TileKind::Rail => {}
            _ => return Err(MapError::Occupied(p)),
        }
        t.tracks |= track.bits();
        self.touch(Range::tile(p));
        Ok(())
    }

    /// Lay several pieces of plain track at once.
    pub fn build_tracks(&mut self, p: Point, tracks: TrackBits) -> Result<(), MapError> {
        for track in tracks.iter() {
            self.build_track(p, track)?;
        }
        Ok(())
    }

    /// Remove a piece of plain track with its signals and reservation.
    pub fn remove_track(&mut self, p: Point, track: Track) -> Result<(), MapError> {
        let t = self.rail_tile_mut(p)?;
        if !t.tracks.has(track) {
            return Err(MapError::NoTrack(p, track));
        }
        t.tracks = t.tracks.without(track.bits());
        t.reserved = t.reserved.without(track.bits());
        t.signals[track.index()] = None;
        if t.tracks.is_empty() {
            let slope = t.slope;
            *t = Tile {
                slope,
                ..Tile::default()
            };
        }
        self.touch(Range::tile(p));
        Ok(())
    }

    pub fn set_rail_type(&mut self, p: Point, rail_type: RailType) -> Result<(), MapError> {
        let t = self.tile_mut(p)?;
        if !t.kind.is_railway() {
            return Err(MapError::NotRail(p));
        }
        t.rail_type = rail_type;
        self.touch(Range::tile(p));
        Ok(())
    }

    pub fn set_slope(&mut self, p: Point, slope: Slope) -> Result<(), MapError> {
        self.tile_mut(p)?.slope = slope;
        self.touch(Range::tile(p));
        Ok(())
    }

    /// Put up a signal facing `td`, or facing both ways when `two_way`.
    /// Adds to any signal already on the track and keeps its aspects.
    pub fn build_signal(
        &mut self,
        p: Point,
        td: Trackdir,
        kind: SignalType,
        two_way: bool,
    ) -> Result<(), MapError> {
        let track = td.track();
        let t = self.rail_tile_mut(p)?;
        if !t.tracks.has(track) {
            return Err(MapError::NoTrack(p, track));
        }
        let slot = &mut t.signals[track.index()];
        let mut sig = match *slot {
            Some(s) => s,
            None if two_way => Signal::two_way(kind),
            None => Signal::one_way(kind, td),
        };
        sig.kind = kind;
        sig.present[td.is_reversed() as usize] = true;
        if two_way {
            sig.present = [true; 2];
        }
        *slot = Some(sig);
        self.touch(Range::tile(p));
        Ok(())
    }

    pub fn remove_signal(&mut self, p: Point, track: Track) -> Result<(), MapError> {
        let t = self.rail_tile_mut(p)?;
        if t.signals[track.index()].take().is_none() {
            return Err(MapError::NoSignal(p, track));
        }
        self.touch(Range::tile(p));
        Ok(())
    }

    pub fn set_signal_type(
        &mut self,
        p: Point,
        track: Track,
        kind: SignalType,
    ) -> Result<(), MapError> {
        let t = self.rail_tile_mut(p)?;
        let sig = t.signals[track.index()]
            .as_mut()
            .ok_or(MapError::NoSignal(p, track))?;
        sig.kind = kind;
        self.touch(Range::tile(p));
        Ok(())
    }

    /// Build a platform of `length` tiles starting at `at` and extending
    /// east (X axis) or south (Y axis). Returns the station's area.
    pub fn build_station(
        &mut self,
        id: u16,
        at: Point,
        axis: Axis,
        length: i32,
        rail_type: RailType,
    ) -> Result<Range, MapError> {
        let dir = axis.dirs()[0];
        let tiles: Vec<Point> = (0..length.max(1)).map(|i| at + dir.offset() * i).collect();
        for &p in &tiles {
            self.ensure_buildable(p)?;
        }
        let mut area = Range::default();
        for &p in &tiles {
            self.replace(p, Tile::with_kind(TileKind::Station { id, axis }, rail_type))?;
            area = area.union(Range::tile(p));
        }
        self.touch(area);
        Ok(self.stations.get(&id).copied().unwrap_or(area))
    }

    pub fn build_waypoint(
        &mut self,
        p: Point,
        id: u16,
        axis: Axis,
        rail_type: RailType,
    ) -> Result<(), MapError> {
        self.ensure_buildable(p)?;
        self.replace(p, Tile::with_kind(TileKind::Waypoint { id, axis }, rail_type))?;
        self.touch(Range::tile(p));
        Ok(())
    }

    /// Build a depot whose entrance faces `entrance`.
    pub fn build_depot(
        &mut self,
        p: Point,
        entrance: Dir,
        rail_type: RailType,
    ) -> Result<(), MapError> {
        self.ensure_buildable(p)?;
        self.replace(p, Tile::with_kind(TileKind::Depot { entrance }, rail_type))?;
        self.touch(Range::tile(p));
        Ok(())
    }

    pub fn build_level_crossing(
        &mut self,
        p: Point,
        rail_axis: Axis,
        rail_type: RailType,
    ) -> Result<(), MapError> {
        self.ensure_buildable(p)?;
        self.replace(p, Tile::with_kind(TileKind::Crossing { rail_axis }, rail_type))?;
        self.touch(Range::tile(p));
        Ok(())
    }

    /// Dig a tunnel between two aligned portals.
    pub fn build_tunnel(&mut self, a: Point, b: Point, rail_type: RailType) -> Result<(), MapError> {
        self.build_tunnel_bridge(a, b, false, rail_type)
    }

    /// Span a bridge between two aligned ramps.
    pub fn build_bridge(&mut self, a: Point, b: Point, rail_type: RailType) -> Result<(), MapError> {
        self.build_tunnel_bridge(a, b, true, rail_type)
    }

    fn build_tunnel_bridge(
        &mut self,
        a: Point,
        b: Point,
        bridge: bool,
        rail_type: RailType,
    ) -> Result<(), MapError> {
        let dir = Dir::between(a, b).ok_or(MapError::Misaligned(a, b))?;
        self.ensure_buildable(a)?;
        self.ensure_buildable(b)?;
        let head_a = TileKind::TunnelBridge {
            dir,
            far_end: b,
            bridge,
        };
        let head_b = TileKind::TunnelBridge {
            dir: dir.reverse(),
            far_end: a,
            bridge,
        };
        self.replace(a, Tile::with_kind(head_a, rail_type))?;
        self.replace(b, Tile::with_kind(head_b, rail_type))?;
        self.touch(Range::spanning(a, b));
        Ok(())
    }

    pub fn set_speed_limit(&mut self, p: Point, limit: Option<u16>) -> Result<(), MapError> {
        self.tile_mut(p)?.speed_limit = limit;
        self.touch(Range::tile(p));
        Ok(())
    }

    /// Demolish a tile. Tunnels and bridges go with both heads.
    pub fn clear(&mut self, p: Point) -> Result<(), MapError> {
        let kind = self.tile(p).ok_or(MapError::OutOfBounds(p))?.kind;
        let mut area = Range::tile(p);
        if let TileKind::TunnelBridge { far_end, .. } = kind {
            if self.idx(far_end).is_some() {
                self.replace(far_end, Tile::default())?;
            }
            area = area.union(Range::tile(far_end));
        }
        self.replace(p, Tile::default())?;
        self.touch(area);
        Ok(())
    }

    // -- state commands -----------------------------------------------------

    /// Change the aspect shown to vehicles travelling `td`.
    pub fn set_signal_state(
        &mut self,
        p: Point,
        td: Trackdir,
        state: SignalState,
    ) -> Result<(), MapError> {
        let track = td.track();
        let t = self.tile_mut(p)?;
        let sig = t.signals[track.index()]
            .as_mut()
            .filter(|s| s.faces(td))
            .ok_or(MapError::NoSignal(p, track))?;
        sig.green[td.is_reversed() as usize] = state == SignalState::Green;
        Ok(())
    }

    /// Reserve a track for a path. Returns `false` without reserving when
    /// it would overlap an existing reservation.
    pub fn reserve_track(&mut self, p: Point, track: Track) -> Result<bool, MapError> {
        let t = self.tile_mut(p)?;
        if !t.tracks.has(track) {
            return Err(MapError::NoTrack(p, track));
        }
        if t.reserved.overlaps_track(track) {
            return Ok(false);
        }
        t.reserved |= track.bits();
        Ok(true)
    }

    pub fn unreserve_track(&mut self, p: Point, track: Track) -> Result<(), MapError> {
        let t = self.tile_mut(p)?;
        t.reserved = t.reserved.without(track.bits());
        Ok(())
    }

    /// Drop every reservation on the map.
    pub fn clear_reservations(&mut self) {
        for t in &mut self.tiles {
            t.reserved = TrackBits::NONE;
        }
    }
}

impl TileMap for RailMap {
    fn bounds(&self) -> Range {
        Range::new(0, 0, self.width, self.height)
    }

    fn kind(&self, p: Point) -> TileKind {
        self.tile(p).map_or(TileKind::Void, |t| t.kind)
    }

    fn track_bits(&self, p: Point) -> TrackBits {
        self.tile(p).map_or(TrackBits::NONE, |t| t.tracks)
    }

    fn rail_type(&self, p: Point) -> RailType {
        self.tile(p).map_or(RailType::default(), |t| t.rail_type)
    }

    fn slope(&self, p: Point) -> Slope {
        self.tile(p).map_or(Slope::Flat, |t| t.slope)
    }

    fn signal(&self, p: Point, track: Track) -> Option<Signal> {
        self.tile(p).and_then(|t| t.signal(track).copied())
    }

    fn reserved_tracks(&self, p: Point) -> TrackBits {
        self.tile(p).map_or(TrackBits::NONE, |t| t.reserved)
    }

    fn speed_limit(&self, p: Point) -> Option<u16> {
        self.tile(p).and_then(|t| t.speed_limit)
    }

    fn station_area(&self, id: u16) -> Option<Range> {
        self.stations.get(&id).copied()
    }

    fn layout_epoch(&self) -> u64 {
        self.epoch
    }

    fn layout_changes_since(&self, epoch: u64) -> Option<&[LayoutChange]> {
        if epoch < self.journal_floor {
            return None;
        }
        let start = self.journal.partition_point(|c| c.epoch <= epoch);
        Some(&self.journal[start..])
    }
}

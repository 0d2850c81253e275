//! Track following: from a tile and trackdir to the trackdirs a vehicle can
//! take on the next tile.

use signalbox_core::{Dir, Point, RailTypes, TileKind, TileMap, Trackdir, TrackdirBits};

use crate::distance::manhattan;

/// Why [`Follower::follow`] found no way on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FollowError {
    #[error("no track continues")]
    NoWay,
    #[error("next tile has an incompatible rail type")]
    RailType,
    #[error("only 90 degree turns continue")]
    Turn90,
    #[error("every continuation is reserved")]
    Reserved,
}

/// Result of one follow step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Follow {
    pub old_tile: Point,
    pub old_td: Trackdir,
    /// Direction the vehicle leaves `old_tile` in.
    pub exit_dir: Dir,
    pub new_tile: Point,
    /// Usable trackdirs on `new_tile`, never empty.
    pub new_trackdirs: TrackdirBits,
    /// Tiles jumped over: tunnel or bridge body, or platform tiles before
    /// the platform end.
    pub tiles_skipped: u32,
    pub is_station: bool,
    /// Speed limit of `old_tile`.
    pub speed_limit: Option<u16>,
}

impl Follow {
    /// The stub follow a root node arrives by: nothing skipped, standing on
    /// `tile` already.
    pub fn origin(map: &dyn TileMap, tile: Point, td: Trackdir) -> Self {
        Self {
            old_tile: tile,
            old_td: td,
            exit_dir: td.exit(),
            new_tile: tile,
            new_trackdirs: td.bits(),
            tiles_skipped: 0,
            is_station: false,
            speed_limit: map.speed_limit(tile),
        }
    }

    /// Whether the follow turned the vehicle around on the same tile.
    #[inline]
    pub fn is_reversal(&self) -> bool {
        self.old_tile == self.new_tile
    }
}

/// Follows track for one vehicle's rail types and turning rules.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Follower {
    pub rail_types: RailTypes,
    pub forbid_90_deg: bool,
    /// Skip trackdirs that are reserved or overlap a reservation.
    pub mask_reserved: bool,
}

impl Follower {
    pub fn new(rail_types: RailTypes, forbid_90_deg: bool) -> Self {
        Self {
            rail_types,
            forbid_90_deg,
            mask_reserved: false,
        }
    }

    /// The same follower with reservation masking switched on or off.
    pub fn masking(mut self, on: bool) -> Self {
        self.mask_reserved = on;
        self
    }

    /// Advance one step from `tile` travelling `td`.
    pub fn follow(
        &self,
        map: &dyn TileMap,
        tile: Point,
        td: Trackdir,
    ) -> Result<Follow, FollowError> {
        let exit = td.exit();
        let mut f = Follow {
            old_tile: tile,
            old_td: td,
            exit_dir: exit,
            new_tile: tile,
            new_trackdirs: TrackdirBits::NONE,
            tiles_skipped: 0,
            is_station: false,
            speed_limit: map.speed_limit(tile),
        };

        // Depots are dead ends: anything not heading out turns around.
        if let TileKind::Depot { entrance } = map.kind(tile) {
            if entrance != exit {
                f.new_trackdirs = td.reverse().bits();
                return Ok(f);
            }
        }

        let jumped = match map.kind(tile) {
            TileKind::TunnelBridge { dir, far_end, .. } if dir == exit => {
                f.new_tile = far_end;
                f.tiles_skipped = (manhattan(tile, far_end) - 1).max(0) as u32;
                true
            }
            _ => {
                f.new_tile = exit.step(tile);
                false
            }
        };

        let mut tds =
            map.track_bits(f.new_tile).trackdirs() & TrackdirBits::reachable_from(exit);
        if tds.is_empty() {
            return Err(FollowError::NoWay);
        }
        if !self.rail_types.has(map.rail_type(f.new_tile)) {
            return Err(FollowError::RailType);
        }
        match map.kind(f.new_tile) {
            TileKind::Depot { entrance } if entrance.reverse() != exit => {
                return Err(FollowError::NoWay);
            }
            // Tunnel and bridge heads are entered from the open side only.
            TileKind::TunnelBridge { dir, .. } if !jumped && dir != exit => {
                return Err(FollowError::NoWay);
            }
            TileKind::Station { .. } => {
                let len = map.platform_length(f.new_tile, exit).max(1);
                f.is_station = true;
                f.tiles_skipped = len - 1;
                f.new_tile = f.new_tile + exit.offset() * (len as i32 - 1);
            }
            _ => {}
        }

        if self.forbid_90_deg {
            tds = tds.without(td.turn90_successors());
            if tds.is_empty() {
                return Err(FollowError::Turn90);
            }
        }
        f.new_trackdirs = tds;

        if self.mask_reserved {
            self.mask_reserved_tracks(map, &mut f)?;
        }
        Ok(f)
    }

    fn mask_reserved_tracks(&self, map: &dyn TileMap, f: &mut Follow) -> Result<(), FollowError> {
        if f.is_station {
            let back = f.exit_dir.reverse().offset();
            if (0..=f.tiles_skipped as i32).any(|i| map.is_station_reserved(f.new_tile + back * i)) {
                return Err(FollowError::Reserved);
            }
        }
        let reserved = map.reserved_tracks(f.new_tile);
        if reserved.is_empty() {
            return Ok(());
        }
        let mut tds = f.new_trackdirs.without(reserved.trackdirs());
        for td in tds.iter() {
            if (reserved | td.track().bits()).overlapping() {
                tds = tds.without(td.bits());
            }
        }
        if tds.is_empty() {
            return Err(FollowError::Reserved);
        }
        f.new_trackdirs = tds;
        Ok(())
    }
}

//! Path-signal helpers: where a train may stop and wait.

use signalbox_core::{Point, SignalType, TileKind, TileMap, Trackdir};

use crate::follower::Follower;

/// Whether a train on `tile` travelling `td` stops at a spot it can wait at:
/// inside a depot, in front of a block signal, or in front of a path signal
/// on the next tile. With `include_line_end`, the end of the line and the
/// back of a one-way path signal count as well.
pub fn is_safe_waiting_position(
    map: &dyn TileMap,
    follower: &Follower,
    tile: Point,
    td: Trackdir,
    include_line_end: bool,
) -> bool {
    let kind = map.kind(tile);
    if kind.is_depot() {
        return true;
    }
    if kind == TileKind::Rail && map.has_signal_on(tile, td) && !map.is_pbs_signal(tile, td) {
        return true;
    }
    let Ok(next) = follower.masking(false).follow(map, tile, td) else {
        return include_line_end;
    };
    let Some(ntd) = next.new_trackdirs.single() else {
        return false;
    };
    if map.kind(next.new_tile) != TileKind::Rail {
        return false;
    }
    if map.is_pbs_signal(next.new_tile, ntd) {
        return true;
    }
    if map.has_signal_on(next.new_tile, ntd.reverse())
        && map.signal_type(next.new_tile, ntd.track()) == Some(SignalType::PbsOneWay)
    {
        return include_line_end;
    }
    false
}

/// Whether the waiting spot on `tile` travelling `td` is clear of other
/// reservations, including the track just beyond it.
pub fn is_waiting_position_free(
    map: &dyn TileMap,
    follower: &Follower,
    tile: Point,
    td: Trackdir,
) -> bool {
    if map.reserved_tracks(tile).overlaps_track(td.track()) {
        return false;
    }
    let kind = map.kind(tile);
    if kind.is_depot() {
        return true;
    }
    if kind == TileKind::Rail && map.has_signal_on(tile, td) && !map.is_pbs_signal(tile, td) {
        return true;
    }
    match follower.masking(false).follow(map, tile, td) {
        Ok(next) => !map
            .reserved_tracks(next.new_tile)
            .intersects(next.new_trackdirs.tracks()),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalbox_core::{Layout, RailMap, RailType, Track};

    fn follower() -> Follower {
        Follower::new(RailType::RAIL.mask(), false)
    }

    fn line() -> RailMap {
        Layout::parse_map("-----").unwrap()
    }

    #[test]
    fn path_signal_ahead_is_safe() {
        let mut m = line();
        m.build_signal(Point::new(3, 0), Trackdir::WestToEast, SignalType::Pbs, false)
            .unwrap();
        let f = follower();
        assert!(is_safe_waiting_position(&m, &f, Point::new(2, 0), Trackdir::WestToEast, false));
        assert!(!is_safe_waiting_position(&m, &f, Point::new(1, 0), Trackdir::WestToEast, false));
    }

    #[test]
    fn block_signal_tile_is_safe() {
        let mut m = line();
        m.build_signal(Point::new(2, 0), Trackdir::WestToEast, SignalType::Block, false)
            .unwrap();
        assert!(is_safe_waiting_position(
            &m,
            &follower(),
            Point::new(2, 0),
            Trackdir::WestToEast,
            false
        ));
    }

    #[test]
    fn line_end_only_when_included() {
        let m = line();
        let f = follower();
        let end = Point::new(4, 0);
        assert!(!is_safe_waiting_position(&m, &f, end, Trackdir::WestToEast, false));
        assert!(is_safe_waiting_position(&m, &f, end, Trackdir::WestToEast, true));
    }

    #[test]
    fn back_of_oneway_path_signal() {
        let mut m = line();
        m.build_signal(Point::new(3, 0), Trackdir::EastToWest, SignalType::PbsOneWay, false)
            .unwrap();
        let f = follower();
        let p = Point::new(2, 0);
        assert!(!is_safe_waiting_position(&m, &f, p, Trackdir::WestToEast, false));
        assert!(is_safe_waiting_position(&m, &f, p, Trackdir::WestToEast, true));
    }

    #[test]
    fn reservations_make_positions_busy() {
        let mut m = line();
        let f = follower();
        let p = Point::new(2, 0);
        assert!(is_waiting_position_free(&m, &f, p, Trackdir::WestToEast));
        m.reserve_track(Point::new(3, 0), Track::Horizontal).unwrap();
        assert!(!is_waiting_position_free(&m, &f, p, Trackdir::WestToEast));
        m.reserve_track(p, Track::Horizontal).unwrap();
        assert!(!is_waiting_position_free(&m, &f, p, Trackdir::EastToWest));
    }
}

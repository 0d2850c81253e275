use signalbox_core::{Point, Range, TILE_CORNER_LENGTH, Trackdir};

/// Manhattan (L1) distance between two points.
#[inline]
pub fn manhattan(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Lower bound on the track cost from leaving `tile` along `td` to any tile
/// of `target`.
///
/// Works in half-tile coordinates: the vehicle sits on the edge it exits
/// through, the target is its nearest tile centre. Diagonal half-steps cost
/// a corner piece, straight half-steps half a straight tile.
pub fn rail_estimate(tile: Point, td: Trackdir, target: Range) -> i32 {
    if target.is_empty() {
        return 0;
    }
    let exit = td.exit().offset();
    let x1 = 2 * tile.x + exit.x;
    let y1 = 2 * tile.y + exit.y;
    let x2 = x1.clamp(2 * target.min.x, 2 * (target.max.x - 1));
    let y2 = y1.clamp(2 * target.min.y, 2 * (target.max.y - 1));
    let dx = (x1 - x2).abs();
    let dy = (y1 - y2).abs();
    let dmin = dx.min(dy);
    let dxy = (dx - dy).abs();
    (dmin * TILE_CORNER_LENGTH + (dxy - 1) * 50).max(0)
}

use signalbox_core::Point;

/// Why a query produced no route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("origin {tile} carries none of the requested trackdirs")]
    InvalidOrigin { tile: Point },
    #[error("no path to the destination")]
    NoPath,
    #[error("search gave up after closing {limit} nodes")]
    BudgetExceeded { limit: usize },
    #[error("every way on is blocked by a red two-way signal")]
    BlockedBySignal,
    #[error("the vehicle's order has no destination on this map")]
    NoDestination,
}

//! The vehicle side of a query.

use signalbox_core::{Point, RailType, RailTypes, TILE_SIZE};

/// What the vehicle is currently heading for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Order {
    #[default]
    None,
    Station(u16),
    Waypoint(u16),
    Depot(Point),
}

/// Vehicle properties the cost engine reads.
pub trait Vehicle {
    /// Top speed of the vehicle.
    fn max_speed(&self) -> u16;

    /// Speed cap set by the current order.
    fn order_max_speed(&self) -> u16 {
        u16::MAX
    }

    /// Length of the whole train, in [`TILE_SIZE`] units per tile.
    fn total_length(&self) -> u32;

    fn compatible_rail_types(&self) -> RailTypes;

    fn order(&self) -> Order {
        Order::None
    }

    /// Effective speed cap, `min(max_speed, order_max_speed)`.
    fn speed_cap(&self) -> u16 {
        self.max_speed().min(self.order_max_speed())
    }

    /// Length rounded up to whole tiles.
    fn length_in_tiles(&self) -> u32 {
        self.total_length().div_ceil(TILE_SIZE)
    }
}

/// A plain train description.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Train {
    pub max_speed: u16,
    pub order_max_speed: Option<u16>,
    /// In [`TILE_SIZE`] units.
    pub length: u32,
    pub rail_types: RailTypes,
    pub order: Order,
}

impl Train {
    /// A train `tiles` long running on plain rail.
    pub fn new(tiles: u32) -> Self {
        Self {
            max_speed: 160,
            order_max_speed: None,
            length: tiles * TILE_SIZE,
            rail_types: RailType::RAIL.mask(),
            order: Order::None,
        }
    }

    pub fn with_max_speed(mut self, speed: u16) -> Self {
        self.max_speed = speed;
        self
    }

    pub fn with_rail_types(mut self, rail_types: RailTypes) -> Self {
        self.rail_types = rail_types;
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }
}

impl Vehicle for Train {
    fn max_speed(&self) -> u16 {
        self.max_speed
    }

    fn order_max_speed(&self) -> u16 {
        self.order_max_speed.unwrap_or(u16::MAX)
    }

    fn total_length(&self) -> u32 {
        self.length
    }

    fn compatible_rail_types(&self) -> RailTypes {
        self.rail_types
    }

    fn order(&self) -> Order {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_cap_and_length() {
        let mut t = Train::new(3).with_max_speed(120);
        assert_eq!(t.speed_cap(), 120);
        t.order_max_speed = Some(80);
        assert_eq!(t.speed_cap(), 80);
        assert_eq!(t.length_in_tiles(), 3);
        t.length += 1;
        assert_eq!(t.length_in_tiles(), 4);
    }
}

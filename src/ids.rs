//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                $name(value)
            }

            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a growing plot
    PlotId
);
entity_id!(
    /// Identifier of a plot boundary
    PolygonId
);
entity_id!(
    /// Stable identifier of a pin. Not to be confused with its display sequence number.
    PinId
);
entity_id!(SensorId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Plot,
    Polygon,
    Pin,
    Sensor,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Plot => "plot",
            EntityKind::Polygon => "polygon",
            EntityKind::Pin => "pin",
            EntityKind::Sensor => "sensor",
        })
    }
}

/// Issues identifiers per entity kind, starting at 1.
///
/// Counters only ever move forward, so an id is never handed out twice within
/// a session, even after the entity it named was deleted or a change was
/// rolled back. The counters are saved with the project so this also holds
/// across a save/load cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    /// Last issued id for each kind, 0 when nothing was issued yet
    last_plot: u64,
    last_polygon: u64,
    last_pin: u64,
    last_sensor: u64,
}

impl IdAllocator {
    fn counter_mut(&mut self, kind: EntityKind) -> &mut u64 {
        match kind {
            EntityKind::Plot => &mut self.last_plot,
            EntityKind::Polygon => &mut self.last_polygon,
            EntityKind::Pin => &mut self.last_pin,
            EntityKind::Sensor => &mut self.last_sensor,
        }
    }

    /// Next raw identifier for the given kind
    pub fn next_id(&mut self, kind: EntityKind) -> u64 {
        let counter = self.counter_mut(kind);
        *counter += 1;
        *counter
    }

    /// Last issued identifier for the given kind, 0 if none
    pub fn last_id(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Plot => self.last_plot,
            EntityKind::Polygon => self.last_polygon,
            EntityKind::Pin => self.last_pin,
            EntityKind::Sensor => self.last_sensor,
        }
    }

    /// Make sure future ids of this kind are above `id`.
    /// Used when entities are loaded from a file that may carry stale counters.
    pub fn reserve_through(&mut self, kind: EntityKind, id: u64) {
        let counter = self.counter_mut(kind);
        if *counter < id {
            *counter = id;
        }
    }

    pub fn next_plot_id(&mut self) -> PlotId {
        PlotId(self.next_id(EntityKind::Plot))
    }

    pub fn next_polygon_id(&mut self) -> PolygonId {
        PolygonId(self.next_id(EntityKind::Polygon))
    }

    pub fn next_pin_id(&mut self) -> PinId {
        PinId(self.next_id(EntityKind::Pin))
    }

    pub fn next_sensor_id(&mut self) -> SensorId {
        SensorId(self.next_id(EntityKind::Sensor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase_per_kind() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.next_plot_id(), PlotId::new(1));
        assert_eq!(ids.next_plot_id(), PlotId::new(2));
        assert_eq!(ids.next_pin_id(), PinId::new(1));
        assert_eq!(ids.next_id(EntityKind::Plot), 3);
        assert_eq!(ids.last_id(EntityKind::Sensor), 0);
    }

    #[test]
    fn reserve_through_never_moves_backwards() {
        let mut ids = IdAllocator::default();
        ids.reserve_through(EntityKind::Polygon, 7);
        assert_eq!(ids.next_polygon_id(), PolygonId::new(8));
        ids.reserve_through(EntityKind::Polygon, 2);
        assert_eq!(ids.next_polygon_id(), PolygonId::new(9));
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&SensorId::new(42)).unwrap(), "42");
        let id: PinId = serde_json::from_str("5").unwrap();
        assert_eq!(id, PinId::new(5));
    }
}

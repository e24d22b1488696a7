//! Route definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dmx::BusId;

/// Which way a route carries data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Art-Net universe drives the bus
    ToDmx,
    /// Bus changes are published as an Art-Net universe
    ToArtnet,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToDmx => write!(f, "Art-Net -> DMX"),
            Direction::ToArtnet => write!(f, "DMX -> Art-Net"),
        }
    }
}

/// A mapping between one DMX bus and one Art-Net universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    pub bus: BusId,
    pub universe: u8,
    pub direction: Direction,
    pub enabled: bool,
}

impl Route {
    pub fn new(bus: BusId, universe: u8, direction: Direction, enabled: bool) -> Self {
        Self {
            bus,
            universe,
            direction,
            enabled,
        }
    }

    /// Whether this route takes part in dispatch in the given direction
    pub fn is_active(&self, direction: Direction) -> bool {
        self.enabled && self.direction == direction
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <-> universe {} ({}{})",
            self.bus,
            self.universe,
            self.direction,
            if self.enabled { "" } else { ", disabled" }
        )
    }
}

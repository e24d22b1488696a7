//! Route table
//!
//! Maps Art-Net universes to DMX buses and back. A bus may appear in at most
//! one route; several buses may listen to the same inbound universe.

use std::collections::{BTreeSet, HashMap};

use crate::constants::MAX_UNIVERSE;
use crate::dmx::{BusId, DmxBus, DmxDriver, UniverseBuffers};
use crate::error::RouteError;
use crate::routing::route::{Direction, Route};

/// Immutable-after-startup set of routes
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    /// Routes in registration order
    routes: Vec<Route>,
    /// Index into `routes` keyed by bus
    by_bus: HashMap<BusId, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a list of routes, failing on the first conflict
    pub fn from_routes(routes: impl IntoIterator<Item = Route>) -> Result<Self, RouteError> {
        let mut table = Self::new();
        for route in routes {
            table.add_route(route.bus, route.universe, route.direction, route.enabled)?;
        }
        Ok(table)
    }

    /// Register a route
    pub fn add_route(
        &mut self,
        bus: BusId,
        universe: u8,
        direction: Direction,
        enabled: bool,
    ) -> Result<(), RouteError> {
        if universe > MAX_UNIVERSE {
            return Err(RouteError::UniverseOutOfRange(universe));
        }
        if self.by_bus.contains_key(&bus) {
            return Err(RouteError::DuplicateRoute(bus));
        }

        self.by_bus.insert(bus, self.routes.len());
        self.routes.push(Route::new(bus, universe, direction, enabled));
        Ok(())
    }

    /// Copy an inbound universe onto every enabled ToDmx bus listening to it
    ///
    /// Missing or unavailable buses are skipped. Returns the number of buses
    /// written.
    pub fn dispatch_inbound<D>(&self, universe: u8, data: &[u8], driver: &mut D) -> usize
    where
        D: DmxDriver + ?Sized,
    {
        let mut written = 0;

        for route in &self.routes {
            if route.universe != universe || !route.is_active(Direction::ToDmx) {
                continue;
            }

            match driver.bus_mut(route.bus) {
                Some(bus) if bus.is_available() => {
                    bus.write_universe(data);
                    written += 1;
                    tracing::trace!("Universe {} -> {}", universe, route.bus);
                }
                _ => {
                    tracing::trace!("{} unavailable, skipping universe {}", route.bus, universe);
                }
            }
        }

        written
    }

    /// Copy one changed bus channel into the bus's ToArtnet universe
    ///
    /// Only that slot is touched, so values written through output channels
    /// on the same universe survive. Returns the universe that was dirtied,
    /// if the bus has an enabled ToArtnet route and the channel is valid.
    pub fn dispatch_outbound(
        &self,
        bus: BusId,
        channel: u16,
        value: u8,
        buffers: &mut UniverseBuffers,
    ) -> Option<u8> {
        let route = self.route_for_bus(bus)?;
        if !route.is_active(Direction::ToArtnet) {
            return None;
        }

        buffers
            .ensure(route.universe)
            .set(channel, value)
            .then_some(route.universe)
    }

    /// The route registered for a bus, enabled or not
    pub fn route_for_bus(&self, bus: BusId) -> Option<&Route> {
        self.by_bus.get(&bus).map(|&index| &self.routes[index])
    }

    /// All routes in registration order, disabled ones included
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Every universe referenced by a route
    pub fn universes(&self) -> BTreeSet<u8> {
        self.routes.iter().map(|route| route.universe).collect()
    }

    /// Universes published by enabled ToArtnet routes
    pub fn outbound_universes(&self) -> BTreeSet<u8> {
        self.routes
            .iter()
            .filter(|route| route.is_active(Direction::ToArtnet))
            .map(|route| route.universe)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

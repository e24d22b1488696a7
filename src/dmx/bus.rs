//! DMX bus driver seam
//!
//! The bridge talks to physical buses through [`DmxBus`] and finds them
//! through a [`DmxDriver`]. [`VirtualBus`] is an in-memory bus that drivers
//! running on their own thread can share with the node.

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constants::DMX_CHANNELS;

/// Identifier of a DMX bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(pub u16);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus{}", self.0)
    }
}

/// A channel value changed on a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusChange {
    pub bus: BusId,
    pub channel: u16,
    pub value: u8,
}

/// A single DMX512 bus
pub trait DmxBus: Send {
    /// Read a channel (1-based)
    fn read_channel(&self, channel: u16) -> Option<u8>;

    /// Write a channel (1-based)
    fn write_channel(&mut self, channel: u16, value: u8);

    /// Whether the bus can currently be driven
    fn is_available(&self) -> bool {
        true
    }

    /// Write a whole frame starting at channel 1
    fn write_universe(&mut self, data: &[u8]) {
        for (index, &value) in data.iter().take(DMX_CHANNELS).enumerate() {
            self.write_channel(index as u16 + 1, value);
        }
    }
}

/// Lookup of buses by id
pub trait DmxDriver {
    fn bus(&self, id: BusId) -> Option<&dyn DmxBus>;

    fn bus_mut(&mut self, id: BusId) -> Option<&mut dyn DmxBus>;
}

/// Owned set of buses
#[derive(Default)]
pub struct BusSet {
    buses: HashMap<BusId, Box<dyn DmxBus>>,
}

impl BusSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bus, replacing any previous bus with the same id
    pub fn insert(&mut self, id: BusId, bus: impl DmxBus + 'static) {
        self.buses.insert(id, Box::new(bus));
    }

    /// Remove a bus; routes to it become no-ops
    pub fn remove(&mut self, id: BusId) -> bool {
        self.buses.remove(&id).is_some()
    }

    pub fn ids(&self) -> Vec<BusId> {
        let mut ids: Vec<BusId> = self.buses.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}

impl DmxDriver for BusSet {
    fn bus(&self, id: BusId) -> Option<&dyn DmxBus> {
        let bus: &dyn DmxBus = &**self.buses.get(&id)?;
        Some(bus)
    }

    fn bus_mut(&mut self, id: BusId) -> Option<&mut dyn DmxBus> {
        let bus: &mut dyn DmxBus = &mut **self.buses.get_mut(&id)?;
        Some(bus)
    }
}

struct VirtualBusState {
    slots: [u8; DMX_CHANNELS],
    available: bool,
    writes: u64,
}

/// In-memory bus
///
/// Clones share state, so a driver thread can hold one handle and inject
/// traffic while the node holds another.
#[derive(Clone)]
pub struct VirtualBus {
    id: BusId,
    state: Arc<Mutex<VirtualBusState>>,
    notifier: Option<Sender<BusChange>>,
}

impl VirtualBus {
    pub fn new(id: BusId) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(VirtualBusState {
                slots: [0u8; DMX_CHANNELS],
                available: true,
                writes: 0,
            })),
            notifier: None,
        }
    }

    /// Create a bus that reports injected changes on `notifier`
    pub fn with_notifier(id: BusId, notifier: Sender<BusChange>) -> Self {
        let mut bus = Self::new(id);
        bus.notifier = Some(notifier);
        bus
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    /// Simulate traffic originating on the bus side
    ///
    /// Returns the change event, or `None` when the value did not change.
    pub fn inject(&self, channel: u16, value: u8) -> Option<BusChange> {
        let index = (channel as usize).checked_sub(1)?;
        {
            let mut state = self.state.lock();
            let slot = state.slots.get_mut(index)?;
            if *slot == value {
                return None;
            }
            *slot = value;
        }

        let change = BusChange {
            bus: self.id,
            channel,
            value,
        };
        if let Some(notifier) = &self.notifier {
            if notifier.try_send(change).is_err() {
                tracing::warn!("{}: change queue full, dropping channel {} update", self.id, channel);
            }
        }
        Some(change)
    }

    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    /// Number of channel writes received from the bridge
    pub fn writes(&self) -> u64 {
        self.state.lock().writes
    }

    pub fn snapshot(&self) -> [u8; DMX_CHANNELS] {
        self.state.lock().slots
    }
}

impl DmxBus for VirtualBus {
    fn read_channel(&self, channel: u16) -> Option<u8> {
        let index = (channel as usize).checked_sub(1)?;
        self.state.lock().slots.get(index).copied()
    }

    fn write_channel(&mut self, channel: u16, value: u8) {
        let Some(index) = (channel as usize).checked_sub(1) else {
            return;
        };
        let mut state = self.state.lock();
        if let Some(slot) = state.slots.get_mut(index) {
            *slot = value;
            state.writes += 1;
        }
    }

    fn is_available(&self) -> bool {
        self.state.lock().available
    }

    fn write_universe(&mut self, data: &[u8]) {
        let len = data.len().min(DMX_CHANNELS);
        let mut state = self.state.lock();
        state.slots[..len].copy_from_slice(&data[..len]);
        state.writes += len as u64;
    }
}

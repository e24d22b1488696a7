//! DMX side of the bridge
//!
//! Universe buffers shared by the router, the scheduler and the channel
//! views, plus the bus driver seam.

pub mod buffer;
pub mod bus;

pub use buffer::{FlushState, UniverseBuffer, UniverseBuffers};
pub use bus::{BusChange, BusId, BusSet, DmxBus, DmxDriver, VirtualBus};

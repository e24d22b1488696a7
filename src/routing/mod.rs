//! Addressing and routing
//!
//! Decides which inbound frames belong to the node and where universe data
//! flows between Art-Net and the DMX buses.

pub mod filter;
pub mod route;
pub mod table;

pub use filter::{AddressFilter, NodeAddress};
pub use route::{Direction, Route};
pub use table::RouteTable;

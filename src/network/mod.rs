//! Network subsystem for Art-Net UDP transport

pub mod transport;
pub mod udp;

pub use transport::{MemoryTransport, SentFrame, Transport, UdpTransport};
pub use udp::create_socket;

//! # Art-Net DMX Bridge
//!
//! Bridges Art-Net (DMX512 over UDP) with one or more DMX512 buses and
//! exposes individual channels as sensors and outputs.
//!
//! ## Architecture Overview
//!
//! ```text
//!            Art-Net (UDP 6454)                          DMX buses
//!  ┌──────────────────────────────────┐          ┌──────────────────────┐
//!  │  network::UdpTransport (socket2) │          │ dmx::bus (DmxDriver) │
//!  └───────┬──────────────────▲───────┘          └────▲────────────┬────┘
//!          │ ArtDmx            │ flush                 │ ToDmx      │ BusChange
//!          ▼                   │                       │            ▼
//!  ┌───────────────────────────┴───────────────────────┴────────────────────┐
//!  │                               node::Node                               │
//!  │                                                                        │
//!  │  ┌───────────────┐   ┌─────────────────────┐   ┌───────────────────┐   │
//!  │  │ AddressFilter │──▶│ UniverseBuffers     │◀─▶│ RouteTable        │   │
//!  │  │ (net/subnet)  │   │ 512 slots + dirty   │   │ one route per bus │   │
//!  │  └───────────────┘   └──▲───────────┬──────┘   └───────────────────┘   │
//!  │                         │           │                                  │
//!  │       ┌─────────────────┴──┐   ┌────▼───────────┐                      │
//!  │       │ channel views      │   │ FlushScheduler │                      │
//!  │       │ Output / Sensor    │   │ Idle ⇄ Dirty   │                      │
//!  │       └────────────────────┘   └────────────────┘                      │
//!  └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one cooperative loop (see [`runtime`]), so the node
//! mutates its buffers without locking.

pub mod channel;
pub mod config;
pub mod dmx;
pub mod error;
pub mod network;
pub mod node;
pub mod protocol;
pub mod routing;
pub mod runtime;
pub mod scheduler;
#[cfg(feature = "ui")]
pub mod ui;

pub use error::{Error, Result};
pub use node::Node;

/// Application-wide constants
pub mod constants {
    /// Number of channel slots in a DMX512 universe
    pub const DMX_CHANNELS: usize = 512;

    /// UDP port used by Art-Net
    pub const ARTNET_PORT: u16 = 6454;

    /// Packet identifier at the start of every Art-Net packet
    pub const ARTNET_ID: &[u8; 8] = b"Art-Net\0";

    /// OpDmx opcode
    pub const OP_DMX: u16 = 0x5000;

    /// Art-Net protocol revision written into outgoing frames
    pub const PROTOCOL_VERSION: u16 = 14;

    /// Size of the ArtDmx header preceding the channel data
    pub const ARTDMX_HEADER_LEN: usize = 18;

    /// Highest valid net (7 bits)
    pub const MAX_NET: u8 = 127;

    /// Highest valid subnet (4 bits)
    pub const MAX_SUBNET: u8 = 15;

    /// Highest valid universe within a subnet (4 bits)
    pub const MAX_UNIVERSE: u8 = 15;

    /// Default flush period in milliseconds
    pub const DEFAULT_FLUSH_PERIOD_MS: u64 = 100;

    /// Default HTTP port for the status API
    pub const DEFAULT_HTTP_PORT: u16 = 8080;

    /// How often the run loop drains pending bus change events
    pub const BUS_POLL_INTERVAL_MS: u64 = 5;

    /// Interval between periodic statistics log lines
    pub const STATS_LOG_INTERVAL_SECS: u64 = 30;

    /// Maximum UDP datagram size accepted by the receiver
    pub const MAX_PACKET_SIZE: usize = 1472;
}

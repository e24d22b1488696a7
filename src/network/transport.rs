//! Outbound frame transport
//!
//! The node hands finished universes to a [`Transport`]. Sends are
//! fire-and-forget: a failed send is reported but never retried, the next
//! flush of the universe supersedes it.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::constants::{ARTNET_PORT, DMX_CHANNELS};
use crate::error::NetworkError;
use crate::protocol::{ArtDmx, PortAddress};

/// Sends universe frames to the Art-Net network
pub trait Transport {
    fn send(
        &mut self,
        target: Ipv4Addr,
        port: PortAddress,
        data: &[u8; DMX_CHANNELS],
    ) -> Result<(), NetworkError>;
}

/// Art-Net over a shared tokio UDP socket
pub struct UdpTransport {
    socket: Arc<tokio::net::UdpSocket>,
    /// Destination UDP port
    port: u16,
    /// Next sequence number per port-address
    sequences: HashMap<u16, u8>,
    packets_sent: u64,
    bytes_sent: u64,
}

impl UdpTransport {
    pub fn new(socket: Arc<tokio::net::UdpSocket>) -> Self {
        Self::with_port(socket, ARTNET_PORT)
    }

    /// Send to a non-standard UDP port
    pub fn with_port(socket: Arc<tokio::net::UdpSocket>, port: u16) -> Self {
        Self {
            socket,
            port,
            sequences: HashMap::new(),
            packets_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Sequence numbers run 1..=255; 0 would disable sequencing on receivers
    fn next_sequence(&mut self, port: PortAddress) -> u8 {
        let slot = self.sequences.entry(port.to_raw()).or_insert(0);
        *slot = if *slot == u8::MAX { 1 } else { *slot + 1 };
        *slot
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}

impl Transport for UdpTransport {
    fn send(
        &mut self,
        target: Ipv4Addr,
        port: PortAddress,
        data: &[u8; DMX_CHANNELS],
    ) -> Result<(), NetworkError> {
        let sequence = self.next_sequence(port);
        let packet = ArtDmx::new(port, sequence, data).encode();
        let dest = SocketAddr::new(target.into(), self.port);

        let sent = self
            .socket
            .try_send_to(&packet, dest)
            .map_err(|e| NetworkError::SendFailed(format!("{}: {}", dest, e)))?;

        self.packets_sent += 1;
        self.bytes_sent += sent as u64;
        tracing::trace!("Sent Art-Net DMX packet for {} to {}", port, dest);

        Ok(())
    }
}

/// A frame captured by [`MemoryTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub target: Ipv4Addr,
    pub port: PortAddress,
    pub data: Vec<u8>,
}

/// Transport that records frames instead of sending them
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Vec<SentFrame>,
    fail: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail
    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }

    pub fn sent(&self) -> &[SentFrame] {
        &self.sent
    }

    pub fn take(&mut self) -> Vec<SentFrame> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for MemoryTransport {
    fn send(
        &mut self,
        target: Ipv4Addr,
        port: PortAddress,
        data: &[u8; DMX_CHANNELS],
    ) -> Result<(), NetworkError> {
        if self.fail {
            return Err(NetworkError::SendFailed("memory transport set to fail".into()));
        }
        self.sent.push(SentFrame {
            target,
            port,
            data: data.to_vec(),
        });
        Ok(())
    }
}

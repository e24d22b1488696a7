//! Art-Net wire format
//!
//! Only OpDmx is understood. Layout of an ArtDmx packet:
//!
//! ```text
//! offset  size  field
//!      0     8  "Art-Net\0"
//!      8     2  opcode (LE, 0x5000)
//!     10     2  protocol version (BE)
//!     12     1  sequence
//!     13     1  physical
//!     14     2  port-address (LE)
//!     16     2  data length (BE, <= 512)
//!     18     n  channel data
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    ARTDMX_HEADER_LEN, ARTNET_ID, DMX_CHANNELS, OP_DMX, PROTOCOL_VERSION,
};
use crate::error::ProtocolError;

/// Full 15-bit Art-Net port-address split into its three tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortAddress {
    pub net: u8,
    pub subnet: u8,
    pub universe: u8,
}

impl PortAddress {
    pub fn new(net: u8, subnet: u8, universe: u8) -> Self {
        Self {
            net,
            subnet,
            universe,
        }
    }

    /// Split a raw port-address: net in bits 14-8, subnet 7-4, universe 3-0
    pub fn from_raw(raw: u16) -> Self {
        Self {
            net: ((raw >> 8) & 0x7F) as u8,
            subnet: ((raw >> 4) & 0x0F) as u8,
            universe: (raw & 0x0F) as u8,
        }
    }

    /// Compose `(net << 8) | (subnet << 4) | universe`
    pub fn to_raw(self) -> u16 {
        (u16::from(self.net & 0x7F) << 8)
            | (u16::from(self.subnet & 0x0F) << 4)
            | u16::from(self.universe & 0x0F)
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.net, self.subnet, self.universe)
    }
}

/// A decoded ArtDmx frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtDmx {
    pub sequence: u8,
    pub physical: u8,
    pub port_address: PortAddress,
    pub data: Bytes,
}

impl ArtDmx {
    /// Build a full 512-channel frame
    pub fn new(port_address: PortAddress, sequence: u8, data: &[u8; DMX_CHANNELS]) -> Self {
        Self {
            sequence,
            physical: 0,
            port_address,
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Decode an ArtDmx packet, rejecting anything malformed
    pub fn decode(packet: &[u8]) -> Result<Self, ProtocolError> {
        if packet.len() < 10 {
            return Err(ProtocolError::TooShort(packet.len()));
        }

        if &packet[0..8] != ARTNET_ID {
            return Err(ProtocolError::InvalidIdentifier);
        }

        let opcode = u16::from_le_bytes([packet[8], packet[9]]);
        if opcode != OP_DMX {
            return Err(ProtocolError::UnsupportedOpcode(opcode));
        }

        if packet.len() < ARTDMX_HEADER_LEN {
            return Err(ProtocolError::TooShort(packet.len()));
        }

        let length = u16::from_be_bytes([packet[16], packet[17]]);
        if length as usize > DMX_CHANNELS {
            return Err(ProtocolError::LengthTooLarge(length));
        }

        let available = packet.len() - ARTDMX_HEADER_LEN;
        if available < length as usize {
            return Err(ProtocolError::Truncated {
                declared: length,
                available,
            });
        }

        let end = ARTDMX_HEADER_LEN + length as usize;
        Ok(Self {
            sequence: packet[12],
            physical: packet[13],
            port_address: PortAddress::from_raw(u16::from_le_bytes([packet[14], packet[15]])),
            data: Bytes::copy_from_slice(&packet[ARTDMX_HEADER_LEN..end]),
        })
    }

    /// Encode into a datagram ready for the socket
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ARTDMX_HEADER_LEN + self.data.len());

        buf.put_slice(ARTNET_ID);
        buf.put_u16_le(OP_DMX);
        buf.put_u16(PROTOCOL_VERSION);
        buf.put_u8(self.sequence);
        buf.put_u8(self.physical);
        buf.put_u16_le(self.port_address.to_raw());
        buf.put_u16(self.data.len() as u16);
        buf.put_slice(&self.data);

        buf.freeze()
    }
}

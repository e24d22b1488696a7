//! Outbound flush scheduling
//!
//! Each outbound universe buffer is either `Idle` or `Dirty`. Once per tick
//! (every `flush_period`) the scheduler picks the buffers to transmit:
//!
//! - continuous output: every outbound buffer, dirty or not, so remote state
//!   survives lossy links;
//! - change-triggered output: only dirty buffers.
//!
//! A buffer is flushed at most once per tick and a flush always carries the
//! current contents, so bursts of writes between ticks collapse into one
//! frame. A zero period disables batching: every decision point flushes all
//! dirty buffers immediately.

use serde::Serialize;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::constants::{MAX_NET, MAX_SUBNET};
use crate::dmx::UniverseBuffers;
use crate::error::ConfigError;
use crate::protocol::PortAddress;

/// Where and how often outbound frames are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputAddress {
    /// Unicast target, or `None` for broadcast
    address: Option<Ipv4Addr>,
    net: u8,
    subnet: u8,
    flush_period: Duration,
    continuous: bool,
}

impl OutputAddress {
    /// Create a validated output address
    pub fn new(
        address: Option<Ipv4Addr>,
        net: u8,
        subnet: u8,
        flush_period: Duration,
        continuous: bool,
    ) -> Result<Self, ConfigError> {
        if net > MAX_NET {
            return Err(ConfigError::NetOutOfRange(net));
        }
        if subnet > MAX_SUBNET {
            return Err(ConfigError::SubnetOutOfRange(subnet));
        }
        Ok(Self {
            address,
            net,
            subnet,
            flush_period,
            continuous,
        })
    }

    /// Destination for outbound frames
    pub fn target(&self) -> Ipv4Addr {
        self.address.unwrap_or(Ipv4Addr::BROADCAST)
    }

    pub fn is_broadcast(&self) -> bool {
        self.address.is_none()
    }

    /// Full port-address for an outbound universe
    pub fn port_address(&self, universe: u8) -> PortAddress {
        PortAddress::new(self.net, self.subnet, universe)
    }

    pub fn net(&self) -> u8 {
        self.net
    }

    pub fn subnet(&self) -> u8 {
        self.subnet
    }

    pub fn flush_period(&self) -> Duration {
        self.flush_period
    }

    pub fn continuous(&self) -> bool {
        self.continuous
    }
}

/// Decides when outbound buffers are transmitted
#[derive(Debug, Clone)]
pub struct FlushScheduler {
    period: Duration,
    continuous: bool,
    next_tick: Option<Instant>,
    ticks: u64,
}

impl FlushScheduler {
    pub fn new(period: Duration, continuous: bool) -> Self {
        Self {
            period,
            continuous,
            next_tick: None,
            ticks: 0,
        }
    }

    pub fn from_output(output: &OutputAddress) -> Self {
        Self::new(output.flush_period(), output.continuous())
    }

    /// Anchor the tick cadence; the first tick is one period after `now`
    pub fn start(&mut self, now: Instant) {
        self.next_tick = Some(now + self.period);
    }

    /// Whether every write is flushed without batching
    pub fn is_immediate(&self) -> bool {
        self.period.is_zero()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Number of ticks evaluated so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Evaluate a decision point
    ///
    /// Returns the universes to transmit, in universe order. Their buffers
    /// have already been moved back to `Idle`.
    pub fn poll(&mut self, now: Instant, buffers: &mut UniverseBuffers) -> Vec<u8> {
        if self.is_immediate() {
            return Self::flush(now, buffers, false);
        }

        let Some(next_tick) = self.next_tick else {
            self.start(now);
            return Vec::new();
        };
        if now < next_tick {
            return Vec::new();
        }

        // Missed ticks collapse into this one
        let behind = now.duration_since(next_tick);
        let periods = behind.as_nanos() / self.period.as_nanos() + 1;
        if periods > 1 {
            tracing::debug!("Flush scheduler fell behind by {} ticks", periods - 1);
        }
        let advance = self.period.as_nanos().saturating_mul(periods);
        self.next_tick = Some(next_tick + Duration::from_nanos(advance.min(u64::MAX as u128) as u64));
        self.ticks += 1;

        Self::flush(now, buffers, self.continuous)
    }

    fn flush(now: Instant, buffers: &mut UniverseBuffers, all: bool) -> Vec<u8> {
        let mut due = Vec::new();
        for buffer in buffers.iter_mut() {
            if !buffer.is_outbound() || !(all || buffer.is_dirty()) {
                continue;
            }
            buffer.mark_flushed(now);
            due.push(buffer.universe());
        }
        due
    }
}

/// Serializable view of the output configuration
#[derive(Debug, Clone, Serialize)]
pub struct OutputStatus {
    pub target: Ipv4Addr,
    pub broadcast: bool,
    pub net: u8,
    pub subnet: u8,
    pub flush_period_ms: u64,
    pub continuous: bool,
}

impl From<&OutputAddress> for OutputStatus {
    fn from(output: &OutputAddress) -> Self {
        Self {
            target: output.target(),
            broadcast: output.is_broadcast(),
            net: output.net,
            subnet: output.subnet,
            flush_period_ms: output.flush_period.as_millis() as u64,
            continuous: output.continuous,
        }
    }
}

//! The bridge node
//!
//! Owns the filter, route table, universe buffers, flush scheduler and
//! channel views together with the transport and bus driver. The run loop
//! feeds it events one at a time; nothing here blocks or locks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use crate::channel::{dmx_to_normalized, ChannelRole, OutputChannel, SensorChannel};
use crate::config::{AppConfig, RouteConfig};
use crate::constants::DMX_CHANNELS;
use crate::dmx::{BusChange, BusSet, DmxDriver, FlushState, UniverseBuffers};
use crate::error::{Error, Result};
use crate::network::{Transport, UdpTransport};
use crate::protocol::{ArtDmx, PortAddress};
use crate::routing::{AddressFilter, Direction, NodeAddress, Route, RouteTable};
use crate::scheduler::{FlushScheduler, OutputAddress, OutputStatus};

/// Running counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    /// Datagrams handed to the node
    pub frames_received: u64,
    /// Frames that passed the filter and hit a known universe
    pub frames_accepted: u64,
    /// Frames for another net/subnet
    pub frames_filtered: u64,
    /// Frames that failed to decode
    pub frames_malformed: u64,
    /// Frames for a universe this node does not use
    pub frames_unrouted: u64,
    pub bus_changes: u64,
    pub flushes_sent: u64,
    pub send_failures: u64,
}

/// Art-Net ⇄ DMX bridge node
pub struct Node<T = UdpTransport, D = BusSet> {
    filter: AddressFilter,
    output: OutputAddress,
    routes: RouteTable,
    buffers: UniverseBuffers,
    scheduler: FlushScheduler,
    outputs: Vec<OutputChannel>,
    sensors: Vec<SensorChannel>,
    transport: T,
    driver: D,
    stats: NodeStats,
}

impl<T: Transport, D: DmxDriver> Node<T, D> {
    /// Build a node from validated configuration
    ///
    /// Fails on any configuration error; no partial node is ever returned.
    pub fn new(config: &AppConfig, transport: T, driver: D) -> Result<Self> {
        config.validate()?;

        let filter = AddressFilter::new(config.node_address()?);
        let output = config.output_address()?;
        let routes = RouteTable::from_routes(config.routes.iter().map(RouteConfig::to_route))?;

        // One buffer per universe referenced by a route or binding
        let mut buffers = UniverseBuffers::new();
        for universe in routes.universes() {
            buffers.ensure(universe);
        }
        for universe in routes.outbound_universes() {
            buffers.ensure(universe).set_outbound(true);
        }

        let mut outputs = Vec::new();
        let mut sensors = Vec::new();
        for channel in &config.channels {
            let binding = channel.binding()?;
            let buffer = buffers.ensure(binding.universe());
            match channel.role {
                ChannelRole::Output => {
                    buffer.set_outbound(true);
                    outputs.push(OutputChannel::new(channel.name.clone(), binding));
                }
                ChannelRole::Sensor => {
                    sensors.push(SensorChannel::new(channel.name.clone(), binding));
                }
            }
        }

        Ok(Self {
            filter,
            scheduler: FlushScheduler::from_output(&output),
            output,
            routes,
            buffers,
            outputs,
            sensors,
            transport,
            driver,
            stats: NodeStats::default(),
        })
    }

    /// Anchor the flush cadence at `now`
    pub fn start(&mut self, now: Instant) {
        self.scheduler.start(now);
    }

    /// Handle a raw datagram from the network
    ///
    /// Malformed packets are dropped silently. Returns true if the frame
    /// was accepted.
    pub fn handle_packet(&mut self, packet: &[u8]) -> bool {
        self.stats.frames_received += 1;

        match ArtDmx::decode(packet) {
            Ok(frame) => self.handle_frame(frame.port_address, &frame.data),
            Err(e) => {
                self.stats.frames_malformed += 1;
                tracing::trace!("Dropping packet: {}", e);
                false
            }
        }
    }

    /// Handle a decoded ArtDmx frame
    pub fn handle_frame(&mut self, port: PortAddress, data: &[u8]) -> bool {
        if data.len() > DMX_CHANNELS {
            self.stats.frames_malformed += 1;
            tracing::trace!("Dropping oversized frame for {}: {} bytes", port, data.len());
            return false;
        }

        if !self.filter.accepts_port(port) {
            self.stats.frames_filtered += 1;
            tracing::trace!("Ignoring frame for {}", port);
            return false;
        }

        let Some(buffer) = self.buffers.get_mut(port.universe) else {
            self.stats.frames_unrouted += 1;
            tracing::trace!("No routes or channels for universe {}", port.universe);
            return false;
        };
        buffer.load(data);
        self.stats.frames_accepted += 1;

        tracing::trace!("Received frame for {}, length {}", port, data.len());

        self.routes
            .dispatch_inbound(port.universe, data, &mut self.driver);
        self.publish_sensors(port.universe);
        true
    }

    fn publish_sensors(&mut self, universe: u8) {
        for sensor in &mut self.sensors {
            if sensor.binding().universe() != universe {
                continue;
            }
            if let Some(value) = sensor.poll(&self.buffers) {
                tracing::debug!(
                    "'{}': channel {} updated to value: {}",
                    sensor.name(),
                    sensor.binding().channel(),
                    value
                );
            }
        }
    }

    /// Handle a value change reported by a bus driver
    ///
    /// Returns the universe that was dirtied, if any.
    pub fn handle_bus_change(&mut self, change: BusChange) -> Option<u8> {
        self.stats.bus_changes += 1;

        let universe = self.routes.dispatch_outbound(
            change.bus,
            change.channel,
            change.value,
            &mut self.buffers,
        )?;
        tracing::trace!(
            "{} channel {} -> universe {}",
            change.bus,
            change.channel,
            universe
        );

        if self.scheduler.is_immediate() {
            self.tick(Instant::now());
        }
        Some(universe)
    }

    /// Write a normalized value (0.0-1.0) to a named output channel
    pub fn write_output(&mut self, name: &str, normalized: f32) -> Result<u8> {
        let output = self
            .outputs
            .iter_mut()
            .find(|output| output.name() == name)
            .ok_or_else(|| Error::UnknownChannel(name.to_string()))?;

        let value = output.write(&mut self.buffers, normalized);

        if self.scheduler.is_immediate() {
            self.tick(Instant::now());
        }
        Ok(value)
    }

    /// Current value of a named sensor channel
    pub fn read_sensor(&self, name: &str) -> Result<u8> {
        self.sensors
            .iter()
            .find(|sensor| sensor.name() == name)
            .map(|sensor| sensor.read(&self.buffers))
            .ok_or_else(|| Error::UnknownChannel(name.to_string()))
    }

    /// Run a flush decision point and transmit what is due
    ///
    /// Returns the number of frames handed to the transport successfully.
    pub fn tick(&mut self, now: Instant) -> usize {
        let due = self.scheduler.poll(now, &mut self.buffers);
        let target = self.output.target();
        let mut sent = 0;

        for universe in due {
            let Some(buffer) = self.buffers.get(universe) else {
                continue;
            };
            let port = self.output.port_address(universe);

            match self.transport.send(target, port, buffer.data()) {
                Ok(()) => {
                    self.stats.flushes_sent += 1;
                    sent += 1;
                    tracing::debug!("Flushed universe {} to {}", port, target);
                }
                Err(e) => {
                    self.stats.send_failures += 1;
                    tracing::warn!("Failed to flush universe {}: {}", port, e);
                }
            }
        }

        sent
    }

    /// Log the node configuration
    pub fn log_config(&self) {
        let node = self.filter.address();
        tracing::info!("Art-Net node:");
        tracing::info!(
            "  Listening on net {}, subnet {} (universe {})",
            node.net(),
            node.subnet(),
            node.universe()
        );
        tracing::info!(
            "  Output: {} net {}, subnet {}, every {:?}{}",
            self.output.target(),
            self.output.net(),
            self.output.subnet(),
            self.output.flush_period(),
            if self.output.continuous() { " (continuous)" } else { "" }
        );

        let inbound: Vec<&Route> = self
            .routes
            .routes()
            .iter()
            .filter(|route| route.direction == Direction::ToDmx)
            .collect();
        if !inbound.is_empty() {
            tracing::info!("Art-Net to DMX routes:");
            for route in inbound {
                tracing::info!("  {}", route);
            }
        }

        let outbound: Vec<&Route> = self
            .routes
            .routes()
            .iter()
            .filter(|route| route.direction == Direction::ToArtnet)
            .collect();
        if !outbound.is_empty() {
            tracing::info!("DMX to Art-Net routes:");
            for route in outbound {
                tracing::info!("  {}", route);
            }
        }

        for output in &self.outputs {
            tracing::info!(
                "  Output '{}': universe {}, channel {}",
                output.name(),
                output.binding().universe(),
                output.binding().channel()
            );
        }
        for sensor in &self.sensors {
            tracing::info!(
                "  Sensor '{}': universe {}, channel {}",
                sensor.name(),
                sensor.binding().universe(),
                sensor.binding().channel()
            );
        }
    }

    /// Serializable snapshot of the node
    pub fn status(&self, now: Instant) -> NodeStatus {
        let universes = self
            .buffers
            .iter()
            .map(|buffer| UniverseStatus {
                universe: buffer.universe(),
                state: buffer.state(),
                outbound: buffer.is_outbound(),
                last_flush_ms_ago: buffer
                    .last_flush()
                    .map(|at| now.saturating_duration_since(at).as_millis() as u64),
                data: buffer.data().to_vec(),
            })
            .collect();

        let outputs = self.outputs.iter().map(|output| {
            let binding = output.binding();
            (output.name(), ChannelRole::Output, binding)
        });
        let sensors = self.sensors.iter().map(|sensor| {
            let binding = sensor.binding();
            (sensor.name(), ChannelRole::Sensor, binding)
        });
        let channels = outputs
            .chain(sensors)
            .map(|(name, role, binding)| {
                let value = self
                    .buffers
                    .get(binding.universe())
                    .and_then(|buffer| buffer.get(binding.channel()))
                    .unwrap_or(0);
                ChannelStatus {
                    name: name.to_string(),
                    role,
                    universe: binding.universe(),
                    channel: binding.channel(),
                    value,
                    normalized: dmx_to_normalized(value),
                }
            })
            .collect();

        NodeStatus {
            node: self.filter.address(),
            output: OutputStatus::from(&self.output),
            routes: self.routes.routes().to_vec(),
            universes,
            channels,
            stats: self.stats.clone(),
            updated_at: Utc::now(),
        }
    }

    pub fn node_address(&self) -> NodeAddress {
        self.filter.address()
    }

    pub fn output_address(&self) -> &OutputAddress {
        &self.output
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn buffers(&self) -> &UniverseBuffers {
        &self.buffers
    }

    pub fn scheduler(&self) -> &FlushScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

/// Snapshot of one universe buffer
#[derive(Debug, Clone, Serialize)]
pub struct UniverseStatus {
    pub universe: u8,
    pub state: FlushState,
    pub outbound: bool,
    pub last_flush_ms_ago: Option<u64>,
    pub data: Vec<u8>,
}

/// Snapshot of one bound channel
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub name: String,
    pub role: ChannelRole,
    pub universe: u8,
    pub channel: u16,
    pub value: u8,
    pub normalized: f32,
}

/// Snapshot of the whole node, published for the status API
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub node: NodeAddress,
    pub output: OutputStatus,
    pub routes: Vec<Route>,
    pub universes: Vec<UniverseStatus>,
    pub channels: Vec<ChannelStatus>,
    pub stats: NodeStats,
    pub updated_at: DateTime<Utc>,
}

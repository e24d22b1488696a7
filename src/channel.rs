//! Channel views
//!
//! Outputs turn normalized application values into DMX bytes written into a
//! universe buffer. Sensors expose the current byte of a slot; they are
//! pull-based and never trigger a flush.

use serde::{Deserialize, Serialize};

use crate::constants::{DMX_CHANNELS, MAX_UNIVERSE};
use crate::dmx::UniverseBuffers;
use crate::error::ConfigError;

/// Role of a bound channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    Output,
    Sensor,
}

/// A universe slot a view is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelBinding {
    universe: u8,
    channel: u16,
}

impl ChannelBinding {
    /// Create a validated binding (universe 0-15, channel 1-512)
    pub fn new(universe: u8, channel: u16) -> Result<Self, ConfigError> {
        if universe > MAX_UNIVERSE {
            return Err(ConfigError::UniverseOutOfRange(universe));
        }
        if channel == 0 || channel as usize > DMX_CHANNELS {
            return Err(ConfigError::ChannelOutOfRange(channel));
        }
        Ok(Self { universe, channel })
    }

    pub fn universe(&self) -> u8 {
        self.universe
    }

    pub fn channel(&self) -> u16 {
        self.channel
    }
}

/// Convert a normalized value to a DMX byte
///
/// Rounds half up and clamps to 0-255. NaN maps to 0.
pub fn normalized_to_dmx(normalized: f32) -> u8 {
    if normalized.is_nan() {
        return 0;
    }
    (normalized * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Convert a DMX byte to a normalized value
pub fn dmx_to_normalized(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Writable channel
#[derive(Debug, Clone)]
pub struct OutputChannel {
    name: String,
    binding: ChannelBinding,
    last_value: u8,
}

impl OutputChannel {
    pub fn new(name: impl Into<String>, binding: ChannelBinding) -> Self {
        Self {
            name: name.into(),
            binding,
            last_value: 0,
        }
    }

    /// Write a normalized value (0.0-1.0) into the bound slot
    ///
    /// Marks the buffer dirty and returns the byte written.
    pub fn write(&mut self, buffers: &mut UniverseBuffers, normalized: f32) -> u8 {
        let value = normalized_to_dmx(normalized);
        buffers
            .ensure(self.binding.universe)
            .set(self.binding.channel, value);
        self.last_value = value;
        value
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> ChannelBinding {
        self.binding
    }

    /// Last byte written through this output
    pub fn last_value(&self) -> u8 {
        self.last_value
    }
}

/// Read-only channel
#[derive(Debug, Clone)]
pub struct SensorChannel {
    name: String,
    binding: ChannelBinding,
    last_published: Option<u8>,
}

impl SensorChannel {
    pub fn new(name: impl Into<String>, binding: ChannelBinding) -> Self {
        Self {
            name: name.into(),
            binding,
            last_published: None,
        }
    }

    /// Current value of the bound slot
    pub fn read(&self, buffers: &UniverseBuffers) -> u8 {
        buffers
            .get(self.binding.universe)
            .and_then(|buffer| buffer.get(self.binding.channel))
            .unwrap_or(0)
    }

    /// Read the slot and report it only if it changed since the last poll
    pub fn poll(&mut self, buffers: &UniverseBuffers) -> Option<u8> {
        let value = self.read(buffers);
        if self.last_published == Some(value) {
            return None;
        }
        self.last_published = Some(value);
        Some(value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> ChannelBinding {
        self.binding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_endpoints() {
        assert_eq!(normalized_to_dmx(0.0), 0);
        assert_eq!(normalized_to_dmx(1.0), 255);
        // 127.5 rounds half up
        assert_eq!(normalized_to_dmx(0.5), 128);
    }

    #[test]
    fn test_conversion_clamps() {
        assert_eq!(normalized_to_dmx(-0.5), 0);
        assert_eq!(normalized_to_dmx(3.0), 255);
        assert_eq!(normalized_to_dmx(f32::NAN), 0);
        assert_eq!(normalized_to_dmx(f32::INFINITY), 255);
    }

    #[test]
    fn test_binding_ranges() {
        assert!(ChannelBinding::new(15, 512).is_ok());
        assert_eq!(ChannelBinding::new(0, 0), Err(ConfigError::ChannelOutOfRange(0)));
        assert_eq!(ChannelBinding::new(0, 513), Err(ConfigError::ChannelOutOfRange(513)));
        assert_eq!(ChannelBinding::new(16, 1), Err(ConfigError::UniverseOutOfRange(16)));
    }

    #[test]
    fn test_output_write_dirties_buffer() {
        let mut buffers = UniverseBuffers::new();
        let mut output = OutputChannel::new("dimmer", ChannelBinding::new(0, 1).unwrap());

        assert_eq!(output.write(&mut buffers, 1.0), 255);

        let buffer = buffers.get(0).unwrap();
        assert_eq!(buffer.get(1), Some(255));
        assert!(buffer.is_dirty());
        assert_eq!(output.last_value(), 255);
    }

    #[test]
    fn test_sensor_reads_without_dirtying() {
        let mut buffers = UniverseBuffers::new();
        buffers.ensure(1).load(&[0, 0, 77]);
        let sensor = SensorChannel::new("fader", ChannelBinding::new(1, 3).unwrap());

        assert_eq!(sensor.read(&buffers), 77);
        assert!(!buffers.get(1).unwrap().is_dirty());
    }

    #[test]
    fn test_sensor_poll_reports_changes() {
        let mut buffers = UniverseBuffers::new();
        buffers.ensure(0);
        let mut sensor = SensorChannel::new("level", ChannelBinding::new(0, 1).unwrap());

        assert_eq!(sensor.poll(&buffers), Some(0));
        assert_eq!(sensor.poll(&buffers), None);

        buffers.ensure(0).load(&[42]);
        assert_eq!(sensor.poll(&buffers), Some(42));
        assert_eq!(sensor.poll(&buffers), None);
    }
}

//! Per-universe channel store
//!
//! A buffer holds current-value state for one Art-Net universe. Channels are
//! numbered 1..=512 to match DMX convention.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::constants::DMX_CHANNELS;

/// Flush state of a universe buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushState {
    Idle,
    Dirty,
}

/// Fixed-size channel store for a single universe
#[derive(Debug, Clone)]
pub struct UniverseBuffer {
    universe: u8,
    slots: [u8; DMX_CHANNELS],
    dirty: bool,
    /// Whether this universe is transmitted by the flush scheduler
    outbound: bool,
    last_flush: Option<Instant>,
}

impl UniverseBuffer {
    /// Create an empty, idle buffer
    pub fn new(universe: u8) -> Self {
        Self {
            universe,
            slots: [0u8; DMX_CHANNELS],
            dirty: false,
            outbound: false,
            last_flush: None,
        }
    }

    pub fn universe(&self) -> u8 {
        self.universe
    }

    /// Get a channel value (1-based)
    pub fn get(&self, channel: u16) -> Option<u8> {
        let index = (channel as usize).checked_sub(1)?;
        self.slots.get(index).copied()
    }

    /// Set a channel value (1-based) and mark the buffer dirty
    ///
    /// Returns false if the channel is out of range.
    pub fn set(&mut self, channel: u16, value: u8) -> bool {
        let Some(index) = (channel as usize).checked_sub(1) else {
            return false;
        };
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Load channel data received from the network
    ///
    /// Frames shorter than 512 channels only overwrite their leading slots.
    /// Received state is a mirror of the remote side and does not dirty the
    /// buffer, so it is never echoed back out.
    pub fn load(&mut self, data: &[u8]) {
        let len = data.len().min(DMX_CHANNELS);
        self.slots[..len].copy_from_slice(&data[..len]);
    }

    /// Current channel data
    pub fn data(&self) -> &[u8; DMX_CHANNELS] {
        &self.slots
    }

    pub fn state(&self) -> FlushState {
        if self.dirty {
            FlushState::Dirty
        } else {
            FlushState::Idle
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_outbound(&self) -> bool {
        self.outbound
    }

    pub(crate) fn set_outbound(&mut self, outbound: bool) {
        self.outbound = outbound;
    }

    /// Clear the dirty flag and record the flush time
    ///
    /// The recorded timestamp never moves backwards.
    pub fn mark_flushed(&mut self, now: Instant) {
        self.dirty = false;
        self.last_flush = Some(match self.last_flush {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    pub fn last_flush(&self) -> Option<Instant> {
        self.last_flush
    }
}

/// All universe buffers of a node, keyed by universe
#[derive(Debug, Default, Clone)]
pub struct UniverseBuffers {
    buffers: BTreeMap<u8, UniverseBuffer>,
}

impl UniverseBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the buffer for a universe, creating it on first use
    pub fn ensure(&mut self, universe: u8) -> &mut UniverseBuffer {
        self.buffers
            .entry(universe)
            .or_insert_with(|| UniverseBuffer::new(universe))
    }

    pub fn get(&self, universe: u8) -> Option<&UniverseBuffer> {
        self.buffers.get(&universe)
    }

    pub fn get_mut(&mut self, universe: u8) -> Option<&mut UniverseBuffer> {
        self.buffers.get_mut(&universe)
    }

    pub fn contains(&self, universe: u8) -> bool {
        self.buffers.contains_key(&universe)
    }

    /// Iterate buffers in universe order
    pub fn iter(&self) -> impl Iterator<Item = &UniverseBuffer> {
        self.buffers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut UniverseBuffer> {
        self.buffers.values_mut()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_channels_are_one_based() {
        let mut buffer = UniverseBuffer::new(0);

        assert!(buffer.set(1, 10));
        assert!(buffer.set(512, 20));
        assert!(!buffer.set(0, 30));
        assert!(!buffer.set(513, 40));

        assert_eq!(buffer.data()[0], 10);
        assert_eq!(buffer.data()[511], 20);
        assert_eq!(buffer.get(0), None);
        assert_eq!(buffer.get(1), Some(10));
        assert_eq!(buffer.get(513), None);
    }

    #[test]
    fn test_write_transitions_to_dirty() {
        let mut buffer = UniverseBuffer::new(3);
        assert_eq!(buffer.state(), FlushState::Idle);

        buffer.set(5, 0);
        assert_eq!(buffer.state(), FlushState::Dirty);

        buffer.mark_flushed(Instant::now());
        assert_eq!(buffer.state(), FlushState::Idle);

        // Rewriting the same value still counts as a write
        buffer.set(5, 0);
        assert_eq!(buffer.state(), FlushState::Dirty);
    }

    #[test]
    fn test_load_keeps_buffer_idle() {
        let mut buffer = UniverseBuffer::new(0);
        buffer.set(10, 99);
        buffer.mark_flushed(Instant::now());

        buffer.load(&[7, 8, 9]);

        assert_eq!(buffer.get(1), Some(7));
        assert_eq!(buffer.get(3), Some(9));
        assert_eq!(buffer.get(10), Some(99));
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_last_flush_is_monotonic() {
        let mut buffer = UniverseBuffer::new(0);
        let start = Instant::now();
        let later = start + Duration::from_millis(100);

        buffer.mark_flushed(later);
        buffer.mark_flushed(start);

        assert_eq!(buffer.last_flush(), Some(later));
    }

    #[test]
    fn test_buffers_created_once() {
        let mut buffers = UniverseBuffers::new();
        buffers.ensure(2).set(1, 50);
        buffers.ensure(2);
        buffers.ensure(0);

        assert_eq!(buffers.len(), 2);
        assert_eq!(buffers.get(2).and_then(|b| b.get(1)), Some(50));

        let order: Vec<u8> = buffers.iter().map(|b| b.universe()).collect();
        assert_eq!(order, vec![0, 2]);
    }
}

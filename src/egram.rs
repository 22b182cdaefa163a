// src/egram.rs
//
// Egram telemetry types.
//
// The pacemaker streams one unsigned byte per channel roughly every 10 ms;
// each pair becomes an `EgramPoint` timestamped relative to stream start.
// Points are handed to the consumer through a bounded channel, one send per
// point in production order, so a single-threaded UI can drain them on its
// own context instead of being called from the worker thread.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Sender half of the egram hand-off channel, supplied by the stream consumer.
pub type EgramSender = tokio::sync::mpsc::Sender<EgramPoint>;

/// A single telemetry sample pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EgramPoint {
    /// Milliseconds since stream start (monotonic, not wall-clock)
    pub timestamp_ms: u64,
    pub atrial_value: f64,
    pub ventricular_value: f64,
}

/// Bounded, insertion-ordered sample buffer with ring semantics.
/// Owned by a stream consumer, not by the connection manager.
#[derive(Clone, Debug)]
pub struct EgramBuffer {
    points: VecDeque<EgramPoint>,
    capacity: usize,
}

impl EgramBuffer {
    /// Default capacity, about 10 s of samples at the nominal 100 Hz rate.
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest when full.
    pub fn add_point(&mut self, point: EgramPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Snapshot of the buffered points, oldest first.
    pub fn points(&self) -> Vec<EgramPoint> {
        self.points.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl Default for EgramBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(t: u64) -> EgramPoint {
        EgramPoint {
            timestamp_ms: t,
            atrial_value: t as f64,
            ventricular_value: -(t as f64),
        }
    }

    #[test]
    fn test_buffer_preserves_insertion_order() {
        let mut buf = EgramBuffer::with_capacity(10);
        for t in 0..5 {
            buf.add_point(point(t));
        }
        let ts: Vec<u64> = buf.points().iter().map(|p| p.timestamp_ms).collect();
        assert_eq!(ts, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_buffer_evicts_oldest_at_capacity() {
        let mut buf = EgramBuffer::with_capacity(3);
        for t in 0..5 {
            buf.add_point(point(t));
        }
        assert_eq!(buf.len(), 3);
        let ts: Vec<u64> = buf.points().iter().map(|p| p.timestamp_ms).collect();
        assert_eq!(ts, vec![2, 3, 4]);
    }

    #[test]
    fn test_default_capacity() {
        let mut buf = EgramBuffer::new();
        for t in 0..1500u64 {
            buf.add_point(point(t));
        }
        assert_eq!(buf.len(), EgramBuffer::DEFAULT_CAPACITY);
        assert_eq!(buf.points()[0].timestamp_ms, 500);
    }
}

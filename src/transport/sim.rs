// src/transport/sim.rs
//
// Simulated transport, used when no real pacemaker is attached.
// Reads behave like a quiet serial line (timeout, no data); writes are
// logged and discarded. The egram streamer never reads this port in
// simulated mode, it synthesizes its own waveform instead.

use std::time::Duration;

use crate::error::LinkError;
use crate::transport::{Transport, SIM_PORT_NAME};

pub struct SimulatedPort {
    open: bool,
}

impl SimulatedPort {
    pub fn new() -> Self {
        Self { open: true }
    }
}

impl Default for SimulatedPort {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimulatedPort {
    fn name(&self) -> &str {
        SIM_PORT_NAME
    }

    fn read(&mut self, _max_bytes: usize) -> Result<Vec<u8>, LinkError> {
        if !self.open {
            return Err(LinkError::device(SIM_PORT_NAME, "port is closed"));
        }
        // Emulate a read timeout on an idle line without spinning the caller
        std::thread::sleep(Duration::from_millis(10));
        Ok(Vec::new())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if !self.open {
            return Err(LinkError::device(SIM_PORT_NAME, "port is closed"));
        }
        tlog!("[SimPort] TX {} bytes (discarded)", bytes.len());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_empty_and_writes_accepted() {
        let mut port = SimulatedPort::new();
        assert_eq!(port.read(64).expect("read failed"), Vec::<u8>::new());
        port.write(&[1, 2, 3]).expect("write failed");
    }

    #[test]
    fn test_closed_port_rejects_io() {
        let mut port = SimulatedPort::new();
        port.close();
        assert!(!port.is_open());
        assert!(matches!(port.read(1), Err(LinkError::Device { .. })));
        assert!(matches!(port.write(&[0]), Err(LinkError::Device { .. })));
    }
}

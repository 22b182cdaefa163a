// src/transport/serial.rs
//
// Real serial port transport over the serialport crate.
// Reads use a short timeout so the background loops remain responsive to
// cancellation; a timeout is reported as an empty read, not an error.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::error::{is_fatal_io, LinkError};
use crate::transport::{Transport, READ_TIMEOUT_MS};

pub struct RealSerialPort {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl RealSerialPort {
    /// Open the port at the given baud rate with the standard read timeout.
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let port = serialport::new(name, baud_rate)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()
            .map_err(|e| LinkError::connection(name, e.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            port: Some(port),
        })
    }
}

impl Transport for RealSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, LinkError> {
        let port = match self.port.as_mut() {
            Some(p) => p,
            None => return Err(LinkError::device(&self.name, "port is closed")),
        };

        let mut buf = vec![0u8; max_bytes];
        match port.read(&mut buf) {
            // EOF means the device went away
            Ok(0) => Err(LinkError::device(&self.name, "port returned EOF")),
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Ok(Vec::new())
            }
            Err(e) if is_fatal_io(&e) => Err(LinkError::device(&self.name, e.to_string())),
            Err(e) => Err(LinkError::read(&self.name, e.to_string())),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let port = match self.port.as_mut() {
            Some(p) => p,
            None => return Err(LinkError::device(&self.name, "port is closed")),
        };

        port.write_all(bytes)
            .and_then(|_| port.flush())
            .map_err(|e| {
                if is_fatal_io(&e) {
                    LinkError::device(&self.name, e.to_string())
                } else {
                    LinkError::write(&self.name, e.to_string())
                }
            })
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) {
        // Dropping the handle releases the OS port
        self.port = None;
    }
}

// src/error.rs
//
// Typed errors for the pacemaker link.
//
// Two kinds of failure matter to the loops: fatal device conditions
// (permission denied, device unplugged) that must stop the owning loop, and
// transient I/O hiccups that are retried after a brief delay. `LinkError`
// carries that distinction so loop code never string-matches at the call site.

use std::fmt;

/// Error type for transport, codec and loop operations.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkError {
    /// Opening the underlying device failed.
    Connection { device: String, detail: String },
    /// An operation did not complete within its deadline.
    Timeout { device: String, operation: String },
    /// A read failed with a recoverable error.
    Read { device: String, detail: String },
    /// A write failed with a recoverable error.
    Write { device: String, detail: String },
    /// Decode input was not an exact parameter frame.
    FrameLength { expected: usize, actual: usize },
    /// Permission denied or device no longer present. The owning loop must
    /// stop and the connection is to be treated as lost.
    Device { device: String, detail: String },
}

impl LinkError {
    pub fn connection(device: &str, detail: impl Into<String>) -> Self {
        LinkError::Connection {
            device: device.to_string(),
            detail: detail.into(),
        }
    }

    pub fn timeout(device: &str, operation: impl Into<String>) -> Self {
        LinkError::Timeout {
            device: device.to_string(),
            operation: operation.into(),
        }
    }

    pub fn read(device: &str, detail: impl Into<String>) -> Self {
        LinkError::Read {
            device: device.to_string(),
            detail: detail.into(),
        }
    }

    pub fn write(device: &str, detail: impl Into<String>) -> Self {
        LinkError::Write {
            device: device.to_string(),
            detail: detail.into(),
        }
    }

    pub fn frame_length(actual: usize) -> Self {
        LinkError::FrameLength {
            expected: crate::codec::constants::FRAME_LEN,
            actual,
        }
    }

    pub fn device(device: &str, detail: impl Into<String>) -> Self {
        LinkError::Device {
            device: device.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether this error should terminate the owning loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::Device { .. })
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Connection { device, detail } => {
                write!(f, "{}: connect failed: {}", device, detail)
            }
            LinkError::Timeout { device, operation } => {
                write!(f, "{}: timed out during {}", device, operation)
            }
            LinkError::Read { device, detail } => write!(f, "{}: read error: {}", device, detail),
            LinkError::Write { device, detail } => write!(f, "{}: write error: {}", device, detail),
            LinkError::FrameLength { expected, actual } => {
                write!(f, "frame length {} (expected {})", actual, expected)
            }
            LinkError::Device { device, detail } => {
                write!(f, "{}: device error: {}", device, detail)
            }
        }
    }
}

impl std::error::Error for LinkError {}

/// Classify a std I/O error from the serial backend as fatal or transient.
///
/// Windows reports an unplugged USB adapter as "a device attached to the
/// system is not functioning", which surfaces as a generic error kind, so the
/// message is checked as well.
pub(crate) fn is_fatal_io(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::PermissionDenied | ErrorKind::NotFound | ErrorKind::BrokenPipe
    ) || e.to_string().to_lowercase().contains("not functioning")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(LinkError::device("COM3", "unplugged").is_fatal());
        assert!(!LinkError::read("COM3", "overrun").is_fatal());
        assert!(!LinkError::frame_length(12).is_fatal());
    }

    #[test]
    fn test_fatal_io_kinds() {
        use std::io::{Error, ErrorKind};
        assert!(is_fatal_io(&Error::new(ErrorKind::PermissionDenied, "denied")));
        assert!(is_fatal_io(&Error::new(
            ErrorKind::Other,
            "A device attached to the system is not functioning."
        )));
        assert!(!is_fatal_io(&Error::new(ErrorKind::TimedOut, "timed out")));
    }

    #[test]
    fn test_display_names_device() {
        let e = LinkError::connection("/dev/ttyACM0", "busy");
        assert!(e.to_string().contains("/dev/ttyACM0"));
        assert!(e.to_string().contains("busy"));
    }
}

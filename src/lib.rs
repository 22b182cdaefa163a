// src/lib.rs
//
// pacelink: device communication layer for the DCM pacemaker controller.
//
// The DCM forms supply a parameter record and consume status/telemetry
// events; everything between them and the device lives here. The codec turns
// records into the fixed 31-byte parameter frame, the transport abstracts
// real vs. simulated serial devices, and two background loops provide
// diagnostic monitoring and egram telemetry streaming. The connection
// manager ties them together and enforces that the loops never share the
// port.

#[macro_use]
pub mod logging;

pub mod codec;
pub mod egram;
pub mod error;
pub mod manager;
pub mod monitor;
pub mod params;
pub mod streamer;
pub mod transport;
pub mod types;
pub mod validation;
pub mod worker;

pub use codec::{decode_frame, encode_parameters, DecodedFrame};
pub use egram::{EgramBuffer, EgramPoint, EgramSender};
pub use error::LinkError;
pub use manager::ConnectionManager;
pub use params::{PacingMode, PacingParameters};
pub use transport::{list_ports, Transport, DEFAULT_BAUD_RATE, SIM_PORT_NAME};
pub use types::{LinkEvent, LinkEventSender, LoopKind};
pub use validation::{validate_parameters, ValidationError};
pub use worker::{LinkWorker, WorkerState};

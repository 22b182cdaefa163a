// src/manager.rs
//
// Connection manager: owns the transport and the two background loops,
// and exposes the operations the DCM forms call. The monitor and the egram
// streamer are never running at the same time; whichever one is starting,
// the other is stopped first so they cannot contend for the port.

use std::sync::{Arc, Mutex};

use crate::codec::{decode_frame, encode_parameters};
use crate::egram::EgramSender;
use crate::params::PacingParameters;
use crate::monitor::MonitorLoop;
use crate::streamer::{EgramSource, EgramStreamer};
use crate::transport::{self, SharedTransport, Transport, DEFAULT_BAUD_RATE};
use crate::types::LinkEventSender;
use crate::worker::{LinkWorker, WorkerState};

pub struct ConnectionManager {
    port: Option<SharedTransport>,
    port_name: Option<String>,
    simulated: bool,
    monitor: Option<MonitorLoop>,
    streamer: Option<EgramStreamer>,
    /// Last record confirmed sent, kept for the device-info display
    last_sent: Option<PacingParameters>,
    event_tx: LinkEventSender,
}

impl ConnectionManager {
    /// Create a manager delivering diagnostic events to the given channel.
    /// The consumer drains the channel on its own execution context.
    pub fn new(event_tx: LinkEventSender) -> Self {
        Self {
            port: None,
            port_name: None,
            simulated: false,
            monitor: None,
            streamer: None,
            last_sent: None,
            event_tx,
        }
    }

    /// List candidate port names. Never fails; falls back to the synthetic
    /// simulated port when no hardware is present.
    pub fn list_ports(&self) -> Vec<String> {
        transport::list_ports()
    }

    pub fn is_connected(&self) -> bool {
        match self.port {
            Some(ref port) => port.lock().map(|g| g.is_open()).unwrap_or(false),
            None => false,
        }
    }

    /// Whether the live connection is the simulated device.
    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Name of the connected port, if any.
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Last record confirmed sent over this connection.
    pub fn last_sent(&self) -> Option<&PacingParameters> {
        self.last_sent.as_ref()
    }

    /// Monitor loop state, `Stopped` when no monitor exists.
    pub fn monitor_state(&self) -> WorkerState {
        self.monitor
            .as_ref()
            .map(|m| m.state())
            .unwrap_or(WorkerState::Stopped)
    }

    /// Egram streamer state, `Stopped` when no stream is active.
    pub fn egram_state(&self) -> WorkerState {
        self.streamer
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(WorkerState::Stopped)
    }

    /// Open the given port at the default baud rate. On success in real mode
    /// the monitor loop is started. Returns whether the attempt succeeded;
    /// a failed open is reported, not retried.
    pub async fn connect(&mut self, port: &str) -> bool {
        // At most one transport is live per manager
        self.disconnect().await;

        match transport::open_transport(port, DEFAULT_BAUD_RATE) {
            Ok(t) => {
                self.install_transport(t, port).await;
                true
            }
            Err(e) => {
                tlog!("[Link] connect error: {}", e);
                false
            }
        }
    }

    /// Install an opened transport and start the monitor when appropriate.
    /// Split from `connect` so tests can drive the manager with a scripted
    /// transport.
    async fn install_transport(&mut self, t: Box<dyn Transport>, port: &str) {
        self.simulated = t.is_simulated();
        let shared: SharedTransport = Arc::new(Mutex::new(t));
        self.port = Some(shared.clone());
        self.port_name = Some(port.to_string());

        tlog!(
            "[Link] connected to {}{}",
            port,
            if self.simulated { " (simulated mode)" } else { "" }
        );

        // The monitor only makes sense against a real device
        if !self.simulated {
            let mut monitor = MonitorLoop::new(shared, self.event_tx.clone());
            if let Err(e) = monitor.start().await {
                tlog!("[Link] monitor start failed: {}", e);
            }
            self.monitor = Some(monitor);
        }
    }

    /// Stop both loops, close the port, clear connection state. Idempotent.
    pub async fn disconnect(&mut self) {
        if let Some(mut streamer) = self.streamer.take() {
            let _ = streamer.stop().await;
        }
        if let Some(mut monitor) = self.monitor.take() {
            let _ = monitor.stop().await;
        }
        if let Some(port) = self.port.take() {
            if let Ok(mut guard) = port.lock() {
                guard.close();
            }
        }

        if self.port_name.take().is_some() {
            tlog!("[Link] disconnected");
        }
        self.simulated = false;
    }

    /// Encode and send a parameter record.
    ///
    /// Requires an active connection; fails immediately with no side effect
    /// otherwise. Success means the write completed — echo verification is
    /// advisory: the monitor keeps reading, so a device echo of the frame
    /// shows up decoded in the diagnostic events and logs.
    pub fn send_and_verify(&mut self, params: &PacingParameters) -> bool {
        if !self.is_connected() {
            tlog!("[Link] cannot send parameters, not connected");
            return false;
        }

        let frame = encode_parameters(params);
        tlog!("[Link] TX: {}", hex::encode(&frame));
        if let Ok(decoded) = decode_frame(&frame) {
            tlog!("[Link] TX breakdown:\n{}", decoded.breakdown());
        }

        if self.simulated {
            tlog!("[Link] simulated send ok");
            self.last_sent = Some(params.clone());
            return true;
        }

        let port = match self.port {
            Some(ref p) => p,
            None => return false,
        };
        let write_result = match port.lock() {
            Ok(mut guard) => guard.write(&frame),
            Err(e) => {
                tlog!("[Link] port mutex poisoned: {}", e);
                return false;
            }
        };

        match write_result {
            Ok(()) => {
                self.last_sent = Some(params.clone());
                true
            }
            Err(e) => {
                tlog!("[Link] error sending parameters: {}", e);
                false
            }
        }
    }

    /// Start streaming egram points into the caller's channel.
    ///
    /// Requires an active connection. Stops the monitor loop first so the two
    /// loops never read the same port concurrently.
    pub async fn start_egram_stream(&mut self, sink: EgramSender) -> Result<(), String> {
        if !self.is_connected() {
            return Err("Cannot start egram stream: not connected".to_string());
        }
        if self.streamer.is_some() {
            return Err("Egram stream is already running".to_string());
        }

        if let Some(mut monitor) = self.monitor.take() {
            let _ = monitor.stop().await;
        }

        let source = if self.simulated {
            EgramSource::Simulated
        } else {
            match self.port {
                Some(ref port) => EgramSource::Serial(port.clone()),
                None => return Err("Cannot start egram stream: not connected".to_string()),
            }
        };

        let mut streamer = EgramStreamer::new(source, sink, self.event_tx.clone());
        streamer.start().await?;
        self.streamer = Some(streamer);
        Ok(())
    }

    /// Stop the egram stream and drop the sink. In real mode the monitor is
    /// started again so diagnostic visibility resumes.
    pub async fn stop_egram_stream(&mut self) {
        if let Some(mut streamer) = self.streamer.take() {
            let _ = streamer.stop().await;
        }

        if self.is_connected() && !self.simulated && self.monitor.is_none() {
            if let Some(ref port) = self.port {
                let mut monitor = MonitorLoop::new(port.clone(), self.event_tx.clone());
                if let Err(e) = monitor.start().await {
                    tlog!("[Link] monitor restart failed: {}", e);
                }
                self.monitor = Some(monitor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedPort;
    use crate::transport::{SimulatedPort, SIM_PORT_NAME};
    use tokio::sync::mpsc;

    fn manager() -> (ConnectionManager, tokio::sync::mpsc::Receiver<crate::types::LinkEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (ConnectionManager::new(tx), rx)
    }

    #[tokio::test]
    async fn test_connect_simulated_end_to_end() {
        let (mut mgr, _events) = manager();
        assert!(!mgr.is_connected());

        assert!(mgr.connect(SIM_PORT_NAME).await);
        assert!(mgr.is_connected());
        assert!(mgr.is_simulated());
        assert_eq!(mgr.port_name(), Some(SIM_PORT_NAME));
        // No monitor in simulated mode
        assert_eq!(mgr.monitor_state(), WorkerState::Stopped);

        // Simulated send always succeeds and retains the record
        let params = PacingParameters::default();
        assert!(mgr.send_and_verify(&params));
        assert_eq!(mgr.last_sent(), Some(&params));

        // Stream a few synthetic points
        let (sink, mut rx) = mpsc::channel(64);
        mgr.start_egram_stream(sink).await.expect("stream failed");
        let point = rx.recv().await.expect("no egram point");
        assert!(point.atrial_value.abs() <= 1.0);
        mgr.stop_egram_stream().await;

        mgr.disconnect().await;
        assert!(!mgr.is_connected());
        assert!(!mgr.is_simulated());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (mut mgr, _events) = manager();
        mgr.disconnect().await;
        assert!(mgr.connect(SIM_PORT_NAME).await);
        mgr.disconnect().await;
        mgr.disconnect().await;
        assert!(!mgr.is_connected());
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let (mut mgr, _events) = manager();
        assert!(!mgr.send_and_verify(&PacingParameters::default()));
        assert!(mgr.last_sent().is_none());
    }

    #[tokio::test]
    async fn test_egram_requires_connection() {
        let (mut mgr, _events) = manager();
        let (sink, _rx) = mpsc::channel(8);
        assert!(mgr.start_egram_stream(sink).await.is_err());
    }

    #[tokio::test]
    async fn test_monitor_and_streamer_are_mutually_exclusive() {
        let (mut mgr, _events) = manager();
        // A scripted transport behaves like a quiet real device
        mgr.install_transport(
            Box::new(ScriptedPort::new(vec![])),
            "scripted",
        )
        .await;
        assert!(!mgr.is_simulated());
        assert_eq!(mgr.monitor_state(), WorkerState::Running);

        let (sink, _rx) = mpsc::channel(64);
        mgr.start_egram_stream(sink).await.expect("stream failed");
        // The monitor was stopped before streaming began
        assert_eq!(mgr.monitor_state(), WorkerState::Stopped);
        assert_eq!(mgr.egram_state(), WorkerState::Running);

        mgr.stop_egram_stream().await;
        // Stopping the stream restarts the monitor in real mode
        assert_eq!(mgr.egram_state(), WorkerState::Stopped);
        assert_eq!(mgr.monitor_state(), WorkerState::Running);

        mgr.disconnect().await;
    }

    #[tokio::test]
    async fn test_double_stream_start_rejected() {
        let (mut mgr, _events) = manager();
        mgr.install_transport(Box::new(SimulatedPort::new()), SIM_PORT_NAME)
            .await;

        let (sink_a, _rx_a) = mpsc::channel(8);
        mgr.start_egram_stream(sink_a).await.expect("stream failed");
        let (sink_b, _rx_b) = mpsc::channel(8);
        assert!(mgr.start_egram_stream(sink_b).await.is_err());

        mgr.disconnect().await;
    }

    #[tokio::test]
    async fn test_connect_failure_reports_false() {
        let (mut mgr, _events) = manager();
        assert!(!mgr.connect("/dev/nonexistent-pacelink-port").await);
        assert!(!mgr.is_connected());
    }
}

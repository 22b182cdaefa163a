// src/streamer.rs
//
// Egram streamer: produces a live sequence of telemetry points while
// connected. Real mode reads one unsigned byte per channel from the port;
// simulated mode synthesizes a pair of sine waveforms at the same cadence.
// Each point is sent through the caller's bounded channel, one send per
// point in production order.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::egram::{EgramPoint, EgramSender};
use crate::transport::SharedTransport;
use crate::types::{LinkEvent, LinkEventSender, LoopKind};
use crate::worker::{LinkWorker, WorkerState};

/// Nominal sample spacing (~100 Hz)
const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);
/// Backoff after a transient read error in real mode
const RETRY_DELAY: Duration = Duration::from_millis(10);
/// Simulated atrial channel frequency factor (1 Hz)
const SIM_ATRIAL_FREQ: f64 = 2.0 * PI;
/// Simulated ventricular channel frequency factor, offset so the two
/// channels drift against each other
const SIM_VENTRICULAR_FREQ: f64 = 2.3 * PI;

/// Where the stream's samples come from.
pub enum EgramSource {
    /// Synthesized sine pair, no hardware involved
    Simulated,
    /// Byte pairs read from the device
    Serial(SharedTransport),
}

pub struct EgramStreamer {
    source: Option<EgramSource>,
    sink: EgramSender,
    event_tx: LinkEventSender,
    state: WorkerState,
    cancel_flag: Arc<AtomicBool>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl EgramStreamer {
    pub fn new(source: EgramSource, sink: EgramSender, event_tx: LinkEventSender) -> Self {
        Self {
            source: Some(source),
            sink,
            event_tx,
            state: WorkerState::Stopped,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            task_handle: None,
        }
    }
}

#[async_trait]
impl LinkWorker for EgramStreamer {
    async fn start(&mut self) -> Result<(), String> {
        if self.state == WorkerState::Running {
            return Err("Egram stream is already running".to_string());
        }

        let source = self
            .source
            .take()
            .ok_or("Egram stream cannot be restarted".to_string())?;

        self.state = WorkerState::Starting;
        self.cancel_flag.store(false, Ordering::Relaxed);

        let cancel_flag = self.cancel_flag.clone();
        let sink = self.sink.clone();
        let event_tx = self.event_tx.clone();

        self.task_handle = Some(tokio::task::spawn_blocking(move || match source {
            EgramSource::Simulated => run_sim_egram_blocking(cancel_flag, sink, event_tx),
            EgramSource::Serial(port) => run_serial_egram_blocking(port, cancel_flag, sink, event_tx),
        }));
        self.state = WorkerState::Running;

        Ok(())
    }

    async fn stop(&mut self) -> Result<(), String> {
        self.cancel_flag.store(true, Ordering::Relaxed);

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }

        self.state = WorkerState::Stopped;
        Ok(())
    }

    fn state(&self) -> WorkerState {
        self.state.clone()
    }
}

/// Simulated stream: two independent sine channels sampled against the
/// stream-start clock. Infinite and restartable, only meant to exercise
/// downstream consumers.
fn run_sim_egram_blocking(
    cancel_flag: Arc<AtomicBool>,
    sink: EgramSender,
    event_tx: LinkEventSender,
) {
    tlog!("[Egram] simulated stream started");
    let t0 = Instant::now();
    let reason;

    loop {
        if cancel_flag.load(Ordering::Relaxed) {
            reason = "stopped";
            break;
        }

        let timestamp_ms = t0.elapsed().as_millis() as u64;
        let t_s = timestamp_ms as f64 / 1000.0;
        let point = EgramPoint {
            timestamp_ms,
            atrial_value: (t_s * SIM_ATRIAL_FREQ).sin(),
            ventricular_value: (t_s * SIM_VENTRICULAR_FREQ).sin(),
        };

        // A closed sink means the consumer went away; nothing left to do
        if sink.blocking_send(point).is_err() {
            reason = "stopped";
            break;
        }

        std::thread::sleep(SAMPLE_INTERVAL);
    }

    let _ = event_tx.blocking_send(LinkEvent::Ended {
        kind: LoopKind::Egram,
        reason: reason.to_string(),
    });
    tlog!("[Egram] simulated stream stopped ({})", reason);
}

/// Real stream: one unsigned byte per channel, interpreted directly as the
/// atrial/ventricular magnitudes. Partial pairs are carried to the next
/// iteration; nothing is emitted until a full pair arrives.
fn run_serial_egram_blocking(
    port: SharedTransport,
    cancel_flag: Arc<AtomicBool>,
    sink: EgramSender,
    event_tx: LinkEventSender,
) {
    tlog!("[Egram] serial stream started (uint8 atr/vent pairs)");
    let t0 = Instant::now();
    let mut pending: Vec<u8> = Vec::with_capacity(2);
    let mut sample_count: u64 = 0;
    let reason;

    loop {
        if cancel_flag.load(Ordering::Relaxed) {
            reason = "stopped";
            break;
        }

        let read_result = match port.lock() {
            Ok(mut guard) => guard.read(2 - pending.len()),
            Err(e) => {
                tlog!("[Egram] port mutex poisoned: {}", e);
                reason = "error";
                break;
            }
        };

        match read_result {
            Ok(data) if data.is_empty() => continue,
            Ok(data) => {
                pending.extend_from_slice(&data);
                if pending.len() < 2 {
                    continue;
                }

                let point = EgramPoint {
                    timestamp_ms: t0.elapsed().as_millis() as u64,
                    atrial_value: pending[0] as f64,
                    ventricular_value: pending[1] as f64,
                };
                pending.clear();

                if sample_count < 10 {
                    tlog!(
                        "[Egram] sample {}: atr={}, vent={}, t={} ms",
                        sample_count,
                        point.atrial_value,
                        point.ventricular_value,
                        point.timestamp_ms
                    );
                }
                sample_count += 1;

                if sink.blocking_send(point).is_err() {
                    reason = "stopped";
                    break;
                }
            }
            Err(e) if e.is_fatal() => {
                tlog!("[Egram] fatal serial error in egram loop, stopping: {}", e);
                reason = "disconnected";
                break;
            }
            Err(e) => {
                tlog!("[Egram] loop error: {}", e);
                std::thread::sleep(RETRY_DELAY);
            }
        }
    }

    let _ = event_tx.blocking_send(LinkEvent::Ended {
        kind: LoopKind::Egram,
        reason: reason.to_string(),
    });
    tlog!("[Egram] serial stream stopped ({})", reason);
}

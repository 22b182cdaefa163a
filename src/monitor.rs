// src/monitor.rs
//
// Serial monitor loop: passive diagnostic visibility into raw traffic while
// connected and not streaming egram. Runs against real ports only; simulated
// connections have nothing to watch. Any 31-byte read matching the parameter
// frame header is decoded and reported. Fatal device errors end the loop for
// good; everything else is retried after a brief delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::codec::{decode_frame, is_parameter_frame};
use crate::transport::SharedTransport;
use crate::types::{LinkEvent, LinkEventSender, LoopKind};
use crate::worker::{LinkWorker, WorkerState};

/// Bytes requested per monitor read, enough for a full frame plus slack
const READ_CHUNK: usize = 64;
/// Idle sleep while paused
const PAUSE_POLL: Duration = Duration::from_millis(50);
/// Backoff after a transient read error
const RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct MonitorLoop {
    port: SharedTransport,
    event_tx: LinkEventSender,
    state: WorkerState,
    cancel_flag: Arc<AtomicBool>,
    pause_flag: Arc<AtomicBool>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl MonitorLoop {
    pub fn new(port: SharedTransport, event_tx: LinkEventSender) -> Self {
        Self {
            port,
            event_tx,
            state: WorkerState::Stopped,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            pause_flag: Arc::new(AtomicBool::new(false)),
            task_handle: None,
        }
    }
}

#[async_trait]
impl LinkWorker for MonitorLoop {
    async fn start(&mut self) -> Result<(), String> {
        if self.state == WorkerState::Running {
            return Err("Monitor is already running".to_string());
        }

        self.state = WorkerState::Starting;
        self.cancel_flag.store(false, Ordering::Relaxed);
        self.pause_flag.store(false, Ordering::Relaxed);

        let port = self.port.clone();
        let cancel_flag = self.cancel_flag.clone();
        let pause_flag = self.pause_flag.clone();
        let event_tx = self.event_tx.clone();

        self.task_handle = Some(tokio::task::spawn_blocking(move || {
            run_monitor_blocking(port, cancel_flag, pause_flag, event_tx)
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

    async fn pause(&mut self) -> Result<(), String> {
        if self.state != WorkerState::Running {
            return Err("Monitor is not running".to_string());
        }
        self.pause_flag.store(true, Ordering::Relaxed);
        self.state = WorkerState::Paused;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), String> {
        if self.state != WorkerState::Paused {
            return Err("Monitor is not paused".to_string());
        }
        self.pause_flag.store(false, Ordering::Relaxed);
        self.state = WorkerState::Running;
        Ok(())
    }

    fn state(&self) -> WorkerState {
        self.state.clone()
    }
}

/// Blocking monitor loop. The transport read timeout paces each iteration,
/// so an empty read doubles as the cancellation poll interval.
fn run_monitor_blocking(
    port: SharedTransport,
    cancel_flag: Arc<AtomicBool>,
    pause_flag: Arc<AtomicBool>,
    event_tx: LinkEventSender,
) {
    tlog!("[Monitor] started");
    let reason;

    loop {
        if cancel_flag.load(Ordering::Relaxed) {
            reason = "stopped";
            break;
        }

        if pause_flag.load(Ordering::Relaxed) {
            std::thread::sleep(PAUSE_POLL);
            continue;
        }

        let read_result = match port.lock() {
            Ok(mut guard) => guard.read(READ_CHUNK),
            Err(e) => {
                tlog!("[Monitor] port mutex poisoned: {}", e);
                reason = "error";
                break;
            }
        };

        match read_result {
            Ok(data) if data.is_empty() => continue,
            Ok(data) => {
                tlog!("[Monitor] RX {} bytes: {}", data.len(), hex::encode(&data));
                if is_parameter_frame(&data) {
                    match decode_frame(&data) {
                        Ok(decoded) => {
                            tlog!("[Monitor] decoded:\n{}", decoded.breakdown());
                            let _ = event_tx.blocking_send(LinkEvent::Frame(decoded));
                        }
                        Err(e) => tlog!("[Monitor] decode error: {}", e),
                    }
                }
            }
            Err(e) if e.is_fatal() => {
                tlog!("[Monitor] fatal serial error, stopping monitor loop: {}", e);
                reason = "disconnected";
                break;
            }
            Err(e) => {
                tlog!("[Monitor] read error: {}", e);
                std::thread::sleep(RETRY_DELAY);
            }
        }
    }

    let _ = event_tx.blocking_send(LinkEvent::Ended {
        kind: LoopKind::Monitor,
        reason: reason.to_string(),
    });
    tlog!("[Monitor] stopped ({})", reason);
}

// src/types.rs
//
// Cross-thread messages from the background loops to the link consumer.
// Delivered over a bounded tokio channel; the consumer drains it on its own
// execution context.

use serde::Serialize;

use crate::codec::DecodedFrame;

/// Which background loop produced a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopKind {
    Monitor,
    Egram,
}

/// Message from a background loop to the consumer.
///
/// `Ended` reasons follow the stream conventions: "stopped" for a requested
/// stop, "disconnected" for a fatal device condition, "error" for anything
/// else that terminated the loop. A "disconnected" end means the connection
/// should be treated as lost; there is no automatic reconnect.
#[derive(Clone, Debug, Serialize)]
pub enum LinkEvent {
    /// A parameter frame observed on the wire, decoded for diagnostics
    Frame(DecodedFrame),
    /// A loop terminated (kind, reason)
    Ended { kind: LoopKind, reason: String },
}

/// Sender half of the event channel, cloned into each worker.
pub type LinkEventSender = tokio::sync::mpsc::Sender<LinkEvent>;

//! Common test utilities for Verdigris integration tests.

pub mod scripted;

use tokio::sync::mpsc;
use verdigris::agent::broadcast::DocumentMessage;
use verdigris::types::snapshot::Snapshot;

/// Drains every message currently queued on the receiver.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<DocumentMessage>) -> Vec<DocumentMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

/// Parses every full-snapshot message, in order.
pub fn snapshots(messages: &[DocumentMessage]) -> Vec<Snapshot> {
    messages
        .iter()
        .filter_map(|m| m.snapshot_json())
        .filter_map(|json| Snapshot::from_wire(json).ok())
        .collect()
}

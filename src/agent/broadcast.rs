//! Snapshot broadcast channel between a generation run and its consumer.
//!
//! One ordered, single-producer/single-consumer stream of transient
//! messages per document run. Every content message carries the ENTIRE
//! current snapshot, serialized once — never a diff. That invariant is
//! what makes the channel safe without backpressure: a dropped or
//! coalesced message costs animation smoothness, never correctness,
//! because any later message fully supersedes it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::types::snapshot::Snapshot;

/// A transient message on the document stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentMessage {
    /// Announcement sent before any content so the consumer can open a
    /// viewer for the document.
    Start {
        /// Generated document id.
        id: Uuid,
        /// Human-readable document title.
        title: String,
        /// Document kind (e.g. "terraform").
        kind: String,
    },

    /// The entire current snapshot, serialized to the wire format.
    Snapshot(String),

    /// Generation has completed; no further content will arrive.
    Finish,
}

impl DocumentMessage {
    /// Returns true for content messages.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot(_))
    }

    /// Returns the serialized snapshot if this is a content message.
    #[must_use]
    pub fn snapshot_json(&self) -> Option<&str> {
        match self {
            Self::Snapshot(json) => Some(json),
            _ => None,
        }
    }

    /// Returns true for the terminal message.
    #[must_use]
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish)
    }
}

/// Producer half of the document stream.
///
/// Sends never block and never fail the run: if the consumer has gone
/// away the message is dropped, which is acceptable because messages are
/// transient by design.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: mpsc::UnboundedSender<DocumentMessage>,
}

impl Broadcaster {
    /// Creates a connected producer/consumer pair.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DocumentMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Announces the document before content arrives.
    pub fn start(&self, id: Uuid, title: &str, kind: &str) {
        self.send(DocumentMessage::Start {
            id,
            title: title.to_string(),
            kind: kind.to_string(),
        });
    }

    /// Broadcasts the full current snapshot. Returns the serialized wire
    /// string, which callers track as "the last broadcast".
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn snapshot(&self, snapshot: &Snapshot) -> serde_json::Result<String> {
        let json = snapshot.to_wire()?;
        self.send(DocumentMessage::Snapshot(json.clone()));
        Ok(json)
    }

    /// Broadcasts an already-serialized (possibly partial) content string.
    ///
    /// Used by revision runs, which forward the model's raw accumulating
    /// JSON prefix instead of a locally-built snapshot.
    pub fn raw(&self, content: String) {
        self.send(DocumentMessage::Snapshot(content));
    }

    /// Signals that generation has completed.
    pub fn finish(&self) {
        self.send(DocumentMessage::Finish);
    }

    fn send(&self, message: DocumentMessage) {
        if self.tx.send(message).is_err() {
            debug!("broadcast consumer gone; dropping message");
        }
    }
}

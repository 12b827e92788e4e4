//! Conversion event system.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring buffer of recent events so that a late-attaching UI can catch up on
//! what a running batch has done so far.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

/// Where the engine bundle was materialized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineSource {
    /// All local assets were reachable.
    Local,
    /// The remote bundle was fetched and materialized locally.
    Remote,
}

/// What happened during a conversion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvertEvent {
    // -- Batch lifecycle -----------------------------------------------------
    BatchStarted {
        total: usize,
        format: String,
    },
    FileStarted {
        index: usize,
        name: String,
    },
    FileCompleted {
        index: usize,
        name: String,
        output_name: String,
    },
    FileFailed {
        index: usize,
        name: String,
        error: String,
    },
    BatchCompleted {
        total: usize,
        failed: usize,
    },

    // -- Progress ------------------------------------------------------------
    Progress {
        percent: f32,
        label: String,
    },

    // -- Engine lifecycle ----------------------------------------------------
    EngineLoading {
        phase: String,
    },
    EngineReady {
        source: EngineSource,
    },
    EngineLoadFailed {
        error: String,
    },
}

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<ConvertEvent>,
    recent: RwLock<VecDeque<ConvertEvent>>,
}

impl EventBus {
    /// Create a new event bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<ConvertEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers and store it in the
    /// ring buffer.
    pub fn emit(&self, event: ConvertEvent) {
        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // Ignore send errors (no subscribers).
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<ConvertEvent> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

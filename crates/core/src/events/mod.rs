//! Track lifecycle events, fanned out to connected clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::track::Track;

/// An event describing a change to the track collection.
///
/// The serialized form is the wire format pushed to websocket clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum TrackEvent {
    /// A track was created.
    #[serde(rename = "trackNew")]
    TrackNew {
        track: Track,
        #[serde(rename = "playlistId", skip_serializing_if = "Option::is_none")]
        playlist_id: Option<i64>,
    },

    /// A track's persisted state changed.
    #[serde(rename = "trackUpdate")]
    TrackUpdate { track: Track },

    /// A track was deleted.
    #[serde(rename = "trackDelete")]
    TrackDelete { id: i64 },
}

/// Broadcast bus for track events.
///
/// Emission never blocks and never fails: with no subscribers the event is
/// simply dropped. Slow subscribers lose events (lagged), which is fine for
/// a UI-refresh feed backed by a queryable store.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TrackEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, event: TrackEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

//! Event bus built on a tokio broadcast channel plus an append-only
//! per-session log, so late subscribers can replay exactly what live
//! subscribers observed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::{Event, EventEnvelope};

/// Capacity for the broadcast channel
const DEFAULT_CAPACITY: usize = 1000;

struct SessionLog {
    events: Vec<EventEnvelope>,
    /// Set when a terminal event is appended; the log becomes immutable and
    /// eligible for purging after the retention window.
    terminal_at: Option<DateTime<Utc>>,
}

struct BusInner {
    sender: broadcast::Sender<EventEnvelope>,
    logs: HashMap<Uuid, SessionLog>,
    published: usize,
}

/// Event bus for publishing and subscribing to session progress events.
///
/// Publishing appends to the session log and broadcasts inside a single
/// critical section: the log is the single source of ordering, and a replay
/// snapshot taken together with a fresh receiver has no gap and no overlap.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                sender,
                logs: HashMap::new(),
                published: 0,
            })),
        }
    }

    /// Publish an event to the session log and all live subscribers.
    ///
    /// Returns the number of subscribers that received the event. Events for
    /// a session that already reached a terminal event are rejected to keep
    /// the log immutable.
    pub fn publish(&self, session_id: Uuid, event: Event) -> usize {
        let mut envelope = EventEnvelope::new(session_id, event);
        let mut inner = self.inner.lock().unwrap();

        let log = inner.logs.entry(session_id).or_insert_with(|| SessionLog {
            events: Vec::new(),
            terminal_at: None,
        });
        if log.terminal_at.is_some() {
            tracing::warn!(session_id = %session_id, "event dropped: session log already closed");
            return 0;
        }

        envelope.seq = log.events.len() as u64;
        if envelope.event.is_terminal() {
            log.terminal_at = Some(envelope.timestamp);
        }
        log.events.push(envelope.clone());

        inner.published += 1;
        inner.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to all live events across sessions.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.inner.lock().unwrap().sender.subscribe()
    }

    /// Subscribe with replay: the full history of one session so far, plus a
    /// live receiver created in the same critical section. Every event is in
    /// exactly one of the two.
    pub fn subscribe_with_replay(
        &self,
        session_id: Uuid,
    ) -> (Vec<EventEnvelope>, broadcast::Receiver<EventEnvelope>) {
        let inner = self.inner.lock().unwrap();
        let history = inner
            .logs
            .get(&session_id)
            .map(|log| log.events.clone())
            .unwrap_or_default();
        (history, inner.sender.subscribe())
    }

    /// Snapshot of a session's event log in append order.
    pub fn history(&self, session_id: Uuid) -> Vec<EventEnvelope> {
        self.inner
            .lock()
            .unwrap()
            .logs
            .get(&session_id)
            .map(|log| log.events.clone())
            .unwrap_or_default()
    }

    /// Drop logs of sessions that reached a terminal event more than
    /// `retention` ago. Returns how many logs were purged.
    pub fn purge_expired(&self, retention: Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.logs.len();
        inner
            .logs
            .retain(|_, log| !matches!(log.terminal_at, Some(t) if t < cutoff));
        before - inner.logs.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().sender.receiver_count()
    }

    /// Total number of events published (for monitoring)
    pub fn event_count(&self) -> usize {
        self.inner.lock().unwrap().published
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .field("event_count", &self.event_count())
            .finish()
    }
}

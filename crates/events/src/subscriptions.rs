//! Client subscription protocol for the progress stream.
//!
//! The protocol is transport-agnostic: a transport hands `run_client` an
//! inbound command channel and an outbound message channel and forwards
//! bytes however it likes. Subscribing replays the session's history before
//! bridging to live events; per-session sequence numbers guarantee the
//! bridge has no gap and no duplicate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bus::EventBus;
use crate::types::EventEnvelope;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { session_id: Uuid },
    Unsubscribe { session_id: Uuid },
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Event { envelope: EventEnvelope },
    Subscribed { session_id: Uuid },
    Unsubscribed { session_id: Uuid },
    Pong,
    Error { message: String },
}

/// Transient per-connection state: which sessions the client follows and the
/// next sequence number expected from each. Never persisted.
#[derive(Debug)]
pub struct ClientSubscription {
    pub client_id: Uuid,
    sessions: HashMap<Uuid, u64>,
}

impl ClientSubscription {
    pub fn new(client_id: Uuid) -> Self {
        Self {
            client_id,
            sessions: HashMap::new(),
        }
    }

    pub fn subscribe_from(&mut self, session_id: Uuid, next_seq: u64) {
        self.sessions.insert(session_id, next_seq);
    }

    pub fn unsubscribe(&mut self, session_id: Uuid) -> bool {
        self.sessions.remove(&session_id).is_some()
    }

    /// Whether this envelope should be delivered now. Envelopes already
    /// covered by a replay snapshot are skipped.
    pub fn wants(&self, envelope: &EventEnvelope) -> bool {
        match self.sessions.get(&envelope.session_id) {
            Some(next) => envelope.seq >= *next,
            None => false,
        }
    }

    pub fn advance(&mut self, envelope: &EventEnvelope) {
        if let Some(next) = self.sessions.get_mut(&envelope.session_id) {
            *next = envelope.seq + 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Drive one client connection until it disconnects.
///
/// Terminal events end the per-session stream: the session is dropped from
/// the subscription after its terminal envelope is delivered.
pub async fn run_client(
    bus: EventBus,
    client_id: Uuid,
    mut commands: mpsc::Receiver<ClientMessage>,
    out: mpsc::Sender<ServerMessage>,
) {
    let mut rx = bus.subscribe();
    let mut subscription = ClientSubscription::new(client_id);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                if !handle_command(&bus, &mut subscription, command, &out).await {
                    break;
                }
            }

            event = rx.recv() => {
                match event {
                    Ok(envelope) => {
                        if !subscription.wants(&envelope) {
                            continue;
                        }
                        subscription.advance(&envelope);
                        let terminal = envelope.event.is_terminal();
                        let session_id = envelope.session_id;
                        if out.send(ServerMessage::Event { envelope }).await.is_err() {
                            break;
                        }
                        if terminal {
                            subscription.unsubscribe(session_id);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(client_id = %client_id, missed = n, "subscriber lagged");
                        let message = ServerMessage::Error {
                            message: format!("stream lagged, missed {} events", n),
                        };
                        if out.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    debug!(client_id = %client_id, "client connection closed");
}

async fn handle_command(
    bus: &EventBus,
    subscription: &mut ClientSubscription,
    command: ClientMessage,
    out: &mpsc::Sender<ServerMessage>,
) -> bool {
    match command {
        ClientMessage::Subscribe { session_id } => {
            let history = bus.history(session_id);
            subscription.subscribe_from(session_id, history.len() as u64);

            if out
                .send(ServerMessage::Subscribed { session_id })
                .await
                .is_err()
            {
                return false;
            }
            let mut closed = false;
            for envelope in history {
                closed = envelope.event.is_terminal();
                if out.send(ServerMessage::Event { envelope }).await.is_err() {
                    return false;
                }
            }
            if closed {
                subscription.unsubscribe(session_id);
            }
            true
        }
        ClientMessage::Unsubscribe { session_id } => {
            subscription.unsubscribe(session_id);
            out.send(ServerMessage::Unsubscribed { session_id })
                .await
                .is_ok()
        }
        ClientMessage::Ping => out.send(ServerMessage::Pong).await.is_ok(),
    }
}

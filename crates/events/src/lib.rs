//! Streaming progress bus: event types, pub/sub distribution, and
//! replay-consistent per-session logs.

mod bus;
mod subscriptions;
mod types;

pub use bus::EventBus;
pub use subscriptions::{run_client, ClientMessage, ClientSubscription, ServerMessage};
pub use types::{Event, EventEnvelope};

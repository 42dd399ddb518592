//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` pushes change events for subscribed
//! entity-kind channels. Clients subscribe by channel name and treat
//! every event as a signal to re-fetch over REST.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;

//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The endpoint at `/ws` streams committed funding events to clients that
//! subscribed to the matching campaign ids (or to `"*"`).

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;

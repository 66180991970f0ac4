//! WebSocket server for real-time updates.
//!
//! Clients can subscribe to:
//! - Challenge lifecycle events (created, funded, activated, completed, ...)
//! - Settlement events (payout submitted, payout failed)
//!
//! Subscriptions can be filtered to a set of challenge ids.

pub mod server;
pub mod subscriptions;

pub use server::{WebSocketServer, WsState};

//! HTTP API for the ARENA coordinator.
//!
//! Exposes the challenge lifecycle (create, join, fund, results, dispute
//! resolution) and settlement operations (settle, replay) over a small JSON
//! API, plus read endpoints for listings and telemetry.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::RpcServer;

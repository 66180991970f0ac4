//! Challenge lifecycle coordination.
//!
//! The controller is the write path: every mutating operation reads a
//! record, applies the pure lifecycle engine, and writes back under
//! optimistic concurrency. The sweeper is the background path: it fires
//! expired deadlines and pumps owed settlements. Both publish events on a
//! broadcast channel for the WebSocket layer.

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod sweeper;

pub use config::CoordinatorConfig;
pub use controller::LifecycleController;
pub use error::CoordinatorError;
pub use event::ChallengeEvent;
pub use sweeper::TimeoutSweeper;

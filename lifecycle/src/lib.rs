//! Pure challenge lifecycle engine.
//!
//! Everything in this crate is deterministic: functions take a mutable
//! challenge record, the current time, and the coordinator parameters, and
//! either mutate the record and return events for the caller to act on, or
//! reject the operation without touching the record. No I/O, no clocks, no
//! storage.

pub mod bracket;
pub mod error;
pub mod event;
pub mod reconcile;
pub mod transition;

pub use error::LifecycleError;
pub use event::LifecycleEvent;
pub use transition::{apply, Action};

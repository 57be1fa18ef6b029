//! Hub-side session coordinator.
//!
//! A hub runs one [`Session`] at a time:
//!
//! ```text
//! Idle ──start()──► Proposing ──PROPOSE sent──► Awaiting ──quorum──► Completed
//!                                                   │
//!                                                   └──abandon()──► Abandoned
//! ```
//!
//! # Triggers
//!
//! The joint operation runs at most once per session, on whichever comes
//! first:
//!
//! - **Eager**: a resource notification makes the qualifying count reach the
//!   required count.
//! - **Deadline**: the end-of-window check finds the quorum met.
//!
//! If the deadline check finds the quorum unmet, every unresolved sensor is
//! sent ATTEMPT_FAILED and the session stays `Awaiting` so their classical
//! fallback bits can still be collected.
//!
//! Participants are the first `required` qualifying sensors in target order,
//! so selection never depends on the order in which notifications arrived.

mod config;
mod error;
mod session;
mod state;

pub use config::{HubConfig, QuorumPolicy};
pub use error::SessionError;
pub use session::{RecordOutcome, Resolution, SensorStatus, Session};
pub use state::HubCoordinator;

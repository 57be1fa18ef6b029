//! Combined node state machine.
//!
//! A node plays exactly one role: it is either a hub coordinating a session
//! or a sensor answering one. This crate wraps both behind a single
//! [`StateMachine`](qsn_core::StateMachine) so a runner can drive any node
//! the same way.

mod state;

pub use state::{NodeRole, NodeStateMachine};

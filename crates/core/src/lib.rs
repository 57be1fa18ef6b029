//! Core types for QSN hub/sensor coordination.
//!
//! This crate provides the foundational types for the coordination architecture:
//!
//! - [`ProtocolEvent`]: Events processed by the hub and sensor state machines
//! - [`Action`]: All possible outputs from a state machine
//! - [`EventPriority`]: Ordering priority for events at the same timestamp
//! - [`StateMachine`]: The trait that every node state machine implements
//! - [`MessageHandler`], [`ResourceObserver`], [`DeadlineHandler`]: the narrow
//!   capability interfaces each role composes
//! - [`ProtocolObserver`]: the injected diagnostics sink
//!
//! # Architecture
//!
//! ```text
//! ProtocolEvent → StateMachine::handle() → Actions → runner (network, resource layer, timers)
//! ```
//!
//! The state machine is:
//! - **Synchronous**: No async, no .await
//! - **Deterministic**: Same state + event = same actions
//! - **Pure-ish**: Mutates self, but performs no I/O
//!
//! All I/O is handled by the runner which:
//! 1. Delivers events to the node
//! 2. Executes the returned actions
//! 3. Converts results (message deliveries, resource notifications, timer
//!    firings) back into events

mod action;
mod event;
mod observer;
mod outcome;
mod timer;
mod traits;

pub use action::Action;
pub use event::{EventPriority, ProtocolEvent};
pub use observer::{
    NoopObserver, ProtocolNotice, ProtocolObserver, RecordingObserver, Severity, TracingObserver,
};
pub use outcome::{SessionOutcome, SessionPhase};
pub use timer::TimerId;
pub use traits::{
    DeadlineHandler, JointOperation, MessageHandler, NoOpJointOperation, ResourceObserver,
    StateMachine,
};

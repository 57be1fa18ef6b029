//! Deterministic simulation runner.
//!
//! This crate provides a fully deterministic environment for running
//! hub/sensor coordination rounds. Given the same seed, it produces
//! identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, SimEvent>)     │ │
//! │  │     Ordered by: time, priority, node, sequence     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     nodes: BTreeMap<NodeId, NodeStateMachine>      │ │
//! │  │     Each processes events sequentially             │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → network / resource layer / timers    │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod error;
mod event_queue;
mod joint;
mod network;
mod resources;
mod runner;

pub use error::SimulationError;
pub use event_queue::{EventKey, SimEvent};
pub use joint::GhzMeasurement;
pub use network::{NetworkConfig, SimulatedNetwork};
pub use resources::{
    EntanglementRequest, ResourceLayerConfig, ResourceNotification, ResourceStats,
    ScheduledTransition, SimulatedResourceLayer,
};
pub use runner::{SimulationRunner, SimulationStats};

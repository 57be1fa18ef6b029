//! Action types for the deterministic state machines.

use crate::{SessionOutcome, TimerId};
use qsn_messages::GhzMessage;
use qsn_types::{NodeId, ResourceHandle};
use std::time::Duration;

/// Actions a state machine asks its runner to perform.
///
/// Actions are **commands** - they describe something to do. The state
/// machine never performs I/O itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Messaging
    // ═══════════════════════════════════════════════════════════════════════
    /// Send a protocol message to another node.
    SendMessage { to: NodeId, message: GhzMessage },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Fire `id` after `duration` of simulated time.
    SetTimer { id: TimerId, duration: Duration },

    // ═══════════════════════════════════════════════════════════════════════
    // Resource layer
    // ═══════════════════════════════════════════════════════════════════════
    /// Ask the resource layer to entangle `resource_count` memories with
    /// `peer` inside the `[start_deadline, end_deadline)` window.
    RequestEntanglement {
        peer: NodeId,
        start_deadline: Duration,
        end_deadline: Duration,
        resource_count: usize,
        fidelity_threshold: f64,
    },

    /// Return resources to RAW.
    ReleaseResources { handles: Vec<ResourceHandle> },

    // ═══════════════════════════════════════════════════════════════════════
    // Reporting
    // ═══════════════════════════════════════════════════════════════════════
    /// A hub session reached a terminal phase.
    EmitSessionOutcome { outcome: SessionOutcome },
}

impl Action {
    /// Get the action type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SendMessage { .. } => "SendMessage",
            Action::SetTimer { .. } => "SetTimer",
            Action::RequestEntanglement { .. } => "RequestEntanglement",
            Action::ReleaseResources { .. } => "ReleaseResources",
            Action::EmitSessionOutcome { .. } => "EmitSessionOutcome",
        }
    }
}

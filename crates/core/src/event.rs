//! Event types for the deterministic state machines.

use qsn_messages::GhzMessage;
use qsn_types::{NodeId, ResourceInfo};
use std::time::Duration;

/// Priority levels for event ordering within the same timestamp.
///
/// Events at the same simulation time are processed in priority order.
/// Lower values = higher priority (processed first).
///
/// The protocol never depends on this tie-break; it only makes runs
/// reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Internal events: consequences of prior event processing.
    Internal = 0,

    /// Timer events: scheduled by the node itself.
    Timer = 1,

    /// Network events: messages from other nodes.
    Network = 2,

    /// Client events: session control from the operator.
    Client = 3,
}

/// Events that a node state machine processes.
///
/// Events are **passive data** - they describe something that happened.
/// The state machine processes events and returns actions.
#[derive(Debug, Clone)]
pub enum ProtocolEvent {
    // ═══════════════════════════════════════════════════════════════════════
    // Session control (priority: Client)
    // ═══════════════════════════════════════════════════════════════════════
    /// Start a coordination round on a hub.
    StartSession {
        targets: Vec<NodeId>,
        start_deadline: Duration,
        end_deadline: Duration,
        /// Per-session quorum; `None` uses the hub's configured policy.
        required: Option<usize>,
    },

    /// Explicitly abandon the hub's active session.
    AbandonSession,

    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// The end deadline of the hub session started as `round` was reached.
    SessionDeadline { round: u64 },

    // ═══════════════════════════════════════════════════════════════════════
    // Network (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// A protocol message arrived from another node.
    MessageReceived { from: NodeId, message: GhzMessage },

    // ═══════════════════════════════════════════════════════════════════════
    // Resource layer (priority: Internal)
    // ═══════════════════════════════════════════════════════════════════════
    /// A local resource changed state.
    ResourceStateChanged { info: ResourceInfo },
}

impl ProtocolEvent {
    /// Get the priority for this event type.
    pub fn priority(&self) -> EventPriority {
        match self {
            ProtocolEvent::StartSession { .. } | ProtocolEvent::AbandonSession => {
                EventPriority::Client
            }
            ProtocolEvent::SessionDeadline { .. } => EventPriority::Timer,
            ProtocolEvent::MessageReceived { .. } => EventPriority::Network,
            ProtocolEvent::ResourceStateChanged { .. } => EventPriority::Internal,
        }
    }

    /// Check if this is a network event (from another node).
    pub fn is_network(&self) -> bool {
        self.priority() == EventPriority::Network
    }

    /// Get the event type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            ProtocolEvent::StartSession { .. } => "StartSession",
            ProtocolEvent::AbandonSession => "AbandonSession",
            ProtocolEvent::SessionDeadline { .. } => "SessionDeadline",
            ProtocolEvent::MessageReceived { .. } => "MessageReceived",
            ProtocolEvent::ResourceStateChanged { .. } => "ResourceStateChanged",
        }
    }
}

//! GHZ coordination message.

use qsn_types::{ClassicalBit, NodeId, ResourceState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Direction a message kind travels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HubToSensor,
    SensorToHub,
}

/// Discriminant of a [`GhzMessage`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Propose,
    Accept,
    Reject,
    StatusUpdate,
    AttemptFailed,
    ClassicalFallback,
}

impl MessageKind {
    pub fn direction(self) -> Direction {
        match self {
            MessageKind::Propose | MessageKind::AttemptFailed => Direction::HubToSensor,
            MessageKind::Accept
            | MessageKind::Reject
            | MessageKind::StatusUpdate
            | MessageKind::ClassicalFallback => Direction::SensorToHub,
        }
    }

    /// Stable message type identifier (e.g., "ghz.propose").
    pub fn message_type_id(self) -> &'static str {
        match self {
            MessageKind::Propose => "ghz.propose",
            MessageKind::Accept => "ghz.accept",
            MessageKind::Reject => "ghz.reject",
            MessageKind::StatusUpdate => "ghz.status_update",
            MessageKind::AttemptFailed => "ghz.attempt_failed",
            MessageKind::ClassicalFallback => "ghz.classical_fallback",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Propose => "PROPOSE",
            MessageKind::Accept => "ACCEPT",
            MessageKind::Reject => "REJECT",
            MessageKind::StatusUpdate => "STATUS_UPDATE",
            MessageKind::AttemptFailed => "ATTEMPT_FAILED",
            MessageKind::ClassicalFallback => "CLASSICAL_FALLBACK",
        };
        f.write_str(name)
    }
}

/// A message of the GHZ coordination protocol.
///
/// Immutable once built. Only the fields relevant to a kind exist on its
/// variant, so "absent" fields cannot be misread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GhzMessage {
    /// Invite a sensor into a coordination round.
    Propose {
        hub: NodeId,
        start_deadline: Duration,
        end_deadline: Duration,
        resource_count: usize,
    },

    /// The sensor agrees to participate.
    Accept,

    /// The sensor declines. Defined for completeness; the current sensor
    /// policy always accepts.
    Reject,

    /// The sensor reports a change in one of its resources.
    StatusUpdate { status: ResourceState },

    /// The hub gave up waiting on this sensor; the sensor must fall back.
    AttemptFailed,

    /// The sensor's substitute local result.
    ClassicalFallback { bit: ClassicalBit },
}

impl GhzMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            GhzMessage::Propose { .. } => MessageKind::Propose,
            GhzMessage::Accept => MessageKind::Accept,
            GhzMessage::Reject => MessageKind::Reject,
            GhzMessage::StatusUpdate { .. } => MessageKind::StatusUpdate,
            GhzMessage::AttemptFailed => MessageKind::AttemptFailed,
            GhzMessage::ClassicalFallback { .. } => MessageKind::ClassicalFallback,
        }
    }

    pub fn direction(&self) -> Direction {
        self.kind().direction()
    }

    /// Get the message type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            GhzMessage::Propose { .. } => "Propose",
            GhzMessage::Accept => "Accept",
            GhzMessage::Reject => "Reject",
            GhzMessage::StatusUpdate { .. } => "StatusUpdate",
            GhzMessage::AttemptFailed => "AttemptFailed",
            GhzMessage::ClassicalFallback { .. } => "ClassicalFallback",
        }
    }
}

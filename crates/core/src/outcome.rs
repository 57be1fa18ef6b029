//! Session lifecycle and terminal outcome.

use qsn_types::{ClassicalBit, NodeId};
use std::fmt;
use std::time::Duration;

/// Lifecycle phase of a hub session.
///
/// `Idle → Proposing → Awaiting → Completed`, or `Awaiting → Abandoned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Idle,
    Proposing,
    Awaiting,
    Completed,
    Abandoned,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Abandoned)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Proposing => "proposing",
            SessionPhase::Awaiting => "awaiting",
            SessionPhase::Completed => "completed",
            SessionPhase::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

/// Terminal record of a hub session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub hub: NodeId,

    /// Either [`SessionPhase::Completed`] or [`SessionPhase::Abandoned`].
    pub phase: SessionPhase,

    /// Sensors whose resources took part in the joint operation, in target
    /// order. Empty for abandoned sessions.
    pub participants: Vec<NodeId>,

    /// Classical outcomes returned by the joint operation.
    pub joint_outcomes: Vec<ClassicalBit>,

    /// Classical fallback results received before the session ended, in
    /// target order.
    pub fallback_bits: Vec<(NodeId, ClassicalBit)>,

    /// Simulation time at which the session ended.
    pub finished_at: Duration,
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }
}

//! Injected diagnostics sink.
//!
//! Hub and sensor state machines never log through process-wide state. Each
//! one receives an [`Arc<dyn ProtocolObserver>`](ProtocolObserver) at
//! construction and reports structured [`ProtocolNotice`] values to it. The
//! observer decides where they go:
//!
//! - [`TracingObserver`] forwards them to `tracing` at the notice's severity
//! - [`NoopObserver`] drops them
//! - [`RecordingObserver`] keeps them in memory for assertions

use qsn_messages::MessageKind;
use qsn_types::{ClassicalBit, NodeId, ResourceState};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A structured diagnostic emitted by a protocol state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolNotice {
    // ═══════════════════════════════════════════════════════════════════════
    // Hub
    // ═══════════════════════════════════════════════════════════════════════
    SessionStarted {
        targets: usize,
        required: usize,
        end_deadline: Duration,
    },
    SessionRejected {
        reason: String,
    },
    ProposalSent {
        sensor: NodeId,
    },
    EntanglementRequested {
        sensor: NodeId,
    },
    ResourceRecorded {
        sensor: NodeId,
        state: ResourceState,
        entangled: usize,
    },
    HistoryFull {
        sensor: NodeId,
    },
    QuorumReached {
        qualifying: usize,
        required: usize,
        eager: bool,
    },
    JointOperationExecuted {
        participants: Vec<NodeId>,
        outcomes: Vec<ClassicalBit>,
    },
    ResourcesReleased {
        count: usize,
    },
    QuorumShortfall {
        qualifying: usize,
        required: usize,
    },
    AttemptFailedSent {
        sensor: NodeId,
    },
    FallbackReceived {
        sensor: NodeId,
        bit: ClassicalBit,
    },
    SensorDeclined {
        sensor: NodeId,
    },
    DuplicateResolution {
        sensor: NodeId,
        kind: MessageKind,
    },
    LateEvent {
        event: &'static str,
    },
    SessionAbandoned {
        unresolved: usize,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Sensor
    // ═══════════════════════════════════════════════════════════════════════
    HubRecorded {
        hub: NodeId,
    },
    ProposalAccepted {
        hub: NodeId,
    },
    StatusForwarded {
        hub: NodeId,
        state: ResourceState,
    },
    FallbackEntered {
        hub: NodeId,
    },
    ClassicalResultSent {
        hub: NodeId,
        bit: ClassicalBit,
    },
    IgnoredInFallback {
        from: NodeId,
        kind: MessageKind,
    },
    MissingHub {
        context: &'static str,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Either role
    // ═══════════════════════════════════════════════════════════════════════
    /// A message kind that has no meaning in the receiver's current state.
    UnexpectedMessage {
        from: NodeId,
        kind: MessageKind,
        state: &'static str,
    },
    /// A message from a node this role does not coordinate with.
    UnknownSender {
        from: NodeId,
        kind: MessageKind,
    },
    /// A resource notification for a link this role does not track.
    UnknownResource {
        remote: NodeId,
    },
    /// An event this role has no handler for.
    UnsupportedEvent {
        event: &'static str,
    },
}

impl ProtocolNotice {
    pub fn severity(&self) -> Severity {
        match self {
            ProtocolNotice::HistoryFull { .. }
            | ProtocolNotice::ResourceRecorded { .. } => Severity::Trace,

            ProtocolNotice::DuplicateResolution { .. }
            | ProtocolNotice::LateEvent { .. }
            | ProtocolNotice::IgnoredInFallback { .. }
            | ProtocolNotice::StatusForwarded { .. }
            | ProtocolNotice::ProposalSent { .. } => Severity::Debug,

            ProtocolNotice::SessionStarted { .. }
            | ProtocolNotice::EntanglementRequested { .. }
            | ProtocolNotice::QuorumReached { .. }
            | ProtocolNotice::JointOperationExecuted { .. }
            | ProtocolNotice::ResourcesReleased { .. }
            | ProtocolNotice::AttemptFailedSent { .. }
            | ProtocolNotice::FallbackReceived { .. }
            | ProtocolNotice::SensorDeclined { .. }
            | ProtocolNotice::SessionAbandoned { .. }
            | ProtocolNotice::HubRecorded { .. }
            | ProtocolNotice::ProposalAccepted { .. }
            | ProtocolNotice::FallbackEntered { .. }
            | ProtocolNotice::ClassicalResultSent { .. } => Severity::Info,

            ProtocolNotice::QuorumShortfall { .. }
            | ProtocolNotice::UnexpectedMessage { .. }
            | ProtocolNotice::UnknownSender { .. }
            | ProtocolNotice::UnknownResource { .. }
            | ProtocolNotice::UnsupportedEvent { .. } => Severity::Warn,

            ProtocolNotice::SessionRejected { .. } | ProtocolNotice::MissingHub { .. } => {
                Severity::Error
            }
        }
    }
}

impl fmt::Display for ProtocolNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolNotice::SessionStarted {
                targets,
                required,
                end_deadline,
            } => write!(
                f,
                "session started with {targets} targets, {required} required, deadline {end_deadline:?}"
            ),
            ProtocolNotice::SessionRejected { reason } => {
                write!(f, "session start rejected: {reason}")
            }
            ProtocolNotice::ProposalSent { sensor } => write!(f, "proposal sent to {sensor}"),
            ProtocolNotice::EntanglementRequested { sensor } => {
                write!(f, "requested entanglement with {sensor}")
            }
            ProtocolNotice::ResourceRecorded {
                sensor,
                state,
                entangled,
            } => write!(
                f,
                "recorded {state} resource for {sensor} ({entangled} entangled)"
            ),
            ProtocolNotice::HistoryFull { sensor } => {
                write!(f, "notification history for {sensor} is full")
            }
            ProtocolNotice::QuorumReached {
                qualifying,
                required,
                eager,
            } => {
                let when = if *eager { "before deadline" } else { "at deadline" };
                write!(f, "quorum reached {when}: {qualifying}/{required}")
            }
            ProtocolNotice::JointOperationExecuted {
                participants,
                outcomes,
            } => write!(
                f,
                "joint operation executed on {} participants, {} outcomes",
                participants.len(),
                outcomes.len()
            ),
            ProtocolNotice::ResourcesReleased { count } => {
                write!(f, "released {count} resources")
            }
            ProtocolNotice::QuorumShortfall {
                qualifying,
                required,
            } => write!(
                f,
                "deadline reached under quorum: {qualifying}/{required} sensors entangled"
            ),
            ProtocolNotice::AttemptFailedSent { sensor } => {
                write!(f, "sent ATTEMPT_FAILED to {sensor}")
            }
            ProtocolNotice::FallbackReceived { sensor, bit } => {
                write!(f, "received classical fallback {bit} from {sensor}")
            }
            ProtocolNotice::SensorDeclined { sensor } => write!(f, "{sensor} declined"),
            ProtocolNotice::DuplicateResolution { sensor, kind } => {
                write!(f, "{kind} from already-resolved {sensor} absorbed")
            }
            ProtocolNotice::LateEvent { event } => {
                write!(f, "{event} after session end absorbed")
            }
            ProtocolNotice::SessionAbandoned { unresolved } => {
                write!(f, "session abandoned with {unresolved} unresolved sensors")
            }
            ProtocolNotice::HubRecorded { hub } => write!(f, "hub set to {hub}"),
            ProtocolNotice::ProposalAccepted { hub } => {
                write!(f, "accepted GHZ proposal from {hub}")
            }
            ProtocolNotice::StatusForwarded { hub, state } => {
                write!(f, "sent status {state} to {hub}")
            }
            ProtocolNotice::FallbackEntered { hub } => {
                write!(f, "received ATTEMPT_FAILED from {hub}, entering fallback")
            }
            ProtocolNotice::ClassicalResultSent { hub, bit } => {
                write!(f, "sent classical result {bit} to {hub}")
            }
            ProtocolNotice::IgnoredInFallback { from, kind } => {
                write!(f, "ignoring {kind} from {from} in fallback")
            }
            ProtocolNotice::MissingHub { context } => {
                write!(f, "no hub known while handling {context}, dropped")
            }
            ProtocolNotice::UnexpectedMessage { from, kind, state } => {
                write!(f, "unexpected {kind} from {from} in {state} state")
            }
            ProtocolNotice::UnknownSender { from, kind } => {
                write!(f, "{kind} from unknown sender {from}")
            }
            ProtocolNotice::UnknownResource { remote } => {
                write!(f, "resource notification for untracked link with {remote}")
            }
            ProtocolNotice::UnsupportedEvent { event } => {
                write!(f, "{event} is not handled by this role")
            }
        }
    }
}

/// Sink for protocol notices.
pub trait ProtocolObserver: Send + Sync {
    fn notice(&self, node: NodeId, notice: ProtocolNotice);
}

/// Forwards notices to `tracing` at their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProtocolObserver for TracingObserver {
    fn notice(&self, node: NodeId, notice: ProtocolNotice) {
        match notice.severity() {
            Severity::Trace => trace!(node = node.0, "{notice}"),
            Severity::Debug => debug!(node = node.0, "{notice}"),
            Severity::Info => info!(node = node.0, "{notice}"),
            Severity::Warn => warn!(node = node.0, "{notice}"),
            Severity::Error => error!(node = node.0, "{notice}"),
        }
    }
}

/// Discards every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProtocolObserver for NoopObserver {
    fn notice(&self, _node: NodeId, _notice: ProtocolNotice) {}
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    notices: Mutex<Vec<(NodeId, ProtocolNotice)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all notices recorded so far, in emission order.
    pub fn notices(&self) -> Vec<(NodeId, ProtocolNotice)> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Number of recorded notices at or above `severity`.
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.notices()
            .iter()
            .filter(|(_, n)| n.severity() >= severity)
            .count()
    }

    /// Whether any recorded notice matches `predicate`.
    pub fn any(&self, predicate: impl Fn(&ProtocolNotice) -> bool) -> bool {
        self.notices().iter().any(|(_, n)| predicate(n))
    }
}

impl ProtocolObserver for RecordingObserver {
    fn notice(&self, node: NodeId, notice: ProtocolNotice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push((node, notice)),
            Err(poisoned) => poisoned.into_inner().push((node, notice)),
        }
    }
}

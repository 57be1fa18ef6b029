//! Session start errors.

use qsn_core::SessionPhase;
use qsn_types::NodeId;
use std::time::Duration;

/// Error returned when a hub refuses to start a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Hub already has a session in phase {0}")]
    NotIdle(SessionPhase),
    #[error("Session has no target sensors")]
    EmptyTargets,
    #[error("Sensor {0} listed more than once")]
    DuplicateTarget(NodeId),
    #[error("End deadline {end:?} is not after start deadline {start:?}")]
    InvalidWindow { start: Duration, end: Duration },
    #[error("End deadline {end:?} already passed (now {now:?})")]
    DeadlineElapsed { end: Duration, now: Duration },
}

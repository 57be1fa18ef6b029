//! Core traits for state machines.

use crate::{Action, ProtocolEvent};
use qsn_messages::GhzMessage;
use qsn_types::{ClassicalBit, NodeId, ResourceHandle, ResourceInfo};
use std::time::Duration;

/// A state machine that processes events.
///
/// This is the core abstraction for the coordination architecture.
/// Hub and sensor logic are implemented as state machines that are:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// Never blocks. All I/O is performed by the runner via the returned
    /// actions.
    fn handle(&mut self, event: ProtocolEvent) -> Vec<Action>;

    /// Set the current time.
    ///
    /// Called by the runner before each `handle()` call to provide the
    /// current simulation time.
    fn set_time(&mut self, now: Duration);

    /// Get the time that was last set via `set_time()`.
    fn now(&self) -> Duration;
}

/// Capability: receive protocol messages from other nodes.
pub trait MessageHandler {
    /// Handle a message from `from`.
    ///
    /// Implementations must tolerate any message kind in any state and apply
    /// their own filtering rule.
    fn on_message(&mut self, from: NodeId, message: GhzMessage) -> Vec<Action>;
}

/// Capability: observe local resource state changes.
pub trait ResourceObserver {
    fn on_resource_state_change(&mut self, info: ResourceInfo) -> Vec<Action>;
}

/// Capability: react to the end-of-window deadline. Hub only.
pub trait DeadlineHandler {
    fn on_deadline(&mut self, round: u64) -> Vec<Action>;
}

/// The multi-party joint operation (GHZ circuit plus measurement).
///
/// Implemented by the runner and passed to the hub. Synchronous from the
/// coordinator's point of view: it is invoked once, with the handles of the
/// selected entangled resources, and returns their classical outcomes.
pub trait JointOperation: Send {
    fn run_joint_operation(&mut self, handles: &[ResourceHandle]) -> Vec<ClassicalBit>;
}

/// No-op implementation for unit tests.
///
/// Returns one `0` bit per handle.
pub struct NoOpJointOperation;

impl JointOperation for NoOpJointOperation {
    fn run_joint_operation(&mut self, handles: &[ResourceHandle]) -> Vec<ClassicalBit> {
        vec![ClassicalBit::ZERO; handles.len()]
    }
}

//! Event queue with deterministic ordering.

use qsn_core::{EventPriority, ProtocolEvent};
use qsn_types::{NodeId, ResourceHandle, ResourceState};
use std::cmp::Ordering;
use std::time::Duration;

/// Something the runner will process at a scheduled time.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// Deliver an event to a node's state machine.
    Node(ProtocolEvent),

    /// A scheduled resource layer transition (entanglement success or
    /// reservation expiry). Applied only if the handle is still eligible.
    Resource {
        handle: ResourceHandle,
        state: ResourceState,
    },
}

impl SimEvent {
    pub fn priority(&self) -> EventPriority {
        match self {
            SimEvent::Node(event) => event.priority(),
            SimEvent::Resource { .. } => EventPriority::Internal,
        }
    }
}

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Priority (internal before timer before network before client)
/// 3. Node id (deterministic ordering)
/// 4. Sequence number (FIFO for same time/priority/node)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: Duration,
    /// Priority for ordering at same time.
    pub priority: EventPriority,
    /// Which node the event belongs to.
    pub node: NodeId,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

impl EventKey {
    pub fn new(time: Duration, event: &SimEvent, node: NodeId, sequence: u64) -> Self {
        Self {
            time,
            priority: event.priority(),
            node,
            sequence,
        }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.node.cmp(&other.node))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(millis: u64, priority: EventPriority, node: u32, sequence: u64) -> EventKey {
        EventKey {
            time: Duration::from_millis(millis),
            priority,
            node: NodeId(node),
            sequence,
        }
    }

    #[test]
    fn test_event_key_ordering() {
        assert!(key(1, EventPriority::Client, 0, 2) < key(2, EventPriority::Internal, 0, 1));
    }

    #[test]
    fn test_priority_ordering_at_same_time() {
        let internal = key(1, EventPriority::Internal, 5, 9);
        let timer = key(1, EventPriority::Timer, 0, 1);
        let network = key(1, EventPriority::Network, 0, 0);
        assert!(internal < timer, "Internal events should process before timers");
        assert!(timer < network, "Timers should process before network");
    }

    #[test]
    fn test_node_then_sequence_ordering() {
        assert!(key(1, EventPriority::Network, 0, 2) < key(1, EventPriority::Network, 1, 1));
        assert!(key(1, EventPriority::Network, 1, 1) < key(1, EventPriority::Network, 1, 2));
    }

    #[test]
    fn test_resource_transitions_are_internal() {
        let event = SimEvent::Resource {
            handle: ResourceHandle(1),
            state: ResourceState::Raw,
        };
        assert_eq!(event.priority(), EventPriority::Internal);
    }
}

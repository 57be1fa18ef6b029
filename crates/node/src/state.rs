//! Node state machine.

use qsn_core::{Action, ProtocolEvent, StateMachine};
use qsn_hub::HubCoordinator;
use qsn_sensor::SensorAgent;
use qsn_types::NodeId;
use std::time::Duration;
use tracing::instrument;

/// The role a node plays, with its role-specific state machine.
#[derive(Debug)]
pub enum NodeRole {
    Hub(HubCoordinator),
    Sensor(SensorAgent),
}

impl NodeRole {
    pub fn name(&self) -> &'static str {
        match self {
            NodeRole::Hub(_) => "hub",
            NodeRole::Sensor(_) => "sensor",
        }
    }
}

/// Combined node state machine.
///
/// Routes every event to the hub or sensor it wraps. Time is tracked here
/// and pushed down before each event.
#[derive(Debug)]
pub struct NodeStateMachine {
    id: NodeId,
    role: NodeRole,
    now: Duration,
}

impl NodeStateMachine {
    pub fn hub(hub: HubCoordinator) -> Self {
        Self {
            id: hub.id(),
            role: NodeRole::Hub(hub),
            now: Duration::ZERO,
        }
    }

    pub fn sensor(sensor: SensorAgent) -> Self {
        Self {
            id: sensor.id(),
            role: NodeRole::Sensor(sensor),
            now: Duration::ZERO,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> &NodeRole {
        &self.role
    }

    pub fn as_hub(&self) -> Option<&HubCoordinator> {
        match &self.role {
            NodeRole::Hub(hub) => Some(hub),
            NodeRole::Sensor(_) => None,
        }
    }

    pub fn as_hub_mut(&mut self) -> Option<&mut HubCoordinator> {
        match &mut self.role {
            NodeRole::Hub(hub) => Some(hub),
            NodeRole::Sensor(_) => None,
        }
    }

    pub fn as_sensor(&self) -> Option<&SensorAgent> {
        match &self.role {
            NodeRole::Sensor(sensor) => Some(sensor),
            NodeRole::Hub(_) => None,
        }
    }
}

impl StateMachine for NodeStateMachine {
    #[instrument(skip(self), fields(
        node = self.id.0,
        role = self.role.name(),
        event = %event.type_name(),
    ))]
    fn handle(&mut self, event: ProtocolEvent) -> Vec<Action> {
        match &mut self.role {
            NodeRole::Hub(hub) => hub.handle(event),
            NodeRole::Sensor(sensor) => sensor.handle(event),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
        match &mut self.role {
            NodeRole::Hub(hub) => hub.set_time(now),
            NodeRole::Sensor(sensor) => sensor.set_time(now),
        }
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsn_core::{NoOpJointOperation, NoopObserver, SessionPhase};
    use qsn_hub::HubConfig;
    use qsn_messages::GhzMessage;
    use std::sync::Arc;

    fn hub_node() -> NodeStateMachine {
        NodeStateMachine::hub(HubCoordinator::new(
            NodeId(0),
            HubConfig::default(),
            Box::new(NoOpJointOperation),
            Arc::new(NoopObserver),
        ))
    }

    fn sensor_node() -> NodeStateMachine {
        NodeStateMachine::sensor(SensorAgent::new(NodeId(1), 7, Arc::new(NoopObserver)))
    }

    #[test]
    fn test_routes_start_to_hub() {
        let mut node = hub_node();
        node.set_time(Duration::from_millis(10));

        let actions = node.handle(ProtocolEvent::StartSession {
            targets: vec![NodeId(1)],
            start_deadline: Duration::from_secs(1),
            end_deadline: Duration::from_secs(2),
            required: None,
        });

        assert_eq!(actions.len(), 2);
        assert_eq!(node.role().name(), "hub");
        assert_eq!(
            node.as_hub().map(HubCoordinator::phase),
            Some(SessionPhase::Awaiting)
        );
        assert_eq!(node.as_hub().map(|h| h.now()), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_routes_messages_to_sensor() {
        let mut node = sensor_node();

        let actions = node.handle(ProtocolEvent::MessageReceived {
            from: NodeId(0),
            message: GhzMessage::Propose {
                hub: NodeId(0),
                start_deadline: Duration::from_secs(1),
                end_deadline: Duration::from_secs(2),
                resource_count: 1,
            },
        });

        assert_eq!(
            actions,
            vec![Action::SendMessage {
                to: NodeId(0),
                message: GhzMessage::Accept
            }]
        );
        assert!(node.as_hub().is_none());
        assert_eq!(
            node.as_sensor().and_then(|s| s.state().hub()),
            Some(NodeId(0))
        );
    }
}

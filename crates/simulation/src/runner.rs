//! Deterministic simulation runner.
//!
//! Nodes never see the network or the resource layer directly. The runner
//! pops the next event, hands it to the owning node, and turns the returned
//! actions into new events: messages go through [`SimulatedNetwork`],
//! entanglement requests and releases through [`SimulatedResourceLayer`],
//! timers straight into the queue.

use crate::event_queue::{EventKey, SimEvent};
use crate::joint::GhzMeasurement;
use crate::network::{NetworkConfig, SimulatedNetwork};
use crate::resources::{
    EntanglementRequest, ResourceLayerConfig, ResourceNotification, ResourceStats,
    SimulatedResourceLayer,
};
use crate::SimulationError;
use qsn_core::{
    Action, ProtocolEvent, ProtocolObserver, SessionOutcome, SessionPhase, StateMachine, TimerId,
    TracingObserver,
};
use qsn_hub::{HubConfig, HubCoordinator};
use qsn_node::NodeStateMachine;
use qsn_sensor::SensorAgent;
use qsn_types::NodeId;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

const SENSOR_SEED_SALT: u64 = 0x5e45_0a11;
const JOINT_SEED_SALT: u64 = 0x6a1e_7000;

/// Derive a per-node seed from the run seed.
fn node_seed(seed: u64, node: NodeId, salt: u64) -> u64 {
    seed.wrapping_add(u64::from(node.0) ^ salt)
        .wrapping_mul(0x517c_c1b7_2722_0a95)
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Events processed by priority.
    pub events_by_priority: [u64; 4],
    /// Total actions generated.
    pub actions_generated: u64,
    /// Messages scheduled for delivery.
    pub messages_sent: u64,
    /// Messages addressed to a node the runner does not know.
    pub messages_undeliverable: u64,
    /// Timers set.
    pub timers_set: u64,
    /// Resource notifications delivered to nodes.
    pub resource_notifications: u64,
    /// Sessions that ran the joint operation.
    pub sessions_completed: u64,
    /// Sessions abandoned.
    pub sessions_abandoned: u64,
}

/// Deterministic simulation runner.
///
/// Processes events in deterministic order and executes actions.
/// Given the same seed and the same setup calls, produces identical results
/// every run.
pub struct SimulationRunner {
    nodes: BTreeMap<NodeId, NodeStateMachine>,

    /// Global event queue, ordered deterministically.
    event_queue: BTreeMap<EventKey, SimEvent>,

    /// Sequence counter for deterministic ordering.
    sequence: u64,

    /// Current simulation time.
    now: Duration,

    network: SimulatedNetwork,
    resources: SimulatedResourceLayer,

    /// Run seed; per-node generators are derived from it.
    seed: u64,

    /// RNG for latency and resource sampling.
    rng: ChaCha8Rng,

    observer: Arc<dyn ProtocolObserver>,
    stats: SimulationStats,
    outcomes: Vec<SessionOutcome>,
}

impl std::fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationRunner")
            .field("nodes", &self.nodes.len())
            .field("pending_events", &self.event_queue.len())
            .field("now", &self.now)
            .field("seed", &self.seed)
            .field("stats", &self.stats)
            .finish()
    }
}

impl SimulationRunner {
    /// Create an empty runner. Protocol notices go to `tracing`.
    pub fn new(network: NetworkConfig, resources: ResourceLayerConfig, seed: u64) -> Self {
        Self {
            nodes: BTreeMap::new(),
            event_queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            network: SimulatedNetwork::new(network),
            resources: SimulatedResourceLayer::new(resources),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            observer: Arc::new(TracingObserver),
            stats: SimulationStats::default(),
            outcomes: Vec::new(),
        }
    }

    /// Replace the observer handed to nodes added from now on.
    pub fn with_observer(mut self, observer: Arc<dyn ProtocolObserver>) -> Self {
        self.observer = observer;
        self
    }

    // ─── Setup ───

    /// Add a hub whose joint operation is a seeded [`GhzMeasurement`].
    pub fn add_hub(&mut self, id: NodeId, config: HubConfig) -> Result<(), SimulationError> {
        let joint = GhzMeasurement::new(node_seed(self.seed, id, JOINT_SEED_SALT));
        let hub = HubCoordinator::new(id, config, Box::new(joint), Arc::clone(&self.observer));
        self.insert_node(NodeStateMachine::hub(hub))
    }

    pub fn add_sensor(&mut self, id: NodeId) -> Result<(), SimulationError> {
        let sensor = SensorAgent::new(
            id,
            node_seed(self.seed, id, SENSOR_SEED_SALT),
            Arc::clone(&self.observer),
        );
        self.insert_node(NodeStateMachine::sensor(sensor))
    }

    fn insert_node(&mut self, node: NodeStateMachine) -> Result<(), SimulationError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(SimulationError::DuplicateNode(id));
        }
        debug!(node = id.0, role = node.role().name(), "Node added");
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Start a session on `hub` at the current time.
    ///
    /// The hub validates the parameters synchronously; on success its
    /// proposals and deadline timer are scheduled. `required` overrides the
    /// hub's quorum policy for this session.
    pub fn start_session(
        &mut self,
        hub: NodeId,
        targets: Vec<NodeId>,
        start_deadline: Duration,
        end_deadline: Duration,
        required: Option<usize>,
    ) -> Result<(), SimulationError> {
        if let Some(&unknown) = targets.iter().find(|&t| !self.nodes.contains_key(t)) {
            return Err(SimulationError::UnknownNode(unknown));
        }
        let now = self.now;
        let node = self
            .nodes
            .get_mut(&hub)
            .ok_or(SimulationError::UnknownNode(hub))?;
        node.set_time(now);
        let coordinator = node.as_hub_mut().ok_or(SimulationError::NotAHub(hub))?;
        let actions = coordinator.start(targets, start_deadline, end_deadline, required)?;

        self.stats.actions_generated += actions.len() as u64;
        for action in actions {
            self.process_action(hub, action);
        }
        Ok(())
    }

    /// Schedule an event for `node` at `now + delay`.
    pub fn schedule_initial_event(&mut self, node: NodeId, delay: Duration, event: ProtocolEvent) {
        let time = self.now + delay;
        self.schedule_event(node, time, SimEvent::Node(event));
    }

    // ─── Accessors ───

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn resource_stats(&self) -> &ResourceStats {
        self.resources.stats()
    }

    /// Terminal session records in the order they were emitted.
    pub fn outcomes(&self) -> &[SessionOutcome] {
        &self.outcomes
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeStateMachine> {
        self.nodes.get(&id)
    }

    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }

    // ─── Running ───

    /// Run simulation until no more events or time limit reached.
    pub fn run_until(&mut self, end_time: Duration) {
        trace!(
            end_time_secs = end_time.as_secs_f64(),
            "Running simulation step"
        );

        while let Some((&key, _)) = self.event_queue.first_key_value() {
            if key.time > end_time {
                debug!(
                    remaining_events = self.event_queue.len(),
                    "Time limit reached"
                );
                break;
            }
            let Some((key, event)) = self.event_queue.pop_first() else {
                break;
            };
            self.process_event(key, event);
        }

        // Always advance to end_time so polling loops make progress.
        if self.now < end_time {
            self.now = end_time;
        }

        trace!(
            events_processed = self.stats.events_processed,
            actions_generated = self.stats.actions_generated,
            final_time = ?self.now,
            "Simulation step complete"
        );
    }

    /// Run until the queue is empty. Returns the time of the last event.
    ///
    /// Always terminates: nothing re-arms itself, so every event chain is
    /// finite.
    pub fn run_to_completion(&mut self) -> Duration {
        while let Some((key, event)) = self.event_queue.pop_first() {
            self.process_event(key, event);
        }
        self.now
    }

    fn process_event(&mut self, key: EventKey, event: SimEvent) {
        self.now = key.time;
        self.stats.events_processed += 1;
        self.stats.events_by_priority[key.priority as usize] += 1;

        trace!(time = ?self.now, node = key.node.0, "Processing event");

        match event {
            SimEvent::Node(event) => self.deliver(key.node, event),
            SimEvent::Resource { handle, state } => {
                let notifications = self.resources.apply(handle, state);
                self.schedule_notifications(notifications);
            }
        }
    }

    fn deliver(&mut self, id: NodeId, event: ProtocolEvent) {
        let Some(node) = self.nodes.get_mut(&id) else {
            warn!(node = id.0, event = event.type_name(), "Event for unknown node dropped");
            return;
        };
        node.set_time(self.now);
        let actions = node.handle(event);
        self.stats.actions_generated += actions.len() as u64;
        for action in actions {
            self.process_action(id, action);
        }
    }

    /// Process an action from a node.
    fn process_action(&mut self, from: NodeId, action: Action) {
        match action {
            Action::SendMessage { to, message } => {
                if !self.nodes.contains_key(&to) {
                    self.stats.messages_undeliverable += 1;
                    warn!(from = from.0, to = to.0, kind = %message.kind(), "Message to unknown node");
                    return;
                }
                let delivery = self
                    .network
                    .delivery_time(from, to, self.now, &mut self.rng);
                self.schedule_event(
                    to,
                    delivery,
                    SimEvent::Node(ProtocolEvent::MessageReceived { from, message }),
                );
                self.stats.messages_sent += 1;
            }

            Action::SetTimer { id, duration } => {
                let event = Self::timer_to_event(id);
                self.schedule_event(from, self.now + duration, SimEvent::Node(event));
                self.stats.timers_set += 1;
            }

            Action::RequestEntanglement {
                peer,
                start_deadline,
                end_deadline,
                resource_count,
                fidelity_threshold,
            } => {
                let request = EntanglementRequest {
                    requester: from,
                    peer,
                    start_deadline,
                    end_deadline,
                    resource_count,
                    fidelity_threshold,
                };
                let transitions = self.resources.request(request, self.now, &mut self.rng);
                for t in transitions {
                    self.schedule_event(
                        from,
                        t.at,
                        SimEvent::Resource {
                            handle: t.handle,
                            state: t.state,
                        },
                    );
                }
            }

            Action::ReleaseResources { handles } => {
                let notifications = self.resources.release(&handles);
                self.schedule_notifications(notifications);
            }

            Action::EmitSessionOutcome { outcome } => {
                match outcome.phase {
                    SessionPhase::Completed => self.stats.sessions_completed += 1,
                    SessionPhase::Abandoned => self.stats.sessions_abandoned += 1,
                    _ => {}
                }
                info!(
                    hub = outcome.hub.0,
                    phase = %outcome.phase,
                    participants = outcome.participants.len(),
                    fallback_bits = outcome.fallback_bits.len(),
                    "Session finished"
                );
                self.outcomes.push(outcome);
            }
        }
    }

    /// Deliver resource notifications to their endpoints at the current time.
    fn schedule_notifications(&mut self, notifications: Vec<ResourceNotification>) {
        for n in notifications {
            self.stats.resource_notifications += 1;
            self.schedule_event(
                n.node,
                self.now,
                SimEvent::Node(ProtocolEvent::ResourceStateChanged { info: n.info }),
            );
        }
    }

    fn schedule_event(&mut self, node: NodeId, time: Duration, event: SimEvent) -> EventKey {
        self.sequence += 1;
        let key = EventKey::new(time, &event, node, self.sequence);
        self.event_queue.insert(key, event);
        key
    }

    fn timer_to_event(id: TimerId) -> ProtocolEvent {
        match id {
            TimerId::SessionDeadline { round } => ProtocolEvent::SessionDeadline { round },
        }
    }
}

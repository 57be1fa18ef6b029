//! Sensor state machine.

use crate::FallbackAgent;
use qsn_core::{
    Action, MessageHandler, ProtocolEvent, ProtocolNotice, ProtocolObserver, ResourceObserver,
    StateMachine,
};
use qsn_messages::{GhzMessage, MessageKind};
use qsn_types::{ClassicalBit, NodeId, ResourceInfo};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;

/// Protocol state of a sensor.
///
/// Exactly one variant at any time. There is no transition out of
/// `Fallback` within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    /// Awaiting or accepting proposals and reporting resource status.
    Normal {
        /// Hub that proposed the current round; `None` until the first PROPOSE.
        hub: Option<NodeId>,
    },

    /// The hub gave up on this sensor; the classical result has been sent.
    Fallback { hub: NodeId, bit: ClassicalBit },
}

impl SensorState {
    pub fn hub(&self) -> Option<NodeId> {
        match self {
            SensorState::Normal { hub } => *hub,
            SensorState::Fallback { hub, .. } => Some(*hub),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SensorState::Fallback { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SensorState::Normal { .. } => "normal",
            SensorState::Fallback { .. } => "fallback",
        }
    }
}

/// Round parameters from the most recent PROPOSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundParameters {
    pub start_deadline: Duration,
    pub end_deadline: Duration,
    pub resource_count: usize,
}

/// Per-sensor coordination state machine.
pub struct SensorAgent {
    id: NodeId,
    state: SensorState,
    round: Option<RoundParameters>,

    /// The node's own generator, used only for the fallback bit.
    rng: ChaCha8Rng,

    observer: Arc<dyn ProtocolObserver>,
    now: Duration,
}

impl std::fmt::Debug for SensorAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorAgent")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("round", &self.round)
            .field("now", &self.now)
            .finish()
    }
}

impl SensorAgent {
    /// Create a sensor in the `Normal` state with no known hub.
    pub fn new(id: NodeId, seed: u64, observer: Arc<dyn ProtocolObserver>) -> Self {
        Self {
            id,
            state: SensorState::Normal { hub: None },
            round: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            observer,
            now: Duration::ZERO,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn round(&self) -> Option<RoundParameters> {
        self.round
    }

    fn notice(&self, notice: ProtocolNotice) {
        self.observer.notice(self.id, notice);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Normal
    // ═══════════════════════════════════════════════════════════════════════

    fn on_propose(&mut self, from: NodeId, round: RoundParameters) -> Vec<Action> {
        self.state = SensorState::Normal { hub: Some(from) };
        self.round = Some(round);
        self.notice(ProtocolNotice::HubRecorded { hub: from });
        self.notice(ProtocolNotice::ProposalAccepted { hub: from });
        vec![Action::SendMessage {
            to: from,
            message: GhzMessage::Accept,
        }]
    }

    fn on_attempt_failed(&mut self, from: NodeId, known_hub: Option<NodeId>) -> Vec<Action> {
        let Some(hub) = known_hub else {
            self.notice(ProtocolNotice::MissingHub {
                context: "ATTEMPT_FAILED",
            });
            return vec![];
        };
        if hub != from {
            self.notice(ProtocolNotice::UnknownSender {
                from,
                kind: MessageKind::AttemptFailed,
            });
            return vec![];
        }
        self.notice(ProtocolNotice::FallbackEntered { hub });
        self.enter_fallback(hub)
    }

    /// Transition into `Fallback` and run the one-shot fallback agent.
    fn enter_fallback(&mut self, hub: NodeId) -> Vec<Action> {
        let (bit, action) = FallbackAgent::new(hub).execute(&mut self.rng);
        self.state = SensorState::Fallback { hub, bit };
        self.notice(ProtocolNotice::ClassicalResultSent { hub, bit });
        vec![action]
    }
}

impl MessageHandler for SensorAgent {
    fn on_message(&mut self, from: NodeId, message: GhzMessage) -> Vec<Action> {
        match self.state {
            SensorState::Normal { hub } => match message {
                GhzMessage::Propose {
                    start_deadline,
                    end_deadline,
                    resource_count,
                    ..
                } => self.on_propose(
                    from,
                    RoundParameters {
                        start_deadline,
                        end_deadline,
                        resource_count,
                    },
                ),
                GhzMessage::AttemptFailed => self.on_attempt_failed(from, hub),
                other => {
                    self.notice(ProtocolNotice::UnexpectedMessage {
                        from,
                        kind: other.kind(),
                        state: self.state.name(),
                    });
                    vec![]
                }
            },
            SensorState::Fallback { .. } => {
                self.notice(ProtocolNotice::IgnoredInFallback {
                    from,
                    kind: message.kind(),
                });
                vec![]
            }
        }
    }
}

impl ResourceObserver for SensorAgent {
    fn on_resource_state_change(&mut self, info: ResourceInfo) -> Vec<Action> {
        match self.state {
            SensorState::Normal { hub: Some(hub) } => {
                self.notice(ProtocolNotice::StatusForwarded {
                    hub,
                    state: info.state,
                });
                vec![Action::SendMessage {
                    to: hub,
                    message: GhzMessage::StatusUpdate { status: info.state },
                }]
            }
            SensorState::Normal { hub: None } => {
                self.notice(ProtocolNotice::MissingHub {
                    context: "resource state change",
                });
                vec![]
            }
            SensorState::Fallback { .. } => vec![],
        }
    }
}

impl StateMachine for SensorAgent {
    fn handle(&mut self, event: ProtocolEvent) -> Vec<Action> {
        match event {
            ProtocolEvent::MessageReceived { from, message } => self.on_message(from, message),
            ProtocolEvent::ResourceStateChanged { info } => self.on_resource_state_change(info),
            other => {
                self.notice(ProtocolNotice::UnsupportedEvent {
                    event: other.type_name(),
                });
                vec![]
            }
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}

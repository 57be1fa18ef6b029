//! Hub coordinator state machine.

use crate::{HubConfig, QuorumPolicy, Resolution, Session, SessionError};
use qsn_core::{
    Action, DeadlineHandler, JointOperation, MessageHandler, ProtocolEvent, ProtocolNotice,
    ProtocolObserver, ResourceObserver, SessionOutcome, SessionPhase, StateMachine, TimerId,
};
use qsn_messages::{GhzMessage, MessageKind};
use qsn_types::{ClassicalBit, NodeId, ResourceInfo, ResourceState};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Hub-side session coordinator.
///
/// Owns at most one [`Session`]. Drives it from `Idle` through
/// `Proposing` and `Awaiting` to `Completed` (or `Abandoned`) and runs the
/// injected [`JointOperation`] exactly once per session.
pub struct HubCoordinator {
    id: NodeId,
    config: HubConfig,
    session: Option<Session>,

    /// Round number handed to the next session; tags its deadline timer.
    next_round: u64,

    joint_operation: Box<dyn JointOperation>,
    joint_operations_run: u64,
    last_outcome: Option<SessionOutcome>,

    observer: Arc<dyn ProtocolObserver>,
    now: Duration,
}

impl std::fmt::Debug for HubCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubCoordinator")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("next_round", &self.next_round)
            .field("joint_operations_run", &self.joint_operations_run)
            .field("now", &self.now)
            .finish()
    }
}

impl HubCoordinator {
    pub fn new(
        id: NodeId,
        config: HubConfig,
        joint_operation: Box<dyn JointOperation>,
        observer: Arc<dyn ProtocolObserver>,
    ) -> Self {
        Self {
            id,
            config,
            session: None,
            next_round: 1,
            joint_operation,
            joint_operations_run: 0,
            last_outcome: None,
            observer,
            now: Duration::ZERO,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map_or(SessionPhase::Idle, Session::phase)
    }

    /// Number of times the joint operation has been invoked.
    pub fn joint_operations_run(&self) -> u64 {
        self.joint_operations_run
    }

    /// Outcome of the most recent terminal session.
    pub fn last_outcome(&self) -> Option<&SessionOutcome> {
        self.last_outcome.as_ref()
    }

    fn notice(&self, notice: ProtocolNotice) {
        self.observer.notice(self.id, notice);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Session control
    // ═══════════════════════════════════════════════════════════════════════

    /// Start a session: PROPOSE to every target and arm the deadline.
    ///
    /// `required` overrides the configured [`QuorumPolicy`] for this session
    /// and is clamped to `[1, targets]`.
    ///
    /// Only valid from `Idle`. Call [`reset`](Self::reset) after a terminal
    /// session to start another.
    pub fn start(
        &mut self,
        targets: Vec<NodeId>,
        start_deadline: Duration,
        end_deadline: Duration,
        required: Option<usize>,
    ) -> Result<Vec<Action>, SessionError> {
        self.validate_start(&targets, start_deadline, end_deadline)?;

        let required = required
            .map_or(self.config.quorum, QuorumPolicy::Fixed)
            .required_for(targets.len());
        let round = self.next_round;
        self.next_round += 1;

        let mut session = Session::new(
            round,
            targets,
            start_deadline,
            end_deadline,
            required,
            self.config.min_entangled_per_sensor,
            self.config.resource_count,
        );

        let mut actions = Vec::with_capacity(session.targets().len() + 1);
        for &sensor in session.targets() {
            actions.push(Action::SendMessage {
                to: sensor,
                message: GhzMessage::Propose {
                    hub: self.id,
                    start_deadline,
                    end_deadline,
                    resource_count: self.config.resource_count,
                },
            });
            self.notice(ProtocolNotice::ProposalSent { sensor });
        }
        actions.push(Action::SetTimer {
            id: TimerId::SessionDeadline { round },
            duration: end_deadline.saturating_sub(self.now),
        });

        self.notice(ProtocolNotice::SessionStarted {
            targets: session.targets().len(),
            required,
            end_deadline,
        });

        session.set_phase(SessionPhase::Awaiting);
        self.session = Some(session);
        Ok(actions)
    }

    fn validate_start(
        &self,
        targets: &[NodeId],
        start_deadline: Duration,
        end_deadline: Duration,
    ) -> Result<(), SessionError> {
        let phase = self.phase();
        if phase != SessionPhase::Idle {
            return Err(SessionError::NotIdle(phase));
        }
        if targets.is_empty() {
            return Err(SessionError::EmptyTargets);
        }
        let mut seen = HashSet::with_capacity(targets.len());
        if let Some(&dup) = targets.iter().find(|&&t| !seen.insert(t)) {
            return Err(SessionError::DuplicateTarget(dup));
        }
        if end_deadline <= start_deadline {
            return Err(SessionError::InvalidWindow {
                start: start_deadline,
                end: end_deadline,
            });
        }
        if end_deadline <= self.now {
            return Err(SessionError::DeadlineElapsed {
                end: end_deadline,
                now: self.now,
            });
        }
        Ok(())
    }

    /// Abandon the awaiting session.
    pub fn abandon(&mut self) -> Vec<Action> {
        let Some(session) = self.active_session("AbandonSession") else {
            return vec![];
        };
        session.set_phase(SessionPhase::Abandoned);
        let unresolved = session.unresolved().len();
        self.notice(ProtocolNotice::SessionAbandoned { unresolved });
        self.finish(SessionPhase::Abandoned, vec![], vec![])
    }

    /// Drop a terminal session and return to `Idle`.
    ///
    /// Returns `false` (and keeps the session) if it is still active.
    pub fn reset(&mut self) -> bool {
        let phase = self.phase();
        if phase == SessionPhase::Idle || phase.is_terminal() {
            self.session = None;
            true
        } else {
            false
        }
    }

    /// The session if it is still accepting events; otherwise reports the
    /// event as late and returns `None`.
    fn active_session(&mut self, event: &'static str) -> Option<&mut Session> {
        let phase = self.phase();
        if phase == SessionPhase::Idle || phase.is_terminal() {
            self.notice(ProtocolNotice::LateEvent { event });
            return None;
        }
        self.session.as_mut()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Messages
    // ═══════════════════════════════════════════════════════════════════════

    fn on_accept(&mut self, sensor: NodeId) -> Vec<Action> {
        let fidelity_threshold = self.config.fidelity_threshold;
        let resource_count = self.config.resource_count;
        let Some(session) = self.session.as_mut() else {
            return vec![];
        };
        let (start_deadline, end_deadline) = (session.start_deadline(), session.end_deadline());
        let Some(status) = session.status_mut(sensor) else {
            return vec![];
        };
        if status.accepted() {
            self.notice(ProtocolNotice::DuplicateResolution {
                sensor,
                kind: MessageKind::Accept,
            });
            return vec![];
        }
        status.mark_accepted();
        self.notice(ProtocolNotice::EntanglementRequested { sensor });
        vec![Action::RequestEntanglement {
            peer: sensor,
            start_deadline,
            end_deadline,
            resource_count,
            fidelity_threshold,
        }]
    }

    fn on_reject(&mut self, sensor: NodeId) -> Vec<Action> {
        let Some(status) = self.session.as_mut().and_then(|s| s.status_mut(sensor)) else {
            return vec![];
        };
        if status.is_resolved() {
            self.notice(ProtocolNotice::DuplicateResolution {
                sensor,
                kind: MessageKind::Reject,
            });
            return vec![];
        }
        status.resolve(Resolution::Declined);
        self.notice(ProtocolNotice::SensorDeclined { sensor });
        vec![]
    }

    /// A RAW status after the deadline means the sensor will not make it.
    fn on_status_update(&mut self, sensor: NodeId, status: ResourceState) -> Vec<Action> {
        if status.is_entangled() {
            return vec![];
        }
        let now = self.now;
        let Some(session) = self.session.as_mut() else {
            return vec![];
        };
        if now < session.end_deadline() {
            return vec![];
        }
        let unresolved = session.status(sensor).is_some_and(|s| !s.is_resolved());
        if unresolved {
            self.give_up(sensor)
        } else {
            vec![]
        }
    }

    fn on_classical_fallback(&mut self, sensor: NodeId, bit: ClassicalBit) -> Vec<Action> {
        let Some(status) = self.session.as_mut().and_then(|s| s.status_mut(sensor)) else {
            return vec![];
        };
        match status.resolution() {
            None | Some(Resolution::GivenUp) => {
                status.resolve(Resolution::Fallback(bit));
                self.notice(ProtocolNotice::FallbackReceived { sensor, bit });
            }
            Some(_) => self.notice(ProtocolNotice::DuplicateResolution {
                sensor,
                kind: MessageKind::ClassicalFallback,
            }),
        }
        vec![]
    }

    /// Send ATTEMPT_FAILED to `sensor` and mark it given up.
    fn give_up(&mut self, sensor: NodeId) -> Vec<Action> {
        let Some(status) = self.session.as_mut().and_then(|s| s.status_mut(sensor)) else {
            return vec![];
        };
        status.resolve(Resolution::GivenUp);
        self.notice(ProtocolNotice::AttemptFailedSent { sensor });
        vec![Action::SendMessage {
            to: sensor,
            message: GhzMessage::AttemptFailed,
        }]
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Trigger
    // ═══════════════════════════════════════════════════════════════════════

    /// Run the joint operation on the selected participants and complete.
    ///
    /// No-op unless the session is awaiting.
    fn trigger(&mut self, eager: bool) -> Vec<Action> {
        let Some(session) = self.session.as_mut() else {
            return vec![];
        };
        if session.phase() != SessionPhase::Awaiting {
            return vec![];
        }
        session.set_phase(SessionPhase::Completed);

        let qualifying = session.qualifying_count();
        let required = session.required();
        let participants = session.select_participants();
        let handles = session.handles_of(&participants);

        self.notice(ProtocolNotice::QuorumReached {
            qualifying,
            required,
            eager,
        });

        let outcomes = self.joint_operation.run_joint_operation(&handles);
        self.joint_operations_run += 1;
        self.notice(ProtocolNotice::JointOperationExecuted {
            participants: participants.clone(),
            outcomes: outcomes.clone(),
        });

        self.notice(ProtocolNotice::ResourcesReleased {
            count: handles.len(),
        });
        let mut actions = vec![Action::ReleaseResources { handles }];
        actions.extend(self.finish(SessionPhase::Completed, participants, outcomes));
        actions
    }

    fn finish(
        &mut self,
        phase: SessionPhase,
        participants: Vec<NodeId>,
        joint_outcomes: Vec<ClassicalBit>,
    ) -> Vec<Action> {
        let fallback_bits = self
            .session
            .as_ref()
            .map(Session::fallback_bits)
            .unwrap_or_default();
        let outcome = SessionOutcome {
            hub: self.id,
            phase,
            participants,
            joint_outcomes,
            fallback_bits,
            finished_at: self.now,
        };
        self.last_outcome = Some(outcome.clone());
        vec![Action::EmitSessionOutcome { outcome }]
    }
}

impl MessageHandler for HubCoordinator {
    fn on_message(&mut self, from: NodeId, message: GhzMessage) -> Vec<Action> {
        let Some(session) = self.active_session(message.type_name()) else {
            return vec![];
        };
        if !session.is_target(from) {
            self.notice(ProtocolNotice::UnknownSender {
                from,
                kind: message.kind(),
            });
            return vec![];
        }
        match message {
            GhzMessage::Accept => self.on_accept(from),
            GhzMessage::Reject => self.on_reject(from),
            GhzMessage::StatusUpdate { status } => self.on_status_update(from, status),
            GhzMessage::ClassicalFallback { bit } => self.on_classical_fallback(from, bit),
            other @ (GhzMessage::Propose { .. } | GhzMessage::AttemptFailed) => {
                self.notice(ProtocolNotice::UnexpectedMessage {
                    from,
                    kind: other.kind(),
                    state: "awaiting",
                });
                vec![]
            }
        }
    }
}

impl ResourceObserver for HubCoordinator {
    fn on_resource_state_change(&mut self, info: ResourceInfo) -> Vec<Action> {
        let Some(session) = self.active_session("ResourceStateChanged") else {
            return vec![];
        };
        let Some(recorded) = session.record_resource(&info) else {
            self.notice(ProtocolNotice::UnknownResource {
                remote: info.remote,
            });
            return vec![];
        };
        let entangled = session
            .status(info.remote)
            .map_or(0, |s| s.entangled_count());
        let history_full = !recorded.appended;
        let quorum = info.state.is_entangled()
            && session.qualifies(info.remote)
            && session.has_quorum();

        self.notice(ProtocolNotice::ResourceRecorded {
            sensor: info.remote,
            state: info.state,
            entangled,
        });
        if history_full {
            self.notice(ProtocolNotice::HistoryFull {
                sensor: info.remote,
            });
        }

        if quorum {
            self.trigger(true)
        } else {
            vec![]
        }
    }
}

impl DeadlineHandler for HubCoordinator {
    fn on_deadline(&mut self, round: u64) -> Vec<Action> {
        let Some(session) = self.active_session("SessionDeadline") else {
            return vec![];
        };
        if session.round() != round {
            self.notice(ProtocolNotice::LateEvent {
                event: "SessionDeadline",
            });
            return vec![];
        }
        // Quorum only grows on an ENTANGLED notification, which triggers
        // eagerly; this catches a session whose records were updated
        // without that check.
        if session.has_quorum() {
            return self.trigger(false);
        }

        let qualifying = session.qualifying_count();
        let required = session.required();
        let unresolved = session.unresolved();
        self.notice(ProtocolNotice::QuorumShortfall {
            qualifying,
            required,
        });
        unresolved
            .into_iter()
            .flat_map(|sensor| self.give_up(sensor))
            .collect()
    }
}

impl StateMachine for HubCoordinator {
    fn handle(&mut self, event: ProtocolEvent) -> Vec<Action> {
        match event {
            ProtocolEvent::StartSession {
                targets,
                start_deadline,
                end_deadline,
                required,
            } => match self.start(targets, start_deadline, end_deadline, required) {
                Ok(actions) => actions,
                Err(e) => {
                    self.notice(ProtocolNotice::SessionRejected {
                        reason: e.to_string(),
                    });
                    vec![]
                }
            },
            ProtocolEvent::AbandonSession => self.abandon(),
            ProtocolEvent::SessionDeadline { round } => self.on_deadline(round),
            ProtocolEvent::MessageReceived { from, message } => self.on_message(from, message),
            ProtocolEvent::ResourceStateChanged { info } => self.on_resource_state_change(info),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QuorumPolicy, SensorStatus};
    use qsn_core::{NoOpJointOperation, RecordingObserver, Severity};
    use qsn_types::ResourceHandle;

    const HUB: NodeId = NodeId(0);
    const START: Duration = Duration::from_secs(1);
    const END: Duration = Duration::from_secs(3);

    fn sensors(ids: &[u32]) -> Vec<NodeId> {
        ids.iter().map(|&n| NodeId(n)).collect()
    }

    fn make_hub(config: HubConfig) -> (HubCoordinator, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        let hub = HubCoordinator::new(
            HUB,
            config,
            Box::new(NoOpJointOperation),
            observer.clone(),
        );
        (hub, observer)
    }

    fn started(ids: &[u32], config: HubConfig) -> (HubCoordinator, Arc<RecordingObserver>) {
        let (mut hub, observer) = make_hub(config);
        hub.start(sensors(ids), START, END, None).expect("session should start");
        (hub, observer)
    }

    fn entangled(sensor: u32, handle: u64) -> ResourceInfo {
        ResourceInfo {
            remote: NodeId(sensor),
            state: ResourceState::Entangled,
            handle: ResourceHandle(handle),
        }
    }

    fn raw(sensor: u32, handle: u64) -> ResourceInfo {
        ResourceInfo {
            remote: NodeId(sensor),
            state: ResourceState::Raw,
            handle: ResourceHandle(handle),
        }
    }

    fn attempt_failed_targets(actions: &[Action]) -> Vec<NodeId> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::SendMessage {
                    to,
                    message: GhzMessage::AttemptFailed,
                } => Some(*to),
                _ => None,
            })
            .collect()
    }

    fn outcome_of(actions: &[Action]) -> Option<&SessionOutcome> {
        actions.iter().find_map(|a| match a {
            Action::EmitSessionOutcome { outcome } => Some(outcome),
            _ => None,
        })
    }

    fn round(hub: &HubCoordinator) -> u64 {
        hub.session().map(Session::round).unwrap_or_default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Start
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_start_proposes_to_every_target_and_arms_deadline() {
        let (mut hub, _) = make_hub(HubConfig::default());
        hub.set_time(Duration::from_millis(500));

        let actions = hub
            .start(sensors(&[1, 2, 3]), START, END, None)
            .expect("session should start");

        let proposed: Vec<NodeId> = actions
            .iter()
            .filter_map(|a| match a {
                Action::SendMessage {
                    to,
                    message: GhzMessage::Propose { hub, .. },
                } if *hub == HUB => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(proposed, sensors(&[1, 2, 3]));
        assert!(actions.contains(&Action::SetTimer {
            id: TimerId::SessionDeadline { round: 1 },
            duration: Duration::from_millis(2500),
        }));
        assert_eq!(hub.phase(), SessionPhase::Awaiting);
        assert_eq!(hub.session().map(Session::required), Some(1));
    }

    #[test]
    fn test_start_rejects_bad_parameters() {
        let (mut hub, _) = make_hub(HubConfig::default());

        assert_eq!(
            hub.start(vec![], START, END, None),
            Err(SessionError::EmptyTargets)
        );
        assert_eq!(
            hub.start(sensors(&[1, 2, 1]), START, END, None),
            Err(SessionError::DuplicateTarget(NodeId(1)))
        );
        assert_eq!(
            hub.start(sensors(&[1]), END, START, None),
            Err(SessionError::InvalidWindow {
                start: END,
                end: START
            })
        );
        hub.set_time(Duration::from_secs(5));
        assert!(matches!(
            hub.start(sensors(&[1]), START, END, None),
            Err(SessionError::DeadlineElapsed { .. })
        ));
        assert_eq!(hub.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let (mut hub, _) = started(&[1, 2], HubConfig::default());

        let err = hub.start(sensors(&[3]), START, END, None);

        assert_eq!(err, Err(SessionError::NotIdle(SessionPhase::Awaiting)));
        assert_eq!(hub.session().map(|s| s.targets().len()), Some(2));
    }

    #[test]
    fn test_invalid_start_event_is_reported() {
        let (mut hub, observer) = make_hub(HubConfig::default());

        let actions = hub.handle(ProtocolEvent::StartSession {
            targets: vec![],
            start_deadline: START,
            end_deadline: END,
            required: None,
        });

        assert!(actions.is_empty());
        assert!(observer.any(|n| matches!(n, ProtocolNotice::SessionRejected { .. })));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Messages
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_accept_requests_entanglement_once() {
        let config = HubConfig::default()
            .with_resource_count(2)
            .with_fidelity_threshold(0.9);
        let (mut hub, observer) = started(&[1, 2], config);

        let first = hub.on_message(NodeId(1), GhzMessage::Accept);
        let second = hub.on_message(NodeId(1), GhzMessage::Accept);

        assert_eq!(
            first,
            vec![Action::RequestEntanglement {
                peer: NodeId(1),
                start_deadline: START,
                end_deadline: END,
                resource_count: 2,
                fidelity_threshold: 0.9,
            }]
        );
        assert!(second.is_empty());
        assert!(observer.any(|n| matches!(
            n,
            ProtocolNotice::DuplicateResolution {
                kind: MessageKind::Accept,
                ..
            }
        )));
    }

    #[test]
    fn test_message_from_non_target_is_dropped() {
        let (mut hub, observer) = started(&[1, 2], HubConfig::default());

        let actions = hub.on_message(NodeId(7), GhzMessage::Accept);

        assert!(actions.is_empty());
        assert_eq!(observer.count_at_least(Severity::Warn), 1);
        assert!(observer.any(|n| matches!(n, ProtocolNotice::UnknownSender { .. })));
    }

    #[test]
    fn test_hub_bound_kinds_are_unexpected() {
        let (mut hub, observer) = started(&[1], HubConfig::default());

        let actions = hub.on_message(NodeId(1), GhzMessage::AttemptFailed);

        assert!(actions.is_empty());
        assert!(observer.any(|n| matches!(n, ProtocolNotice::UnexpectedMessage { .. })));
    }

    #[test]
    fn test_reject_marks_sensor_declined() {
        let config = HubConfig::default().with_quorum(QuorumPolicy::AllTargets);
        let (mut hub, _) = started(&[1, 2], config);

        hub.on_message(NodeId(2), GhzMessage::Reject);
        hub.set_time(END);
        let actions = hub.on_deadline(round(&hub));

        assert_eq!(attempt_failed_targets(&actions), sensors(&[1]));
        assert_eq!(
            hub.session()
                .and_then(|s| s.status(NodeId(2)))
                .and_then(SensorStatus::resolution),
            Some(Resolution::Declined)
        );
    }

    #[test]
    fn test_unknown_resource_link_is_warned() {
        let (mut hub, observer) = started(&[1], HubConfig::default());

        let actions = hub.on_resource_state_change(entangled(9, 1));

        assert!(actions.is_empty());
        assert!(observer.any(|n| matches!(n, ProtocolNotice::UnknownResource { .. })));
        assert_eq!(hub.phase(), SessionPhase::Awaiting);
    }

    #[test]
    fn test_history_overflow_is_reported() {
        let config = HubConfig::default().with_quorum(QuorumPolicy::AllTargets);
        let (mut hub, observer) = started(&[1, 2], config);

        hub.on_resource_state_change(raw(1, 1));
        hub.on_resource_state_change(raw(1, 2));

        assert!(observer.any(|n| matches!(n, ProtocolNotice::HistoryFull { .. })));
        assert_eq!(
            hub.session()
                .and_then(|s| s.status(NodeId(1)))
                .map(|s| s.history().len()),
            Some(1)
        );
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Triggers
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_eager_trigger_selects_in_target_order() {
        // Four targets, two required; S1 and S3 entangle.
        let (mut hub, _) = started(&[1, 2, 3, 4], HubConfig::default());

        let after_first = hub.on_resource_state_change(entangled(1, 11));
        assert!(after_first.is_empty());
        assert_eq!(hub.joint_operations_run(), 0);

        let actions = hub.on_resource_state_change(entangled(3, 33));

        assert_eq!(hub.joint_operations_run(), 1);
        assert_eq!(hub.phase(), SessionPhase::Completed);
        assert_eq!(
            actions.first(),
            Some(&Action::ReleaseResources {
                handles: vec![ResourceHandle(11), ResourceHandle(33)]
            })
        );
        let outcome = outcome_of(&actions).expect("completion emits an outcome");
        assert!(outcome.is_completed());
        assert_eq!(outcome.participants, sensors(&[1, 3]));
        assert_eq!(outcome.joint_outcomes, vec![ClassicalBit::ZERO; 2]);
    }

    #[test]
    fn test_selection_ignores_arrival_order() {
        let (mut hub, _) = started(&[1, 2, 3, 4], HubConfig::default());

        hub.on_resource_state_change(entangled(4, 44));
        let actions = hub.on_resource_state_change(entangled(2, 22));

        let outcome = outcome_of(&actions).expect("completion emits an outcome");
        assert_eq!(outcome.participants, sensors(&[2, 4]));
    }

    #[test]
    fn test_selection_takes_exactly_required() {
        let config = HubConfig::default()
            .with_quorum(QuorumPolicy::Fixed(2))
            .with_min_entangled_per_sensor(2)
            .with_resource_count(2);
        let (mut hub, _) = started(&[1, 2, 3], config);

        hub.on_resource_state_change(entangled(1, 1));
        hub.on_resource_state_change(entangled(2, 3));
        hub.on_resource_state_change(entangled(2, 4));
        hub.on_resource_state_change(entangled(3, 5));
        assert_eq!(hub.joint_operations_run(), 0, "only S2 meets the minimum");

        let actions = hub.on_resource_state_change(entangled(1, 2));

        let outcome = outcome_of(&actions).expect("completion emits an outcome");
        assert_eq!(outcome.participants, sensors(&[1, 2]));
        assert_eq!(outcome.joint_outcomes.len(), 4);
    }

    #[test]
    fn test_explicit_required_overrides_policy() {
        // HalfOfTargets would need two; the session asks for three.
        let (mut hub, _) = make_hub(HubConfig::default());
        hub.start(sensors(&[1, 2, 3, 4]), START, END, Some(3))
            .expect("session should start");
        assert_eq!(hub.session().map(Session::required), Some(3));

        hub.on_resource_state_change(entangled(1, 11));
        let at_two = hub.on_resource_state_change(entangled(2, 22));
        assert!(outcome_of(&at_two).is_none());
        assert_eq!(hub.joint_operations_run(), 0);
        assert_eq!(hub.phase(), SessionPhase::Awaiting);

        let actions = hub.on_resource_state_change(entangled(4, 44));

        let outcome = outcome_of(&actions).expect("completion emits an outcome");
        assert_eq!(outcome.participants, sensors(&[1, 2, 4]));
        assert_eq!(hub.joint_operations_run(), 1);
    }

    #[test]
    fn test_explicit_required_is_clamped() {
        let (mut low, _) = make_hub(HubConfig::default());
        low.start(sensors(&[1, 2]), START, END, Some(0))
            .expect("session should start");
        assert_eq!(low.session().map(Session::required), Some(1));

        let (mut high, _) = make_hub(HubConfig::default());
        high.start(sensors(&[1, 2]), START, END, Some(9))
            .expect("session should start");
        assert_eq!(high.session().map(Session::required), Some(2));
    }

    #[test]
    fn test_deadline_triggers_when_quorum_already_met() {
        let (mut hub, observer) = started(&[1, 2], HubConfig::default());
        let r = round(&hub);
        hub.session
            .as_mut()
            .and_then(|s| s.record_resource(&entangled(2, 22)))
            .expect("S2 is a target");
        assert_eq!(hub.joint_operations_run(), 0);

        hub.set_time(END);
        let actions = hub.on_deadline(r);

        assert!(attempt_failed_targets(&actions).is_empty());
        assert_eq!(hub.joint_operations_run(), 1);
        assert_eq!(hub.phase(), SessionPhase::Completed);
        let outcome = outcome_of(&actions).expect("completion emits an outcome");
        assert_eq!(outcome.participants, sensors(&[2]));
        assert_eq!(outcome.finished_at, END);
        assert!(observer.any(|n| matches!(
            n,
            ProtocolNotice::QuorumReached { eager: false, .. }
        )));
    }

    #[test]
    fn test_completion_is_idempotent() {
        let (mut hub, observer) = started(&[1, 2], HubConfig::default());
        hub.on_resource_state_change(entangled(1, 1));
        assert_eq!(hub.phase(), SessionPhase::Completed);
        let r = round(&hub);

        let mut follow_up = hub.on_resource_state_change(entangled(2, 2));
        hub.set_time(END);
        follow_up.extend(hub.on_deadline(r));
        follow_up.extend(hub.on_message(
            NodeId(2),
            GhzMessage::StatusUpdate {
                status: ResourceState::Raw,
            },
        ));
        follow_up.extend(hub.abandon());

        assert!(follow_up.is_empty());
        assert_eq!(hub.joint_operations_run(), 1);
        assert_eq!(hub.phase(), SessionPhase::Completed);
        assert!(observer.any(|n| matches!(n, ProtocolNotice::LateEvent { .. })));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Deadline and fallback
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_deadline_under_quorum_gives_up_on_everyone() {
        let (mut hub, observer) = started(&[1, 2], HubConfig::default());
        hub.set_time(END);

        let actions = hub.on_deadline(round(&hub));

        assert_eq!(attempt_failed_targets(&actions), sensors(&[1, 2]));
        assert_eq!(hub.phase(), SessionPhase::Awaiting);
        assert_eq!(hub.joint_operations_run(), 0);
        assert!(observer.any(|n| matches!(n, ProtocolNotice::QuorumShortfall { .. })));

        hub.on_message(
            NodeId(1),
            GhzMessage::ClassicalFallback {
                bit: ClassicalBit::ONE,
            },
        );
        hub.on_message(
            NodeId(2),
            GhzMessage::ClassicalFallback {
                bit: ClassicalBit::ZERO,
            },
        );
        let session = hub.session().expect("session stays open");
        assert!(session.all_accounted_for());
        assert_eq!(
            session.fallback_bits(),
            vec![(NodeId(1), ClassicalBit::ONE), (NodeId(2), ClassicalBit::ZERO)]
        );
        assert_eq!(hub.joint_operations_run(), 0);
    }

    #[test]
    fn test_raw_status_before_deadline_is_ignored() {
        let (mut hub, _) = started(&[1, 2], HubConfig::default());
        let raw_status = GhzMessage::StatusUpdate {
            status: ResourceState::Raw,
        };

        hub.set_time(Duration::from_secs(2));
        let early = hub.on_message(NodeId(2), raw_status.clone());
        assert!(early.is_empty());

        hub.set_time(Duration::from_millis(3100));
        let late = hub.on_message(NodeId(2), raw_status.clone());
        let repeated = hub.on_message(NodeId(2), raw_status);

        assert_eq!(attempt_failed_targets(&late), sensors(&[2]));
        assert!(repeated.is_empty(), "ATTEMPT_FAILED is sent once");
    }

    #[test]
    fn test_entangled_status_update_is_informational() {
        let (mut hub, _) = started(&[1, 2], HubConfig::default());

        let actions = hub.on_message(
            NodeId(1),
            GhzMessage::StatusUpdate {
                status: ResourceState::Entangled,
            },
        );

        assert!(actions.is_empty());
        assert_eq!(hub.session().map(Session::qualifying_count), Some(0));
    }

    #[test]
    fn test_rollback_reopens_sensor_for_give_up() {
        let config = HubConfig::default().with_quorum(QuorumPolicy::AllTargets);
        let (mut hub, _) = started(&[1, 2], config);

        hub.on_resource_state_change(entangled(1, 1));
        hub.on_resource_state_change(raw(1, 1));
        hub.set_time(END);
        let actions = hub.on_deadline(round(&hub));

        assert_eq!(attempt_failed_targets(&actions), sensors(&[1, 2]));
    }

    #[test]
    fn test_second_deadline_does_not_resend() {
        let (mut hub, _) = started(&[1, 2], HubConfig::default());
        hub.set_time(END);
        let r = round(&hub);

        let first = hub.on_deadline(r);
        let second = hub.on_deadline(r);

        assert_eq!(attempt_failed_targets(&first).len(), 2);
        assert!(second.is_empty());
    }

    #[test]
    fn test_duplicate_fallback_is_absorbed() {
        let (mut hub, observer) = started(&[1, 2], HubConfig::default());
        hub.set_time(END);
        hub.on_deadline(round(&hub));
        let bit = |b| GhzMessage::ClassicalFallback {
            bit: ClassicalBit::new(b),
        };

        hub.on_message(NodeId(1), bit(true));
        hub.on_message(NodeId(1), bit(false));

        assert_eq!(
            hub.session().map(Session::fallback_bits),
            Some(vec![(NodeId(1), ClassicalBit::ONE)])
        );
        assert!(observer.any(|n| matches!(n, ProtocolNotice::DuplicateResolution { .. })));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Abandon and reset
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_abandon_emits_outcome_with_fallback_bits() {
        let (mut hub, _) = started(&[1, 2], HubConfig::default());
        hub.set_time(END);
        hub.on_deadline(round(&hub));
        hub.on_message(
            NodeId(2),
            GhzMessage::ClassicalFallback {
                bit: ClassicalBit::ONE,
            },
        );
        hub.set_time(Duration::from_secs(4));

        let actions = hub.abandon();

        let outcome = outcome_of(&actions).expect("abandon emits an outcome");
        assert_eq!(outcome.phase, SessionPhase::Abandoned);
        assert!(outcome.participants.is_empty());
        assert_eq!(outcome.fallback_bits, vec![(NodeId(2), ClassicalBit::ONE)]);
        assert_eq!(outcome.finished_at, Duration::from_secs(4));
        assert_eq!(hub.last_outcome(), Some(outcome));

        let late = hub.on_message(
            NodeId(1),
            GhzMessage::ClassicalFallback {
                bit: ClassicalBit::ZERO,
            },
        );
        assert!(late.is_empty());
    }

    #[test]
    fn test_reset_allows_new_session_and_ignores_stale_deadline() {
        let (mut hub, observer) = started(&[1, 2], HubConfig::default());
        let old_round = round(&hub);
        assert!(!hub.reset(), "active sessions are not reset");

        hub.on_resource_state_change(entangled(1, 1));
        assert!(hub.reset());
        assert_eq!(hub.phase(), SessionPhase::Idle);

        hub.set_time(Duration::from_secs(2));
        hub.start(sensors(&[3, 4]), START, Duration::from_secs(6), None)
            .expect("session should start after reset");
        hub.set_time(END);
        let stale = hub.on_deadline(old_round);

        assert!(stale.is_empty());
        assert_eq!(hub.phase(), SessionPhase::Awaiting);
        assert!(observer.any(|n| matches!(
            n,
            ProtocolNotice::LateEvent {
                event: "SessionDeadline"
            }
        )));
    }
}

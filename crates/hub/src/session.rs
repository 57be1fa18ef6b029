//! Per-session bookkeeping: target order, per-sensor status and quorum.
//!
//! A [`Session`] is pure data. It never emits actions; the coordinator reads
//! it to decide when to trigger and whom to give up on.

use qsn_core::SessionPhase;
use qsn_types::{ClassicalBit, NodeId, ResourceHandle, ResourceInfo, ResourceState};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// How a sensor was resolved within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Reached the per-sensor entangled minimum.
    Entangled,
    /// The hub sent ATTEMPT_FAILED and is waiting for the classical bit.
    GivenUp,
    /// The sensor answered the proposal with REJECT.
    Declined,
    /// The sensor delivered its classical fallback bit.
    Fallback(ClassicalBit),
}

/// What recording a resource notification changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// The notification was appended to the bounded history.
    pub appended: bool,
    /// The notification undid a previous ENTANGLED for the same handle.
    pub rolled_back: bool,
}

/// Status of one target sensor.
#[derive(Debug, Clone)]
pub struct SensorStatus {
    /// First `capacity` notifications, in arrival order.
    history: Vec<ResourceState>,
    capacity: usize,

    /// Handles currently ENTANGLED with this sensor.
    entangled: BTreeSet<ResourceHandle>,

    accepted: bool,
    resolution: Option<Resolution>,
}

impl SensorStatus {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: Vec::with_capacity(capacity),
            capacity,
            entangled: BTreeSet::new(),
            accepted: false,
            resolution: None,
        }
    }

    /// Apply a resource notification.
    ///
    /// The entangled set always tracks the latest state per handle; the
    /// history stops growing once it is full.
    pub fn record(&mut self, info: &ResourceInfo) -> RecordOutcome {
        let appended = self.history.len() < self.capacity;
        if appended {
            self.history.push(info.state);
        }
        let rolled_back = match info.state {
            ResourceState::Entangled => {
                self.entangled.insert(info.handle);
                false
            }
            ResourceState::Raw => self.entangled.remove(&info.handle),
        };
        RecordOutcome {
            appended,
            rolled_back,
        }
    }

    pub fn history(&self) -> &[ResourceState] {
        &self.history
    }

    pub fn history_is_full(&self) -> bool {
        self.history.len() >= self.capacity
    }

    pub fn entangled_count(&self) -> usize {
        self.entangled.len()
    }

    pub fn entangled_handles(&self) -> impl Iterator<Item = ResourceHandle> + '_ {
        self.entangled.iter().copied()
    }

    pub fn accepted(&self) -> bool {
        self.accepted
    }

    pub fn mark_accepted(&mut self) {
        self.accepted = true;
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn resolve(&mut self, resolution: Resolution) {
        self.resolution = Some(resolution);
    }

    /// Drop an `Entangled` resolution that no longer holds.
    fn clear_entangled(&mut self) {
        if self.resolution == Some(Resolution::Entangled) {
            self.resolution = None;
        }
    }
}

/// One coordination round owned by a hub.
#[derive(Debug, Clone)]
pub struct Session {
    round: u64,
    targets: Vec<NodeId>,
    start_deadline: Duration,
    end_deadline: Duration,
    required: usize,
    min_entangled_per_sensor: usize,
    statuses: HashMap<NodeId, SensorStatus>,
    phase: SessionPhase,
}

impl Session {
    /// Create a session in the `Proposing` phase.
    ///
    /// Callers validate the targets and window; `required` must already be
    /// clamped to `[1, targets.len()]`.
    pub fn new(
        round: u64,
        targets: Vec<NodeId>,
        start_deadline: Duration,
        end_deadline: Duration,
        required: usize,
        min_entangled_per_sensor: usize,
        history_capacity: usize,
    ) -> Self {
        let statuses = targets
            .iter()
            .map(|&sensor| (sensor, SensorStatus::new(history_capacity)))
            .collect();
        Self {
            round,
            targets,
            start_deadline,
            end_deadline,
            required,
            min_entangled_per_sensor,
            statuses,
            phase: SessionPhase::Proposing,
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn start_deadline(&self) -> Duration {
        self.start_deadline
    }

    pub fn end_deadline(&self) -> Duration {
        self.end_deadline
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    pub fn is_target(&self, sensor: NodeId) -> bool {
        self.statuses.contains_key(&sensor)
    }

    pub fn status(&self, sensor: NodeId) -> Option<&SensorStatus> {
        self.statuses.get(&sensor)
    }

    pub(crate) fn status_mut(&mut self, sensor: NodeId) -> Option<&mut SensorStatus> {
        self.statuses.get_mut(&sensor)
    }

    /// Record a resource notification for `info.remote`.
    ///
    /// Returns `None` if the remote is not a target. Keeps the `Entangled`
    /// resolution in step with the per-sensor minimum.
    pub fn record_resource(&mut self, info: &ResourceInfo) -> Option<RecordOutcome> {
        let min = self.min_entangled_per_sensor;
        let status = self.statuses.get_mut(&info.remote)?;
        let outcome = status.record(info);
        if status.entangled_count() >= min {
            if status.resolution.is_none() {
                status.resolve(Resolution::Entangled);
            }
        } else {
            status.clear_entangled();
        }
        Some(outcome)
    }

    /// Whether `sensor` currently meets the per-sensor entangled minimum.
    pub fn qualifies(&self, sensor: NodeId) -> bool {
        self.statuses
            .get(&sensor)
            .is_some_and(|s| s.entangled_count() >= self.min_entangled_per_sensor)
    }

    pub fn qualifying_count(&self) -> usize {
        self.targets.iter().filter(|&&s| self.qualifies(s)).count()
    }

    pub fn has_quorum(&self) -> bool {
        self.qualifying_count() >= self.required
    }

    /// The first `required` qualifying sensors, in target order.
    pub fn select_participants(&self) -> Vec<NodeId> {
        self.targets
            .iter()
            .copied()
            .filter(|&s| self.qualifies(s))
            .take(self.required)
            .collect()
    }

    /// Entangled handles of `participants`, in participant order.
    pub fn handles_of(&self, participants: &[NodeId]) -> Vec<ResourceHandle> {
        participants
            .iter()
            .filter_map(|s| self.statuses.get(s))
            .flat_map(|status| status.entangled_handles())
            .collect()
    }

    /// Targets not yet resolved, in target order.
    pub fn unresolved(&self) -> Vec<NodeId> {
        self.targets
            .iter()
            .copied()
            .filter(|s| self.statuses.get(s).is_some_and(|st| !st.is_resolved()))
            .collect()
    }

    /// Whether every target has been resolved one way or another.
    pub fn all_accounted_for(&self) -> bool {
        self.unresolved().is_empty()
    }

    /// Fallback bits received so far, in target order.
    pub fn fallback_bits(&self) -> Vec<(NodeId, ClassicalBit)> {
        self.targets
            .iter()
            .filter_map(|&s| match self.statuses.get(&s)?.resolution() {
                Some(Resolution::Fallback(bit)) => Some((s, bit)),
                _ => None,
            })
            .collect()
    }
}

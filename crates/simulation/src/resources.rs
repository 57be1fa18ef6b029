//! Simulated entanglement resource layer.
//!
//! Each requested memory is a link between two nodes with its own
//! [`ResourceHandle`]. A link starts RAW. It may turn ENTANGLED once inside
//! the reservation window and always returns to RAW at the window's end
//! unless it was released first. Both endpoints are notified of every
//! transition.

use qsn_types::{NodeId, ResourceHandle, ResourceInfo, ResourceState};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Configuration for the simulated resource layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLayerConfig {
    /// Probability that a requested memory becomes entangled in its window.
    pub success_probability: f64,
    /// Earliest generation time after a request.
    pub min_generation_delay: Duration,
    /// Fidelity of generated pairs. Requests with a higher threshold never
    /// succeed.
    pub raw_fidelity: f64,
}

impl Default for ResourceLayerConfig {
    fn default() -> Self {
        Self {
            success_probability: 0.64,
            min_generation_delay: Duration::from_millis(10),
            raw_fidelity: 0.93,
        }
    }
}

impl ResourceLayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the success probability, clamped to `[0, 1]`.
    pub fn with_success_probability(mut self, probability: f64) -> Self {
        self.success_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn with_min_generation_delay(mut self, delay: Duration) -> Self {
        self.min_generation_delay = delay;
        self
    }

    pub fn with_raw_fidelity(mut self, fidelity: f64) -> Self {
        self.raw_fidelity = fidelity;
        self
    }
}

/// Entanglement request as seen by the resource layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntanglementRequest {
    pub requester: NodeId,
    pub peer: NodeId,
    pub start_deadline: Duration,
    pub end_deadline: Duration,
    pub resource_count: usize,
    pub fidelity_threshold: f64,
}

/// A transition the runner must schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTransition {
    pub at: Duration,
    pub handle: ResourceHandle,
    pub state: ResourceState,
}

/// A notification to deliver to one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceNotification {
    pub node: NodeId,
    pub info: ResourceInfo,
}

/// Counters kept by the resource layer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceStats {
    pub requests: u64,
    pub memories_allocated: u64,
    pub entangled: u64,
    pub expired: u64,
    pub released: u64,
}

#[derive(Debug, Clone)]
struct Link {
    a: NodeId,
    b: NodeId,
    state: ResourceState,
    released: bool,
}

impl Link {
    fn notifications(&self, handle: ResourceHandle) -> [ResourceNotification; 2] {
        [
            ResourceNotification {
                node: self.a,
                info: ResourceInfo {
                    remote: self.b,
                    state: self.state,
                    handle,
                },
            },
            ResourceNotification {
                node: self.b,
                info: ResourceInfo {
                    remote: self.a,
                    state: self.state,
                    handle,
                },
            },
        ]
    }
}

/// Simulated resource layer shared by all nodes.
#[derive(Debug)]
pub struct SimulatedResourceLayer {
    config: ResourceLayerConfig,
    links: BTreeMap<ResourceHandle, Link>,
    next_handle: u64,
    stats: ResourceStats,
}

impl SimulatedResourceLayer {
    pub fn new(config: ResourceLayerConfig) -> Self {
        Self {
            config,
            links: BTreeMap::new(),
            next_handle: 1,
            stats: ResourceStats::default(),
        }
    }

    pub fn config(&self) -> &ResourceLayerConfig {
        &self.config
    }

    pub fn stats(&self) -> &ResourceStats {
        &self.stats
    }

    /// Current state of a link, if the handle exists.
    pub fn state(&self, handle: ResourceHandle) -> Option<ResourceState> {
        self.links.get(&handle).map(|l| l.state)
    }

    /// Allocate memories for a request made at `now`.
    ///
    /// Returns the transitions to schedule: at most one ENTANGLED per
    /// memory, and one RAW expiry at the window end for every memory.
    pub fn request(
        &mut self,
        request: EntanglementRequest,
        now: Duration,
        rng: &mut ChaCha8Rng,
    ) -> Vec<ScheduledTransition> {
        self.stats.requests += 1;
        let earliest = request
            .start_deadline
            .max(now + self.config.min_generation_delay);
        let window_open = earliest < request.end_deadline;
        let feasible = self.config.raw_fidelity >= request.fidelity_threshold;
        let probability = self.config.success_probability.clamp(0.0, 1.0);

        let mut transitions = Vec::with_capacity(request.resource_count * 2);
        for _ in 0..request.resource_count {
            let handle = ResourceHandle(self.next_handle);
            self.next_handle += 1;
            self.stats.memories_allocated += 1;
            self.links.insert(
                handle,
                Link {
                    a: request.requester,
                    b: request.peer,
                    state: ResourceState::Raw,
                    released: false,
                },
            );

            if window_open && feasible && rng.gen_bool(probability) {
                let at = Duration::from_secs_f64(
                    rng.gen_range(earliest.as_secs_f64()..request.end_deadline.as_secs_f64()),
                )
                .clamp(earliest, request.end_deadline);
                transitions.push(ScheduledTransition {
                    at,
                    handle,
                    state: ResourceState::Entangled,
                });
            }
            transitions.push(ScheduledTransition {
                at: request.end_deadline,
                handle,
                state: ResourceState::Raw,
            });
        }

        debug!(
            requester = request.requester.0,
            peer = request.peer.0,
            count = request.resource_count,
            scheduled_entanglements = transitions.len() - request.resource_count,
            feasible,
            "Entanglement requested"
        );
        transitions
    }

    /// Apply a scheduled transition.
    ///
    /// Returns the notifications for both endpoints, or nothing if the link
    /// was released or is already in `state`.
    pub fn apply(
        &mut self,
        handle: ResourceHandle,
        state: ResourceState,
    ) -> Vec<ResourceNotification> {
        let Some(link) = self.links.get_mut(&handle) else {
            return vec![];
        };
        if link.released || link.state == state {
            return vec![];
        }
        link.state = state;
        match state {
            ResourceState::Entangled => self.stats.entangled += 1,
            ResourceState::Raw => self.stats.expired += 1,
        }
        trace!(handle = handle.0, %state, "Resource transition");
        link.notifications(handle).to_vec()
    }

    /// Release handles back to RAW immediately.
    ///
    /// Released links take no further scheduled transitions. Only links that
    /// were ENTANGLED produce notifications.
    pub fn release(&mut self, handles: &[ResourceHandle]) -> Vec<ResourceNotification> {
        let mut notifications = Vec::new();
        for handle in handles {
            let Some(link) = self.links.get_mut(handle) else {
                continue;
            };
            if link.released {
                continue;
            }
            link.released = true;
            if link.state == ResourceState::Entangled {
                link.state = ResourceState::Raw;
                self.stats.released += 1;
                notifications.extend(link.notifications(*handle));
            }
        }
        notifications
    }
}

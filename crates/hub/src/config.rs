//! Hub configuration.

/// How many qualifying sensors a session needs before the joint operation
/// runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuorumPolicy {
    /// Half the targets, rounded down, but at least one.
    #[default]
    HalfOfTargets,
    /// Every target must qualify.
    AllTargets,
    /// A fixed count.
    Fixed(usize),
}

impl QuorumPolicy {
    /// Required participant count for `targets` sensors, clamped to
    /// `[1, targets]`.
    ///
    /// `targets` is never zero for a valid session; zero yields zero.
    pub fn required_for(self, targets: usize) -> usize {
        if targets == 0 {
            return 0;
        }
        let raw = match self {
            QuorumPolicy::HalfOfTargets => targets / 2,
            QuorumPolicy::AllTargets => targets,
            QuorumPolicy::Fixed(n) => n,
        };
        raw.clamp(1, targets)
    }
}

/// Hub coordinator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    /// Required participant count policy.
    pub quorum: QuorumPolicy,

    /// Entangled resources a sensor needs before it counts toward quorum.
    pub min_entangled_per_sensor: usize,

    /// Memories requested per sensor. Also bounds each sensor's
    /// notification history.
    pub resource_count: usize,

    /// Minimum fidelity passed to the resource layer with every request.
    pub fidelity_threshold: f64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            quorum: QuorumPolicy::HalfOfTargets,
            min_entangled_per_sensor: 1,
            resource_count: 1,
            fidelity_threshold: 0.8,
        }
    }
}

impl HubConfig {
    /// Create a hub configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quorum policy.
    pub fn with_quorum(mut self, quorum: QuorumPolicy) -> Self {
        self.quorum = quorum;
        self
    }

    /// Set the per-sensor entangled minimum. Values below one are raised to one.
    pub fn with_min_entangled_per_sensor(mut self, min: usize) -> Self {
        self.min_entangled_per_sensor = min.max(1);
        self
    }

    /// Set the number of memories requested per sensor. Values below one
    /// are raised to one.
    pub fn with_resource_count(mut self, count: usize) -> Self {
        self.resource_count = count.max(1);
        self
    }

    /// Set the fidelity threshold.
    pub fn with_fidelity_threshold(mut self, threshold: f64) -> Self {
        self.fidelity_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_of_targets_has_floor_of_one() {
        let policy = QuorumPolicy::HalfOfTargets;
        assert_eq!(policy.required_for(1), 1);
        assert_eq!(policy.required_for(2), 1);
        assert_eq!(policy.required_for(4), 2);
        assert_eq!(policy.required_for(5), 2);
    }

    #[test]
    fn test_fixed_is_clamped() {
        assert_eq!(QuorumPolicy::Fixed(0).required_for(3), 1);
        assert_eq!(QuorumPolicy::Fixed(7).required_for(3), 3);
        assert_eq!(QuorumPolicy::AllTargets.required_for(3), 3);
    }

    #[test]
    fn test_builder() {
        let config = HubConfig::new()
            .with_quorum(QuorumPolicy::AllTargets)
            .with_resource_count(0)
            .with_min_entangled_per_sensor(2);
        assert_eq!(config.quorum, QuorumPolicy::AllTargets);
        assert_eq!(config.resource_count, 1);
        assert_eq!(config.min_entangled_per_sensor, 2);
    }
}

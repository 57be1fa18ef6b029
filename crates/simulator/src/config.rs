//! Scenario configuration.
//!
//! Scenarios are TOML files. Every section except `hubs` is optional and
//! falls back to its defaults:
//!
//! ```toml
//! [simulation]
//! seed = 42
//! start_ms = 1000
//! end_ms = 3000
//!
//! [[hubs]]
//! name = "Hub1"
//! sensors = ["Sensor1H1", "Sensor2H1", "Sensor3H1", "Sensor4H1"]
//! quorum = "half"          # "half" | "all" | integer
//!
//! [resources]
//! success_probability = 0.64
//! min_generation_delay_ms = 10
//! raw_fidelity = 0.93
//!
//! [network]
//! latency_ms = 5
//! jitter_fraction = 0.1
//!
//! [policy]
//! min_entangled_per_sensor = 1
//! resource_count = 1
//! fidelity_threshold = 0.8
//! ```

use qsn_hub::{HubConfig, QuorumPolicy};
use qsn_simulation::{NetworkConfig, ResourceLayerConfig, SimulationError};
use qsn_types::NodeId;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Error loading or validating a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error("Simulation setup failed: {0}")]
    Setup(#[from] SimulationError),
}

impl ScenarioError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ScenarioError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// `[simulation]`: seed and the session window, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSection {
    pub seed: u64,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: 42,
            start_ms: 1000,
            end_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuorumKeyword {
    Half,
    All,
}

/// `quorum = "half" | "all" | <count>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QuorumSetting {
    Count(usize),
    Keyword(QuorumKeyword),
}

impl Default for QuorumSetting {
    fn default() -> Self {
        QuorumSetting::Keyword(QuorumKeyword::Half)
    }
}

impl From<QuorumSetting> for QuorumPolicy {
    fn from(setting: QuorumSetting) -> Self {
        match setting {
            QuorumSetting::Keyword(QuorumKeyword::Half) => QuorumPolicy::HalfOfTargets,
            QuorumSetting::Keyword(QuorumKeyword::All) => QuorumPolicy::AllTargets,
            QuorumSetting::Count(n) => QuorumPolicy::Fixed(n),
        }
    }
}

/// One `[[hubs]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubSection {
    pub name: String,
    pub sensors: Vec<String>,
    #[serde(default)]
    pub quorum: QuorumSetting,
}

/// `[resources]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcesSection {
    pub success_probability: f64,
    pub min_generation_delay_ms: u64,
    pub raw_fidelity: f64,
}

impl Default for ResourcesSection {
    fn default() -> Self {
        Self {
            success_probability: 0.64,
            min_generation_delay_ms: 10,
            raw_fidelity: 0.93,
        }
    }
}

/// `[network]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSection {
    pub latency_ms: u64,
    pub jitter_fraction: f64,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            latency_ms: 5,
            jitter_fraction: 0.1,
        }
    }
}

/// `[policy]`: hub-side parameters shared by every hub.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySection {
    pub min_entangled_per_sensor: usize,
    pub resource_count: usize,
    pub fidelity_threshold: f64,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            min_entangled_per_sensor: 1,
            resource_count: 1,
            fidelity_threshold: 0.8,
        }
    }
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationSection,
    pub hubs: Vec<HubSection>,
    #[serde(default)]
    pub resources: ResourcesSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub policy: PolicySection,
}

impl ScenarioConfig {
    /// Three hubs with four sensors each.
    pub fn builtin() -> Self {
        let hubs = (1..=3)
            .map(|h| HubSection {
                name: format!("Hub{h}"),
                sensors: (1..=4).map(|s| format!("Sensor{s}H{h}")).collect(),
                quorum: QuorumSetting::default(),
            })
            .collect();
        Self {
            simulation: SimulationSection::default(),
            hubs,
            resources: ResourcesSection::default(),
            network: NetworkSection::default(),
            policy: PolicySection::default(),
        }
    }

    /// Parse and validate a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.simulation.seed = seed;
        self
    }

    pub fn with_success_probability(mut self, probability: f64) -> Self {
        self.resources.success_probability = probability;
        self
    }

    /// Set the window length; the end moves, the start stays.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.simulation.end_ms = self.simulation.start_ms.saturating_add(duration_ms);
        self
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        let sim = &self.simulation;
        if sim.end_ms <= sim.start_ms {
            return Err(ScenarioError::invalid(
                "simulation.end_ms",
                format!("must be after start_ms ({})", sim.start_ms),
            ));
        }

        check_unit("resources.success_probability", self.resources.success_probability)?;
        check_unit("resources.raw_fidelity", self.resources.raw_fidelity)?;
        check_unit("network.jitter_fraction", self.network.jitter_fraction)?;
        check_unit("policy.fidelity_threshold", self.policy.fidelity_threshold)?;

        let policy = &self.policy;
        if policy.resource_count == 0 {
            return Err(ScenarioError::invalid(
                "policy.resource_count",
                "must be at least 1",
            ));
        }
        if policy.min_entangled_per_sensor == 0 {
            return Err(ScenarioError::invalid(
                "policy.min_entangled_per_sensor",
                "must be at least 1",
            ));
        }
        if policy.min_entangled_per_sensor > policy.resource_count {
            return Err(ScenarioError::invalid(
                "policy.min_entangled_per_sensor",
                format!("exceeds resource_count ({})", policy.resource_count),
            ));
        }

        if self.hubs.is_empty() {
            return Err(ScenarioError::invalid("hubs", "at least one hub is required"));
        }
        let mut names = HashSet::new();
        for (i, hub) in self.hubs.iter().enumerate() {
            if hub.name.is_empty() {
                return Err(ScenarioError::invalid(format!("hubs[{i}].name"), "is empty"));
            }
            if !names.insert(hub.name.as_str()) {
                return Err(ScenarioError::invalid(
                    format!("hubs[{i}].name"),
                    format!("duplicate node name {:?}", hub.name),
                ));
            }
            if hub.sensors.is_empty() {
                return Err(ScenarioError::invalid(
                    format!("hubs[{i}].sensors"),
                    "at least one sensor is required",
                ));
            }
            if hub.quorum == QuorumSetting::Count(0) {
                return Err(ScenarioError::invalid(
                    format!("hubs[{i}].quorum"),
                    "must be at least 1",
                ));
            }
        }
        for (i, hub) in self.hubs.iter().enumerate() {
            for sensor in &hub.sensors {
                if sensor.is_empty() || !names.insert(sensor.as_str()) {
                    return Err(ScenarioError::invalid(
                        format!("hubs[{i}].sensors"),
                        format!("empty or duplicate node name {sensor:?}"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Node names in id order: hubs first, then sensors, both in file order.
    pub fn node_names(&self) -> Vec<(NodeId, &str)> {
        let hubs = self.hubs.iter().map(|h| h.name.as_str());
        let sensors = self
            .hubs
            .iter()
            .flat_map(|h| h.sensors.iter().map(String::as_str));
        hubs.chain(sensors)
            .enumerate()
            .map(|(i, name)| (NodeId(i as u32), name))
            .collect()
    }

    pub fn start_deadline(&self) -> Duration {
        Duration::from_millis(self.simulation.start_ms)
    }

    pub fn end_deadline(&self) -> Duration {
        Duration::from_millis(self.simulation.end_ms)
    }

    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig::new()
            .with_latency(Duration::from_millis(self.network.latency_ms))
            .with_jitter_fraction(self.network.jitter_fraction)
    }

    pub fn resource_config(&self) -> ResourceLayerConfig {
        ResourceLayerConfig::new()
            .with_success_probability(self.resources.success_probability)
            .with_min_generation_delay(Duration::from_millis(
                self.resources.min_generation_delay_ms,
            ))
            .with_raw_fidelity(self.resources.raw_fidelity)
    }

    pub fn hub_config(&self, hub: &HubSection) -> HubConfig {
        HubConfig::new()
            .with_quorum(hub.quorum.into())
            .with_min_entangled_per_sensor(self.policy.min_entangled_per_sensor)
            .with_resource_count(self.policy.resource_count)
            .with_fidelity_threshold(self.policy.fidelity_threshold)
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ScenarioError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ScenarioError::invalid(
            field,
            format!("{value} is outside [0, 1]"),
        ))
    }
}

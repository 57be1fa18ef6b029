//! Scenario runner and report.

use crate::config::{ScenarioConfig, ScenarioError};
use qsn_core::{ProtocolEvent, SessionOutcome, SessionPhase};
use qsn_simulation::{ResourceStats, SimulationRunner, SimulationStats};
use qsn_types::{ClassicalBit, NodeId};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

/// Per-hub result of a scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSummary {
    pub name: String,
    pub phase: SessionPhase,
    pub participants: Vec<String>,
    pub joint_outcomes: Vec<ClassicalBit>,
    pub fallback_bits: Vec<(String, ClassicalBit)>,
    pub finished_at: Option<Duration>,
}

/// Result of a full scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub seed: u64,
    pub hubs: Vec<HubSummary>,
    pub stats: SimulationStats,
    pub resources: ResourceStats,
    pub finished_at: Duration,
}

impl SimulationReport {
    pub fn completed(&self) -> usize {
        self.hubs
            .iter()
            .filter(|h| h.phase == SessionPhase::Completed)
            .count()
    }

    pub fn abandoned(&self) -> usize {
        self.hubs
            .iter()
            .filter(|h| h.phase == SessionPhase::Abandoned)
            .count()
    }

    /// Print a human-readable summary.
    pub fn print_summary(&self) {
        println!("\n=== Session Summary (seed {}) ===", self.seed);
        for hub in &self.hubs {
            println!("\n{}: {}", hub.name, hub.phase);
            if let Some(at) = hub.finished_at {
                println!("  Finished at: {at:?}");
            }
            if !hub.participants.is_empty() {
                let outcomes: Vec<String> =
                    hub.joint_outcomes.iter().map(ToString::to_string).collect();
                println!("  Participants: {}", hub.participants.join(", "));
                println!("  Joint outcomes: [{}]", outcomes.join(", "));
            }
            for (sensor, bit) in &hub.fallback_bits {
                println!("  Fallback {sensor}: {bit}");
            }
        }

        println!("\n=== Statistics ===");
        println!(
            "Sessions: {} completed, {} abandoned",
            self.completed(),
            self.abandoned()
        );
        println!("Events processed: {}", self.stats.events_processed);
        println!(
            "Messages: {} sent, {} undeliverable",
            self.stats.messages_sent, self.stats.messages_undeliverable
        );
        println!(
            "Resources: {} requests, {} entangled, {} expired, {} released",
            self.resources.requests,
            self.resources.entangled,
            self.resources.expired,
            self.resources.released
        );
        println!("Simulated time: {:?}", self.finished_at);
    }
}

/// Builds a [`SimulationRunner`] from a scenario and drives it to the end.
pub struct Simulator {
    config: ScenarioConfig,
    runner: SimulationRunner,
    names: HashMap<NodeId, String>,
    hubs: Vec<NodeId>,
}

impl Simulator {
    /// Validate the scenario, register every node and start one session
    /// per hub.
    pub fn new(config: ScenarioConfig) -> Result<Self, ScenarioError> {
        config.validate()?;

        let mut runner = SimulationRunner::new(
            config.network_config(),
            config.resource_config(),
            config.simulation.seed,
        );
        let ids: HashMap<String, NodeId> = config
            .node_names()
            .into_iter()
            .map(|(id, name)| (name.to_string(), id))
            .collect();
        let names = ids.iter().map(|(name, &id)| (id, name.clone())).collect();

        let mut hubs = Vec::with_capacity(config.hubs.len());
        for hub in &config.hubs {
            let id = lookup(&ids, &hub.name)?;
            runner.add_hub(id, config.hub_config(hub))?;
            for sensor in &hub.sensors {
                runner.add_sensor(lookup(&ids, sensor)?)?;
            }
            hubs.push(id);
        }

        for (hub, section) in hubs.iter().zip(&config.hubs) {
            let targets = section
                .sensors
                .iter()
                .map(|s| lookup(&ids, s))
                .collect::<Result<Vec<_>, _>>()?;
            runner.start_session(
                *hub,
                targets,
                config.start_deadline(),
                config.end_deadline(),
                None,
            )?;
        }

        info!(
            seed = config.simulation.seed,
            hubs = hubs.len(),
            nodes = ids.len(),
            "Scenario initialized"
        );

        Ok(Self {
            config,
            runner,
            names,
            hubs,
        })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    /// Run until no events remain, then abandon every session that never
    /// reached quorum so each hub reports a terminal outcome.
    pub fn run(&mut self) -> SimulationReport {
        self.runner.run_to_completion();

        for &hub in &self.hubs {
            if self.hub_phase(hub) == Some(SessionPhase::Awaiting) {
                warn!(hub = %self.name(hub), "Session did not reach quorum, abandoning");
                self.runner
                    .schedule_initial_event(hub, Duration::ZERO, ProtocolEvent::AbandonSession);
            }
        }
        let finished_at = self.runner.run_to_completion();

        let hubs = self
            .hubs
            .iter()
            .map(|&hub| self.summarize(hub))
            .collect();
        SimulationReport {
            seed: self.config.simulation.seed,
            hubs,
            stats: self.runner.stats().clone(),
            resources: self.runner.resource_stats().clone(),
            finished_at,
        }
    }

    fn hub_phase(&self, hub: NodeId) -> Option<SessionPhase> {
        self.runner
            .node(hub)
            .and_then(|n| n.as_hub())
            .map(|h| h.phase())
    }

    fn name(&self, id: NodeId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn summarize(&self, hub: NodeId) -> HubSummary {
        let outcome: Option<&SessionOutcome> =
            self.runner.outcomes().iter().rev().find(|o| o.hub == hub);
        match outcome {
            Some(outcome) => HubSummary {
                name: self.name(hub),
                phase: outcome.phase,
                participants: outcome.participants.iter().map(|&p| self.name(p)).collect(),
                joint_outcomes: outcome.joint_outcomes.clone(),
                fallback_bits: outcome
                    .fallback_bits
                    .iter()
                    .map(|&(s, bit)| (self.name(s), bit))
                    .collect(),
                finished_at: Some(outcome.finished_at),
            },
            None => HubSummary {
                name: self.name(hub),
                phase: self.hub_phase(hub).unwrap_or(SessionPhase::Idle),
                participants: Vec::new(),
                joint_outcomes: Vec::new(),
                fallback_bits: Vec::new(),
                finished_at: None,
            },
        }
    }
}

fn lookup(ids: &HashMap<String, NodeId>, name: &str) -> Result<NodeId, ScenarioError> {
    ids.get(name).copied().ok_or_else(|| ScenarioError::Invalid {
        field: "hubs".to_string(),
        reason: format!("unknown node name {name:?}"),
    })
}

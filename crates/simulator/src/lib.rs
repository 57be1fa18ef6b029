//! Scenario-driven simulator for hub/sensor coordination.
//!
//! Wraps [`qsn_simulation::SimulationRunner`] with a TOML scenario format
//! and a per-hub report. The `qsn-sim` binary is a thin CLI over
//! [`Simulator`].
//!
//! # Example
//!
//! ```ignore
//! use qsn_simulator::{ScenarioConfig, Simulator};
//!
//! let config = ScenarioConfig::load("scenario.toml")?.with_seed(7);
//! let mut simulator = Simulator::new(config)?;
//! let report = simulator.run();
//! report.print_summary();
//! ```

mod config;
mod runner;

pub use config::{
    HubSection, NetworkSection, PolicySection, QuorumKeyword, QuorumSetting, ResourcesSection,
    ScenarioConfig, ScenarioError, SimulationSection,
};
pub use runner::{HubSummary, SimulationReport, Simulator};

//! Tests for deterministic simulation.
//!
//! These tests verify that the simulation produces identical results
//! given the same seed, which is the core property we need for debugging
//! and replay.

use qsn_hub::{HubConfig, QuorumPolicy};
use qsn_simulation::{NetworkConfig, ResourceLayerConfig, SimulationRunner};
use qsn_types::NodeId;
use std::time::Duration;
use tracing_test::traced_test;

const START: Duration = Duration::from_millis(1000);
const END: Duration = Duration::from_millis(3000);

fn test_network_config() -> NetworkConfig {
    NetworkConfig::new()
        .with_latency(Duration::from_millis(5))
        .with_jitter_fraction(0.5)
}

/// Two hubs with four sensors each, half of which must entangle.
fn build_runner(seed: u64, success_probability: f64) -> SimulationRunner {
    let resources = ResourceLayerConfig::new().with_success_probability(success_probability);
    let mut runner = SimulationRunner::new(test_network_config(), resources, seed);

    for hub in 0..2u32 {
        let hub_id = NodeId(hub);
        runner
            .add_hub(hub_id, HubConfig::new().with_quorum(QuorumPolicy::HalfOfTargets))
            .expect("fresh hub id");
        let sensors: Vec<NodeId> = (0..4).map(|i| NodeId(10 + hub * 4 + i)).collect();
        for &sensor in &sensors {
            runner.add_sensor(sensor).expect("fresh sensor id");
        }
        runner
            .start_session(hub_id, sensors, START, END, None)
            .expect("session should start");
    }
    runner
}

#[traced_test]
#[test]
fn test_determinism_same_seed() {
    let seed = 12345u64;

    let mut runner1 = build_runner(seed, 0.5);
    runner1.run_to_completion();

    let mut runner2 = build_runner(seed, 0.5);
    runner2.run_to_completion();

    assert_eq!(runner1.stats(), runner2.stats());
    assert_eq!(runner1.resource_stats(), runner2.resource_stats());
    assert_eq!(runner1.outcomes(), runner2.outcomes());
    assert_eq!(runner1.now(), runner2.now());
}

#[test]
fn test_different_seeds_both_run() {
    for seed in [1u64, 2, 3, 4] {
        let mut runner = build_runner(seed, 0.5);
        runner.run_to_completion();

        let stats = runner.stats();
        assert!(stats.events_processed > 0);
        assert!(stats.messages_sent >= 16, "proposals and accepts at minimum");
        assert_eq!(runner.pending_events(), 0);
    }
}

#[test]
fn test_run_until_stops_at_time_limit() {
    let mut runner = build_runner(7, 1.0);

    runner.run_until(Duration::from_millis(500));

    assert_eq!(runner.now(), Duration::from_millis(500));
    assert!(runner.outcomes().is_empty(), "nothing entangles before start");
    assert!(runner.pending_events() > 0, "expiries and deadlines remain");

    runner.run_until(END + Duration::from_secs(1));
    assert_eq!(runner.outcomes().len(), 2);
}

//! Simulated network with deterministic latency and per-pair FIFO.

use qsn_types::NodeId;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

/// Configuration for the simulated network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Base one-way latency.
    pub latency: Duration,
    /// Jitter as a fraction of base latency (0.0 - 1.0).
    pub jitter_fraction: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(5),
            jitter_fraction: 0.1,
        }
    }
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base one-way latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the jitter fraction, clamped to `[0, 1]`.
    pub fn with_jitter_fraction(mut self, jitter: f64) -> Self {
        self.jitter_fraction = jitter.clamp(0.0, 1.0);
        self
    }
}

/// Simulated network for deterministic message delivery.
///
/// Reliable: every message is delivered. Messages on the same ordered pair
/// are never reordered, even when jitter would otherwise overtake an
/// earlier send.
#[derive(Debug)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
    /// Latest scheduled delivery per `(from, to)`.
    last_delivery: HashMap<(NodeId, NodeId), Duration>,
}

impl SimulatedNetwork {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            last_delivery: HashMap::new(),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Sample a one-way latency with jitter. Never below 1µs.
    pub fn sample_latency(&self, rng: &mut ChaCha8Rng) -> Duration {
        const FLOOR: Duration = Duration::from_micros(1);
        let base = self.config.latency.as_secs_f64();
        let jitter_range = base * self.config.jitter_fraction;
        if jitter_range <= 0.0 {
            return self.config.latency.max(FLOOR);
        }
        let jitter = rng.gen_range(-jitter_range..jitter_range);
        Duration::from_secs_f64((base + jitter).max(0.0)).max(FLOOR)
    }

    /// Delivery time for a message sent at `now`, clamped so it never lands
    /// before the previous message on the same pair.
    pub fn delivery_time(
        &mut self,
        from: NodeId,
        to: NodeId,
        now: Duration,
        rng: &mut ChaCha8Rng,
    ) -> Duration {
        let sampled = now + self.sample_latency(rng);
        let slot = self.last_delivery.entry((from, to)).or_insert(sampled);
        if sampled < *slot {
            trace!(from = from.0, to = to.0, "FIFO clamp applied");
        }
        let delivery = sampled.max(*slot);
        *slot = delivery;
        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_latency_stays_within_jitter() {
        let network = SimulatedNetwork::new(
            NetworkConfig::new()
                .with_latency(Duration::from_millis(10))
                .with_jitter_fraction(0.2),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let latency = network.sample_latency(&mut rng);
            assert!(latency >= Duration::from_micros(7_990));
            assert!(latency <= Duration::from_micros(12_010));
        }
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let network = SimulatedNetwork::new(NetworkConfig::new().with_jitter_fraction(0.0));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(network.sample_latency(&mut rng), Duration::from_millis(5));
    }

    #[test]
    fn test_per_pair_fifo_under_jitter() {
        let mut network = SimulatedNetwork::new(
            NetworkConfig::new()
                .with_latency(Duration::from_millis(10))
                .with_jitter_fraction(1.0),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let (a, b) = (NodeId(0), NodeId(1));

        let mut previous = Duration::ZERO;
        for step in 0..500u64 {
            let now = Duration::from_micros(step * 100);
            let delivery = network.delivery_time(a, b, now, &mut rng);
            assert!(delivery >= previous, "message {step} overtook its predecessor");
            assert!(delivery > now);
            previous = delivery;
        }
    }

    #[test]
    fn test_pairs_are_independent() {
        let mut network = SimulatedNetwork::new(NetworkConfig::new().with_jitter_fraction(0.0));
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let late = network.delivery_time(NodeId(0), NodeId(1), Duration::from_secs(1), &mut rng);
        let other = network.delivery_time(NodeId(1), NodeId(0), Duration::ZERO, &mut rng);

        assert_eq!(late, Duration::from_millis(1005));
        assert_eq!(other, Duration::from_millis(5));
    }
}

//! Simulated GHZ joint operation.

use qsn_core::JointOperation;
use qsn_types::{ClassicalBit, ResourceHandle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Ideal GHZ preparation followed by a computational-basis measurement.
///
/// Every participant observes the same bit. The bit itself is uniformly
/// random per invocation.
#[derive(Debug)]
pub struct GhzMeasurement {
    rng: ChaCha8Rng,
    invocations: Arc<AtomicU64>,
}

impl GhzMeasurement {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            invocations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared invocation counter. Stays readable after the measurement has
    /// been moved into a hub.
    pub fn invocation_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.invocations)
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }
}

impl JointOperation for GhzMeasurement {
    fn run_joint_operation(&mut self, handles: &[ResourceHandle]) -> Vec<ClassicalBit> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let bit = ClassicalBit::new(self.rng.gen::<bool>());
        vec![bit; handles.len()]
    }
}

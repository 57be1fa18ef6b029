//! Fallback sub-agent.
//!
//! Runs once on entry into [`SensorState::Fallback`](crate::SensorState):
//! performs a local stand-in measurement (one random classical bit from the
//! node's own generator) and reports it to the hub with CLASSICAL_FALLBACK.
//! No retries, no acknowledgement.

use qsn_core::Action;
use qsn_messages::GhzMessage;
use qsn_types::{ClassicalBit, NodeId};
use rand::Rng;

/// One-shot fallback for a single hub.
///
/// [`execute`](Self::execute) consumes the agent, so a given agent can report
/// at most once.
#[derive(Debug)]
pub struct FallbackAgent {
    hub: NodeId,
}

impl FallbackAgent {
    pub fn new(hub: NodeId) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> NodeId {
        self.hub
    }

    /// Draw the local bit and build the message that reports it.
    pub fn execute<R: Rng + ?Sized>(self, rng: &mut R) -> (ClassicalBit, Action) {
        let bit = ClassicalBit::new(rng.gen::<bool>());
        let action = Action::SendMessage {
            to: self.hub,
            message: GhzMessage::ClassicalFallback { bit },
        };
        (bit, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_execute_addresses_hub() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (bit, action) = FallbackAgent::new(NodeId(3)).execute(&mut rng);
        assert_eq!(
            action,
            Action::SendMessage {
                to: NodeId(3),
                message: GhzMessage::ClassicalFallback { bit },
            }
        );
    }

    #[test]
    fn test_same_seed_same_bit() {
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        let (bit_a, _) = FallbackAgent::new(NodeId(0)).execute(&mut a);
        let (bit_b, _) = FallbackAgent::new(NodeId(0)).execute(&mut b);
        assert_eq!(bit_a, bit_b);
    }

    #[test]
    fn test_both_values_reachable() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let bits: Vec<_> = (0..64)
            .map(|_| FallbackAgent::new(NodeId(0)).execute(&mut rng).0)
            .collect();
        assert!(bits.contains(&ClassicalBit::ZERO));
        assert!(bits.contains(&ClassicalBit::ONE));
    }
}

//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a network node (hub or sensor).
///
/// Node ids are uniquely addressable: a message sent to a `NodeId` reaches
/// exactly one protocol instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Opaque handle to one memory-pair instance issued by the resource layer.
///
/// The coordinator never interprets a handle; it only collects the handles of
/// entangled resources and passes them to the joint operation and back to the
/// resource layer for release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(pub u64);

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(7).to_string(), "node-7");
        assert_eq!(ResourceHandle(12).to_string(), "res-12");
    }

    #[test]
    fn test_node_id_ordering_follows_index() {
        let mut ids = vec![NodeId(3), NodeId(1), NodeId(2)];
        ids.sort();
        assert_eq!(ids, vec![NodeId(1), NodeId(2), NodeId(3)]);
    }
}

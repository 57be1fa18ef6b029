//! Runner setup errors.

use qsn_hub::SessionError;
use qsn_types::NodeId;

/// Error returned by [`SimulationRunner`](crate::SimulationRunner) setup calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Node {0} already exists")]
    DuplicateNode(NodeId),
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    #[error("Node {0} is not a hub")]
    NotAHub(NodeId),
    #[error("Session rejected: {0}")]
    Session(#[from] SessionError),
}

//! Resource-layer notification types.

use crate::{NodeId, ResourceHandle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a memory-pair resource as reported by the resource layer.
///
/// Only the two states relevant to coordination are modelled; the physical
/// meaning of each is owned by the resource layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceState {
    /// The pairwise link is established and usable.
    Entangled,
    /// The resource is free, or an entanglement attempt rolled back.
    Raw,
}

impl ResourceState {
    pub fn is_entangled(self) -> bool {
        matches!(self, ResourceState::Entangled)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Entangled => f.write_str("ENTANGLED"),
            ResourceState::Raw => f.write_str("RAW"),
        }
    }
}

/// A resource state-change notification.
///
/// Delivered to both endpoints of a pairwise link. `remote` is always the
/// *other* endpoint from the receiver's point of view: the sensor id on the
/// hub side, the hub id on the sensor side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub remote: NodeId,
    pub state: ResourceState,
    pub handle: ResourceHandle,
}

/// A single classical measurement result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassicalBit(bool);

impl ClassicalBit {
    pub const ZERO: ClassicalBit = ClassicalBit(false);
    pub const ONE: ClassicalBit = ClassicalBit(true);

    pub fn new(value: bool) -> Self {
        ClassicalBit(value)
    }

    pub fn as_bool(self) -> bool {
        self.0
    }

    /// The bit as `0` or `1`.
    pub fn as_u8(self) -> u8 {
        u8::from(self.0)
    }
}

impl From<bool> for ClassicalBit {
    fn from(value: bool) -> Self {
        ClassicalBit(value)
    }
}

impl fmt::Display for ClassicalBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

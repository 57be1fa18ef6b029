//! Core types for QSN entanglement coordination.
//!
//! This crate provides the foundational types shared by the hub, sensor and
//! simulation crates:
//!
//! - **Identifiers**: [`NodeId`], [`ResourceHandle`]
//! - **Resource layer**: [`ResourceState`], [`ResourceInfo`]
//! - **Classical results**: [`ClassicalBit`]
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend on
//! any other workspace crates, making it the foundation layer.

mod identifiers;
mod resource;

pub use identifiers::{NodeId, ResourceHandle};
pub use resource::{ClassicalBit, ResourceInfo, ResourceState};

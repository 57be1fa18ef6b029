//! Sensor-side coordination logic.
//!
//! A sensor is purely reactive: it cannot detect timeouts (deadlines live at
//! the hub), so it only answers proposals, forwards resource status, and falls
//! back when the hub tells it to.
//!
//! # State machine
//!
//! ```text
//!            PROPOSE / ACCEPT
//!              ┌──────┐
//!              ▼      │
//!          ┌────────────┐   ATTEMPT_FAILED   ┌────────────┐
//!  start → │   Normal   │ ─────────────────► │  Fallback  │  (terminal)
//!          └────────────┘   send one         └────────────┘
//!                           CLASSICAL_FALLBACK
//! ```
//!
//! # Components
//!
//! - [`SensorAgent`] - the per-node state machine
//! - [`SensorState`] - the tagged state variant
//! - [`FallbackAgent`] - the one-shot local substitute measurement

mod fallback;
mod state;

pub use fallback::FallbackAgent;
pub use state::{RoundParameters, SensorAgent, SensorState};

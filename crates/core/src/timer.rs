//! Timer identification.
//!
//! State machines emit `Action::SetTimer`; the runner turns it into a scheduled
//! event. There is no cancellation: once set, a timer always fires, and the
//! receiving state machine decides whether the firing is still relevant.

/// Timer identification for scheduled events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// End-of-window check for the hub session started as `round`.
    SessionDeadline { round: u64 },
}

//! Messages exchanged between a hub and its sensors.
//!
//! Six message kinds, each used in exactly one direction:
//!
//! | Kind                 | Direction    | Payload                                   |
//! |----------------------|--------------|-------------------------------------------|
//! | `Propose`            | hub → sensor | hub id, start/end deadline, resource count |
//! | `Accept`             | sensor → hub | none                                       |
//! | `Reject`             | sensor → hub | none                                       |
//! | `StatusUpdate`       | sensor → hub | resource state                            |
//! | `AttemptFailed`      | hub → sensor | none                                       |
//! | `ClassicalFallback`  | sensor → hub | classical bit                             |
//!
//! The carrier is reliable and FIFO per ordered sender/receiver pair, with no
//! ordering across senders. Receivers apply their own state-dependent filtering
//! and never assume the sender is well behaved.

mod ghz;

pub use ghz::{Direction, GhzMessage, MessageKind};

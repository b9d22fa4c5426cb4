//! CallBridge Types - Canonical domain types for the telephony broker
//!
//! This crate contains the foundational types for CallBridge with zero
//! dependencies on other callbridge crates. It defines:
//!
//! - Call lifecycle types (`CallStatus` with its transition matrix,
//!   `CallDirection` with upstream-variant normalization)
//! - Typed webhook payloads with field aliases for every shape the
//!   upstream is known to deliver
//! - The real-time fanout event envelope sent to subscriber connections
//! - The shared error taxonomy used at the HTTP surface
//!
//! # Architectural Invariants
//!
//! 1. Terminal call states are sticky; the transition matrix is the only
//!    authority on call-status legality
//! 2. Webhook payloads are parsed through tagged structs, never by probing
//!    JSON paths at runtime
//! 3. Direction values are normalized once, at the type boundary

pub mod call;
pub mod error;
pub mod event;
pub mod fanout;

pub use call::*;
pub use error::*;
pub use event::*;
pub use fanout::*;

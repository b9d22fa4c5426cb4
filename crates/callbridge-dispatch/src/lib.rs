//! CallBridge Dispatch
//!
//! Drains the durable webhook queue with at-most-one concurrent processing
//! per event, even across dispatcher instances. Each worker pass leases a
//! batch under `FOR UPDATE SKIP LOCKED`, routes every event to its
//! registered handler inside a per-event savepoint, stamps successes, and
//! delivers fanout emissions after the batch commits.
//!
//! The call state machine lives here: handlers validate every proposed
//! status change against the transition matrix while holding a row lock on
//! the call, so concurrent deliveries for the same call serialize naturally.

pub mod calls;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod message;
pub mod sanitize;
pub mod voicemail;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{DispatchError, DispatchResult};
pub use handler::{EventHandler, HandlerRegistry};
pub use sanitize::sanitize_payload;

use std::sync::Arc;

/// Build the registry with every handler the broker knows, under the event
/// type strings the upstream delivers.
pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("call.ring", Arc::new(calls::RingHandler));
    registry.register("call.started", Arc::new(calls::StartedHandler));
    registry.register("call.ended", Arc::new(calls::EndedHandler));
    registry.register("call.missed", Arc::new(calls::MissedHandler));
    registry.register("call.rejected", Arc::new(calls::RejectedHandler));
    registry.register("call.recording_completed", Arc::new(calls::RecordingHandler));
    registry.register("voicemail.received", Arc::new(voicemail::VoicemailHandler));
    registry.register("sms.received", Arc::new(message::MessageHandler));
    registry.register("sms.sent", Arc::new(message::MessageHandler));
    registry
}

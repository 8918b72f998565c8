//! Call session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition` maps a session and an event to a new session plus the
//! effects the runtime must carry out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Notification, INVALID_OPTION_NOTICE};
pub use event::Event;
pub use state::{Session, SessionContext, SessionPhase, TimerId};
pub use transition::{transition, TransitionError, TransitionResult};

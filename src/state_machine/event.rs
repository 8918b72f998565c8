//! Events that drive a call session

use super::state::TimerId;
use crate::flow::Key;

/// Everything that can happen to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Call answered; enter the flow's entry state
    Start,

    /// Caller pressed a key
    KeyPress { key: Key },

    /// An armed input timer expired
    TimeoutFired { timer: TimerId },

    /// Host-requested jump to a specific state
    Jump { state_id: String },

    /// Return to the previously visited state
    GoBack,

    /// Toggle training mode; applies from the next armed timer
    SetTrainingMode { enabled: bool },

    /// Tear the session down
    Stop,
}

//! Session state types

use crate::config::EngineConfig;
use crate::flow::{FlowGraph, StateNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identifies one armed input timer within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Not started
    #[default]
    Idle,
    /// A prompt has been emitted; waiting for a keypress or the timer
    AwaitingInput,
    /// A terminal node was reached
    Terminal,
    /// Stopped explicitly or after a fatal error
    Stopped,
}

/// Mutable per-call state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    pub phase: SessionPhase,
    pub current_state: Option<String>,
    /// Previously visited states, oldest first
    pub history: Vec<String>,
    /// Consecutive invalid-input or timeout events at the current state
    pub retry_count: u32,
    /// Digits accumulated at an input node
    pub input_buffer: String,
    pub training_mode: bool,
    /// The one outstanding input timer, if any
    pub pending_timeout: Option<TimerId>,
    /// Values submitted at input nodes, keyed by node id
    pub collected: BTreeMap<String, String>,
    /// Monotonic so an id is never reused within a session
    #[serde(default)]
    pub(crate) next_timer: u64,
}

impl Session {
    pub fn new(training_mode: bool) -> Self {
        Self {
            training_mode,
            ..Self::default()
        }
    }

    /// Accepts input and fires timeouts
    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::AwaitingInput
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, SessionPhase::Terminal | SessionPhase::Stopped)
    }

    /// Clear everything except the training flag and the timer sequence
    pub(crate) fn reset(&mut self) {
        *self = Self {
            training_mode: self.training_mode,
            next_timer: self.next_timer,
            ..Self::default()
        };
    }

    pub(crate) fn allocate_timer(&mut self) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        id
    }
}

/// Immutable inputs to every transition of one call
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub call_id: String,
    pub graph: Arc<FlowGraph>,
    pub config: EngineConfig,
}

impl SessionContext {
    pub fn new(call_id: impl Into<String>, graph: Arc<FlowGraph>, config: EngineConfig) -> Self {
        Self {
            call_id: call_id.into(),
            graph,
            config,
        }
    }

    pub fn node(&self, id: &str) -> Option<Arc<StateNode>> {
        self.graph.get(id).cloned()
    }

    pub fn timeout_for(&self, session: &Session) -> Duration {
        self.config.effective_timeout(session.training_mode)
    }
}

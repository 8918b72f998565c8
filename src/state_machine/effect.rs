//! Effects produced by state transitions

use super::state::TimerId;
use crate::flow::{Key, StateNode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Prefix for prompts repeated after an unrecognised key
pub const INVALID_OPTION_NOTICE: &str = "Sorry, that is not a valid option.";

/// Notifications delivered to registered sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    StateChanged {
        node: Arc<StateNode>,
        history: Vec<String>,
    },
    MessageReady {
        text: String,
        language: String,
        node: Arc<StateNode>,
    },
    InputTimeout,
    TransferRequested {
        node: Arc<StateNode>,
    },
    KeyPressed {
        key: Key,
    },
    /// Value submitted at an input node, fired before leaving it
    InputCollected {
        node: Arc<StateNode>,
        value: String,
    },
    FatalError {
        description: String,
    },
}

impl Notification {
    /// Stable name for logging and filtering
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::StateChanged { .. } => "state_changed",
            Notification::MessageReady { .. } => "message_ready",
            Notification::InputTimeout => "input_timeout",
            Notification::TransferRequested { .. } => "transfer_requested",
            Notification::KeyPressed { .. } => "key_pressed",
            Notification::InputCollected { .. } => "input_collected",
            Notification::FatalError { .. } => "fatal_error",
        }
    }
}

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver a notification to every registered sink
    Notify(Notification),

    /// Arm the input timer, replacing any pending one
    ArmTimeout { timer: TimerId, delay: Duration },

    /// Cancel the pending input timer
    CancelTimeout,
}

impl Effect {
    pub fn state_changed(node: Arc<StateNode>, history: Vec<String>) -> Self {
        Effect::Notify(Notification::StateChanged { node, history })
    }

    pub fn message(text: impl Into<String>, node: Arc<StateNode>) -> Self {
        Effect::Notify(Notification::MessageReady {
            text: text.into(),
            language: node.language.clone(),
            node,
        })
    }

    pub fn fatal(description: impl Into<String>) -> Self {
        Effect::Notify(Notification::FatalError {
            description: description.into(),
        })
    }

    pub fn notification(&self) -> Option<&Notification> {
        match self {
            Effect::Notify(n) => Some(n),
            _ => None,
        }
    }
}

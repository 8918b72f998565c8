//! State node types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Keypad input
// ============================================================================

/// A single key on the caller's keypad.
///
/// `Digit` only ever holds 0-9. Parsing (`TryFrom<char>`, `FromStr`, serde)
/// and `Key::digit` enforce this; a larger value built by hand is a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    /// 0-9
    Digit(u8),
    Star,
    Pound,
}

/// Character outside `0-9`, `*`, `#`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a keypad key: {0:?}")]
pub struct KeyError(pub String);

impl Key {
    /// Checked constructor for digit keys
    pub fn digit(d: u8) -> Option<Self> {
        (d <= 9).then_some(Key::Digit(d))
    }

    pub fn as_char(self) -> char {
        match self {
            Key::Digit(d) => {
                debug_assert!(d <= 9, "keypad digit out of range: {d}");
                char::from_digit(u32::from(d), 10).unwrap_or('?')
            }
            Key::Star => '*',
            Key::Pound => '#',
        }
    }
}

impl TryFrom<char> for Key {
    type Error = KeyError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            '*' => Ok(Key::Star),
            '#' => Ok(Key::Pound),
            _ => c
                .to_digit(10)
                .and_then(|d| u8::try_from(d).ok())
                .and_then(Key::digit)
                .ok_or_else(|| KeyError(c.to_string())),
        }
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Key::try_from(c),
            _ => Err(KeyError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Key {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.as_char().to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ============================================================================
// Transition triggers
// ============================================================================

/// What causes a transition out of a node.
///
/// Serialized as the bare key (`"1"`, `"*"`, `"#"`) or the literals
/// `"default"` and `"timeout"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Trigger {
    Key(Key),
    /// Fallback for keys without their own entry
    Default,
    /// Followed when the input timer expires
    Timeout,
}

impl FromStr for Trigger {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Trigger::Default),
            "timeout" => Ok(Trigger::Timeout),
            _ => s.parse().map(Trigger::Key),
        }
    }
}

impl TryFrom<String> for Trigger {
    type Error = KeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Trigger> for String {
    fn from(trigger: Trigger) -> Self {
        trigger.to_string()
    }
}

impl From<Key> for Trigger {
    fn from(key: Key) -> Self {
        Trigger::Key(key)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Key(key) => write!(f, "{key}"),
            Trigger::Default => f.write_str("default"),
            Trigger::Timeout => f.write_str("timeout"),
        }
    }
}

// ============================================================================
// State node
// ============================================================================

/// How a node consumes keypad input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Single-keypress choices
    Menu,
    /// Multi-digit entry, `#` submits and `*` cancels
    Input,
    /// No further input expected
    Terminal,
}

/// Semantic tag carried by terminal nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeAction {
    /// Hand the call to a human agent
    Transfer,
    /// End the call
    Hangup,
}

const DEFAULT_LANGUAGE: &str = "en-US";

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// One point in the call flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateNode {
    pub id: String,
    pub kind: NodeKind,
    pub message: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub transitions: BTreeMap<Trigger, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<NodeAction>,
}

impl StateNode {
    fn new(id: impl Into<String>, kind: NodeKind, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            message: message.into(),
            language: default_language(),
            transitions: BTreeMap::new(),
            action: None,
        }
    }

    pub fn menu(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Menu, message)
    }

    pub fn input(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Input, message)
    }

    pub fn terminal(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Terminal, message)
    }

    /// Add an outgoing transition
    #[must_use]
    pub fn on(mut self, trigger: impl Into<Trigger>, target: impl Into<String>) -> Self {
        self.transitions.insert(trigger.into(), target.into());
        self
    }

    #[must_use]
    pub fn on_default(self, target: impl Into<String>) -> Self {
        self.on(Trigger::Default, target)
    }

    #[must_use]
    pub fn on_timeout(self, target: impl Into<String>) -> Self {
        self.on(Trigger::Timeout, target)
    }

    #[must_use]
    pub fn with_action(mut self, action: NodeAction) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn in_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Exact transition for a trigger, no fallback
    pub fn target(&self, trigger: Trigger) -> Option<&str> {
        self.transitions.get(&trigger).map(String::as_str)
    }

    /// Target for a keypress: the key's own entry, then `default`
    pub fn resolve_key(&self, key: Key) -> Option<&str> {
        self.target(Trigger::Key(key))
            .or_else(|| self.target(Trigger::Default))
    }

    /// Target for a submitted input buffer: `#`, then `default`
    pub fn submit_target(&self) -> Option<&str> {
        self.target(Trigger::Key(Key::Pound))
            .or_else(|| self.target(Trigger::Default))
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == NodeKind::Terminal
    }

    pub fn requests_transfer(&self) -> bool {
        self.is_terminal() && self.action == Some(NodeAction::Transfer)
    }
}

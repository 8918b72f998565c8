//! Flow graph loading and load-time validation

use super::node::{StateNode, Trigger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Reserved escalation target every flow must define
pub const TRANSFER_AGENT: &str = "TRANSFER_AGENT";

/// Flow as authored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDefinition {
    /// State entered when a session starts
    pub entry: String,
    pub states: Vec<StateNode>,
}

/// Errors that reject a flow at load time
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("failed to read flow file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed flow definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("state with empty id")]
    EmptyId,
    #[error("state '{0}' is defined more than once")]
    DuplicateState(String),
    #[error("state '{state}' has an action but is not terminal")]
    ActionOnNonTerminal { state: String },
    #[error("state '{state}' transition '{trigger}' targets unknown state '{target}'")]
    UnknownTarget {
        state: String,
        trigger: Trigger,
        target: String,
    },
    #[error("entry state '{0}' is not defined")]
    UnknownEntry(String),
    #[error("flow does not define the reserved 'TRANSFER_AGENT' state")]
    MissingTransferAgent,
    #[error("'TRANSFER_AGENT' must be a terminal state with the transfer action")]
    TransferAgentNotTerminal,
}

/// Immutable, validated mapping from state id to node
#[derive(Debug)]
pub struct FlowGraph {
    entry: String,
    nodes: HashMap<String, Arc<StateNode>>,
}

impl FlowGraph {
    /// Validate a definition. Any unresolvable reference rejects the whole graph.
    pub fn new(definition: FlowDefinition) -> Result<Self, FlowError> {
        let FlowDefinition { entry, states } = definition;

        let mut nodes = HashMap::with_capacity(states.len());
        for node in states {
            if node.id.is_empty() {
                return Err(FlowError::EmptyId);
            }
            if node.action.is_some() && !node.is_terminal() {
                return Err(FlowError::ActionOnNonTerminal { state: node.id });
            }
            if nodes.contains_key(&node.id) {
                return Err(FlowError::DuplicateState(node.id));
            }
            nodes.insert(node.id.clone(), Arc::new(node));
        }

        for node in nodes.values() {
            for (trigger, target) in &node.transitions {
                if !nodes.contains_key(target) {
                    return Err(FlowError::UnknownTarget {
                        state: node.id.clone(),
                        trigger: *trigger,
                        target: target.clone(),
                    });
                }
            }
        }

        if !nodes.contains_key(&entry) {
            return Err(FlowError::UnknownEntry(entry));
        }
        // Escalation must end the menu loop, not re-enter it
        match nodes.get(TRANSFER_AGENT) {
            None => return Err(FlowError::MissingTransferAgent),
            Some(agent) if !agent.requests_transfer() => {
                return Err(FlowError::TransferAgentNotTerminal)
            }
            Some(_) => {}
        }

        Ok(Self { entry, nodes })
    }

    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Read and validate a JSON flow file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FlowError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| FlowError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn get(&self, id: &str) -> Option<&Arc<StateNode>> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn state_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}

//! Static call-flow graph
//!
//! A flow is loaded once, validated as a whole, and then shared read-only by
//! every session.

mod graph;
mod node;

pub use graph::{FlowDefinition, FlowError, FlowGraph, TRANSFER_AGENT};
pub use node::{Key, KeyError, NodeAction, NodeKind, StateNode, Trigger};

//! IVR call-flow navigation engine
//!
//! Drives a caller through a graph of prompt states using keypad input,
//! with input timeouts, bounded retries and escalation to a live agent.

pub mod config;
pub mod flow;
pub mod runtime;
pub mod state_machine;

pub use config::{ConfigError, EngineConfig};
pub use flow::{FlowDefinition, FlowError, FlowGraph, Key, StateNode, TRANSFER_AGENT};
pub use runtime::{CallError, CallHandle, CallManager, Notifier, PromptPlayer, SessionEngine};
pub use state_machine::{Event, Notification, Session, SessionPhase};

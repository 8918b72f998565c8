//! Runtime for executing calls
//!
//! Each call runs on its own task, owning its session exclusively. Hosts
//! talk to a call through its `CallHandle`.

mod engine;
mod executor;
mod playback;
mod sink;
mod timer;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use engine::SessionEngine;
pub use executor::CallRuntime;
pub use playback::PromptPlayer;
pub use sink::{FnSink, LoggingSink, NotificationSink, Notifier};
pub use timer::{TimerScheduler, TokioTimer};
pub use traits::*;

use crate::config::EngineConfig;
use crate::flow::{FlowGraph, Key};
use crate::state_machine::{Event, SessionContext};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallError {
    #[error("Call {0} has ended")]
    CallEnded(String),
    #[error("Unknown call: {0}")]
    UnknownCall(String),
}

/// Handle to interact with a running call
#[derive(Debug, Clone)]
pub struct CallHandle {
    pub call_id: String,
    pub started_at: DateTime<Utc>,
    event_tx: mpsc::Sender<Event>,
}

impl CallHandle {
    pub async fn press(&self, key: Key) -> Result<(), CallError> {
        self.send(Event::KeyPress { key }).await
    }

    pub async fn go_back(&self) -> Result<(), CallError> {
        self.send(Event::GoBack).await
    }

    pub async fn jump(&self, state_id: impl Into<String>) -> Result<(), CallError> {
        self.send(Event::Jump {
            state_id: state_id.into(),
        })
        .await
    }

    pub async fn set_training_mode(&self, enabled: bool) -> Result<(), CallError> {
        self.send(Event::SetTrainingMode { enabled }).await
    }

    pub async fn stop(&self) -> Result<(), CallError> {
        self.send(Event::Stop).await
    }

    pub async fn send(&self, event: Event) -> Result<(), CallError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| CallError::CallEnded(self.call_id.clone()))
    }

    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }
}

/// Manager for all active calls sharing one flow
pub struct CallManager {
    graph: Arc<FlowGraph>,
    config: EngineConfig,
    calls: Arc<RwLock<HashMap<String, CallHandle>>>,
}

impl CallManager {
    pub fn new(graph: Arc<FlowGraph>, config: EngineConfig) -> Self {
        Self {
            graph,
            config,
            calls: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a new call at the flow's entry state. A `LoggingSink` is always
    /// registered after the caller's sinks.
    ///
    /// The call leaves the registry on its own once it is transferred, hung
    /// up or stopped.
    pub async fn start_call(&self, notifier: Notifier) -> Result<CallHandle, CallError> {
        let call_id = uuid::Uuid::new_v4().to_string();
        let context = SessionContext::new(&call_id, Arc::clone(&self.graph), self.config.clone());

        let notifier = notifier.with(Arc::new(LoggingSink::new(&call_id)));

        let (event_tx, event_rx) = mpsc::channel(32);
        let runtime = CallRuntime::new(context, notifier, event_rx, &event_tx);

        let handle = CallHandle {
            call_id: call_id.clone(),
            started_at: Utc::now(),
            event_tx,
        };
        self.calls
            .write()
            .await
            .insert(call_id.clone(), handle.clone());

        let calls = Arc::clone(&self.calls);
        tokio::spawn(async move {
            runtime.run().await;
            calls.write().await.remove(&call_id);
            tracing::info!(call_id = %call_id, "Call finished");
        });

        handle.send(Event::Start).await?;
        tracing::info!(call_id = %handle.call_id, entry = %self.graph.entry(), "Call started");
        Ok(handle)
    }

    pub async fn get(&self, call_id: &str) -> Option<CallHandle> {
        self.calls
            .read()
            .await
            .get(call_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Stop a call and forget it
    pub async fn end_call(&self, call_id: &str) -> Result<(), CallError> {
        let handle = self
            .calls
            .write()
            .await
            .remove(call_id)
            .ok_or_else(|| CallError::UnknownCall(call_id.to_string()))?;

        // Already stopped on its own: nothing left to do
        if let Err(e) = handle.stop().await {
            tracing::debug!(error = %e, "Call already finished");
        }
        Ok(())
    }

    /// Ids of calls still running; finished calls are pruned
    pub async fn active_calls(&self) -> Vec<String> {
        let mut calls = self.calls.write().await;
        calls.retain(|_, handle| !handle.is_closed());
        let mut ids: Vec<String> = calls.keys().cloned().collect();
        ids.sort();
        ids
    }
}

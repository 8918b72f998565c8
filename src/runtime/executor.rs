//! Call runtime - drives one session from its event channel

use super::engine::SessionEngine;
use super::sink::Notifier;
use super::timer::TokioTimer;
use crate::state_machine::{Event, SessionContext, SessionPhase};
use tokio::sync::mpsc;

/// Runtime for a single call
///
/// All events for the call (keypresses, host commands, fired timers) arrive
/// on one channel and are handled strictly one at a time.
pub struct CallRuntime {
    engine: SessionEngine<TokioTimer>,
    event_rx: mpsc::Receiver<Event>,
}

impl CallRuntime {
    /// `event_tx` must be the sender paired with `event_rx`; timers hold a
    /// weak copy so they never keep the call alive.
    pub fn new(
        context: SessionContext,
        notifier: Notifier,
        event_rx: mpsc::Receiver<Event>,
        event_tx: &mpsc::Sender<Event>,
    ) -> Self {
        let timer = TokioTimer::new(event_tx.downgrade());
        Self {
            engine: SessionEngine::new(context, notifier, timer),
            event_rx,
        }
    }

    /// Process events until the session finishes (terminal node or stop) or
    /// every sender is gone
    pub async fn run(mut self) {
        let call_id = self.engine.context().call_id.clone();
        tracing::info!(call_id = %call_id, "Starting call runtime");

        while let Some(event) = self.event_rx.recv().await {
            if let Err(e) = self.engine.dispatch(event) {
                tracing::warn!(call_id = %call_id, error = %e, "Event rejected");
            }
            // Terminal notifications were delivered synchronously above
            if self.engine.session().is_finished() {
                break;
            }
        }

        let reached = self.engine.session().current_state.clone();
        if self.engine.session().phase != SessionPhase::Stopped {
            self.engine.stop();
        }

        tracing::info!(call_id = %call_id, state = ?reached, "Call runtime stopped");
    }
}

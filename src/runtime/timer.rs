//! Input timers

use crate::state_machine::{Event, TimerId};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Schedules the single outstanding input timer of a session
pub trait TimerScheduler: Send {
    /// Arm `timer`, cancelling whatever was pending
    fn arm(&mut self, timer: TimerId, delay: Duration);

    /// Cancel the pending timer. Idempotent.
    fn cancel(&mut self);
}

/// Timer backed by a tokio task that feeds `TimeoutFired` into the
/// session's own event channel.
///
/// Holds only a weak sender so a pending timer never keeps a finished call
/// alive. Dropping the timer cancels it.
pub struct TokioTimer {
    events: mpsc::WeakSender<Event>,
    pending: Option<CancellationToken>,
}

impl TokioTimer {
    pub fn new(events: mpsc::WeakSender<Event>) -> Self {
        Self {
            events,
            pending: None,
        }
    }
}

impl TimerScheduler for TokioTimer {
    fn arm(&mut self, timer: TimerId, delay: Duration) {
        self.cancel();

        if self.events.upgrade().is_none() {
            tracing::debug!(%timer, "Event channel closed, not arming timer");
            return;
        }

        let events = self.events.clone();
        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = token.cancelled() => {}

                () = tokio::time::sleep(delay) => {
                    if let Some(event_tx) = events.upgrade() {
                        let _ = event_tx.send(Event::TimeoutFired { timer }).await;
                    }
                }
            }
        });
    }

    fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
